/// 경매 목록 조회 (필터/정렬)
// region:    --- Imports
use crate::auction::model::{Auction, AuctionStatus, Category};
use crate::error::MarketResult;
use crate::fees::Fees;
use crate::timer::{remaining, TimeRemaining};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// endregion: --- Imports

// region:    --- Query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    BiddersDesc,
    BiddersAsc,
    TimeAsc,
    TimeDesc,
}

/// 목록 조회 조건 (쿼리 스트링)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub city: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// 쉼표로 구분된 카테고리 목록
    pub categories: Option<String>,
    #[serde(default)]
    pub paused_only: bool,
    #[serde(default)]
    pub sort: SortOrder,
}

impl CatalogQuery {
    fn category_set(&self) -> MarketResult<Vec<Category>> {
        match &self.categories {
            Some(raw) => raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(Category::from_str)
                .collect(),
            None => Ok(Vec::new()),
        }
    }
}
// endregion: --- Query

// region:    --- Catalog
/// 목록 카드
#[derive(Debug, Clone, Serialize)]
pub struct AuctionCard {
    #[serde(flatten)]
    pub auction: Auction,
    pub status: AuctionStatus,
    pub current_highest: i64,
    pub time_remaining: TimeRemaining,
    pub fees: Fees,
}

impl AuctionCard {
    pub fn new(auction: Auction, now: DateTime<Utc>) -> Self {
        Self {
            status: auction.status_at(now),
            current_highest: auction.current_highest(),
            time_remaining: remaining(auction.expiration_date, now),
            fees: auction.fees(),
            auction,
        }
    }
}

/// 종료된 경매는 목록에서 제외한다. paused_only 이면 쿨다운 중인 경매만 남긴다.
pub fn browse(
    auctions: Vec<Auction>,
    query: &CatalogQuery,
    now: DateTime<Utc>,
) -> MarketResult<Vec<AuctionCard>> {
    let categories = query.category_set()?;
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("All Cities"));

    let mut cards: Vec<AuctionCard> = auctions
        .into_iter()
        .map(|auction| AuctionCard::new(auction, now))
        .filter(|card| match card.status {
            AuctionStatus::Expired => false,
            AuctionStatus::Cooldown => true,
            AuctionStatus::Active => !query.paused_only,
        })
        .filter(|card| city.map_or(true, |c| card.auction.city.eq_ignore_ascii_case(c)))
        .filter(|card| query.min_price.map_or(true, |p| card.auction.base_price >= p))
        .filter(|card| query.max_price.map_or(true, |p| card.auction.base_price <= p))
        .filter(|card| categories.is_empty() || categories.contains(&card.auction.category))
        .collect();

    match query.sort {
        SortOrder::BiddersDesc => {
            cards.sort_by(|a, b| b.auction.bidders_count.cmp(&a.auction.bidders_count))
        }
        SortOrder::BiddersAsc => cards.sort_by_key(|c| c.auction.bidders_count),
        SortOrder::TimeAsc => cards.sort_by_key(|c| c.auction.expiration_date),
        SortOrder::TimeDesc => {
            cards.sort_by(|a, b| b.auction.expiration_date.cmp(&a.auction.expiration_date))
        }
    }

    Ok(cards)
}
// endregion: --- Catalog

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MarketError;
    use chrono::Duration;

    fn listing(
        id: i64,
        city: &str,
        category: Category,
        price: i64,
        bidders: i32,
        hours: i64,
    ) -> Auction {
        let now = Utc::now();
        Auction {
            id,
            title: format!("Listing {id}"),
            city: city.to_string(),
            category,
            base_price: price,
            current_bid: None,
            bidders_count: bidders,
            expiration_date: now + Duration::hours(hours),
            cooldown_hours: 24,
            description: None,
            images: Vec::new(),
            years_used: None,
            condition_rating: None,
            insurance_status: None,
            created_by: None,
            created_at: now,
        }
    }

    fn sample() -> Vec<Auction> {
        vec![
            listing(1, "Ahmedabad", Category::FourWheeler, 120000, 23, 60),
            listing(2, "Surat", Category::TwoWheeler, 85000, 18, 32),
            listing(3, "Ahmedabad", Category::Property, 2500000, 31, 74),
            listing(4, "Rajkot", Category::Antiques, 40000, 5, -2),
            listing(5, "Surat", Category::HeavyVehicle, 900000, 7, -100),
        ]
    }

    fn ids(cards: &[AuctionCard]) -> Vec<i64> {
        cards.iter().map(|c| c.auction.id).collect()
    }

    #[test]
    fn default_sort_is_most_bidders_and_hides_expired() {
        let cards = browse(sample(), &CatalogQuery::default(), Utc::now()).unwrap();
        assert_eq!(ids(&cards), vec![3, 1, 2, 4]);
    }

    #[test]
    fn filters_combine() {
        let query = CatalogQuery {
            city: Some("ahmedabad".to_string()),
            max_price: Some(1_000_000),
            categories: Some("Four Wheeler,Property".to_string()),
            ..Default::default()
        };
        let cards = browse(sample(), &query, Utc::now()).unwrap();
        assert_eq!(ids(&cards), vec![1]);
    }

    #[test]
    fn paused_only_keeps_cooldown_listings() {
        let query = CatalogQuery {
            paused_only: true,
            ..Default::default()
        };
        let cards = browse(sample(), &query, Utc::now()).unwrap();
        assert_eq!(ids(&cards), vec![4]);
        assert_eq!(cards[0].time_remaining, TimeRemaining::Expired);
    }

    #[test]
    fn time_ascending_shows_ending_soonest_first() {
        let query = CatalogQuery {
            sort: SortOrder::TimeAsc,
            ..Default::default()
        };
        let cards = browse(sample(), &query, Utc::now()).unwrap();
        assert_eq!(ids(&cards), vec![4, 2, 1, 3]);
    }

    #[test]
    fn unknown_category_is_a_validation_error() {
        let query = CatalogQuery {
            categories: Some("Boats".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            browse(sample(), &query, Utc::now()),
            Err(MarketError::Validation(_))
        ));
    }
}
