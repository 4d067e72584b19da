// region:    --- Imports
use crate::auction::model::{
    Auction, AuctionStatus, Category, EmailLog, Participation, ParticipationStatus, Profile, Role,
};
use crate::error::MarketResult;
use crate::store::{MarketStore, ParticipationFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// endregion: --- Imports

const RECENT_EMAILS: usize = 5;

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 * 1000.0 / whole as f64).round() / 10.0
    }
}

/// 플랫폼 수수료 합계 (포기/유찰 여부와 관계없이 환불되지 않는다)
fn revenue(participations: &[Participation]) -> i64 {
    participations.iter().map(|p| p.platform_fee).sum()
}

// region:    --- Users
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// 이름 또는 이메일 검색
    pub search: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    #[serde(flatten)]
    pub profile: Profile,
    pub participations: usize,
    pub won: usize,
}

pub async fn list_users(
    store: &dyn MarketStore,
    filter: &UserFilter,
) -> MarketResult<Vec<UserRow>> {
    let search = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    let city = filter
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"));

    let participations = store.list_participations(ParticipationFilter::all()).await?;

    Ok(store
        .list_profiles()
        .await?
        .into_iter()
        .filter(|p| {
            search.as_deref().map_or(true, |s| {
                p.full_name.to_lowercase().contains(s) || p.email.to_lowercase().contains(s)
            })
        })
        .filter(|p| city.map_or(true, |c| p.city.eq_ignore_ascii_case(c)))
        .map(|profile| {
            let own = participations.iter().filter(|p| p.user_id == profile.id);
            let (total, won) = own.fold((0, 0), |(total, won), p| {
                (total + 1, won + usize::from(p.status == ParticipationStatus::Won))
            });
            UserRow {
                profile,
                participations: total,
                won,
            }
        })
        .collect())
}
// endregion: --- Users

// region:    --- Reports
#[derive(Debug, Clone, Serialize)]
pub struct CityReport {
    pub city: String,
    pub listings: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub listings: usize,
    pub won: usize,
    pub won_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Reports {
    pub by_city: Vec<CityReport>,
    pub by_category: Vec<CategoryReport>,
    pub total_revenue: i64,
    pub total_listings: usize,
    pub active_cities: usize,
}

/// 도시별/카테고리별 집계
pub fn build_reports(auctions: &[Auction], participations: &[Participation]) -> Reports {
    let total = auctions.len();

    let mut cities: BTreeMap<&str, usize> = BTreeMap::new();
    for auction in auctions {
        *cities.entry(auction.city.as_str()).or_default() += 1;
    }
    let mut by_city: Vec<CityReport> = cities
        .into_iter()
        .map(|(city, listings)| CityReport {
            city: city.to_string(),
            listings,
            percentage: percentage(listings, total),
        })
        .collect();
    by_city.sort_by(|a, b| b.listings.cmp(&a.listings));

    let won_auctions: HashSet<i64> = participations
        .iter()
        .filter(|p| p.status == ParticipationStatus::Won)
        .map(|p| p.auction_id)
        .collect();
    let by_category = Category::ALL
        .into_iter()
        .map(|category| {
            let listed: Vec<&Auction> =
                auctions.iter().filter(|a| a.category == category).collect();
            let won = listed.iter().filter(|a| won_auctions.contains(&a.id)).count();
            CategoryReport {
                category,
                listings: listed.len(),
                won,
                won_percentage: percentage(won, listed.len()),
            }
        })
        .collect();

    Reports {
        active_cities: by_city.len(),
        by_city,
        by_category,
        total_revenue: revenue(participations),
        total_listings: total,
    }
}

pub async fn reports(store: &dyn MarketStore) -> MarketResult<Reports> {
    let auctions = store.list_auctions().await?;
    let participations = store.list_participations(ParticipationFilter::all()).await?;
    Ok(build_reports(&auctions, &participations))
}
// endregion: --- Reports

// region:    --- Admin Dashboard
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub active_listings: usize,
    pub total_users: usize,
    pub admins: usize,
    pub revenue: i64,
    pub recent_emails: Vec<EmailLog>,
}

pub async fn dashboard_stats(
    store: &dyn MarketStore,
    now: DateTime<Utc>,
) -> MarketResult<AdminStats> {
    let auctions = store.list_auctions().await?;
    let profiles = store.list_profiles().await?;
    let participations = store.list_participations(ParticipationFilter::all()).await?;

    Ok(AdminStats {
        active_listings: auctions
            .iter()
            .filter(|a| a.status_at(now) == AuctionStatus::Active)
            .count(),
        total_users: profiles.iter().filter(|p| p.role == Role::User).count(),
        admins: profiles.iter().filter(|p| p.role == Role::Admin).count(),
        revenue: revenue(&participations),
        recent_emails: store.recent_emails(RECENT_EMAILS).await?,
    })
}
// endregion: --- Admin Dashboard

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn listing(id: i64, city: &str, category: Category) -> Auction {
        Auction {
            id,
            title: format!("Listing {id}"),
            city: city.to_string(),
            category,
            base_price: 50000,
            current_bid: None,
            bidders_count: 0,
            expiration_date: Utc::now() + Duration::days(1),
            cooldown_hours: 24,
            description: None,
            images: Vec::new(),
            years_used: None,
            condition_rating: None,
            insurance_status: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn joined(id: i64, auction_id: i64, status: ParticipationStatus) -> Participation {
        Participation {
            id,
            user_id: id,
            auction_id,
            platform_fee: 500,
            deposit_fee: 4500,
            status,
            joined_at: Utc::now(),
        }
    }

    #[test]
    fn reports_group_by_city_and_category() {
        let auctions = vec![
            listing(1, "Ahmedabad", Category::FourWheeler),
            listing(2, "Ahmedabad", Category::FourWheeler),
            listing(3, "Surat", Category::Antiques),
            listing(4, "Rajkot", Category::FourWheeler),
        ];
        let participations = vec![
            joined(10, 1, ParticipationStatus::Won),
            joined(11, 1, ParticipationStatus::Lost),
            joined(12, 3, ParticipationStatus::Exited),
        ];

        let reports = build_reports(&auctions, &participations);
        assert_eq!(reports.total_listings, 4);
        assert_eq!(reports.active_cities, 3);
        assert_eq!(reports.by_city[0].city, "Ahmedabad");
        assert_eq!(reports.by_city[0].percentage, 50.0);
        assert_eq!(reports.total_revenue, 1500);

        let four = reports
            .by_category
            .iter()
            .find(|c| c.category == Category::FourWheeler)
            .unwrap();
        assert_eq!(four.listings, 3);
        assert_eq!(four.won, 1);
        assert_eq!(four.won_percentage, 33.3);
    }

    #[test]
    fn empty_reports_have_zero_percentages() {
        let reports = build_reports(&[], &[]);
        assert!(reports.by_city.is_empty());
        assert!(reports.by_category.iter().all(|c| c.won_percentage == 0.0));
    }
}
