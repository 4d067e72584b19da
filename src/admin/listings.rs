// region:    --- Imports
use crate::auction::lifecycle::{deletable_at, DEFAULT_COOLDOWN_HOURS};
use crate::auction::model::{
    is_supported_city, Auction, AuctionStatus, Bid, Category, EmailType, NewAuction,
    ParticipationStatus, Profile,
};
use crate::error::{MarketError, MarketResult};
use crate::fees::{format_inr, MAX_AMOUNT};
use crate::notify::{render, EmailContext, Mailer};
use crate::store::{MarketStore, ParticipationFilter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::{error, info, warn};

// endregion: --- Imports

pub const MAX_IMAGES: usize = 7;

// region:    --- Listing Filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingFilter {
    /// 제목 검색 (대소문자 무시)
    pub search: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
}

fn selected(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminListing {
    #[serde(flatten)]
    pub auction: Auction,
    pub status: AuctionStatus,
    pub current_highest: i64,
    pub deletable: bool,
}

pub async fn list_listings(
    store: &dyn MarketStore,
    filter: &ListingFilter,
    now: DateTime<Utc>,
) -> MarketResult<Vec<AdminListing>> {
    let category = selected(&filter.category)
        .map(Category::from_str)
        .transpose()?;
    let search = selected(&filter.search).map(str::to_lowercase);
    let city = selected(&filter.city);

    Ok(store
        .list_auctions()
        .await?
        .into_iter()
        .filter(|a| {
            search
                .as_deref()
                .map_or(true, |s| a.title.to_lowercase().contains(s))
        })
        .filter(|a| city.map_or(true, |c| a.city.eq_ignore_ascii_case(c)))
        .filter(|a| category.map_or(true, |c| a.category == c))
        .map(|auction| AdminListing {
            status: auction.status_at(now),
            current_highest: auction.current_highest(),
            deletable: deletable_at(auction.created_at, auction.cooldown_hours, now),
            auction,
        })
        .collect())
}
// endregion: --- Listing Filter

// region:    --- Add Listing
#[derive(Debug, Clone, Deserialize)]
pub struct NewListingRequest {
    pub title: String,
    pub category: String,
    pub city: String,
    pub base_price: i64,
    pub expiration_date: DateTime<Utc>,
    pub cooldown_hours: Option<i32>,
    pub description: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub years_used: Option<i32>,
    pub condition_rating: Option<i32>,
    pub insurance_status: Option<bool>,
}

impl NewListingRequest {
    /// 입력 검증 후 저장용 데이터로 변환
    pub fn validate(self, admin: &Profile, now: DateTime<Utc>) -> MarketResult<NewAuction> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(MarketError::validation("제목을 입력해 주세요."));
        }
        let category = Category::from_str(&self.category)?;
        if !is_supported_city(self.city.trim()) {
            return Err(MarketError::validation(format!(
                "지원하지 않는 도시입니다: {}",
                self.city
            )));
        }
        if self.base_price <= 0 {
            return Err(MarketError::validation("시작가는 0보다 커야 합니다."));
        }
        if self.base_price > MAX_AMOUNT {
            return Err(MarketError::validation(format!(
                "시작가는 {} 를 넘을 수 없습니다.",
                format_inr(MAX_AMOUNT)
            )));
        }
        if self.expiration_date <= now {
            return Err(MarketError::validation("마감 시각은 현재 이후여야 합니다."));
        }
        let cooldown_hours = self.cooldown_hours.unwrap_or(DEFAULT_COOLDOWN_HOURS);
        if cooldown_hours < 0 {
            return Err(MarketError::validation("쿨다운 시간은 0 이상이어야 합니다."));
        }
        if self.images.len() > MAX_IMAGES {
            return Err(MarketError::validation(format!(
                "이미지는 최대 {MAX_IMAGES}장까지 등록할 수 있습니다."
            )));
        }
        if let Some(rating) = self.condition_rating {
            if !(1..=10).contains(&rating) {
                return Err(MarketError::validation("상태 점수는 1~10 사이여야 합니다."));
            }
        }
        if matches!(self.years_used, Some(years) if years < 0) {
            return Err(MarketError::validation("사용 연수는 0 이상이어야 합니다."));
        }

        Ok(NewAuction {
            title,
            city: self.city.trim().to_string(),
            category,
            base_price: self.base_price,
            expiration_date: self.expiration_date,
            cooldown_hours,
            description: self.description.filter(|d| !d.trim().is_empty()),
            images: self.images,
            years_used: self.years_used,
            condition_rating: self.condition_rating,
            insurance_status: self.insurance_status,
            created_by: Some(admin.id),
        })
    }
}

pub async fn add_listing(
    store: &dyn MarketStore,
    admin: &Profile,
    request: NewListingRequest,
) -> MarketResult<Auction> {
    let listing = request.validate(admin, Utc::now())?;
    info!("{:<12} --> 경매 등록: {}", "Admin", listing.title);
    store.create_auction(listing).await
}
// endregion: --- Add Listing

// region:    --- Delete Listing
/// 등록 후 쿨다운 시간이 지나면 삭제할 수 없다
pub async fn delete_listing(
    store: &dyn MarketStore,
    auction_id: i64,
    now: DateTime<Utc>,
) -> MarketResult<()> {
    let auction = store.get_auction(auction_id).await?;
    if !deletable_at(auction.created_at, auction.cooldown_hours, now) {
        warn!("{:<12} --> 삭제 가능 시간 경과 id: {}", "Admin", auction_id);
        return Err(MarketError::Conflict(format!(
            "등록 후 {}시간이 지나 삭제할 수 없습니다.",
            auction.cooldown_hours
        )));
    }
    info!("{:<12} --> 경매 삭제 id: {}", "Admin", auction_id);
    store.delete_auction(auction_id).await
}
// endregion: --- Delete Listing

// region:    --- Resolve
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub auction_id: i64,
    pub winner_id: Option<i64>,
    pub winning_bid: Option<i64>,
    pub won: usize,
    pub lost: usize,
}

/// 경매 마감 처리 (관리자 수동 실행)
/// 최고 입찰자의 참가는 won, 나머지 진행 중 참가는 lost 가 된다.
pub async fn resolve(
    store: &dyn MarketStore,
    mailer: &Mailer,
    auction_id: i64,
    now: DateTime<Utc>,
) -> MarketResult<Resolution> {
    let auction = store.get_auction(auction_id).await?;
    if auction.status_at(now) == AuctionStatus::Active {
        return Err(MarketError::Conflict(
            "진행 중인 경매는 마감할 수 없습니다.".to_string(),
        ));
    }

    // 최신 순 목록에서 가장 높은 금액 (동액이면 먼저 들어온 입찰)
    let top_bid = store
        .list_bids(auction_id)
        .await?
        .into_iter()
        .rev()
        .fold(None, |top: Option<Bid>, bid| match top {
            Some(t) if t.amount >= bid.amount => Some(t),
            _ => Some(bid),
        });

    let pending: Vec<_> = store
        .list_participations(ParticipationFilter::for_auction(auction_id))
        .await?
        .into_iter()
        .filter(|p| p.status == ParticipationStatus::Active)
        .collect();
    let user_ids: Vec<i64> = pending.iter().map(|p| p.user_id).collect();
    let profiles: HashMap<i64, Profile> = store
        .get_profiles(&user_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let winner_id = top_bid.as_ref().map(|b| b.user_id);
    let mut resolution = Resolution {
        auction_id,
        winner_id: None,
        winning_bid: None,
        won: 0,
        lost: 0,
    };

    for participation in pending {
        let is_winner = Some(participation.user_id) == winner_id;
        let (status, kind) = if is_winner {
            (ParticipationStatus::Won, EmailType::Winner)
        } else {
            (ParticipationStatus::Lost, EmailType::Refund)
        };
        // 조회 이후 사용자가 포기했다면 그 참가는 건너뛴다
        match store
            .update_participation_status(participation.id, ParticipationStatus::Active, status)
            .await
        {
            Ok(_) => {}
            Err(MarketError::Conflict(reason)) => {
                warn!(
                    "{:<12} --> 참가 {} 마감 제외: {}",
                    "Admin", participation.id, reason
                );
                continue;
            }
            Err(e) => return Err(e),
        }
        if is_winner {
            resolution.winner_id = winner_id;
            resolution.winning_bid = top_bid.as_ref().map(|b| b.amount);
            resolution.won += 1;
        } else {
            resolution.lost += 1;
        }

        let Some(profile) = profiles.get(&participation.user_id) else {
            continue;
        };
        let ctx = EmailContext::new(
            &profile.full_name,
            &profile.email,
            Some(profile.id),
            &auction,
            participation.platform_fee,
            participation.deposit_fee,
        );
        if let Err(e) = mailer.send(render(kind, &ctx)).await {
            error!("{:<12} --> 마감 메일 발송 실패: {:?}", "Admin", e);
        }
    }

    info!(
        "{:<12} --> 경매 마감 id: {}, winner: {:?}, lost: {}",
        "Admin", auction_id, resolution.winner_id, resolution.lost
    );
    Ok(resolution)
}
// endregion: --- Resolve

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::Role;
    use chrono::Duration;

    fn admin() -> Profile {
        Profile {
            id: 1,
            email: "admin@gmail.com".to_string(),
            full_name: "Administrator".to_string(),
            city: "Ahmedabad".to_string(),
            role: Role::Admin,
            created_at: Utc::now(),
        }
    }

    fn request() -> NewListingRequest {
        NewListingRequest {
            title: "Honda City 2019".to_string(),
            category: "four wheeler".to_string(),
            city: "Surat".to_string(),
            base_price: 450000,
            expiration_date: Utc::now() + Duration::days(3),
            cooldown_hours: None,
            description: None,
            images: vec!["a.jpg".to_string()],
            years_used: Some(5),
            condition_rating: Some(8),
            insurance_status: Some(true),
        }
    }

    #[test]
    fn valid_listing_gets_default_cooldown() {
        let listing = request().validate(&admin(), Utc::now()).unwrap();
        assert_eq!(listing.category, Category::FourWheeler);
        assert_eq!(listing.cooldown_hours, DEFAULT_COOLDOWN_HOURS);
        assert_eq!(listing.created_by, Some(1));
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let mut req = request();
        req.images = vec!["x.jpg".to_string(); MAX_IMAGES + 1];
        assert!(req.validate(&admin(), Utc::now()).is_err());

        let mut req = request();
        req.condition_rating = Some(11);
        assert!(req.validate(&admin(), Utc::now()).is_err());

        let mut req = request();
        req.expiration_date = Utc::now() - Duration::minutes(1);
        assert!(req.validate(&admin(), Utc::now()).is_err());

        let mut req = request();
        req.base_price = 0;
        assert!(req.validate(&admin(), Utc::now()).is_err());

        let mut req = request();
        req.base_price = MAX_AMOUNT + 1;
        assert!(req.validate(&admin(), Utc::now()).is_err());
    }
}
