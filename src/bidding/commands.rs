/// 입찰 관련 커맨드 검증
/// 1. 로그인 여부
/// 2. 경매 상태 (클라이언트 시계 기준, 참고용)
/// 3. 입찰 금액 (현재 최고가 초과, 상한 이하)
// region:    --- Imports
use crate::auction::model::{AuctionStatus, Profile};
use crate::error::{MarketError, MarketResult};
use crate::fees::{format_inr, MAX_AMOUNT};
use serde::{Deserialize, Serialize};

// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PlaceBidCommand {
    pub amount: i64,
}

/// 입찰 가능 여부 검증 후 입찰자 id 반환
pub fn check_bid(
    bidder: Option<&Profile>,
    status: AuctionStatus,
    current_highest: i64,
    amount: i64,
) -> MarketResult<i64> {
    let bidder = bidder.ok_or(MarketError::Unauthenticated)?;

    if status != AuctionStatus::Active {
        return Err(MarketError::AuctionNotActive(status));
    }

    if amount <= current_highest {
        return Err(MarketError::BidTooLow {
            current: current_highest,
        });
    }

    if amount > MAX_AMOUNT {
        return Err(MarketError::validation(format!(
            "입찰 금액은 {} 를 넘을 수 없습니다.",
            format_inr(MAX_AMOUNT)
        )));
    }

    Ok(bidder.id)
}
// endregion: --- Commands

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::Role;
    use chrono::Utc;

    fn bidder() -> Profile {
        Profile {
            id: 42,
            email: "amit@mail.com".to_string(),
            full_name: "Amit Sharma".to_string(),
            city: "Ahmedabad".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn anonymous_bid_is_rejected_first() {
        let err = check_bid(None, AuctionStatus::Expired, 120000, 1).unwrap_err();
        assert!(matches!(err, MarketError::Unauthenticated));
    }

    #[test]
    fn equal_or_lower_amounts_are_rejected() {
        let user = bidder();
        for amount in [119000, 120000] {
            let err = check_bid(Some(&user), AuctionStatus::Active, 120000, amount).unwrap_err();
            assert!(matches!(err, MarketError::BidTooLow { current: 120000 }));
        }
    }

    #[test]
    fn bids_outside_active_window_are_rejected() {
        let user = bidder();
        let err = check_bid(Some(&user), AuctionStatus::Cooldown, 120000, 125000).unwrap_err();
        assert!(matches!(err, MarketError::AuctionNotActive(AuctionStatus::Cooldown)));
    }

    #[test]
    fn amounts_above_ceiling_are_rejected() {
        let user = bidder();
        for amount in [MAX_AMOUNT + 1, i64::MAX] {
            let err = check_bid(Some(&user), AuctionStatus::Active, 120000, amount).unwrap_err();
            assert!(matches!(err, MarketError::Validation(_)));
        }
        assert!(check_bid(Some(&user), AuctionStatus::Active, 120000, MAX_AMOUNT).is_ok());
    }

    #[test]
    fn higher_bid_passes_with_bidder_id() {
        let user = bidder();
        assert_eq!(
            check_bid(Some(&user), AuctionStatus::Active, 120000, 125000).unwrap(),
            42
        );
    }
}
