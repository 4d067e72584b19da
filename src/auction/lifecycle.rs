/// 경매 상태 전이
/// active -> (만료 시각 도달) -> cooldown -> (쿨다운 경과) -> expired
/// 클라이언트 시계 기준의 참고용 판단이며 권한 판단의 근거가 아니다.
use crate::auction::model::AuctionStatus;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_COOLDOWN_HOURS: i32 = 24;

fn cooldown(cooldown_hours: i32) -> Duration {
    Duration::hours(i64::from(cooldown_hours.max(0)))
}

/// 주어진 시각의 경매 상태
pub fn status_at(
    expiration: DateTime<Utc>,
    cooldown_hours: i32,
    now: DateTime<Utc>,
) -> AuctionStatus {
    if now < expiration {
        AuctionStatus::Active
    } else if now < expiration + cooldown(cooldown_hours) {
        AuctionStatus::Cooldown
    } else {
        AuctionStatus::Expired
    }
}

/// 등록 후 쿨다운 시간 안에서만 삭제 가능
pub fn deletable_at(created_at: DateTime<Utc>, cooldown_hours: i32, now: DateTime<Utc>) -> bool {
    now < created_at + cooldown(cooldown_hours)
}
