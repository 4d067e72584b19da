/// 마켓 데이터 저장소
/// 경매, 입찰, 프로필, 참가, 이메일 기록에 대한 백엔드 작업을 정의한다.
/// 일관성 보장(입찰가 단조 증가, 참가 중복 방지, 체크아웃 원자성)은 저장소 구현의 책임이다.
// region:    --- Imports
use crate::auction::model::{
    Account, Auction, Bid, EmailLog, NewAccount, NewAuction, NewBid, NewEmailLog,
    NewParticipation, Participation, ParticipationStatus, Profile,
};
use crate::error::MarketResult;
use async_trait::async_trait;

// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod postgres;
pub mod queries;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
// endregion: --- Modules

// region:    --- Market Store Trait
/// 참가 조회 조건
#[derive(Debug, Clone, Copy, Default)]
pub struct ParticipationFilter {
    pub user_id: Option<i64>,
    pub auction_id: Option<i64>,
}

impl ParticipationFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            auction_id: None,
        }
    }

    pub fn for_auction(auction_id: i64) -> Self {
        Self {
            user_id: None,
            auction_id: Some(auction_id),
        }
    }

    pub fn matches(&self, participation: &Participation) -> bool {
        self.user_id.map_or(true, |id| participation.user_id == id)
            && self
                .auction_id
                .map_or(true, |id| participation.auction_id == id)
    }
}

/// 마켓 저장소 트레이트
#[async_trait]
pub trait MarketStore: Send + Sync {
    /// 최신 등록 순 경매 목록
    async fn list_auctions(&self) -> MarketResult<Vec<Auction>>;

    async fn get_auction(&self, id: i64) -> MarketResult<Auction>;

    async fn create_auction(&self, auction: NewAuction) -> MarketResult<Auction>;

    /// 경매 삭제 후 ListingRemoved 이벤트 발행
    async fn delete_auction(&self, id: i64) -> MarketResult<()>;

    /// 최신 순 입찰 목록
    async fn list_bids(&self, auction_id: i64) -> MarketResult<Vec<Bid>>;

    /// 현재 최고가보다 높을 때만 입찰을 기록하고 BidPlaced 이벤트 발행
    async fn insert_bid(&self, bid: NewBid) -> MarketResult<Bid>;

    async fn get_profiles(&self, ids: &[i64]) -> MarketResult<Vec<Profile>>;

    async fn list_profiles(&self) -> MarketResult<Vec<Profile>>;

    async fn create_account(&self, account: NewAccount) -> MarketResult<Profile>;

    async fn find_account(&self, email: &str) -> MarketResult<Option<Account>>;

    /// 전부 기록되거나 전혀 기록되지 않는다
    async fn insert_participations(
        &self,
        rows: Vec<NewParticipation>,
    ) -> MarketResult<Vec<Participation>>;

    async fn list_participations(
        &self,
        filter: ParticipationFilter,
    ) -> MarketResult<Vec<Participation>>;

    /// 현재 상태가 `from` 일 때만 `to` 로 바꾼다. 이미 바뀌었으면 Conflict.
    async fn update_participation_status(
        &self,
        id: i64,
        from: ParticipationStatus,
        to: ParticipationStatus,
    ) -> MarketResult<Participation>;

    async fn log_email(&self, email: NewEmailLog) -> MarketResult<EmailLog>;

    async fn recent_emails(&self, limit: usize) -> MarketResult<Vec<EmailLog>>;
}
// endregion: --- Market Store Trait
