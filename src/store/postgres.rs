// region:    --- Imports
use super::queries;
use super::{MarketStore, ParticipationFilter};
use crate::auction::events::AuctionEvent;
use crate::auction::model::{
    Account, Auction, Bid, EmailLog, NewAccount, NewAuction, NewBid, NewEmailLog,
    NewParticipation, Participation, ParticipationStatus, Profile,
};
use crate::database::DatabaseManager;
use crate::error::{MarketError, MarketResult};
use crate::realtime::EventPublisher;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::sync::Arc;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Rows
#[derive(FromRow)]
struct AuctionRow {
    id: i64,
    title: String,
    city: String,
    category: String,
    base_price: i64,
    current_bid: Option<i64>,
    bidders_count: i32,
    expiration_date: DateTime<Utc>,
    cooldown_hours: i32,
    description: Option<String>,
    images: Vec<String>,
    years_used: Option<i32>,
    condition_rating: Option<i32>,
    insurance_status: Option<bool>,
    created_by: Option<i64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<AuctionRow> for Auction {
    type Error = MarketError;

    fn try_from(row: AuctionRow) -> Result<Self, Self::Error> {
        Ok(Auction {
            id: row.id,
            title: row.title,
            city: row.city,
            category: row
                .category
                .parse()
                .map_err(|_| MarketError::Corrupt(format!("category: {}", row.category)))?,
            base_price: row.base_price,
            current_bid: row.current_bid,
            bidders_count: row.bidders_count,
            expiration_date: row.expiration_date,
            cooldown_hours: row.cooldown_hours,
            description: row.description,
            images: row.images,
            years_used: row.years_used,
            condition_rating: row.condition_rating,
            insurance_status: row.insurance_status,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct BidRow {
    id: i64,
    auction_id: i64,
    user_id: i64,
    amount: i64,
    created_at: DateTime<Utc>,
}

impl From<BidRow> for Bid {
    fn from(row: BidRow) -> Self {
        Bid {
            id: row.id,
            auction_id: row.auction_id,
            user_id: row.user_id,
            amount: row.amount,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct ProfileRow {
    id: i64,
    email: String,
    full_name: String,
    city: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = MarketError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            id: row.id,
            email: row.email,
            full_name: row.full_name,
            city: row.city,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct AccountRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    password_hash: String,
    password_salt: String,
}

#[derive(FromRow)]
struct ParticipationRow {
    id: i64,
    user_id: i64,
    auction_id: i64,
    platform_fee: i64,
    deposit_fee: i64,
    status: String,
    joined_at: DateTime<Utc>,
}

impl TryFrom<ParticipationRow> for Participation {
    type Error = MarketError;

    fn try_from(row: ParticipationRow) -> Result<Self, Self::Error> {
        Ok(Participation {
            id: row.id,
            user_id: row.user_id,
            auction_id: row.auction_id,
            platform_fee: row.platform_fee,
            deposit_fee: row.deposit_fee,
            status: row.status.parse()?,
            joined_at: row.joined_at,
        })
    }
}

#[derive(FromRow)]
struct EmailLogRow {
    id: i64,
    user_id: Option<i64>,
    auction_id: Option<i64>,
    email_type: String,
    subject: String,
    content: String,
    sent_at: DateTime<Utc>,
}

impl TryFrom<EmailLogRow> for EmailLog {
    type Error = MarketError;

    fn try_from(row: EmailLogRow) -> Result<Self, Self::Error> {
        Ok(EmailLog {
            id: row.id,
            user_id: row.user_id,
            auction_id: row.auction_id,
            email_type: row
                .email_type
                .parse()
                .map_err(|_| MarketError::Corrupt(format!("email type: {}", row.email_type)))?,
            subject: row.subject,
            content: row.content,
            sent_at: row.sent_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> MarketResult<Vec<T>>
where
    T: TryFrom<R, Error = MarketError>,
{
    rows.into_iter().map(T::try_from).collect()
}

/// 유니크 제약 위반을 Conflict 로 변환
fn conflict_on_unique(e: sqlx::Error, message: &str) -> MarketError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            MarketError::Conflict(message.to_string())
        }
        _ => MarketError::Database(e),
    }
}
// endregion: --- Rows

// region:    --- Postgres Store
/// PostgreSQL 저장소
pub struct PostgresStore {
    db_manager: Arc<DatabaseManager>,
    publisher: Arc<dyn EventPublisher>,
}

impl PostgresStore {
    pub fn new(db_manager: Arc<DatabaseManager>, publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            db_manager,
            publisher,
        }
    }

    /// 커밋 이후 발행 실패는 기록만 한다 (구독자는 에코 대기 시간 초과로 알게 된다)
    async fn publish(&self, event: AuctionEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.publisher.publish(event).await {
            error!(
                "{:<12} --> {} 이벤트 발행 실패: {:?}",
                "PgStore", event_type, e
            );
        }
    }
}

#[async_trait]
impl MarketStore for PostgresStore {
    async fn list_auctions(&self) -> MarketResult<Vec<Auction>> {
        let rows = sqlx::query_as::<_, AuctionRow>(queries::LIST_AUCTIONS)
            .fetch_all(self.db_manager.pool())
            .await?;
        convert_all(rows)
    }

    async fn get_auction(&self, id: i64) -> MarketResult<Auction> {
        sqlx::query_as::<_, AuctionRow>(queries::GET_AUCTION)
            .bind(id)
            .fetch_optional(self.db_manager.pool())
            .await?
            .ok_or_else(|| MarketError::NotFound(format!("auction {id}")))?
            .try_into()
    }

    async fn create_auction(&self, auction: NewAuction) -> MarketResult<Auction> {
        let row = sqlx::query_as::<_, AuctionRow>(queries::INSERT_AUCTION)
            .bind(&auction.title)
            .bind(&auction.city)
            .bind(auction.category.as_str())
            .bind(auction.base_price)
            .bind(auction.expiration_date)
            .bind(auction.cooldown_hours)
            .bind(&auction.description)
            .bind(&auction.images)
            .bind(auction.years_used)
            .bind(auction.condition_rating)
            .bind(auction.insurance_status)
            .bind(auction.created_by)
            .fetch_one(self.db_manager.pool())
            .await?;
        info!("{:<12} --> 경매 생성 id: {}", "PgStore", row.id);
        row.try_into()
    }

    async fn delete_auction(&self, id: i64) -> MarketResult<()> {
        let result = sqlx::query(queries::DELETE_AUCTION)
            .bind(id)
            .execute(self.db_manager.pool())
            .await?;
        if result.rows_affected() == 0 {
            return Err(MarketError::NotFound(format!("auction {id}")));
        }
        self.publish(AuctionEvent::ListingRemoved {
            auction_id: id,
            timestamp: Utc::now(),
        })
        .await;
        Ok(())
    }

    async fn list_bids(&self, auction_id: i64) -> MarketResult<Vec<Bid>> {
        let rows = sqlx::query_as::<_, BidRow>(queries::LIST_BIDS)
            .bind(auction_id)
            .fetch_all(self.db_manager.pool())
            .await?;
        Ok(rows.into_iter().map(Bid::from).collect())
    }

    async fn insert_bid(&self, bid: NewBid) -> MarketResult<Bid> {
        // 트랜잭션 시작
        let mut tx = self.db_manager.pool().begin().await?;

        // 현재 최고가보다 높을 때만 갱신 (compare-and-swap)
        let raised = sqlx::query_scalar::<_, i64>(queries::RAISE_CURRENT_BID)
            .bind(bid.auction_id)
            .bind(bid.amount)
            .fetch_optional(&mut *tx)
            .await?;

        if raised.is_none() {
            let current = sqlx::query_scalar::<_, i64>(queries::GET_CURRENT_HIGHEST)
                .bind(bid.auction_id)
                .fetch_optional(&mut *tx)
                .await?;
            tx.rollback().await?;
            return Err(match current {
                Some(current) => MarketError::BidTooLow { current },
                None => MarketError::NotFound(format!("auction {}", bid.auction_id)),
            });
        }

        let row = sqlx::query_as::<_, BidRow>(queries::INSERT_BID)
            .bind(bid.auction_id)
            .bind(bid.user_id)
            .bind(bid.amount)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(queries::REFRESH_BIDDERS_COUNT)
            .bind(bid.auction_id)
            .execute(&mut *tx)
            .await?;

        // 트랜잭션 커밋
        tx.commit().await?;
        info!(
            "{:<12} --> 입찰 성공: auction {}, 현재 가격 {}",
            "PgStore", row.auction_id, row.amount
        );

        let inserted = Bid::from(row);
        self.publish(AuctionEvent::BidPlaced {
            bid_id: inserted.id,
            auction_id: inserted.auction_id,
            bidder_id: inserted.user_id,
            amount: inserted.amount,
            timestamp: inserted.created_at,
        })
        .await;
        Ok(inserted)
    }

    async fn get_profiles(&self, ids: &[i64]) -> MarketResult<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, ProfileRow>(queries::GET_PROFILES)
            .bind(ids)
            .fetch_all(self.db_manager.pool())
            .await?;
        convert_all(rows)
    }

    async fn list_profiles(&self) -> MarketResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(queries::LIST_PROFILES)
            .fetch_all(self.db_manager.pool())
            .await?;
        convert_all(rows)
    }

    async fn create_account(&self, account: NewAccount) -> MarketResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(queries::INSERT_PROFILE)
            .bind(&account.email)
            .bind(&account.full_name)
            .bind(&account.city)
            .bind(account.role.as_str())
            .bind(&account.password_hash)
            .bind(&account.password_salt)
            .fetch_one(self.db_manager.pool())
            .await
            .map_err(|e| conflict_on_unique(e, "이미 가입된 이메일입니다."))?;
        row.try_into()
    }

    async fn find_account(&self, email: &str) -> MarketResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(queries::FIND_ACCOUNT)
            .bind(email)
            .fetch_optional(self.db_manager.pool())
            .await?;
        row.map(|row| {
            Ok(Account {
                profile: row.profile.try_into()?,
                password_hash: row.password_hash,
                password_salt: row.password_salt,
            })
        })
        .transpose()
    }

    async fn insert_participations(
        &self,
        rows: Vec<NewParticipation>,
    ) -> MarketResult<Vec<Participation>> {
        // 하나라도 실패하면 전체 롤백
        let inserted: Vec<ParticipationRow> = self
            .db_manager
            .transaction(move |tx| {
                Box::pin(async move {
                    let mut inserted = Vec::with_capacity(rows.len());
                    for row in rows {
                        let created =
                            sqlx::query_as::<_, ParticipationRow>(queries::INSERT_PARTICIPATION)
                                .bind(row.user_id)
                                .bind(row.auction_id)
                                .bind(row.platform_fee)
                                .bind(row.deposit_fee)
                                .fetch_one(&mut **tx)
                                .await
                                .map_err(|e| {
                                    conflict_on_unique(
                                        e,
                                        &format!("이미 참가 중인 경매입니다: {}", row.auction_id),
                                    )
                                })?;
                        inserted.push(created);
                    }
                    Ok::<_, MarketError>(inserted)
                })
            })
            .await?;
        convert_all(inserted)
    }

    async fn list_participations(
        &self,
        filter: ParticipationFilter,
    ) -> MarketResult<Vec<Participation>> {
        let rows = sqlx::query_as::<_, ParticipationRow>(queries::LIST_PARTICIPATIONS)
            .bind(filter.user_id)
            .bind(filter.auction_id)
            .fetch_all(self.db_manager.pool())
            .await?;
        convert_all(rows)
    }

    async fn update_participation_status(
        &self,
        id: i64,
        from: ParticipationStatus,
        to: ParticipationStatus,
    ) -> MarketResult<Participation> {
        let updated = sqlx::query_as::<_, ParticipationRow>(queries::UPDATE_PARTICIPATION_STATUS)
            .bind(id)
            .bind(to.as_str())
            .bind(from.as_str())
            .fetch_optional(self.db_manager.pool())
            .await?;
        if let Some(row) = updated {
            return row.try_into();
        }

        // 갱신된 행이 없으면 없는 참가인지, 상태가 이미 바뀐 참가인지 구분
        let current: Option<String> = sqlx::query_scalar(queries::GET_PARTICIPATION_STATUS)
            .bind(id)
            .fetch_optional(self.db_manager.pool())
            .await?;
        match current {
            Some(status) => Err(MarketError::Conflict(format!(
                "참가 상태가 이미 변경되었습니다: {status}"
            ))),
            None => Err(MarketError::NotFound(format!("participation {id}"))),
        }
    }

    async fn log_email(&self, email: NewEmailLog) -> MarketResult<EmailLog> {
        sqlx::query_as::<_, EmailLogRow>(queries::INSERT_EMAIL_LOG)
            .bind(email.user_id)
            .bind(email.auction_id)
            .bind(email.email_type.as_str())
            .bind(&email.subject)
            .bind(&email.content)
            .fetch_one(self.db_manager.pool())
            .await?
            .try_into()
    }

    async fn recent_emails(&self, limit: usize) -> MarketResult<Vec<EmailLog>> {
        let rows = sqlx::query_as::<_, EmailLogRow>(queries::RECENT_EMAILS)
            .bind(limit as i64)
            .fetch_all(self.db_manager.pool())
            .await?;
        convert_all(rows)
    }
}
// endregion: --- Postgres Store
