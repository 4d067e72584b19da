// region:    --- Imports
use super::{MarketStore, ParticipationFilter};
use crate::auction::events::AuctionEvent;
use crate::auction::model::{
    Account, Auction, Bid, EmailLog, NewAccount, NewAuction, NewBid, NewEmailLog,
    NewParticipation, Participation, ParticipationStatus, Profile,
};
use crate::error::{MarketError, MarketResult};
use crate::realtime::EventPublisher;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};

// endregion: --- Imports

// region:    --- Memory State
#[derive(Default)]
struct MemoryState {
    next_id: i64,
    auctions: BTreeMap<i64, Auction>,
    bids: Vec<Bid>,
    accounts: BTreeMap<i64, Account>,
    participations: BTreeMap<i64, Participation>,
    emails: Vec<EmailLog>,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}
// endregion: --- Memory State

// region:    --- Memory Store
/// 메모리 저장소 (DATABASE_URL 미설정 시, 테스트용)
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    publisher: Arc<dyn EventPublisher>,
}

impl MemoryStore {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            publisher,
        }
    }

    async fn publish(&self, event: AuctionEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            error!("{:<12} --> 이벤트 발행 실패: {:?}", "MemoryStore", e);
        }
    }
}

fn sort_newest_first(bids: &mut [Bid]) {
    bids.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn list_auctions(&self) -> MarketResult<Vec<Auction>> {
        let state = self.state.read().await;
        let mut auctions: Vec<Auction> = state.auctions.values().cloned().collect();
        auctions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(auctions)
    }

    async fn get_auction(&self, id: i64) -> MarketResult<Auction> {
        self.state
            .read()
            .await
            .auctions
            .get(&id)
            .cloned()
            .ok_or_else(|| MarketError::NotFound(format!("auction {id}")))
    }

    async fn create_auction(&self, auction: NewAuction) -> MarketResult<Auction> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let created = Auction {
            id,
            title: auction.title,
            city: auction.city,
            category: auction.category,
            base_price: auction.base_price,
            current_bid: None,
            bidders_count: 0,
            expiration_date: auction.expiration_date,
            cooldown_hours: auction.cooldown_hours,
            description: auction.description,
            images: auction.images,
            years_used: auction.years_used,
            condition_rating: auction.condition_rating,
            insurance_status: auction.insurance_status,
            created_by: auction.created_by,
            created_at: Utc::now(),
        };
        state.auctions.insert(id, created.clone());
        info!("{:<12} --> 경매 생성 id: {}", "MemoryStore", id);
        Ok(created)
    }

    async fn delete_auction(&self, id: i64) -> MarketResult<()> {
        {
            let mut state = self.state.write().await;
            if state.auctions.remove(&id).is_none() {
                return Err(MarketError::NotFound(format!("auction {id}")));
            }
            state.bids.retain(|b| b.auction_id != id);
            state.participations.retain(|_, p| p.auction_id != id);
        }
        self.publish(AuctionEvent::ListingRemoved {
            auction_id: id,
            timestamp: Utc::now(),
        })
        .await;
        Ok(())
    }

    async fn list_bids(&self, auction_id: i64) -> MarketResult<Vec<Bid>> {
        let state = self.state.read().await;
        let mut bids: Vec<Bid> = state
            .bids
            .iter()
            .filter(|b| b.auction_id == auction_id)
            .cloned()
            .collect();
        sort_newest_first(&mut bids);
        Ok(bids)
    }

    async fn insert_bid(&self, bid: NewBid) -> MarketResult<Bid> {
        let inserted = {
            let mut state = self.state.write().await;
            if !state.accounts.contains_key(&bid.user_id) {
                return Err(MarketError::NotFound(format!("profile {}", bid.user_id)));
            }
            let current = state
                .auctions
                .get(&bid.auction_id)
                .map(Auction::current_highest)
                .ok_or_else(|| MarketError::NotFound(format!("auction {}", bid.auction_id)))?;

            // 비교와 갱신을 같은 잠금 안에서 수행
            if bid.amount <= current {
                return Err(MarketError::BidTooLow { current });
            }

            let id = state.next_id();
            let inserted = Bid {
                id,
                auction_id: bid.auction_id,
                user_id: bid.user_id,
                amount: bid.amount,
                created_at: Utc::now(),
            };
            state.bids.push(inserted.clone());

            let bidders = state
                .bids
                .iter()
                .filter(|b| b.auction_id == bid.auction_id)
                .map(|b| b.user_id)
                .collect::<HashSet<_>>()
                .len();
            if let Some(auction) = state.auctions.get_mut(&bid.auction_id) {
                auction.current_bid = Some(bid.amount);
                auction.bidders_count = bidders as i32;
            }
            inserted
        };

        info!(
            "{:<12} --> 입찰 기록 auction: {}, amount: {}",
            "MemoryStore", inserted.auction_id, inserted.amount
        );
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
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.accounts.get(id))
            .map(|a| a.profile.clone())
            .collect())
    }

    async fn list_profiles(&self) -> MarketResult<Vec<Profile>> {
        let state = self.state.read().await;
        let mut profiles: Vec<Profile> =
            state.accounts.values().map(|a| a.profile.clone()).collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(profiles)
    }

    async fn create_account(&self, account: NewAccount) -> MarketResult<Profile> {
        let mut state = self.state.write().await;
        let taken = state
            .accounts
            .values()
            .any(|a| a.profile.email.eq_ignore_ascii_case(&account.email));
        if taken {
            return Err(MarketError::Conflict(
                "이미 가입된 이메일입니다.".to_string(),
            ));
        }
        let id = state.next_id();
        let profile = Profile {
            id,
            email: account.email,
            full_name: account.full_name,
            city: account.city,
            role: account.role,
            created_at: Utc::now(),
        };
        state.accounts.insert(
            id,
            Account {
                profile: profile.clone(),
                password_hash: account.password_hash,
                password_salt: account.password_salt,
            },
        );
        Ok(profile)
    }

    async fn find_account(&self, email: &str) -> MarketResult<Option<Account>> {
        let state = self.state.read().await;
        Ok(state
            .accounts
            .values()
            .find(|a| a.profile.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_participations(
        &self,
        rows: Vec<NewParticipation>,
    ) -> MarketResult<Vec<Participation>> {
        let mut state = self.state.write().await;

        // 모든 행을 먼저 검증한 뒤 한 번에 기록
        let mut seen = HashSet::new();
        for row in &rows {
            if !state.auctions.contains_key(&row.auction_id) {
                return Err(MarketError::NotFound(format!("auction {}", row.auction_id)));
            }
            let duplicate = !seen.insert((row.user_id, row.auction_id))
                || state
                    .participations
                    .values()
                    .any(|p| p.user_id == row.user_id && p.auction_id == row.auction_id);
            if duplicate {
                return Err(MarketError::Conflict(format!(
                    "이미 참가 중인 경매입니다: {}",
                    row.auction_id
                )));
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(rows.len());
        for row in rows {
            let id = state.next_id();
            let participation = Participation {
                id,
                user_id: row.user_id,
                auction_id: row.auction_id,
                platform_fee: row.platform_fee,
                deposit_fee: row.deposit_fee,
                status: ParticipationStatus::Active,
                joined_at: now,
            };
            state.participations.insert(id, participation.clone());
            created.push(participation);
        }
        Ok(created)
    }

    async fn list_participations(
        &self,
        filter: ParticipationFilter,
    ) -> MarketResult<Vec<Participation>> {
        let state = self.state.read().await;
        let mut rows: Vec<Participation> = state
            .participations
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.joined_at.cmp(&a.joined_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }

    async fn update_participation_status(
        &self,
        id: i64,
        from: ParticipationStatus,
        to: ParticipationStatus,
    ) -> MarketResult<Participation> {
        let mut state = self.state.write().await;
        let participation = state
            .participations
            .get_mut(&id)
            .ok_or_else(|| MarketError::NotFound(format!("participation {id}")))?;
        if participation.status != from {
            return Err(MarketError::Conflict(format!(
                "참가 상태가 이미 변경되었습니다: {}",
                participation.status.as_str()
            )));
        }
        participation.status = to;
        Ok(participation.clone())
    }

    async fn log_email(&self, email: NewEmailLog) -> MarketResult<EmailLog> {
        let mut state = self.state.write().await;
        let id = state.next_id();
        let log = EmailLog {
            id,
            user_id: email.user_id,
            auction_id: email.auction_id,
            email_type: email.email_type,
            subject: email.subject,
            content: email.content,
            sent_at: Utc::now(),
        };
        state.emails.push(log.clone());
        Ok(log)
    }

    async fn recent_emails(&self, limit: usize) -> MarketResult<Vec<EmailLog>> {
        let state = self.state.read().await;
        Ok(state.emails.iter().rev().take(limit).cloned().collect())
    }
}
// endregion: --- Memory Store

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auction::model::Category;
    use crate::realtime::ChangeFeed;
    use chrono::Duration;

    async fn joined(store: &MemoryStore) -> Participation {
        let auction = store
            .create_auction(NewAuction {
                title: "Royal Enfield Classic 350".to_string(),
                city: "Vadodara".to_string(),
                category: Category::TwoWheeler,
                base_price: 90000,
                expiration_date: Utc::now() + Duration::days(1),
                cooldown_hours: 24,
                description: None,
                images: Vec::new(),
                years_used: None,
                condition_rating: None,
                insurance_status: None,
                created_by: None,
            })
            .await
            .unwrap();
        store
            .insert_participations(vec![NewParticipation {
                user_id: 7,
                auction_id: auction.id,
                platform_fee: 50,
                deposit_fee: 1950,
            }])
            .await
            .unwrap()
            .remove(0)
    }

    #[tokio::test]
    async fn exit_after_resolution_is_refused() {
        let store = MemoryStore::new(Arc::new(ChangeFeed::new()));
        let participation = joined(&store).await;

        // 마감 처리가 먼저 won 으로 바꾼다
        let won = store
            .update_participation_status(
                participation.id,
                ParticipationStatus::Active,
                ParticipationStatus::Won,
            )
            .await
            .unwrap();
        assert_eq!(won.status, ParticipationStatus::Won);

        // 이전에 active 를 읽은 포기 요청은 거절된다
        let late_exit = store
            .update_participation_status(
                participation.id,
                ParticipationStatus::Active,
                ParticipationStatus::Exited,
            )
            .await;
        assert!(matches!(late_exit, Err(MarketError::Conflict(_))));

        let rows = store
            .list_participations(ParticipationFilter::for_user(7))
            .await
            .unwrap();
        assert_eq!(rows[0].status, ParticipationStatus::Won);
    }

    #[tokio::test]
    async fn unknown_participation_is_not_found() {
        let store = MemoryStore::new(Arc::new(ChangeFeed::new()));
        let result = store
            .update_participation_status(
                999,
                ParticipationStatus::Active,
                ParticipationStatus::Exited,
            )
            .await;
        assert!(matches!(result, Err(MarketError::NotFound(_))));
    }
}
