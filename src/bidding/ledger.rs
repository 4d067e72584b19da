/// 경매별 입찰 원장
/// - 조회: 입찰 목록(최신 순)과 입찰자 이름, 현재 최고가를 가져온다.
/// - 구독: 삽입 알림마다 전체를 다시 조회한다. 부분 병합은 하지 않는다.
/// - 입찰: 삽입 후 변경 피드의 에코가 올 때까지 기다린다. 화면 갱신은 구독 쪽 재조회가 담당한다.
// region:    --- Imports
use super::commands::check_bid;
use crate::auction::events::AuctionEvent;
use crate::auction::model::{Bid, NewBid, Profile};
use crate::error::{MarketError, MarketResult};
use crate::realtime::{ChangeFeed, FeedNotice};
use crate::store::MarketStore;
use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

// endregion: --- Imports

// region:    --- Snapshot
/// 입찰자 이름이 붙은 입찰
#[derive(Debug, Clone, Serialize)]
pub struct BidView {
    #[serde(flatten)]
    pub bid: Bid,
    pub bidder_name: Option<String>,
}

/// 원장 스냅샷
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSnapshot {
    pub auction_id: i64,
    pub current_highest: i64,
    pub bids: Vec<BidView>,
}

/// 구독자에게 전달되는 알림
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "ledger", rename_all = "snake_case")]
pub enum LedgerNotice {
    NewBid(LedgerSnapshot),
    Closed,
}
// endregion: --- Snapshot

// region:    --- Bid Ledger
pub struct BidLedger {
    auction_id: i64,
    store: Arc<dyn MarketStore>,
    feed: ChangeFeed,
    echo_timeout: Duration,
    snapshot: RwLock<Option<LedgerSnapshot>>,
}

impl BidLedger {
    pub fn new(
        auction_id: i64,
        store: Arc<dyn MarketStore>,
        feed: ChangeFeed,
        echo_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            auction_id,
            store,
            feed,
            echo_timeout,
            snapshot: RwLock::new(None),
        })
    }

    pub fn auction_id(&self) -> i64 {
        self.auction_id
    }

    /// 마지막으로 조회된 스냅샷
    pub async fn snapshot(&self) -> Option<LedgerSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// 입찰 목록, 입찰자 이름, 현재 최고가 조회
    pub async fn fetch(&self) -> MarketResult<LedgerSnapshot> {
        let bids = self.store.list_bids(self.auction_id).await?;

        let bidder_ids: Vec<i64> = bids
            .iter()
            .map(|b| b.user_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names: HashMap<i64, String> = self
            .store
            .get_profiles(&bidder_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.full_name))
            .collect();

        let auction = self.store.get_auction(self.auction_id).await?;

        let snapshot = LedgerSnapshot {
            auction_id: self.auction_id,
            current_highest: auction.current_highest(),
            bids: bids
                .into_iter()
                .map(|bid| BidView {
                    bidder_name: names.get(&bid.user_id).cloned(),
                    bid,
                })
                .collect(),
        };

        // 마지막에 도착한 조회 결과가 이긴다
        *self.snapshot.write().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// 변경 피드 구독 시작. 반환된 LedgerWatch 가 drop 되면 구독도 해제된다.
    pub fn watch(self: &Arc<Self>) -> LedgerWatch {
        let mut subscription = self.feed.subscribe(self.auction_id);
        let (sender, notices) = mpsc::channel(16);
        let ledger = Arc::clone(self);

        let task = tokio::spawn(async move {
            while let Some(notice) = subscription.recv().await {
                // 삽입 알림과 지연 알림 모두 전체 재조회로 처리
                if let FeedNotice::Event(AuctionEvent::ListingRemoved { .. }) = notice {
                    info!(
                        "{:<12} --> 경매 삭제로 구독 종료 id: {}",
                        "Ledger", ledger.auction_id
                    );
                    let _ = sender.send(LedgerNotice::Closed).await;
                    break;
                }

                match ledger.fetch().await {
                    Ok(snapshot) => {
                        if sender.send(LedgerNotice::NewBid(snapshot)).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => error!(
                        "{:<12} --> 입찰 목록 재조회 실패 id: {} {:?}",
                        "Ledger", ledger.auction_id, e
                    ),
                }
            }
        });

        LedgerWatch { notices, task }
    }

    /// 입찰
    pub async fn place_bid(&self, bidder: Option<&Profile>, amount: i64) -> MarketResult<Bid> {
        info!(
            "{:<12} --> 입찰 요청 auction: {}, amount: {}",
            "Ledger", self.auction_id, amount
        );
        let auction = self.store.get_auction(self.auction_id).await?;
        let current_highest = match self.snapshot().await {
            Some(snapshot) => snapshot.current_highest,
            None => self.fetch().await?.current_highest,
        };

        let bidder_id = check_bid(bidder, auction.status_at(Utc::now()), current_highest, amount)
            .map_err(|e| {
                warn!("{:<12} --> 입찰 거절: {}", "Ledger", e);
                e
            })?;

        // 에코를 놓치지 않도록 삽입 전에 구독
        let mut echo = self.feed.subscribe(self.auction_id);
        let bid = self
            .store
            .insert_bid(NewBid {
                auction_id: self.auction_id,
                user_id: bidder_id,
                amount,
            })
            .await?;

        let confirmed = async {
            while let Some(notice) = echo.wait_for_bid(bid.id).await {
                match notice {
                    FeedNotice::Event(_) => return Ok(true),
                    // 놓친 이벤트가 에코였을 수 있으므로 저장소에서 직접 확인
                    FeedNotice::Lagged(_) => {
                        let stored = self.store.list_bids(self.auction_id).await?;
                        if stored.iter().any(|b| b.id == bid.id) {
                            return Ok(true);
                        }
                    }
                }
            }
            Ok::<_, MarketError>(false)
        };

        let outcome = tokio::time::timeout(self.echo_timeout, confirmed).await;
        match outcome {
            Ok(Ok(true)) => {
                info!("{:<12} --> 입찰 반영 확인 bid: {}", "Ledger", bid.id);
                Ok(bid)
            }
            Ok(Err(e)) => Err(e),
            Ok(Ok(false)) | Err(_) => {
                warn!(
                    "{:<12} --> 입찰 에코 대기 시간 초과 bid: {}",
                    "Ledger", bid.id
                );
                Err(MarketError::EchoTimeout)
            }
        }
    }
}
// endregion: --- Bid Ledger

// region:    --- Ledger Watch
/// 원장 구독 핸들
pub struct LedgerWatch {
    notices: mpsc::Receiver<LedgerNotice>,
    task: JoinHandle<()>,
}

impl LedgerWatch {
    /// 다음 알림 대기 (구독이 끝나면 None)
    pub async fn next(&mut self) -> Option<LedgerNotice> {
        self.notices.recv().await
    }
}

impl Drop for LedgerWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}
// endregion: --- Ledger Watch
