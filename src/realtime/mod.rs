/// 실시간 변경 피드
/// 저장소가 발행한 이벤트를 경매 id 단위 구독자에게 전달한다.
/// 구독은 drop 되는 순간 해제된다.
// region:    --- Imports
use crate::auction::events::AuctionEvent;
use crate::error::MarketResult;
use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, warn};

// endregion: --- Imports

// region:    --- Event Publisher
/// 변경 이벤트 발행 트레이트
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: AuctionEvent) -> MarketResult<()>;
}
// endregion: --- Event Publisher

// region:    --- Change Feed
const FEED_CAPACITY: usize = 1024;

/// 프로세스 내 변경 피드
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<AuctionEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// 이벤트 전파 (구독자가 없으면 버려진다)
    pub fn notify(&self, event: AuctionEvent) {
        debug!(
            "{:<12} --> 이벤트 전파: {} (auction={})",
            "Feed",
            event.event_type(),
            event.auction_id()
        );
        let _ = self.sender.send(event);
    }

    /// 경매 단위 구독
    pub fn subscribe(&self, auction_id: i64) -> FeedSubscription {
        FeedSubscription {
            auction_id,
            receiver: self.sender.subscribe(),
        }
    }

    /// 현재 살아 있는 구독 수
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[async_trait]
impl EventPublisher for ChangeFeed {
    async fn publish(&self, event: AuctionEvent) -> MarketResult<()> {
        self.notify(event);
        Ok(())
    }
}
// endregion: --- Change Feed

// region:    --- Subscription
/// 구독자가 받는 알림
#[derive(Debug, Clone, PartialEq)]
pub enum FeedNotice {
    Event(AuctionEvent),
    /// 처리 속도가 밀려 이벤트를 놓쳤으므로 전체 갱신이 필요함
    Lagged(u64),
}

/// 특정 경매에 대한 구독. drop 시 해제된다.
pub struct FeedSubscription {
    auction_id: i64,
    receiver: broadcast::Receiver<AuctionEvent>,
}

impl FeedSubscription {
    pub fn auction_id(&self) -> i64 {
        self.auction_id
    }

    /// 다음 알림 대기 (피드가 닫히면 None)
    pub async fn recv(&mut self) -> Option<FeedNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.auction_id() == self.auction_id => {
                    return Some(FeedNotice::Event(event))
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        "{:<12} --> 구독 지연으로 이벤트 {}건 누락 (auction={})",
                        "Feed", skipped, self.auction_id
                    );
                    return Some(FeedNotice::Lagged(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// 특정 입찰의 삽입 알림 대기.
    /// 대기 중 지연이 생기면 그 알림이 누락되었을 수 있으므로 `Lagged` 를 그대로 돌려준다.
    pub async fn wait_for_bid(&mut self, bid_id: i64) -> Option<FeedNotice> {
        while let Some(notice) = self.recv().await {
            match notice {
                FeedNotice::Event(AuctionEvent::BidPlaced { bid_id: id, .. }) if id == bid_id => {
                    return Some(notice)
                }
                FeedNotice::Lagged(_) => return Some(notice),
                FeedNotice::Event(_) => continue,
            }
        }
        None
    }
}
// endregion: --- Subscription

// region:    --- Tests
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn bid_event(bid_id: i64, auction_id: i64) -> AuctionEvent {
        AuctionEvent::BidPlaced {
            bid_id,
            auction_id,
            bidder_id: 1,
            amount: 1000,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn delivers_only_events_for_the_subscribed_auction() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(7);
        feed.notify(bid_event(1, 8));
        feed.notify(bid_event(2, 7));
        let notice = sub.recv().await.unwrap();
        assert!(matches!(
            notice,
            FeedNotice::Event(AuctionEvent::BidPlaced { bid_id: 2, auction_id: 7, .. })
        ));
    }

    #[tokio::test]
    async fn dropping_subscription_releases_it() {
        let feed = ChangeFeed::new();
        let sub = feed.subscribe(1);
        assert_eq!(feed.subscriber_count(), 1);
        drop(sub);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn waits_for_a_specific_bid() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(3);
        feed.notify(bid_event(10, 3));
        feed.notify(bid_event(11, 3));
        let notice = sub.wait_for_bid(11).await.unwrap();
        assert!(matches!(
            notice,
            FeedNotice::Event(AuctionEvent::BidPlaced { bid_id: 11, .. })
        ));
    }

    #[tokio::test]
    async fn waiting_reports_lag_instead_of_hanging() {
        let feed = ChangeFeed::new();
        let mut sub = feed.subscribe(3);
        // 다른 경매 이벤트로 버퍼를 넘치게 한다
        for id in 0..(FEED_CAPACITY as i64 + 10) {
            feed.notify(bid_event(id, 4));
        }
        let notice = sub.wait_for_bid(99999).await.unwrap();
        assert!(matches!(notice, FeedNotice::Lagged(_)));
    }
}
// endregion: --- Tests
