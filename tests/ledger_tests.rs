use async_trait::async_trait;
use auction_grid::auction::events::AuctionEvent;
use auction_grid::auction::model::{Category, NewAccount, NewAuction, Profile, Role};
use auction_grid::bidding::ledger::{BidLedger, LedgerNotice};
use auction_grid::error::{MarketError, MarketResult};
use auction_grid::realtime::{ChangeFeed, EventPublisher};
use auction_grid::store::{MarketStore, MemoryStore};
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::time::Duration as StdDuration;

/// 이벤트를 버리는 발행자 (에코가 오지 않는 상황)
struct SilentPublisher;

#[async_trait]
impl EventPublisher for SilentPublisher {
    async fn publish(&self, _event: AuctionEvent) -> MarketResult<()> {
        Ok(())
    }
}

/// 에코 직전에 다른 경매 이벤트를 쏟아내 구독자를 지연시키고 에코는 보내지 않는 발행자
struct FloodingPublisher {
    feed: ChangeFeed,
}

#[async_trait]
impl EventPublisher for FloodingPublisher {
    async fn publish(&self, event: AuctionEvent) -> MarketResult<()> {
        if let AuctionEvent::BidPlaced { auction_id, .. } = event {
            for id in 0..2000 {
                self.feed.notify(AuctionEvent::BidPlaced {
                    bid_id: 100_000 + id,
                    auction_id: auction_id + 1,
                    bidder_id: 0,
                    amount: 1,
                    timestamp: Utc::now(),
                });
            }
        }
        Ok(())
    }
}

fn swift(base_price: i64, expires_in: Duration) -> NewAuction {
    NewAuction {
        title: "Maruti Swift VXI 2018".to_string(),
        city: "Ahmedabad".to_string(),
        category: Category::FourWheeler,
        base_price,
        expiration_date: Utc::now() + expires_in,
        cooldown_hours: 24,
        description: None,
        images: Vec::new(),
        years_used: Some(6),
        condition_rating: Some(7),
        insurance_status: Some(true),
        created_by: None,
    }
}

async fn bidder(store: &dyn MarketStore, name: &str) -> Profile {
    store
        .create_account(NewAccount {
            email: format!("{}@mail.com", name.to_lowercase()),
            full_name: name.to_string(),
            city: "Surat".to_string(),
            role: Role::User,
            password_hash: "hash".to_string(),
            password_salt: "salt".to_string(),
        })
        .await
        .unwrap()
}

fn setup() -> (Arc<dyn MarketStore>, ChangeFeed) {
    let feed = ChangeFeed::new();
    let store: Arc<dyn MarketStore> = Arc::new(MemoryStore::new(Arc::new(feed.clone())));
    (store, feed)
}

/// 시작가 ₹120,000 경매: 낮은 입찰은 거절, 높은 입찰은 목록 맨 앞에 기록
#[tokio::test]
async fn test_bid_against_base_price() {
    let (store, feed) = setup();
    let auction = store
        .create_auction(swift(120000, Duration::days(2)))
        .await
        .unwrap();
    let amit = bidder(store.as_ref(), "Amit").await;
    let ledger = BidLedger::new(
        auction.id,
        Arc::clone(&store),
        feed,
        StdDuration::from_secs(2),
    );

    let snapshot = ledger.fetch().await.unwrap();
    assert_eq!(snapshot.current_highest, 120000);
    assert!(snapshot.bids.is_empty());

    let rejected = ledger.place_bid(Some(&amit), 119000).await;
    assert!(matches!(
        rejected,
        Err(MarketError::BidTooLow { current: 120000 })
    ));
    assert!(store.list_bids(auction.id).await.unwrap().is_empty());

    let bid = ledger.place_bid(Some(&amit), 125000).await.unwrap();
    assert_eq!(bid.user_id, amit.id);

    let snapshot = ledger.fetch().await.unwrap();
    assert_eq!(snapshot.bids.len(), 1);
    assert_eq!(snapshot.bids[0].bid.amount, 125000);
    assert_eq!(snapshot.bids[0].bidder_name.as_deref(), Some("Amit"));
    assert_eq!(snapshot.current_highest, 125000);
}

/// 로그인하지 않은 입찰과 마감된 경매 입찰은 기록되지 않는다
#[tokio::test]
async fn test_rejected_bids_leave_no_record() {
    let (store, feed) = setup();
    let closed = store
        .create_auction(swift(50000, Duration::hours(-1)))
        .await
        .unwrap();
    let priya = bidder(store.as_ref(), "Priya").await;
    let ledger = BidLedger::new(closed.id, Arc::clone(&store), feed, StdDuration::from_secs(1));

    assert!(matches!(
        ledger.place_bid(None, 60000).await,
        Err(MarketError::Unauthenticated)
    ));
    assert!(matches!(
        ledger.place_bid(Some(&priya), 60000).await,
        Err(MarketError::AuctionNotActive(_))
    ));
    assert!(store.list_bids(closed.id).await.unwrap().is_empty());
}

/// 구독 중에 입찰이 들어오면 전체 재조회된 스냅샷을 받는다
#[tokio::test]
async fn test_watch_refetches_on_insert() {
    let (store, feed) = setup();
    let auction = store
        .create_auction(swift(85000, Duration::days(1)))
        .await
        .unwrap();
    let amit = bidder(store.as_ref(), "Amit").await;
    let priya = bidder(store.as_ref(), "Priya").await;
    let ledger = BidLedger::new(auction.id, Arc::clone(&store), feed, StdDuration::from_secs(2));

    let mut watch = ledger.watch();
    ledger.place_bid(Some(&amit), 90000).await.unwrap();

    let notice = tokio::time::timeout(StdDuration::from_secs(2), watch.next())
        .await
        .unwrap()
        .unwrap();
    let LedgerNotice::NewBid(snapshot) = notice else {
        panic!("expected a new bid notice");
    };
    assert_eq!(snapshot.current_highest, 90000);

    // 다른 사용자의 더 높은 입찰
    ledger.place_bid(Some(&priya), 95000).await.unwrap();
    let notice = tokio::time::timeout(StdDuration::from_secs(2), watch.next())
        .await
        .unwrap()
        .unwrap();
    let LedgerNotice::NewBid(snapshot) = notice else {
        panic!("expected a new bid notice");
    };
    assert_eq!(snapshot.bids.len(), 2);
    assert_eq!(snapshot.bids[0].bidder_name.as_deref(), Some("Priya"));
}

/// 경매가 삭제되면 구독이 종료된다
#[tokio::test]
async fn test_watch_closes_when_listing_removed() {
    let (store, feed) = setup();
    let auction = store
        .create_auction(swift(85000, Duration::days(1)))
        .await
        .unwrap();
    let ledger = BidLedger::new(auction.id, Arc::clone(&store), feed, StdDuration::from_secs(1));

    let mut watch = ledger.watch();
    store.delete_auction(auction.id).await.unwrap();

    let notice = tokio::time::timeout(StdDuration::from_secs(2), watch.next())
        .await
        .unwrap();
    assert!(matches!(notice, Some(LedgerNotice::Closed)));
    assert!(watch.next().await.is_none());
}

/// 구독 핸들을 drop 하면 변경 피드 구독도 해제된다
#[tokio::test]
async fn test_dropping_watch_releases_subscription() {
    let (store, feed) = setup();
    let auction = store
        .create_auction(swift(85000, Duration::days(1)))
        .await
        .unwrap();
    let ledger = BidLedger::new(
        auction.id,
        Arc::clone(&store),
        feed.clone(),
        StdDuration::from_secs(1),
    );

    let watch = ledger.watch();
    assert_eq!(feed.subscriber_count(), 1);
    drop(watch);

    // abort 는 다음 스케줄링 시점에 반영된다
    let mut released = false;
    for _ in 0..50 {
        if feed.subscriber_count() == 0 {
            released = true;
            break;
        }
        tokio::time::sleep(StdDuration::from_millis(20)).await;
    }
    assert!(released, "subscription still alive after drop");
}

/// 에코가 오지 않으면 타임아웃. 입찰 자체는 이미 기록되어 있다.
#[tokio::test]
async fn test_missing_echo_times_out() {
    let feed = ChangeFeed::new();
    let store: Arc<dyn MarketStore> = Arc::new(MemoryStore::new(Arc::new(SilentPublisher)));
    let auction = store
        .create_auction(swift(85000, Duration::days(1)))
        .await
        .unwrap();
    let amit = bidder(store.as_ref(), "Amit").await;
    let ledger = BidLedger::new(
        auction.id,
        Arc::clone(&store),
        feed,
        StdDuration::from_millis(100),
    );

    let result = ledger.place_bid(Some(&amit), 90000).await;
    assert!(matches!(result, Err(MarketError::EchoTimeout)));
    assert_eq!(store.list_bids(auction.id).await.unwrap().len(), 1);
}

/// 같은 금액의 동시 입찰은 하나만 받아들여진다
#[tokio::test]
async fn test_equal_racing_bids_accept_one() {
    let (store, feed) = setup();
    let auction = store
        .create_auction(swift(100000, Duration::days(1)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..10 {
        let user = bidder(store.as_ref(), &format!("Bidder{i}")).await;
        let ledger = BidLedger::new(
            auction.id,
            Arc::clone(&store),
            feed.clone(),
            StdDuration::from_secs(2),
        );
        handles.push(tokio::spawn(async move {
            ledger.place_bid(Some(&user), 110000).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(MarketError::BidTooLow { current }) => assert_eq!(current, 110000),
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert_eq!(accepted, 1);
    assert_eq!(store.list_bids(auction.id).await.unwrap().len(), 1);
}

/// 구독이 밀려 에코를 놓쳐도 저장된 입찰이면 성공으로 확인한다
#[tokio::test]
async fn test_lagged_echo_is_confirmed_from_store() {
    let feed = ChangeFeed::new();
    let store: Arc<dyn MarketStore> = Arc::new(MemoryStore::new(Arc::new(FloodingPublisher {
        feed: feed.clone(),
    })));
    let auction = store
        .create_auction(swift(85000, Duration::days(1)))
        .await
        .unwrap();
    let amit = bidder(store.as_ref(), "Amit").await;
    let ledger = BidLedger::new(auction.id, Arc::clone(&store), feed, StdDuration::from_secs(2));

    let bid = ledger.place_bid(Some(&amit), 90000).await.unwrap();
    assert_eq!(bid.amount, 90000);
}
