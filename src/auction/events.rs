use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 경매 변경 피드로 전달되는 이벤트
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum AuctionEvent {
    // 입찰 삽입 이벤트
    BidPlaced {
        bid_id: i64,
        auction_id: i64,
        bidder_id: i64,
        amount: i64,
        timestamp: DateTime<Utc>,
    },
    // 관리자 경매 삭제 이벤트
    ListingRemoved {
        auction_id: i64,
        timestamp: DateTime<Utc>,
    },
}

impl AuctionEvent {
    pub fn auction_id(&self) -> i64 {
        match self {
            AuctionEvent::BidPlaced { auction_id, .. } => *auction_id,
            AuctionEvent::ListingRemoved { auction_id, .. } => *auction_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AuctionEvent::BidPlaced { .. } => "BidPlaced",
            AuctionEvent::ListingRemoved { .. } => "ListingRemoved",
        }
    }
}
