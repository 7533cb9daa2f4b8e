use crate::auction::model::{Auction, AuctionPatch, Bid};
use crate::user::model::{User, UserPatch};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 채널로 전달되는 입찰 데이터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidEvent {
    pub auction_id: String,
    pub bidder: String,
    pub amount: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl BidEvent {
    pub fn to_bid(&self) -> Bid {
        Bid {
            bidder: self.bidder.clone(),
            amount: self.amount,
            timestamp: self.timestamp,
        }
    }
}

/// pub/sub 채널 이벤트. `{"event": "<name>", "data": {...}}` 형태로 전달된다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum SyncEvent {
    // 입찰
    #[serde(alias = "bidUpdate", alias = "bidAccepted")]
    BidPlaced(BidEvent),
    // 관리자 입찰 삭제
    BidRemoved(BidEvent),
    // 경매
    AuctionCreated(Auction),
    AuctionUpdated(AuctionPatch),
    AuctionRemoved {
        #[serde(alias = "_id")]
        id: String,
    },
    AuctionEnded {
        #[serde(alias = "_id")]
        id: String,
        #[serde(default)]
        winner: Option<String>,
    },
    // 사용자
    UserRegistered(User),
    UserUpdated(UserPatch),
    // 수수료율
    CommissionRateUpdated {
        rate: f64,
    },
}

impl SyncEvent {
    /// 로그용 이벤트 이름
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::BidPlaced(_) => "bidPlaced",
            SyncEvent::BidRemoved(_) => "bidRemoved",
            SyncEvent::AuctionCreated(_) => "auctionCreated",
            SyncEvent::AuctionUpdated(_) => "auctionUpdated",
            SyncEvent::AuctionRemoved { .. } => "auctionRemoved",
            SyncEvent::AuctionEnded { .. } => "auctionEnded",
            SyncEvent::UserRegistered(_) => "userRegistered",
            SyncEvent::UserUpdated(_) => "userUpdated",
            SyncEvent::CommissionRateUpdated { .. } => "commissionRateUpdated",
        }
    }
}
