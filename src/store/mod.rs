/// 경매 엔티티 저장소
/// 동기화 계층(이벤트)과 요청을 보낸 클라이언트의 확정 결과만 이 저장소를 변경한다.
// region:    --- Imports
use crate::auction::events::{BidEvent, SyncEvent};
use crate::auction::model::{Auction, AuctionPatch, AuctionStatus};
use crate::clock;
use crate::error::ApplyConflict;
use crate::user::model::{User, UserPatch};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

// endregion: --- Imports

pub type SharedStore = Arc<RwLock<AuctionStore>>;

// region:    --- Stats
/// 시장 통계
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub active_auctions: usize,
    pub ended_auctions: usize,
    pub total_bids: usize,
    pub registered_users: usize,
    pub gross_volume: f64,
    pub commission_rate: f64,
    pub commission: f64,
}

// endregion: --- Stats

// region:    --- Auction Store
#[derive(Debug)]
pub struct AuctionStore {
    auctions: HashMap<String, Auction>,
    users: HashMap<String, User>,
    commission_rate: f64,
    stale: bool,
}

impl Default for AuctionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AuctionStore {
    /// 첫 동기화 전까지는 stale 상태
    pub fn new() -> Self {
        Self {
            auctions: HashMap::new(),
            users: HashMap::new(),
            commission_rate: 0.0,
            stale: true,
        }
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // region:    --- Reads
    pub fn get(&self, auction_id: &str) -> Option<&Auction> {
        self.auctions.get(auction_id)
    }

    /// 종료 시간 순 경매 목록
    pub fn list(&self) -> Vec<Auction> {
        let mut auctions: Vec<Auction> = self.auctions.values().cloned().collect();
        auctions.sort_by(|a, b| a.end_time.cmp(&b.end_time).then_with(|| a.id.cmp(&b.id)));
        auctions
    }

    pub fn user(&self, email: &str) -> Option<&User> {
        self.users.get(email)
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn len(&self) -> usize {
        self.auctions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.auctions.is_empty()
    }

    pub fn stats(&self, now: DateTime<Utc>) -> MarketStats {
        let mut stats = MarketStats {
            active_auctions: 0,
            ended_auctions: 0,
            total_bids: 0,
            registered_users: self.users.len(),
            gross_volume: 0.0,
            commission_rate: self.commission_rate,
            commission: 0.0,
        };

        for auction in self.auctions.values() {
            stats.total_bids += auction.bids.len();
            if clock::is_ended(auction, now) {
                stats.ended_auctions += 1;
                if !auction.bids.is_empty() {
                    stats.gross_volume += auction.current_price;
                }
            } else {
                stats.active_auctions += 1;
            }
        }
        stats.commission = stats.gross_volume * self.commission_rate;
        stats
    }
    // endregion: --- Reads

    // region:    --- Sync Entry Point
    /// 동기화 이벤트 적용
    pub fn apply_event(&mut self, event: SyncEvent) -> Result<(), ApplyConflict> {
        match event {
            SyncEvent::BidPlaced(bid) => self.apply_bid_event(&bid),
            SyncEvent::BidRemoved(bid) => self.remove_bid(&bid),
            SyncEvent::AuctionCreated(auction) => self.insert_auction(auction),
            SyncEvent::AuctionUpdated(patch) => self.merge_auction(&patch),
            SyncEvent::AuctionRemoved { id } => self.remove_auction(&id).map(|_| ()),
            SyncEvent::AuctionEnded { id, winner } => self.end_auction(&id, winner),
            SyncEvent::UserRegistered(user) => self.register_user(user),
            SyncEvent::UserUpdated(patch) => self.update_user(&patch),
            SyncEvent::CommissionRateUpdated { rate } => {
                self.commission_rate = rate;
                Ok(())
            }
        }
    }
    // endregion: --- Sync Entry Point

    // region:    --- Bids
    /// 수락된 입찰 반영. 같은 입찰이 다시 오면 건너뛴다.
    pub fn apply_bid_event(&mut self, event: &BidEvent) -> Result<(), ApplyConflict> {
        let auction = self
            .auctions
            .get_mut(&event.auction_id)
            .ok_or_else(|| ApplyConflict::UnknownAuction(event.auction_id.clone()))?;

        let bid = event.to_bid();
        if auction.has_bid(&bid) {
            return Err(ApplyConflict::DuplicateBid {
                auction_id: event.auction_id.clone(),
                bidder: bid.bidder,
                amount: bid.amount,
                timestamp: bid.timestamp,
            });
        }

        auction.current_price = bid.amount;
        auction.bids.push(bid);
        Ok(())
    }

    /// 관리자 입찰 삭제. 현재 가격은 남은 입찰 최고가(없으면 시작 가격)로 재계산한다.
    pub fn remove_bid(&mut self, event: &BidEvent) -> Result<(), ApplyConflict> {
        let auction = self
            .auctions
            .get_mut(&event.auction_id)
            .ok_or_else(|| ApplyConflict::UnknownAuction(event.auction_id.clone()))?;

        let bid = event.to_bid();
        let position = auction
            .bids
            .iter()
            .position(|b| b.same_as(&bid))
            .ok_or_else(|| ApplyConflict::UnknownBid {
                auction_id: event.auction_id.clone(),
                bidder: bid.bidder.clone(),
                amount: bid.amount,
            })?;

        auction.bids.remove(position);
        auction.recompute_price();
        Ok(())
    }
    // endregion: --- Bids

    // region:    --- Auctions
    pub fn insert_auction(&mut self, auction: Auction) -> Result<(), ApplyConflict> {
        if self.auctions.contains_key(&auction.id) {
            return Err(ApplyConflict::DuplicateAuction(auction.id));
        }
        self.auctions.insert(auction.id.clone(), auction);
        Ok(())
    }

    /// 외부 서비스가 확정한 스냅샷 반영.
    /// 응답을 기다리는 사이 이벤트로 먼저 들어온 입찰은 유지하고,
    /// 스냅샷에만 있는 입찰은 시각 순서에 맞는 자리에 넣는다.
    /// 현재 가격은 합친 입찰 목록의 마지막 입찰 금액이다.
    pub fn upsert_confirmed(&mut self, mut auction: Auction) {
        if let Some(existing) = self.auctions.remove(&auction.id) {
            auction.extended_for = auction.extended_for.max(existing.extended_for);

            let mut bids = existing.bids;
            for bid in std::mem::take(&mut auction.bids) {
                if bids.iter().any(|b| b.same_as(&bid)) {
                    continue;
                }
                let at = bids
                    .iter()
                    .position(|b| b.timestamp > bid.timestamp)
                    .unwrap_or(bids.len());
                bids.insert(at, bid);
            }
            auction.bids = bids;

            if let Some(last) = auction.leading_bid() {
                auction.current_price = last.amount;
            }
        }
        self.auctions.insert(auction.id.clone(), auction);
    }

    pub fn merge_auction(&mut self, patch: &AuctionPatch) -> Result<(), ApplyConflict> {
        let auction = self
            .auctions
            .get_mut(&patch.id)
            .ok_or_else(|| ApplyConflict::UnknownAuction(patch.id.clone()))?;
        patch.merge_into(auction);
        Ok(())
    }

    pub fn remove_auction(&mut self, auction_id: &str) -> Result<Auction, ApplyConflict> {
        self.auctions
            .remove(auction_id)
            .ok_or_else(|| ApplyConflict::UnknownAuction(auction_id.to_string()))
    }

    /// 종료 처리. 낙찰자가 없으면 마지막 입찰자를 낙찰자로 기록한다.
    pub fn end_auction(
        &mut self,
        auction_id: &str,
        winner: Option<String>,
    ) -> Result<(), ApplyConflict> {
        let auction = self
            .auctions
            .get_mut(auction_id)
            .ok_or_else(|| ApplyConflict::UnknownAuction(auction_id.to_string()))?;
        close(auction, winner);
        Ok(())
    }

    /// 종료 시간이 지난 경매를 ended 로 전환한다. 전환된 경매 id 를 반환.
    pub fn sweep_ended(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let mut ended = Vec::new();
        for auction in self.auctions.values_mut() {
            if auction.status == AuctionStatus::Active && clock::is_ended(auction, now) {
                close(auction, None);
                ended.push(auction.id.clone());
            }
        }
        ended.sort();
        ended
    }
    // endregion: --- Auctions

    // region:    --- Users
    pub fn register_user(&mut self, user: User) -> Result<(), ApplyConflict> {
        if self.users.contains_key(&user.email) {
            return Err(ApplyConflict::DuplicateUser(user.email));
        }
        self.users.insert(user.email.clone(), user);
        Ok(())
    }

    pub fn update_user(&mut self, patch: &UserPatch) -> Result<(), ApplyConflict> {
        let user = self
            .users
            .get_mut(&patch.email)
            .ok_or_else(|| ApplyConflict::UnknownUser(patch.email.clone()))?;
        patch.merge_into(user);
        Ok(())
    }
    // endregion: --- Users

    // region:    --- Resync
    /// 전체 재동기화. 로컬 전용 연장 기록은 유지한다.
    /// 이미 ended 로 전환한 경매는 스냅샷에 없거나 서버 status 가 늦더라도 다시 active 로 돌리지 않는다.
    pub fn replace_all(&mut self, auctions: Vec<Auction>) {
        let mut previous = std::mem::take(&mut self.auctions);
        for mut auction in auctions {
            if let Some(old) = previous.remove(&auction.id) {
                auction.extended_for = auction.extended_for.max(old.extended_for);
                // 종료 시간이 늘어나지 않았다면 서버 status 가 늦은 것
                if old.status == AuctionStatus::Ended && auction.end_time <= old.end_time {
                    auction.status = AuctionStatus::Ended;
                    if auction.winner.is_none() {
                        auction.winner = old.winner;
                    }
                }
            }
            self.auctions.insert(auction.id.clone(), auction);
        }

        for (id, old) in previous {
            if old.status == AuctionStatus::Ended {
                self.auctions.insert(id, old);
            }
        }
        self.stale = false;
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }
    // endregion: --- Resync
}

fn close(auction: &mut Auction, winner: Option<String>) {
    auction.status = AuctionStatus::Ended;
    if winner.is_some() {
        auction.winner = winner;
    } else if auction.winner.is_none() {
        auction.winner = auction.leading_bid().map(|b| b.bidder.clone());
    }
}

// endregion: --- Auction Store
