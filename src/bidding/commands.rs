/// 입찰 커맨드 처리
/// 1. 중복 제출 방지
/// 2. 로컬 사전 검증
/// 3. 외부 서비스 입찰 요청 (시간 제한)
/// 4. 확정 결과 반영 및 3분 규칙 적용
// region:    --- Imports
use super::validator::{check_amount, validate_bid, BidProposal, BidRules};
use crate::api::{with_timeout, AuctionApi, BidOutcome};
use crate::auction::model::{Auction, AuctionPatch};
use crate::clock::ExtensionRule;
use crate::error::{Error, Result};
use crate::store::SharedStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBidCommand {
    pub auction_id: String,
    pub bidder: String,
    pub amount: f64,
}

type InFlight = Arc<Mutex<HashSet<(String, String)>>>;

/// 처리 중 표시. drop 될 때 해제된다.
struct InFlightGuard {
    in_flight: InFlight,
    key: (String, String),
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.key);
        }
    }
}

pub struct BidSubmitter {
    store: SharedStore,
    api: Arc<dyn AuctionApi>,
    rules: BidRules,
    extension: ExtensionRule,
    timeout: Duration,
    in_flight: InFlight,
}

impl BidSubmitter {
    pub fn new(
        store: SharedStore,
        api: Arc<dyn AuctionApi>,
        rules: BidRules,
        extension: ExtensionRule,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            api,
            rules,
            extension,
            timeout,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// 입찰
    pub async fn place_bid(&self, cmd: PlaceBidCommand) -> Result<Auction> {
        info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);
        let _guard = self.begin(&cmd)?;

        self.precheck(&cmd).await?;

        let outcome = with_timeout(
            self.timeout,
            self.api.submit_bid(&cmd.auction_id, cmd.amount),
        )
        .await?;

        let confirmed = match outcome {
            BidOutcome::Accepted(auction) => auction,
            BidOutcome::Rejected(message) => {
                warn!("{:<12} --> 외부 서비스 입찰 거부: {}", "Command", message);
                return Err(Error::Rejected(message));
            }
        };

        let accepted_at = Utc::now();
        let auction = {
            let mut store = self.store.write().await;
            store.upsert_confirmed(confirmed);
            store
                .get(&cmd.auction_id)
                .cloned()
                .ok_or_else(|| Error::AuctionNotFound(cmd.auction_id.clone()))?
        };
        info!(
            "{:<12} --> 입찰 성공: auction={}, 현재 가격 {}",
            "Command", auction.id, auction.current_price
        );

        Ok(self.extend_if_needed(auction, accepted_at).await)
    }

    /// 같은 입찰자가 같은 경매에 동시에 두 번 제출하지 못하게 한다
    fn begin(&self, cmd: &PlaceBidCommand) -> Result<InFlightGuard> {
        let key = (cmd.auction_id.clone(), cmd.bidder.clone());
        let mut set = self
            .in_flight
            .lock()
            .map_err(|_| Error::Rejected("입찰 상태를 확인할 수 없습니다.".to_string()))?;
        if !set.insert(key.clone()) {
            return Err(Error::SubmissionInFlight {
                auction_id: cmd.auction_id.clone(),
                bidder: cmd.bidder.clone(),
            });
        }
        Ok(InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            key,
        })
    }

    /// 로컬 사전 검증. 저장소가 stale 이면 금액 형식만 보고 외부 서비스에 맡긴다.
    async fn precheck(&self, cmd: &PlaceBidCommand) -> Result<()> {
        let store = self.store.read().await;

        if let Some(user) = store.user(&cmd.bidder) {
            if !user.can_bid() {
                return Err(Error::AccountRestricted(cmd.bidder.clone()));
            }
        }

        if store.is_stale() {
            warn!(
                "{:<12} --> 로컬 상태가 stale 이므로 사전 검증을 생략합니다.",
                "Command"
            );
            return check_amount(cmd.amount);
        }

        let auction = store
            .get(&cmd.auction_id)
            .ok_or_else(|| Error::AuctionNotFound(cmd.auction_id.clone()))?;

        let proposal = BidProposal {
            bidder: cmd.bidder.clone(),
            amount: cmd.amount,
        };
        validate_bid(auction, &proposal, &self.rules, Utc::now()).map(|_| ())
    }

    /// 3분 규칙. 연장은 외부 서비스에 반영된 뒤에만 로컬에 적용한다.
    async fn extend_if_needed(&self, auction: Auction, accepted_at: chrono::DateTime<Utc>) -> Auction {
        let Some(extended) = self.extension.evaluate(&auction, accepted_at, Utc::now()) else {
            return auction;
        };

        info!(
            "{:<12} --> 종료 직전 입찰, 종료 시간 연장: auction={}, end_time={}",
            "Command", auction.id, extended
        );
        let patch = AuctionPatch::end_time(auction.id.clone(), extended);
        match with_timeout(self.timeout, self.api.update_auction(&patch)).await {
            Ok(mut updated) => {
                updated.extended_for = Some(accepted_at);
                let mut store = self.store.write().await;
                store.upsert_confirmed(updated.clone());
                updated
            }
            Err(e) => {
                warn!("{:<12} --> 종료 시간 연장 실패: {}", "Command", e);
                auction
            }
        }
    }
}

// endregion: --- Commands
