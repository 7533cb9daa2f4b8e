/// 경매 관리 커맨드
/// 1. 등록
/// 2. 취소 (종료 시간을 현재로)
/// 3. 연장
/// 4. 삭제
/// 모든 변경은 외부 서비스가 확정한 뒤에만 로컬 저장소에 반영한다.
// region:    --- Imports
use crate::api::{with_timeout, AuctionApi};
use crate::auction::model::{Auction, AuctionPatch, AuctionStatus, NewAuction};
use crate::clock;
use crate::error::{Error, Result};
use crate::store::SharedStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

// endregion: --- Imports

/// 연장 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ExtendAuctionCommand {
    pub minutes: u32,
}

/// 1. 등록
pub async fn create_auction(
    listing: NewAuction,
    api: &dyn AuctionApi,
    store: &SharedStore,
    timeout: Duration,
) -> Result<Auction> {
    info!("{:<12} --> 경매 등록 처리 시작: {}", "Command", listing.title);
    listing.validate(Utc::now())?;

    let auction = with_timeout(timeout, api.create_auction(&listing)).await?;
    store.write().await.upsert_confirmed(auction.clone());
    info!("{:<12} --> 경매 등록 완료: {}", "Command", auction.id);
    Ok(auction)
}

/// 2. 취소
pub async fn cancel_auction(
    auction_id: &str,
    api: &dyn AuctionApi,
    store: &SharedStore,
    timeout: Duration,
) -> Result<Auction> {
    info!("{:<12} --> 경매 취소 처리 시작: {}", "Command", auction_id);
    let now = Utc::now();
    {
        let store = store.read().await;
        let auction = store
            .get(auction_id)
            .ok_or_else(|| Error::AuctionNotFound(auction_id.to_string()))?;
        if clock::is_ended(auction, now) {
            return Err(Error::EndedAuction {
                auction_id: auction_id.to_string(),
            });
        }
    }

    let patch = AuctionPatch {
        status: Some(AuctionStatus::Ended),
        ..AuctionPatch::end_time(auction_id, now)
    };
    let auction = with_timeout(timeout, api.update_auction(&patch)).await?;
    store.write().await.upsert_confirmed(auction.clone());
    Ok(auction)
}

/// 3. 연장. 종료 시간은 앞으로만 이동한다.
pub async fn extend_auction(
    auction_id: &str,
    cmd: ExtendAuctionCommand,
    api: &dyn AuctionApi,
    store: &SharedStore,
    timeout: Duration,
) -> Result<Auction> {
    info!(
        "{:<12} --> 경매 연장 처리 시작: {} (+{}분)",
        "Command", auction_id, cmd.minutes
    );
    if cmd.minutes == 0 {
        return Err(Error::InvalidListing(
            "연장 시간은 1분 이상이어야 합니다.".to_string(),
        ));
    }

    let end_time = {
        let store = store.read().await;
        let auction = store
            .get(auction_id)
            .ok_or_else(|| Error::AuctionNotFound(auction_id.to_string()))?;
        if clock::is_ended(auction, Utc::now()) {
            return Err(Error::EndedAuction {
                auction_id: auction_id.to_string(),
            });
        }
        auction.end_time + chrono::Duration::minutes(i64::from(cmd.minutes))
    };

    let patch = AuctionPatch::end_time(auction_id, end_time);
    let auction = with_timeout(timeout, api.update_auction(&patch)).await?;
    store.write().await.upsert_confirmed(auction.clone());
    Ok(auction)
}

/// 4. 삭제
pub async fn delete_auction(
    auction_id: &str,
    api: &dyn AuctionApi,
    store: &SharedStore,
    timeout: Duration,
) -> Result<()> {
    info!("{:<12} --> 경매 삭제 처리 시작: {}", "Command", auction_id);
    with_timeout(timeout, api.delete_auction(auction_id)).await?;
    // 이벤트로 먼저 지워졌을 수 있다
    if let Err(conflict) = store.write().await.remove_auction(auction_id) {
        debug!("{:<12} --> 로컬 삭제 건너뜀: {}", "Command", conflict);
    }
    Ok(())
}
