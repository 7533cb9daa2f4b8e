// region:    --- Imports
use crate::api::AuctionApi;
use crate::auction::commands::{self, ExtendAuctionCommand};
use crate::auction::model::{Auction, NewAuction};
use crate::bidding::commands::{BidSubmitter, PlaceBidCommand};
use crate::clock;
use crate::error::Error;
use crate::store::SharedStore;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// endregion: --- Imports

// region:    --- State
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub api: Arc<dyn AuctionApi>,
    pub bids: Arc<BidSubmitter>,
    pub connected: Arc<AtomicBool>,
    pub timeout: Duration,
}

/// 라우터 설정
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/stats", get(handle_get_stats))
        .route("/auctions", get(handle_get_auctions).post(handle_create_auction))
        .route(
            "/auctions/:id",
            get(handle_get_auction).delete(handle_delete_auction),
        )
        .route("/auctions/:id/bids", get(handle_get_bids))
        .route("/auctions/:id/bid", post(handle_bid))
        .route("/auctions/:id/cancel", post(handle_cancel_auction))
        .route("/auctions/:id/extend", post(handle_extend_auction))
        .with_state(state)
}

// endregion: --- State

// region:    --- Responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::EndedAuction { .. }
            | Error::BidTooLow { .. }
            | Error::InvalidAmount { .. }
            | Error::InvalidListing(_)
            | Error::Rejected(_) => StatusCode::BAD_REQUEST,
            Error::AccountRestricted(_) => StatusCode::FORBIDDEN,
            Error::AuctionNotFound(_) => StatusCode::NOT_FOUND,
            Error::SubmissionInFlight { .. } => StatusCode::CONFLICT,
            Error::NetworkFailure(_) => StatusCode::BAD_GATEWAY,
            Error::NetworkTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Error::Channel(_) | Error::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "retryable": self.is_retryable(),
        });
        (status, Json(body)).into_response()
    }
}

/// 시계 기준으로 계산한 상태를 붙인 경매 응답
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionView {
    #[serde(flatten)]
    pub auction: Auction,
    pub ended: bool,
    pub remaining_secs: u64,
}

impl AuctionView {
    pub fn new(auction: Auction, now: DateTime<Utc>) -> Self {
        Self {
            ended: clock::is_ended(&auction, now),
            remaining_secs: clock::time_remaining(&auction, now).as_secs(),
            auction,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BidRequest {
    pub bidder: String,
    pub amount: f64,
}

// endregion: --- Responses

// region:    --- Query Handlers
pub async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    let stale = state.store.read().await.is_stale();
    Json(serde_json::json!({
        "connected": state.connected.load(Ordering::SeqCst),
        "stale": stale,
    }))
}

/// 모든 경매 조회
pub async fn handle_get_auctions(State(state): State<AppState>) -> impl IntoResponse {
    info!("{:<12} --> 모든 경매 조회", "Handler");
    let now = Utc::now();
    let auctions: Vec<AuctionView> = state
        .store
        .read()
        .await
        .list()
        .into_iter()
        .map(|auction| AuctionView::new(auction, now))
        .collect();
    Json(auctions)
}

/// 경매 조회
pub async fn handle_get_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> Result<Json<AuctionView>, Error> {
    info!("{:<12} --> 경매 조회 id: {}", "Handler", auction_id);
    let auction = state
        .store
        .read()
        .await
        .get(&auction_id)
        .cloned()
        .ok_or(Error::AuctionNotFound(auction_id))?;
    Ok(Json(AuctionView::new(auction, Utc::now())))
}

/// 입찰 이력 조회 (시간 순)
pub async fn handle_get_bids(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> Result<impl IntoResponse, Error> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Handler", auction_id);
    let bids = state
        .store
        .read()
        .await
        .get(&auction_id)
        .map(|auction| auction.bids.clone())
        .ok_or(Error::AuctionNotFound(auction_id))?;
    Ok(Json(bids))
}

/// 시장 통계 조회
pub async fn handle_get_stats(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.store.read().await.stats(Utc::now());
    Json(stats)
}

// endregion: --- Query Handlers

// region:    --- Command Handlers
/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    Json(request): Json<BidRequest>,
) -> Result<impl IntoResponse, Error> {
    let cmd = PlaceBidCommand {
        auction_id,
        bidder: request.bidder,
        amount: request.amount,
    };
    let auction = state.bids.place_bid(cmd).await?;
    Ok(Json(serde_json::json!({
        "message": "입찰이 성공적으로 처리되었습니다.",
        "auction": AuctionView::new(auction, Utc::now()),
    })))
}

/// 경매 등록
pub async fn handle_create_auction(
    State(state): State<AppState>,
    Json(listing): Json<NewAuction>,
) -> Result<impl IntoResponse, Error> {
    let auction =
        commands::create_auction(listing, state.api.as_ref(), &state.store, state.timeout).await?;
    Ok((
        StatusCode::CREATED,
        Json(AuctionView::new(auction, Utc::now())),
    ))
}

/// 경매 취소
pub async fn handle_cancel_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> Result<Json<AuctionView>, Error> {
    let auction =
        commands::cancel_auction(&auction_id, state.api.as_ref(), &state.store, state.timeout)
            .await?;
    Ok(Json(AuctionView::new(auction, Utc::now())))
}

/// 경매 연장
pub async fn handle_extend_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
    Json(cmd): Json<ExtendAuctionCommand>,
) -> Result<Json<AuctionView>, Error> {
    let auction = commands::extend_auction(
        &auction_id,
        cmd,
        state.api.as_ref(),
        &state.store,
        state.timeout,
    )
    .await?;
    Ok(Json(AuctionView::new(auction, Utc::now())))
}

/// 경매 삭제
pub async fn handle_delete_auction(
    State(state): State<AppState>,
    Path(auction_id): Path<String>,
) -> Result<StatusCode, Error> {
    commands::delete_auction(&auction_id, state.api.as_ref(), &state.store, state.timeout).await?;
    Ok(StatusCode::NO_CONTENT)
}

// endregion: --- Command Handlers
