// region:    --- Imports
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

// endregion: --- Imports

pub type Result<T> = std::result::Result<T, Error>;

// region:    --- Error
/// 사용자에게 노출되는 오류
#[derive(Debug, Error)]
pub enum Error {
    #[error("경매가 이미 종료되었습니다. (auction: {auction_id})")]
    EndedAuction { auction_id: String },

    #[error("입찰 금액이 현재 가격보다 낮습니다. (입찰: {amount}, 현재 가격: {current_price})")]
    BidTooLow { amount: f64, current_price: f64 },

    #[error("잘못된 입찰 금액입니다: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("네트워크 오류: {0}")]
    NetworkFailure(String),

    #[error("응답 시간 초과 ({0:?})")]
    NetworkTimeout(Duration),

    #[error("{0}")]
    Rejected(String),

    #[error("이미 처리 중인 입찰이 있습니다. (auction: {auction_id}, bidder: {bidder})")]
    SubmissionInFlight { auction_id: String, bidder: String },

    #[error("입찰이 제한된 계정입니다: {0}")]
    AccountRestricted(String),

    #[error("경매를 찾을 수 없습니다: {0}")]
    AuctionNotFound(String),

    #[error("잘못된 경매 등록 정보: {0}")]
    InvalidListing(String),

    #[error("이벤트 채널 오류: {0}")]
    Channel(String),

    #[error("설정 오류: {0}")]
    Config(String),
}

impl Error {
    /// 클라이언트에 전달되는 오류 코드
    pub fn code(&self) -> &'static str {
        match self {
            Error::EndedAuction { .. } => "ALREADY_ENDED",
            Error::BidTooLow { .. } => "LOW_BID",
            Error::InvalidAmount { .. } => "INVALID_AMOUNT",
            Error::NetworkFailure(_) => "NETWORK_FAILURE",
            Error::NetworkTimeout(_) => "NETWORK_TIMEOUT",
            Error::Rejected(_) => "REJECTED",
            Error::SubmissionInFlight { .. } => "IN_FLIGHT",
            Error::AccountRestricted(_) => "ACCOUNT_RESTRICTED",
            Error::AuctionNotFound(_) => "NOT_FOUND",
            Error::InvalidListing(_) => "INVALID_LISTING",
            Error::Channel(_) => "CHANNEL_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// 사용자가 같은 동작을 다시 시도해도 되는 오류인지 여부 (자동 재시도는 하지 않음)
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::NetworkFailure(_) | Error::NetworkTimeout(_))
    }
}

// endregion: --- Error

// region:    --- Apply Conflict
/// 동기화 이벤트 적용 충돌. 로그만 남기고 건너뛴다.
#[derive(Debug, Error, PartialEq)]
pub enum ApplyConflict {
    #[error("로컬에 없는 경매: {0}")]
    UnknownAuction(String),

    #[error("이미 존재하는 경매: {0}")]
    DuplicateAuction(String),

    #[error("이미 적용된 입찰: auction={auction_id}, bidder={bidder}, amount={amount}, timestamp={timestamp}")]
    DuplicateBid {
        auction_id: String,
        bidder: String,
        amount: f64,
        timestamp: DateTime<Utc>,
    },

    #[error("로컬에 없는 입찰: auction={auction_id}, bidder={bidder}, amount={amount}")]
    UnknownBid {
        auction_id: String,
        bidder: String,
        amount: f64,
    },

    #[error("로컬에 없는 사용자: {0}")]
    UnknownUser(String),

    #[error("이미 존재하는 사용자: {0}")]
    DuplicateUser(String),
}

// endregion: --- Apply Conflict
