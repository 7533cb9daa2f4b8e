/// 외부 경매 서비스 클라이언트
/// 입찰 수락 여부의 최종 판단은 이 서비스가 한다.
// region:    --- Imports
use crate::auction::model::{Auction, AuctionPatch, NewAuction};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

// endregion: --- Imports

// region:    --- Api Trait
/// 입찰 요청 결과
#[derive(Debug, Clone, PartialEq)]
pub enum BidOutcome {
    Accepted(Auction),
    Rejected(String),
}

/// 외부 경매 서비스 트레이트
#[async_trait]
pub trait AuctionApi: Send + Sync {
    async fn submit_bid(&self, auction_id: &str, amount: f64) -> Result<BidOutcome>;
    async fn fetch_active_auctions(&self) -> Result<Vec<Auction>>;
    async fn create_auction(&self, listing: &NewAuction) -> Result<Auction>;
    async fn update_auction(&self, patch: &AuctionPatch) -> Result<Auction>;
    async fn delete_auction(&self, auction_id: &str) -> Result<()>;
}

// endregion: --- Api Trait

// region:    --- Response Envelope
/// `{success, data, message}` 로 감싼 응답과 감싸지 않은 응답을 모두 받는다
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped {
        success: bool,
        data: Option<T>,
        message: Option<String>,
    },
    Plain(T),
}

impl<T> Envelope<T> {
    fn into_result(self) -> std::result::Result<T, String> {
        match self {
            Envelope::Plain(data) => Ok(data),
            Envelope::Wrapped {
                success: true,
                data: Some(data),
                ..
            } => Ok(data),
            Envelope::Wrapped { message, .. } => {
                Err(message.unwrap_or_else(|| "요청이 거부되었습니다.".to_string()))
            }
        }
    }
}

// endregion: --- Response Envelope

// region:    --- Http Api
/// reqwest 기반 구현체
pub struct HttpAuctionApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl HttpAuctionApi {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("HTTP 클라이언트 생성 실패: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            timeout,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::NetworkTimeout(self.timeout)
        } else {
            Error::NetworkFailure(e.to_string())
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        builder.send().await.map_err(|e| self.transport_error(e))
    }

    /// 응답 본문 해석. 2xx 가 아니면 서버 메시지를 Rejected 로 돌려준다.
    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(envelope) => envelope.into_result().map_err(Error::Rejected),
            Err(_) if !status.is_success() => Err(Error::Rejected(format!(
                "요청 실패 ({}): {}",
                status,
                body.trim()
            ))),
            Err(e) => Err(Error::NetworkFailure(format!("응답 해석 실패: {}", e))),
        }
    }
}

#[async_trait]
impl AuctionApi for HttpAuctionApi {
    async fn submit_bid(&self, auction_id: &str, amount: f64) -> Result<BidOutcome> {
        info!(
            "{:<12} --> 입찰 요청 전송: auction={}, amount={}",
            "Api", auction_id, amount
        );
        let response = self
            .send(
                self.request(Method::POST, &format!("/auctions/{}/bid", auction_id))
                    .json(&serde_json::json!({ "amount": amount })),
            )
            .await?;

        match self.parse::<Auction>(response).await {
            Ok(auction) => Ok(BidOutcome::Accepted(auction)),
            Err(Error::Rejected(message)) => {
                warn!("{:<12} --> 입찰 거부: {}", "Api", message);
                Ok(BidOutcome::Rejected(message))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_active_auctions(&self) -> Result<Vec<Auction>> {
        info!("{:<12} --> 진행 중인 경매 전체 조회", "Api");
        let response = self
            .send(self.request(Method::GET, "/auctions?status=active"))
            .await?;
        self.parse(response).await
    }

    async fn create_auction(&self, listing: &NewAuction) -> Result<Auction> {
        info!("{:<12} --> 경매 등록 요청: {}", "Api", listing.title);
        let response = self
            .send(self.request(Method::POST, "/auctions").json(listing))
            .await?;
        self.parse(response).await
    }

    async fn update_auction(&self, patch: &AuctionPatch) -> Result<Auction> {
        info!("{:<12} --> 경매 수정 요청: {}", "Api", patch.id);
        let response = self
            .send(
                self.request(Method::PUT, &format!("/auctions/{}", patch.id))
                    .json(patch),
            )
            .await?;
        self.parse(response).await
    }

    async fn delete_auction(&self, auction_id: &str) -> Result<()> {
        info!("{:<12} --> 경매 삭제 요청: {}", "Api", auction_id);
        let response = self
            .send(self.request(Method::DELETE, &format!("/auctions/{}", auction_id)))
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Rejected(format!("삭제 실패 ({}): {}", status, body.trim())))
    }
}

// endregion: --- Http Api

// region:    --- Timeout
/// 응답이 없는 요청을 NetworkTimeout 으로 바꾼다
pub async fn with_timeout<T, F>(timeout: Duration, request: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{:<12} --> 요청 시간 초과: {:?}", "Api", timeout);
            Err(Error::NetworkTimeout(timeout))
        }
    }
}

// endregion: --- Timeout
