#![allow(dead_code)]

use async_trait::async_trait;
use auction_sync::api::{AuctionApi, BidOutcome};
use auction_sync::auction::model::{
    Auction, AuctionPatch, AuctionStatus, Bid, Category, NewAuction,
};
use auction_sync::bidding::commands::BidSubmitter;
use auction_sync::bidding::validator::BidRules;
use auction_sync::clock::ExtensionRule;
use auction_sync::error::{Error, Result};
use auction_sync::handlers::{router, AppState};
use auction_sync::message_broker::{MemoryEventChannel, MemoryEventSender};
use auction_sync::store::{AuctionStore, SharedStore};
use auction_sync::sync::SyncLayer;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

/// 트레이싱 초기화 (여러 테스트에서 호출해도 한 번만 설정)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .without_time()
        .with_target(false)
        .with_test_writer()
        .try_init();
}

/// 테스트용 경매 생성
pub fn test_auction(id: &str, price: f64, ends_in: Duration) -> Auction {
    Auction {
        id: id.to_string(),
        title: format!("테스트 경매 {}", id),
        description: "테스트를 위한 경매입니다.".to_string(),
        category: Category::Art,
        image: None,
        starting_price: price,
        current_price: price,
        end_time: Utc::now() + ends_in,
        bids: Vec::new(),
        seller: "TestSeller".to_string(),
        status: AuctionStatus::Active,
        finalized: false,
        winner: None,
        extended_for: None,
    }
}

// region:    --- Fake Api
/// 외부 경매 서비스 대역
#[derive(Default)]
pub struct FakeApi {
    pub auctions: Mutex<HashMap<String, Auction>>,
    pub fetches: AtomicUsize,
    pub submissions: AtomicUsize,
    pub delay: Mutex<Option<std::time::Duration>>,
    pub reject_with: Mutex<Option<String>>,
    pub updates: Mutex<Vec<AuctionPatch>>,
}

impl FakeApi {
    pub fn new(auctions: Vec<Auction>) -> Arc<Self> {
        let api = FakeApi::default();
        {
            let mut map = api.auctions.lock().unwrap();
            for auction in auctions {
                map.insert(auction.id.clone(), auction);
            }
        }
        Arc::new(api)
    }

    pub fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn reject_with(&self, message: &str) {
        *self.reject_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn auction(&self, id: &str) -> Option<Auction> {
        self.auctions.lock().unwrap().get(id).cloned()
    }

    /// 서버 쪽에서만 일어난 입찰 (다른 클라이언트)
    pub fn remote_bid(&self, id: &str, bidder: &str, amount: f64) -> Bid {
        let bid = Bid {
            bidder: bidder.to_string(),
            amount,
            timestamp: Utc::now(),
        };
        let mut map = self.auctions.lock().unwrap();
        let auction = map.get_mut(id).unwrap();
        auction.bids.push(bid.clone());
        auction.current_price = amount;
        bid
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl AuctionApi for FakeApi {
    async fn submit_bid(&self, auction_id: &str, amount: f64) -> Result<BidOutcome> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        self.pause().await;

        if let Some(message) = self.reject_with.lock().unwrap().clone() {
            return Ok(BidOutcome::Rejected(message));
        }

        let mut map = self.auctions.lock().unwrap();
        let Some(auction) = map.get_mut(auction_id) else {
            return Ok(BidOutcome::Rejected("경매를 찾을 수 없습니다.".to_string()));
        };
        let now = Utc::now();
        if auction.end_time <= now || auction.status == AuctionStatus::Ended {
            return Ok(BidOutcome::Rejected("경매가 이미 종료되었습니다.".to_string()));
        }
        if amount <= auction.current_price {
            return Ok(BidOutcome::Rejected(
                "입찰 금액이 현재 가격보다 낮습니다.".to_string(),
            ));
        }
        auction.bids.push(Bid {
            bidder: "token-user".to_string(),
            amount,
            timestamp: now,
        });
        auction.current_price = amount;
        Ok(BidOutcome::Accepted(auction.clone()))
    }

    async fn fetch_active_auctions(&self) -> Result<Vec<Auction>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.auctions.lock().unwrap().values().cloned().collect())
    }

    async fn create_auction(&self, listing: &NewAuction) -> Result<Auction> {
        let mut map = self.auctions.lock().unwrap();
        let id = format!("created-{}", map.len() + 1);
        let auction = Auction {
            id: id.clone(),
            title: listing.title.clone(),
            description: listing.description.clone(),
            category: listing.category,
            image: listing.image.clone(),
            starting_price: listing.starting_price,
            current_price: listing.starting_price,
            end_time: listing.end_time,
            bids: Vec::new(),
            seller: listing.seller.clone(),
            status: AuctionStatus::Active,
            finalized: false,
            winner: None,
            extended_for: None,
        };
        map.insert(id, auction.clone());
        Ok(auction)
    }

    async fn update_auction(&self, patch: &AuctionPatch) -> Result<Auction> {
        self.updates.lock().unwrap().push(patch.clone());
        let mut map = self.auctions.lock().unwrap();
        let auction = map
            .get_mut(&patch.id)
            .ok_or_else(|| Error::Rejected("경매를 찾을 수 없습니다.".to_string()))?;
        patch.merge_into(auction);
        Ok(auction.clone())
    }

    async fn delete_auction(&self, auction_id: &str) -> Result<()> {
        self.auctions
            .lock()
            .unwrap()
            .remove(auction_id)
            .map(|_| ())
            .ok_or_else(|| Error::Rejected("경매를 찾을 수 없습니다.".to_string()))
    }
}

// endregion: --- Fake Api

// region:    --- Test App
pub struct TestApp {
    pub base_url: String,
    pub store: SharedStore,
    pub api: Arc<FakeApi>,
    pub channel: Arc<MemoryEventChannel>,
    pub events: MemoryEventSender,
    pub client: reqwest::Client,
}

/// 동기화 계층과 HTTP 서버를 띄우고 첫 재동기화까지 기다린다
pub async fn spawn_app(api: Arc<FakeApi>, timeout: std::time::Duration) -> TestApp {
    init_tracing();

    let store = AuctionStore::new().shared();
    let (channel, events) = MemoryEventChannel::new();
    let channel = Arc::new(channel);

    let sync = SyncLayer::new(Arc::clone(&store), channel.clone(), api.clone()).with_backoff(
        std::time::Duration::from_millis(10),
        std::time::Duration::from_millis(50),
    );
    let connected = sync.connected_flag();
    sync.start();

    let bids = Arc::new(BidSubmitter::new(
        Arc::clone(&store),
        api.clone(),
        BidRules::default(),
        ExtensionRule::default(),
        timeout,
    ));

    let app = router(AppState {
        store: Arc::clone(&store),
        api: api.clone(),
        bids,
        connected,
        timeout,
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });

    let app = TestApp {
        base_url: format!("http://{}", addr),
        store,
        api,
        channel,
        events,
        client: reqwest::Client::new(),
    };

    let store = Arc::clone(&app.store);
    eventually(|| {
        let store = Arc::clone(&store);
        async move {
            let stale = store.read().await.is_stale();
            !stale
        }
    })
    .await;
    app
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// 조건이 참이 될 때까지 최대 3초 기다린다
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(3);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("조건이 제한 시간 안에 충족되지 않았습니다.");
}

// endregion: --- Test App
