// region:    --- Imports
use auction_sync::api::{AuctionApi, HttpAuctionApi};
use auction_sync::bidding::commands::BidSubmitter;
use auction_sync::config::{ChannelConfig, Config};
use auction_sync::handlers::{self, AppState};
use auction_sync::message_broker::{EventChannel, KafkaEventChannel, WebSocketEventChannel};
use auction_sync::scheduler::AuctionScheduler;
use auction_sync::store::AuctionStore;
use auction_sync::sync::SyncLayer;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
// endregion: --- Imports

// region:    --- Main
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // logging 초기화
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .without_time()
        .with_target(false)
        .init();

    // 설정 읽기
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{:<12} --> 설정 읽기 실패: {}", "Main", e);
            return Err(e.into());
        }
    };
    info!(
        "{:<12} --> 설정: api={}, channel={:?}, listen={}",
        "Main", config.api_url, config.channel, config.listen_addr
    );

    // 로컬 경매 저장소 및 외부 서비스 클라이언트
    let store = AuctionStore::new().shared();
    let api: Arc<dyn AuctionApi> = Arc::new(HttpAuctionApi::new(
        &config.api_url,
        config.api_token.clone(),
        config.request_timeout,
    )?);

    // 이벤트 채널
    let channel: Arc<dyn EventChannel> = match &config.channel {
        ChannelConfig::WebSocket { url } => Arc::new(WebSocketEventChannel::new(url)),
        ChannelConfig::Kafka {
            brokers,
            topic,
            group_prefix,
        } => Arc::new(KafkaEventChannel::new(brokers, topic, group_prefix)),
    };

    // 동기화 시작
    let sync = SyncLayer::new(Arc::clone(&store), channel, Arc::clone(&api))
        .with_backoff(Duration::from_secs(1), config.reconnect_max_backoff);
    let connected = sync.connected_flag();
    sync.start();
    info!("{:<12} --> 동기화 시작", "Main");

    // 경매 종료 스케줄러
    AuctionScheduler::new(Arc::clone(&store), config.sweep_interval).start();

    let bids = Arc::new(BidSubmitter::new(
        Arc::clone(&store),
        Arc::clone(&api),
        config.bid_rules,
        config.extension,
        config.request_timeout,
    ));

    // 로컬 UI 를 위한 cors 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // 라우터 설정
    let routes_all = handlers::router(AppState {
        store,
        api,
        bids,
        connected,
        timeout: config.request_timeout,
    })
    .layer(cors);

    let listener = TcpListener::bind(&config.listen_addr).await?;
    info!(
        "{:<12} --> Web Server: Listening on {}",
        "Main",
        listener.local_addr()?
    );

    // 서버 실행
    if let Err(err) = axum::serve(listener, routes_all.into_make_service()).await {
        error!("{:<12} --> Server error: {}", "Main", err);
    }
    Ok(())
}
// endregion: --- Main
