/// 실시간 동기화 계층
/// 하나의 장기 구독을 소유하고, 받은 순서대로 이벤트를 저장소에 적용한다.
/// 연결이 끊기면 저장소를 stale 로 표시하고, 재연결 후 전체 재동기화가 끝나야 다시 신뢰한다.
// region:    --- Imports
use crate::api::AuctionApi;
use crate::auction::events::SyncEvent;
use crate::error::Result;
use crate::message_broker::EventChannel;
use crate::store::SharedStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// endregion: --- Imports

// region:    --- Sync Layer
pub struct SyncLayer {
    store: SharedStore,
    channel: Arc<dyn EventChannel>,
    api: Arc<dyn AuctionApi>,
    connected: Arc<AtomicBool>,
    initial_backoff: Duration,
    max_backoff: Duration,
}

impl SyncLayer {
    pub fn new(
        store: SharedStore,
        channel: Arc<dyn EventChannel>,
        api: Arc<dyn AuctionApi>,
    ) -> Self {
        Self {
            store,
            channel,
            api,
            connected: Arc::new(AtomicBool::new(false)),
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }

    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// 연결 상태 플래그 (health 조회용)
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.connected)
    }

    /// 백그라운드에서 동기화 시작
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    /// 연결 -> 재동기화 -> 이벤트 적용 을 끊길 때마다 반복한다
    pub async fn run(&self) {
        let mut backoff = self.initial_backoff;
        loop {
            let mut established = false;
            match self.session(&mut established).await {
                Ok(()) => info!("{:<12} --> 이벤트 채널이 닫혔습니다. 재연결합니다.", "Sync"),
                Err(e) => warn!(
                    "{:<12} --> 동기화 연결 끊김: {} ({:?} 후 재시도)",
                    "Sync", e, backoff
                ),
            }

            if established {
                backoff = self.initial_backoff;
            }
            tokio::time::sleep(backoff).await;
            if !established {
                backoff = (backoff * 2).min(self.max_backoff);
            }
        }
    }

    async fn session(&self, established: &mut bool) -> Result<()> {
        // 구독을 먼저 열어야 재동기화 중 발생한 이벤트를 놓치지 않는다
        let mut subscription = self.channel.connect().await?;

        let result: Result<()> = async {
            self.resync().await?;
            *established = true;
            self.connected.store(true, Ordering::SeqCst);
            info!("{:<12} --> 구독 및 재동기화 완료", "Sync");

            while let Some(event) = subscription.recv().await? {
                self.apply(event).await;
            }
            Ok(())
        }
        .await;

        self.connected.store(false, Ordering::SeqCst);
        self.store.write().await.mark_stale();
        result
    }

    /// 외부 서비스에서 진행 중인 경매를 다시 불러온다
    pub async fn resync(&self) -> Result<usize> {
        let auctions = self.api.fetch_active_auctions().await?;
        let count = auctions.len();
        self.store.write().await.replace_all(auctions);
        info!("{:<12} --> 전체 재동기화: 경매 {}건", "Sync", count);
        Ok(count)
    }

    /// 이벤트 하나 적용. 충돌은 로그만 남기고 건너뛴다.
    pub async fn apply(&self, event: SyncEvent) -> bool {
        let name = event.name();
        match self.store.write().await.apply_event(event) {
            Ok(()) => {
                debug!("{:<12} --> 이벤트 적용: {}", "Sync", name);
                true
            }
            Err(conflict) => {
                warn!("{:<12} --> 이벤트 건너뜀 ({}): {}", "Sync", name, conflict);
                false
            }
        }
    }
}

// endregion: --- Sync Layer
