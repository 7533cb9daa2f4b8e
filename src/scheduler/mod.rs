/// 경매 상태 업데이트 스케줄러
/// 종료 시간이 지난 경매를 주기적으로 ended 로 전환한다.
/// 전환은 한 번만 일어나며 이 스케줄러로는 되돌릴 수 없다.
// region:    --- Imports
use crate::store::SharedStore;
use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

// endregion: --- Imports

// region:    --- Auction Scheduler
/// 경매 상태 업데이트 스케줄러
pub struct AuctionScheduler {
    store: SharedStore,
    period: Duration,
}

impl AuctionScheduler {
    /// 주기는 최소 1ms
    pub fn new(store: SharedStore, period: Duration) -> Self {
        Self {
            store,
            period: period.max(Duration::from_millis(1)),
        }
    }

    /// 경매 상태 업데이트 스케줄러 시작
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                self.sweep().await;
            }
        })
    }

    /// ACTIVE -> ENDED 상태 변경. 전환된 경매 id 를 반환한다.
    pub async fn sweep(&self) -> Vec<String> {
        let now = Utc::now();
        let ended = self.store.write().await.sweep_ended(now);

        for id in &ended {
            info!("{:<12} --> 경매 종료: {}", "Scheduler", id);
        }
        debug!(
            "{:<12} --> 경매 상태가 성공적으로 업데이트되었습니다.",
            "Scheduler"
        );
        ended
    }
}
// endregion: --- Auction Scheduler
