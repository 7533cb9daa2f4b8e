// region:    --- Imports
use crate::auction::events::SyncEvent;
use crate::error::{Error, Result};
use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::Message;
use rdkafka::ClientConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

// endregion: --- Imports

// region:    --- Modules
pub mod memory;
pub mod websocket;

pub use memory::{MemoryEventChannel, MemoryEventSender};
pub use websocket::WebSocketEventChannel;

// endregion: --- Modules

// region:    --- Channel Traits
/// 이벤트 채널. connect 할 때마다 새 구독을 연다.
/// connect 는 이후 발행되는 이벤트를 받을 수 있게 된 뒤에 반환해야 한다.
#[async_trait]
pub trait EventChannel: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>>;
}

/// 하나의 연결 위에서의 구독
#[async_trait]
pub trait EventSubscription: Send {
    /// 다음 이벤트. Ok(None) 은 정상 종료, Err 는 연결 끊김.
    async fn recv(&mut self) -> Result<Option<SyncEvent>>;
}

/// 페이로드 역직렬화. 실패하면 로그를 남기고 None.
pub(crate) fn decode_event(payload: &[u8]) -> Option<SyncEvent> {
    match serde_json::from_slice::<SyncEvent>(payload) {
        Ok(event) => {
            debug!("{:<12} --> deserialize 성공: {:?}", "Channel", event);
            Some(event)
        }
        Err(e) => {
            error!("{:<12} --> deserialize 오류: {:?}", "Channel", e);
            None
        }
    }
}

// endregion: --- Channel Traits

// region:    --- Kafka Channel
pub struct KafkaEventChannel {
    brokers: String,
    topic: String,
    group_id: String,
}

impl KafkaEventChannel {
    /// 모든 클라이언트가 모든 이벤트를 받아야 하므로 프로세스마다 컨슈머 그룹을 따로 쓴다
    pub fn new(brokers: &str, topic: &str, group_prefix: &str) -> Self {
        Self {
            brokers: brokers.to_string(),
            topic: topic.to_string(),
            group_id: format!("{}-{}", group_prefix, std::process::id()),
        }
    }
}

#[async_trait]
impl EventChannel for KafkaEventChannel {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>> {
        info!(
            "{:<12} --> Kafka 구독 시작: topic={}, group={}",
            "Channel", self.topic, self.group_id
        );
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &self.brokers)
            .set("group.id", &self.group_id)
            .set("enable.auto.commit", "true")
            // 연결 직후 전체 재동기화를 하므로 이전 메시지는 읽지 않는다
            .set("auto.offset.reset", "latest")
            .set("session.timeout.ms", "6000")
            .set("fetch.max.bytes", "5242880")
            .create()
            .map_err(|e| Error::Channel(format!("Kafka 컨슈머 생성 실패: {}", e)))?;

        consumer
            .subscribe(&[self.topic.as_str()])
            .map_err(|e| Error::Channel(format!("Kafka 구독 실패: {}", e)))?;

        // subscribe 는 파티션 할당 전에 반환되므로 할당될 때까지 기다려야
        // 재동기화 이후의 이벤트를 latest 오프셋에서 놓치지 않는다
        let pending = await_assignment(&consumer, ASSIGNMENT_WAIT).await?;

        Ok(Box::new(KafkaSubscription { consumer, pending }))
    }
}

const ASSIGNMENT_WAIT: Duration = Duration::from_secs(10);
const ASSIGNMENT_POLL: Duration = Duration::from_millis(100);

/// 파티션 할당 상태를 확인할 수 있는 메시지 소스
#[async_trait]
trait PartitionSource: Send + Sync {
    fn is_assigned(&self) -> bool;
    /// 다음 메시지의 페이로드. 페이로드가 없는 메시지는 None.
    async fn next_payload(&self) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
impl PartitionSource for StreamConsumer {
    fn is_assigned(&self) -> bool {
        self.assignment()
            .map(|partitions| partitions.count() > 0)
            .unwrap_or(false)
    }

    async fn next_payload(&self) -> Result<Option<Vec<u8>>> {
        let message = self
            .recv()
            .await
            .map_err(|e| Error::Channel(format!("메시지 수신 오류: {}", e)))?;
        Ok(message.payload().map(|payload| payload.to_vec()))
    }
}

/// 파티션이 할당될 때까지 메시지를 읽으며 기다린다.
/// 기다리는 동안 받은 이벤트는 순서대로 돌려준다.
async fn await_assignment<S>(source: &S, limit: Duration) -> Result<VecDeque<SyncEvent>>
where
    S: PartitionSource + ?Sized,
{
    let mut pending = VecDeque::new();
    let deadline = Instant::now() + limit;

    while !source.is_assigned() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            warn!(
                "{:<12} --> 파티션 할당 대기 시간 초과 ({:?}), 할당 없이 진행합니다.",
                "Channel", limit
            );
            break;
        }

        let poll = remaining.min(ASSIGNMENT_POLL);
        if let Ok(payload) = tokio::time::timeout(poll, source.next_payload()).await {
            if let Some(event) = payload?.as_deref().and_then(decode_event) {
                pending.push_back(event);
            }
        }
    }

    debug!(
        "{:<12} --> 파티션 할당 완료, 대기 중 받은 이벤트 {}건",
        "Channel",
        pending.len()
    );
    Ok(pending)
}

struct KafkaSubscription {
    consumer: StreamConsumer,
    pending: VecDeque<SyncEvent>,
}

#[async_trait]
impl EventSubscription for KafkaSubscription {
    async fn recv(&mut self) -> Result<Option<SyncEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }

        loop {
            let message = self
                .consumer
                .recv()
                .await
                .map_err(|e| Error::Channel(format!("메시지 수신 오류: {}", e)))?;

            debug!(
                "{:<12} --> 메시지 수신: topic={}, partition={}, offset={}",
                "Channel",
                message.topic(),
                message.partition(),
                message.offset()
            );

            let Some(payload) = message.payload() else {
                warn!("{:<12} --> 빈 페이로드 수신", "Channel");
                continue;
            };

            if let Some(event) = decode_event(payload) {
                return Ok(Some(event));
            }
        }
    }
}

// endregion: --- Kafka Channel


// endregion: --- Tests
