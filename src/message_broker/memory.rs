use super::{EventChannel, EventSubscription};
use crate::auction::events::SyncEvent;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

enum Signal {
    Event(SyncEvent),
    Disconnect,
}

/// 프로세스 내부 이벤트 채널. 연결이 끊겨도 같은 큐를 이어서 읽는다.
pub struct MemoryEventChannel {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Signal>>>,
    connections: AtomicUsize,
}

#[derive(Clone)]
pub struct MemoryEventSender {
    sender: mpsc::UnboundedSender<Signal>,
}

impl MemoryEventChannel {
    pub fn new() -> (Self, MemoryEventSender) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                receiver: Arc::new(Mutex::new(receiver)),
                connections: AtomicUsize::new(0),
            },
            MemoryEventSender { sender },
        )
    }

    /// 지금까지 연결한 횟수
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

impl MemoryEventSender {
    pub fn send(&self, event: SyncEvent) -> bool {
        self.sender.send(Signal::Event(event)).is_ok()
    }

    /// 현재 구독에 연결 끊김을 전달
    pub fn disconnect(&self) -> bool {
        self.sender.send(Signal::Disconnect).is_ok()
    }
}

#[async_trait]
impl EventChannel for MemoryEventChannel {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySubscription {
            receiver: Arc::clone(&self.receiver),
        }))
    }
}

struct MemorySubscription {
    receiver: Arc<Mutex<mpsc::UnboundedReceiver<Signal>>>,
}

#[async_trait]
impl EventSubscription for MemorySubscription {
    async fn recv(&mut self) -> Result<Option<SyncEvent>> {
        let mut receiver = self.receiver.lock().await;
        match receiver.recv().await {
            Some(Signal::Event(event)) => Ok(Some(event)),
            Some(Signal::Disconnect) => Err(Error::Channel("연결이 끊어졌습니다.".to_string())),
            None => Ok(None),
        }
    }
}
