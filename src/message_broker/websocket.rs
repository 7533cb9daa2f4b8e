use super::{decode_event, EventChannel, EventSubscription};
use crate::auction::events::SyncEvent;
use crate::error::{Error, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// 웹소켓 이벤트 채널
pub struct WebSocketEventChannel {
    url: String,
}

impl WebSocketEventChannel {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl EventChannel for WebSocketEventChannel {
    async fn connect(&self) -> Result<Box<dyn EventSubscription>> {
        info!("{:<12} --> 웹소켓 연결: {}", "Channel", self.url);
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| Error::Channel(format!("웹소켓 연결 실패: {}", e)))?;
        Ok(Box::new(WebSocketSubscription { stream }))
    }
}

struct WebSocketSubscription {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventSubscription for WebSocketSubscription {
    async fn recv(&mut self) -> Result<Option<SyncEvent>> {
        loop {
            let message = match self.stream.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(Error::Channel(format!("웹소켓 수신 오류: {}", e))),
                Some(Ok(message)) => message,
            };

            let decoded = match message {
                Message::Text(text) => decode_event(text.as_bytes()),
                Message::Binary(bytes) => decode_event(&bytes),
                Message::Close(frame) => {
                    info!("{:<12} --> 웹소켓 종료: {:?}", "Channel", frame);
                    return Ok(None);
                }
                // ping/pong 은 tungstenite 가 처리
                other => {
                    debug!("{:<12} --> 제어 프레임 무시: {:?}", "Channel", other);
                    None
                }
            };

            if let Some(event) = decoded {
                return Ok(Some(event));
            }
        }
    }
}
