// region:    --- Imports
use crate::bidding::validator::BidRules;
use crate::clock::ExtensionRule;
use crate::error::{Error, Result};
use std::str::FromStr;
use std::time::Duration;

// endregion: --- Imports

// region:    --- Config
const MAX_EXTENSION_SECS: u32 = 86_400;
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_SWEEP_INTERVAL_MS: u64 = 3_600_000;
const MAX_BACKOFF_SECS: u64 = 3_600;

/// 이벤트 채널 종류
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelConfig {
    WebSocket {
        url: String,
    },
    Kafka {
        brokers: String,
        topic: String,
        group_prefix: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    pub api_url: String,
    pub api_token: Option<String>,
    pub channel: ChannelConfig,
    pub request_timeout: Duration,
    pub bid_rules: BidRules,
    pub extension: ExtensionRule,
    pub sweep_interval: Duration,
    pub reconnect_max_backoff: Duration,
}

impl Config {
    /// 환경 변수에서 설정 읽기
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 읽기
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let channel = match get("EVENT_CHANNEL", "websocket").to_ascii_lowercase().as_str() {
            "websocket" | "ws" => ChannelConfig::WebSocket {
                url: get("EVENTS_WS_URL", "ws://localhost:5000/events"),
            },
            "kafka" => ChannelConfig::Kafka {
                brokers: get("KAFKA_BROKERS", "localhost:9092"),
                topic: get("KAFKA_TOPIC", "auction-events"),
                group_prefix: get("KAFKA_GROUP_PREFIX", "auction-sync"),
            },
            other => {
                return Err(Error::Config(format!(
                    "알 수 없는 EVENT_CHANNEL: {}",
                    other
                )))
            }
        };

        let extension = ExtensionRule {
            enabled: parse(&lookup, "EXTENSION_RULE_ENABLED", true)?,
            window: chrono::Duration::seconds(i64::from(parse_in_range(
                &lookup,
                "EXTENSION_WINDOW_SECS",
                60u32,
                1,
                MAX_EXTENSION_SECS,
            )?)),
            threshold: chrono::Duration::seconds(i64::from(parse_in_range(
                &lookup,
                "EXTENSION_THRESHOLD_SECS",
                180u32,
                1,
                MAX_EXTENSION_SECS,
            )?)),
        };

        let min_increment: f64 = parse(&lookup, "MIN_BID_INCREMENT", 0.0)?;
        if !min_increment.is_finite() || min_increment < 0.0 {
            return Err(Error::Config(format!(
                "MIN_BID_INCREMENT 는 0 이상이어야 합니다: {}",
                min_increment
            )));
        }

        Ok(Self {
            listen_addr: get("LISTEN_ADDR", "0.0.0.0:3000"),
            api_url: get("AUCTION_API_URL", "http://localhost:5000/api"),
            api_token: lookup("AUCTION_API_TOKEN").filter(|t| !t.is_empty()),
            channel,
            request_timeout: Duration::from_secs(parse_in_range(
                &lookup,
                "BID_TIMEOUT_SECS",
                12,
                1,
                MAX_TIMEOUT_SECS,
            )?),
            bid_rules: BidRules { min_increment },
            extension,
            sweep_interval: Duration::from_millis(parse_in_range(
                &lookup,
                "SWEEP_INTERVAL_MS",
                1000,
                1,
                MAX_SWEEP_INTERVAL_MS,
            )?),
            reconnect_max_backoff: Duration::from_secs(parse_in_range(
                &lookup,
                "RECONNECT_MAX_BACKOFF_SECS",
                30,
                1,
                MAX_BACKOFF_SECS,
            )?),
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{} 값이 잘못되었습니다 ({}): {}", key, raw, e))),
    }
}

/// 0 이나 범위를 벗어난 값은 설정 오류
fn parse_in_range<T, F>(lookup: &F, key: &str, default: T, min: T, max: T) -> Result<T>
where
    T: FromStr + PartialOrd + std::fmt::Display,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let value = parse(lookup, key, default)?;
    if value < min || value > max {
        return Err(Error::Config(format!(
            "{} 값은 {} 이상 {} 이하여야 합니다: {}",
            key, min, max, value
        )));
    }
    Ok(value)
}

// endregion: --- Config
