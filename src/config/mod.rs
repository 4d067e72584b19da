// region:    --- Imports
use std::time::Duration;

// endregion: --- Imports

// region:    --- Config
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@gmail.com";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_KAFKA_TOPIC: &str = "auction-events";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("환경 변수 {key} 값이 올바르지 않습니다: {value}")]
    Invalid { key: &'static str, value: String },
}

/// 서비스 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 없으면 메모리 저장소로 동작
    pub database_url: Option<String>,
    pub database_reset: bool,
    pub database_max_connections: u32,
    /// 없으면 로컬 변경 피드만 사용
    pub kafka_brokers: Option<String>,
    pub kafka_topic: String,
    pub bind_addr: String,
    pub admin_email: String,
    pub admin_password: String,
    pub bid_echo_timeout: Duration,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            database_reset: false,
            database_max_connections: 5,
            kafka_brokers: None,
            kafka_topic: DEFAULT_KAFKA_TOPIC.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            admin_email: DEFAULT_ADMIN_EMAIL.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            bid_echo_timeout: Duration::from_millis(5000),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

impl Config {
    /// 환경 변수로부터 설정 생성
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 임의의 조회 함수로부터 설정 생성
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url: non_empty("DATABASE_URL"),
            database_reset: parse_bool("DATABASE_RESET", non_empty("DATABASE_RESET"))?
                .unwrap_or(defaults.database_reset),
            database_max_connections: parse_num(
                "DATABASE_MAX_CONNECTIONS",
                non_empty("DATABASE_MAX_CONNECTIONS"),
            )?
            .unwrap_or(defaults.database_max_connections),
            kafka_brokers: non_empty("KAFKA_BROKERS"),
            kafka_topic: non_empty("KAFKA_TOPIC").unwrap_or(defaults.kafka_topic),
            bind_addr: non_empty("BIND_ADDR").unwrap_or(defaults.bind_addr),
            admin_email: non_empty("ADMIN_EMAIL").unwrap_or(defaults.admin_email),
            admin_password: non_empty("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            bid_echo_timeout: parse_num::<u64>("BID_ECHO_TIMEOUT_MS", non_empty("BID_ECHO_TIMEOUT_MS"))?
                .map(Duration::from_millis)
                .unwrap_or(defaults.bid_echo_timeout),
            max_body_bytes: parse_num("MAX_BODY_BYTES", non_empty("MAX_BODY_BYTES"))?
                .unwrap_or(defaults.max_body_bytes),
        })
    }
}

fn parse_num<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
) -> Result<Option<T>, ConfigError> {
    match value {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: v }),
    }
}

fn parse_bool(key: &'static str, value: Option<String>) -> Result<Option<bool>, ConfigError> {
    match value.as_deref().map(str::trim) {
        None => Ok(None),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") => Ok(Some(true)),
        Some("0") | Some("false") | Some("FALSE") | Some("no") => Ok(Some(false)),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
        }),
    }
}
// endregion: --- Config

// endregion: --- Tests
