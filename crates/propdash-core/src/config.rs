//! 설정 관리.
//!
//! 캐시, 에러 로그, 텔레메트리, 로깅 설정을 정의합니다.
//! 모든 필드에 기본값이 있으므로 설정 파일은 바꾸고 싶은 값만 담으면 됩니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{DashError, DashResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 캐시 설정
    pub cache: CacheConfig,
    /// 에러 로그 설정
    pub error_log: ErrorLogConfig,
    /// 텔레메트리 설정
    pub telemetry: TelemetryConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
}

/// 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// 최대 항목 수 (초과 시 가장 먼저 삽입된 항목 제거)
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,
    /// 기본 TTL (밀리초)
    #[serde(default = "default_cache_ttl_ms")]
    pub default_ttl_ms: u64,
}

fn default_cache_max_size() -> usize {
    500
}
fn default_cache_ttl_ms() -> u64 {
    120_000 // 2분
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: default_cache_max_size(),
            default_ttl_ms: default_cache_ttl_ms(),
        }
    }
}

impl CacheConfig {
    /// 기본 TTL을 Duration으로 반환
    pub fn default_ttl(&self) -> Duration {
        Duration::from_millis(self.default_ttl_ms)
    }
}

/// 에러 로그 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ErrorLogConfig {
    /// 보관할 최대 에러 수
    #[serde(default = "default_max_errors")]
    pub max_errors: usize,
    /// 에러율 계산에 쓰는 최근 작업 윈도우 크기
    #[serde(default = "default_rate_window")]
    pub rate_window: usize,
    /// 높은 에러율 판정 기준 (0.0 ~ 1.0)
    #[serde(default = "default_high_error_rate_threshold")]
    pub high_error_rate_threshold: f64,
}

fn default_max_errors() -> usize {
    100
}
fn default_rate_window() -> usize {
    100
}
fn default_high_error_rate_threshold() -> f64 {
    0.10
}

impl Default for ErrorLogConfig {
    fn default() -> Self {
        Self {
            max_errors: default_max_errors(),
            rate_window: default_rate_window(),
            high_error_rate_threshold: default_high_error_rate_threshold(),
        }
    }
}

/// 텔레메트리 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    /// 샘플링 주기 (밀리초)
    #[serde(default = "default_polling_interval_ms")]
    pub polling_interval_ms: u64,
    /// 보관할 히스토리 샘플 수
    #[serde(default = "default_history_size")]
    pub history_size: usize,
    /// 구독 에러 이후 구독 상태를 비정상으로 보는 시간 (밀리초)
    #[serde(default = "default_subscription_grace_ms")]
    pub subscription_grace_ms: u64,
}

fn default_polling_interval_ms() -> u64 {
    5_000
}
fn default_history_size() -> usize {
    30
}
fn default_subscription_grace_ms() -> u64 {
    60_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            polling_interval_ms: default_polling_interval_ms(),
            history_size: default_history_size(),
            subscription_grace_ms: default_subscription_grace_ms(),
        }
    }
}

impl TelemetryConfig {
    /// 샘플링 주기를 Duration으로 반환
    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.polling_interval_ms)
    }

    /// 구독 유예 시간을 Duration으로 반환
    pub fn subscription_grace(&self) -> Duration {
        Duration::from_millis(self.subscription_grace_ms)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 환경 변수는 `PROPDASH__CACHE__MAX_SIZE` 형식으로 파일 값을 덮어씁니다.
    pub fn load<P: AsRef<Path>>(path: P) -> DashResult<Self> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::env_source());

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 경로가 주어지면 파일에서, 아니면 기본값과 환경 변수만으로 로드합니다.
    pub fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> DashResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let config: Self = config::Config::builder()
                    .add_source(Self::env_source())
                    .build()?
                    .try_deserialize()?;
                config.validate()?;
                Ok(config)
            }
        }
    }

    fn env_source() -> config::Environment {
        config::Environment::with_prefix("PROPDASH")
            .separator("__")
            .try_parsing(true)
    }

    /// 0 용량/주기처럼 동작할 수 없는 값을 거부합니다.
    pub fn validate(&self) -> DashResult<()> {
        if self.cache.max_size == 0 {
            return Err(DashError::Config("cache.max_size는 1 이상이어야 합니다".to_string()));
        }
        if self.error_log.max_errors == 0 {
            return Err(DashError::Config(
                "error_log.max_errors는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.error_log.rate_window == 0 {
            return Err(DashError::Config(
                "error_log.rate_window는 1 이상이어야 합니다".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.error_log.high_error_rate_threshold) {
            return Err(DashError::Config(format!(
                "error_log.high_error_rate_threshold 범위 오류: {}",
                self.error_log.high_error_rate_threshold
            )));
        }
        if self.telemetry.polling_interval_ms == 0 {
            return Err(DashError::Config(
                "telemetry.polling_interval_ms는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.telemetry.history_size == 0 {
            return Err(DashError::Config(
                "telemetry.history_size는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }
}
