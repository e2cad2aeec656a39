//! 에러 타입 정의.

use propdash_core::DashError;
use propdash_telemetry::TelemetryError;
use thiserror::Error;

/// 모니터 에러 타입
#[derive(Debug, Error)]
pub enum MonitorError {
    /// 설정/로깅 초기화 에러
    #[error(transparent)]
    Core(#[from] DashError),

    /// 텔레메트리 샘플링 에러
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    /// 출력 직렬화 에러
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 잘못된 명령 인자
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<toml::ser::Error> for MonitorError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, MonitorError>;
