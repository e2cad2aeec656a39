//! 텔레메트리 오류 타입.

use thiserror::Error;

/// 텔레메트리 오류.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// 샘플 공급원 오류
    #[error("Metrics source error: {0}")]
    Source(String),

    /// 샘플을 만들 수 있는 데이터가 없음
    #[error("Metrics unavailable: {0}")]
    Unavailable(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;
