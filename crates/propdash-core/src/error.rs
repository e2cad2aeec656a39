//! 신선도 레이어 공통 에러 타입.
//!
//! 데이터 접근 실패는 각 크레이트의 에러 타입이 담당하고,
//! 이 모듈은 설정/입력/내부 오류만 다룹니다.

use thiserror::Error;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum DashError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 로깅 초기화 에러
    #[error("로깅 초기화 에러: {0}")]
    Logging(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// 사용자 설정을 고치면 해결되는 에러인지 확인합니다.
    pub fn is_user_fixable(&self) -> bool {
        matches!(self, DashError::Config(_) | DashError::InvalidInput(_))
    }
}

impl From<config::ConfigError> for DashError {
    fn from(err: config::ConfigError) -> Self {
        DashError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Serialization(err.to_string())
    }
}
