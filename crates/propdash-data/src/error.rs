//! 데이터 모듈 오류 타입.

use thiserror::Error;

use crate::monitoring::KvErrorKind;

/// 데이터 접근 오류.
///
/// 상류(persistence service) 조회 클로저가 반환하는 타입이기도 합니다.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// 상류 조회 실패 (연결 불가, 에러 응답)
    #[error("Fetch error: {0}")]
    FetchError(String),

    /// 레코드를 기대한 형태로 해석할 수 없음
    #[error("Parse error: {0}")]
    ParseError(String),

    /// 레코드가 의미 검증에 실패
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 실시간 업데이트 채널 실패/끊김
    #[error("Subscription error: {0}")]
    SubscriptionError(String),

    /// 레코드를 찾을 수 없음
    #[error("Record not found: {0}")]
    NotFound(String),

    /// 진행 중이던 상류 요청이 취소됨
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl DataError {
    /// 에러 로그에 기록할 분류.
    pub fn kind(&self) -> KvErrorKind {
        match self {
            DataError::FetchError(_) | DataError::NotFound(_) | DataError::Cancelled(_) => {
                KvErrorKind::Fetch
            }
            DataError::ParseError(_) | DataError::SerializationError(_) => KvErrorKind::Parse,
            DataError::ValidationError(_) => KvErrorKind::Validation,
            DataError::SubscriptionError(_) => KvErrorKind::Subscription,
        }
    }

    /// 재시도하면 성공할 가능성이 있는 오류인지 확인합니다.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::FetchError(_) | DataError::SubscriptionError(_) | DataError::Cancelled(_)
        )
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::SerializationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
