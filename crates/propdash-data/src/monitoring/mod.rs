//! 데이터 계층 모니터링.
//!
//! 데이터 조회/해석/검증/구독 실패를 구조화된 형태로 모아 두고,
//! 대시보드 헬스 패널과 텔레메트리가 조회할 수 있게 합니다.

pub mod error_log;

pub use error_log::{ErrorLogStats, ErrorLogger, KvError, KvErrorKind};
