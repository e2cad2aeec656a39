//! # PropDash Core
//!
//! 대시보드 데이터 신선도(freshness) 레이어의 공통 타입을 제공합니다.
//!
//! 이 크레이트는 다른 모든 크레이트가 공유하는 기본 요소를 담고 있습니다:
//! - 에러 타입
//! - 설정 관리 (캐시, 에러 로그, 텔레메트리, 로깅)
//! - 로깅 인프라
//! - 시간 구간(`TimeRange`) 및 기간 키 계산
//! - 변동률/추세 계산 헬퍼

pub mod config;
pub mod error;
pub mod logging;
pub mod stats;
pub mod types;

pub use config::*;
pub use error::*;
pub use logging::*;
pub use stats::*;
pub use types::*;
