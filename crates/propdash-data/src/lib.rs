//! 대시보드 데이터 신선도 관리.
//!
//! 이 crate는 다음을 제공합니다:
//! - TTL 기반 인메모리 캐시 (삽입 순서 기반 용량 제거)
//! - 데이터 접근 실패를 분류해 보관하는 에러 로그
//! - 캐시 + 에러 로그 + 중복 요청 병합(single-flight)을 묶은 fetcher

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod monitoring;

pub use cache::{CacheEntry, CacheStats, CacheStore};
pub use error::{DataError, Result};
pub use fetcher::{CachedFetcher, FetchSource, FetchStats, Fetched};
pub use monitoring::{ErrorLogStats, ErrorLogger, KvError, KvErrorKind};
