//! 캐싱 레이어.
//!
//! - `CacheStore`: TTL은 읽을 때 판정하고, 용량 초과 시 가장 먼저 삽입된 항목을 제거
//!
//! 키는 `"<domain>:<qualifier>"` 규칙을 따릅니다 (예: `dashboard_kpi:main`).
//! prefix 기반 조회/무효화가 이 규칙에 의존합니다.

pub mod store;

pub use store::{CacheEntry, CacheStats, CacheStore};
