//! 실행 요약.

use propdash_data::{CacheStats, CachedFetcher, ErrorLogStats, FetchStats};
use serde::{Deserialize, Serialize};

/// fetcher/캐시/에러 로그 상태를 한데 모은 요약.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub fetch: FetchStats,
    pub cache: CacheStats,
    pub errors: ErrorLogStats,
    /// 에러율 경고 여부
    pub high_error_rate: bool,
}

impl RunSummary {
    /// fetcher 현재 상태로 요약 생성.
    pub fn capture<V>(fetcher: &CachedFetcher<V>) -> Self
    where
        V: Clone + Send + 'static,
    {
        Self {
            fetch: fetcher.fetch_stats(),
            cache: fetcher.cache().get_stats(),
            errors: fetcher.errors().stats(),
            high_error_rate: fetcher.errors().has_high_error_rate(),
        }
    }

    /// 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            upstream_calls = self.fetch.upstream_calls,
            coalesced = self.fetch.coalesced,
            stale_served = self.fetch.stale_served,
            avg_latency = format!("{:.1}ms", self.fetch.avg_latency_ms),
            cache_size = self.cache.size,
            hit_rate = format!("{:.1}%", self.cache.hit_rate * 100.0),
            errors = self.errors.total,
            error_rate = format!("{:.1}%", self.errors.error_rate * 100.0),
            high_error_rate = self.high_error_rate,
            "실행 요약"
        );
    }
}
