//! 실측 텔레메트리 공급원.
//!
//! `CachedFetcher`의 통계와 에러 로그 상태를 그대로 샘플로 옮깁니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use propdash_data::{CachedFetcher, KvErrorKind};

use super::MetricsSource;
use crate::error::Result;
use crate::metrics::TelemetryMetrics;

/// fetcher 기반 공급원.
pub struct FreshnessMetricsSource<V> {
    fetcher: Arc<CachedFetcher<V>>,
    /// 구독 에러 이후 비정상으로 보는 시간
    subscription_grace: Duration,
    /// 직전 샘플 시점의 캐시 쓰기 수
    last_writes: AtomicU64,
}

impl<V> FreshnessMetricsSource<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(fetcher: Arc<CachedFetcher<V>>, subscription_grace: Duration) -> Self {
        let last_writes = fetcher.cache().get_stats().writes;
        Self {
            fetcher,
            subscription_grace,
            last_writes: AtomicU64::new(last_writes),
        }
    }

    fn subscription_healthy(&self) -> bool {
        let Some(last) = self.fetcher.errors().last_error_of_kind(KvErrorKind::Subscription) else {
            return true;
        };

        let elapsed = Utc::now() - last.timestamp;
        elapsed
            .to_std()
            .map(|elapsed| elapsed > self.subscription_grace)
            .unwrap_or(false)
    }
}

#[async_trait]
impl<V> MetricsSource for FreshnessMetricsSource<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn sample(&self) -> Result<TelemetryMetrics> {
        let fetch_stats = self.fetcher.fetch_stats();
        let cache_stats = self.fetcher.cache().get_stats();
        let error_rate = self.fetcher.errors().error_rate();

        let previous = self.last_writes.swap(cache_stats.writes, Ordering::Relaxed);

        Ok(TelemetryMetrics {
            fetch_latency_ms: fetch_stats.avg_latency_ms,
            cache_hit_rate: cache_stats.hit_rate * 100.0,
            error_rate: error_rate * 100.0,
            subscription_health: self.subscription_healthy(),
            data_updates: cache_stats.writes.saturating_sub(previous),
            timestamp: Utc::now(),
        })
    }

    fn name(&self) -> &str {
        "freshness"
    }
}
