//! 텔레메트리 샘플과 헬스 판정.

use chrono::{DateTime, Utc};
use propdash_core::stats::{get_trend, Trend};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 스파크라인 추세 판정 임계값 (%).
pub const TELEMETRY_TREND_THRESHOLD: f64 = 10.0;

/// 한 번의 샘플링 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMetrics {
    /// 상류 조회 지연 (ms)
    pub fetch_latency_ms: f64,
    /// 캐시 적중률 (%)
    pub cache_hit_rate: f64,
    /// 에러율 (%)
    pub error_rate: f64,
    /// 실시간 구독 정상 여부
    pub subscription_health: bool,
    /// 직전 샘플 이후 데이터 갱신 수
    pub data_updates: u64,
    /// 샘플 시각
    pub timestamp: DateTime<Utc>,
}

impl TelemetryMetrics {
    /// 샘플의 헬스 상태.
    pub fn health(&self) -> HealthStatus {
        health_score(self)
    }
}

/// 헬스 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Warning => write!(f, "warning"),
            HealthStatus::Critical => write!(f, "critical"),
        }
    }
}

/// 최신 샘플 하나로 헬스를 판정합니다.
///
/// | 상태 | 조건 (하나라도) |
/// |------|----------------|
/// | Critical | 구독 끊김, 에러율 > 3, 지연 > 500, 적중률 < 70 |
/// | Warning | 에러율 > 1, 지연 > 300, 적중률 < 85 |
/// | Healthy | 그 외 |
pub fn health_score(sample: &TelemetryMetrics) -> HealthStatus {
    if !sample.subscription_health
        || sample.error_rate > 3.0
        || sample.fetch_latency_ms > 500.0
        || sample.cache_hit_rate < 70.0
    {
        HealthStatus::Critical
    } else if sample.error_rate > 1.0
        || sample.fetch_latency_ms > 300.0
        || sample.cache_hit_rate < 85.0
    {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    }
}

/// 지표별 추세 (최신 vs 직전 샘플).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTrends {
    pub fetch_latency: Trend,
    pub cache_hit_rate: Trend,
    pub error_rate: Trend,
    pub data_updates: Trend,
}

impl MetricTrends {
    /// 두 샘플 사이의 추세.
    pub fn between(latest: &TelemetryMetrics, previous: &TelemetryMetrics) -> Self {
        let trend = |current: f64, prev: f64| get_trend(current, prev, TELEMETRY_TREND_THRESHOLD);

        Self {
            fetch_latency: trend(latest.fetch_latency_ms, previous.fetch_latency_ms),
            cache_hit_rate: trend(latest.cache_hit_rate, previous.cache_hit_rate),
            error_rate: trend(latest.error_rate, previous.error_rate),
            data_updates: trend(latest.data_updates as f64, previous.data_updates as f64),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample(latency: f64, hit_rate: f64, error_rate: f64, healthy: bool) -> TelemetryMetrics {
    TelemetryMetrics {
        fetch_latency_ms: latency,
        cache_hit_rate: hit_rate,
        error_rate,
        subscription_health: healthy,
        data_updates: 10,
        timestamp: Utc::now(),
    }
}
