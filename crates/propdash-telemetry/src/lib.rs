//! 데이터 계층 텔레메트리.
//!
//! 이 crate는 다음을 제공합니다:
//! - 텔레메트리 샘플 모델과 헬스 판정
//! - 샘플 공급원 trait (합성/실측)
//! - 고정 크기 히스토리
//! - 주기 샘플러 (일시정지/재개, 최신 샘플 구독)

pub mod error;
pub mod history;
pub mod metrics;
pub mod sampler;
pub mod source;

pub use error::{Result, TelemetryError};
pub use history::MetricsHistory;
pub use metrics::{health_score, HealthStatus, MetricTrends, TelemetryMetrics, TELEMETRY_TREND_THRESHOLD};
pub use sampler::TelemetrySampler;
pub use source::{FreshnessMetricsSource, MetricsSource, SyntheticMetricsSource, SyntheticProfile};
