//! 텔레메트리 샘플 공급원.
//!
//! - `SyntheticMetricsSource`: 기준값 + 무작위 흔들림 (데모, 테스트)
//! - `FreshnessMetricsSource`: 실제 fetcher/캐시/에러 로그 상태에서 산출

mod freshness;
mod synthetic;

use async_trait::async_trait;

use crate::error::Result;
use crate::metrics::TelemetryMetrics;

pub use freshness::FreshnessMetricsSource;
pub use synthetic::{SyntheticMetricsSource, SyntheticProfile};

/// 샘플 공급원 trait.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// 샘플 하나를 만듭니다.
    async fn sample(&self) -> Result<TelemetryMetrics>;

    /// 공급원 이름 (로그용).
    fn name(&self) -> &str;
}
