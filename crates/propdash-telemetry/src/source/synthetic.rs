//! 합성 텔레메트리 공급원.
//!
//! 기준값에 균등 분포 흔들림을 더하고, 일정 확률로 스파이크를 섞습니다.
//! 스파이크 틱에서는 지연과 에러율의 흔들림 폭이 배수로 커집니다.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error};

use super::MetricsSource;
use crate::error::Result;
use crate::metrics::TelemetryMetrics;

const MIN_LATENCY_MS: f64 = 50.0;
const HIT_RATE_RANGE: (f64, f64) = (60.0, 99.0);
const ERROR_RATE_RANGE: (f64, f64) = (0.0, 5.0);

/// 합성 샘플 분포.
#[derive(Debug, Clone)]
pub struct SyntheticProfile {
    /// 기준 지연 (ms)
    pub base_latency_ms: f64,
    /// 지연 흔들림 폭 (±ms)
    pub latency_jitter_ms: f64,
    /// 기준 캐시 적중률 (%)
    pub base_hit_rate: f64,
    /// 적중률 흔들림 폭 (±%)
    pub hit_rate_jitter: f64,
    /// 기준 에러율 (%)
    pub base_error_rate: f64,
    /// 에러율 흔들림 폭 (±%)
    pub error_rate_jitter: f64,
    /// 틱당 스파이크 확률
    pub spike_probability: f64,
    /// 스파이크 배수
    pub spike_multiplier: f64,
    /// 틱당 구독 정상 확률
    pub subscription_healthy_probability: f64,
    /// 틱당 최대 데이터 갱신 수
    pub max_data_updates: u64,
}

impl Default for SyntheticProfile {
    fn default() -> Self {
        Self {
            base_latency_ms: 150.0,
            latency_jitter_ms: 50.0,
            base_hit_rate: 90.0,
            hit_rate_jitter: 5.0,
            base_error_rate: 0.5,
            error_rate_jitter: 0.5,
            spike_probability: 0.1,
            spike_multiplier: 3.0,
            subscription_healthy_probability: 0.98,
            max_data_updates: 20,
        }
    }
}

/// 합성 텔레메트리 공급원.
pub struct SyntheticMetricsSource {
    profile: SyntheticProfile,
    rng: Mutex<StdRng>,
}

impl SyntheticMetricsSource {
    /// 기본 분포, 엔트로피 시드.
    pub fn new() -> Self {
        Self::with_profile(SyntheticProfile::default(), StdRng::from_entropy())
    }

    /// 재현 가능한 시드로 생성 (테스트용).
    pub fn with_seed(seed: u64) -> Self {
        Self::with_profile(SyntheticProfile::default(), StdRng::seed_from_u64(seed))
    }

    pub fn with_profile(profile: SyntheticProfile, rng: StdRng) -> Self {
        Self {
            profile,
            rng: Mutex::new(rng),
        }
    }

    pub fn profile(&self) -> &SyntheticProfile {
        &self.profile
    }

    fn generate(&self, rng: &mut StdRng) -> TelemetryMetrics {
        let p = &self.profile;

        let spike = rng.gen_bool(p.spike_probability.clamp(0.0, 1.0));
        let multiplier = if spike { p.spike_multiplier } else { 1.0 };
        if spike {
            debug!(multiplier = multiplier, "텔레메트리 스파이크");
        }

        let latency = p.base_latency_ms + jitter(rng, p.latency_jitter_ms) * multiplier;
        let hit_rate = p.base_hit_rate + jitter(rng, p.hit_rate_jitter);
        let error_rate = p.base_error_rate + jitter(rng, p.error_rate_jitter) * multiplier;

        TelemetryMetrics {
            fetch_latency_ms: latency.max(MIN_LATENCY_MS),
            cache_hit_rate: hit_rate.clamp(HIT_RATE_RANGE.0, HIT_RATE_RANGE.1),
            error_rate: error_rate.clamp(ERROR_RATE_RANGE.0, ERROR_RATE_RANGE.1),
            subscription_health: rng
                .gen_bool(p.subscription_healthy_probability.clamp(0.0, 1.0)),
            data_updates: rng.gen_range(0..=p.max_data_updates),
            timestamp: Utc::now(),
        }
    }
}

impl Default for SyntheticMetricsSource {
    fn default() -> Self {
        Self::new()
    }
}

/// [-width, width] 균등 분포.
fn jitter(rng: &mut StdRng, width: f64) -> f64 {
    if width <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-width..=width)
}

#[async_trait]
impl MetricsSource for SyntheticMetricsSource {
    async fn sample(&self) -> Result<TelemetryMetrics> {
        let mut rng = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("SyntheticMetricsSource Mutex poisoned, recovering");
                poisoned.into_inner()
            }
        };
        Ok(self.generate(&mut rng))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
