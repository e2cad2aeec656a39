//! 모의 상류(persistence service).
//!
//! 정비 요청 레코드를 만들어 돌려주며, 지연과 실패를 무작위로 섞습니다.
//! 일부 레코드는 일부러 날짜가 깨져 있습니다.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use propdash_analytics::{parse_timestamp, TimeSeriesItem};
use propdash_data::DataError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

const CATEGORIES: [&str; 5] = ["plumbing", "electrical", "hvac", "appliance", "general"];

/// 정비 요청 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub id: u64,
    pub property: String,
    pub category: Option<String>,
    /// 원본 그대로의 생성 시각 문자열
    pub created_at: String,
    pub cost: Option<Decimal>,
}

impl TimeSeriesItem for MaintenanceRequest {
    fn timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }
}

/// 모의 상류.
pub struct SimulatedUpstream {
    /// 호출 실패 확률
    failure_rate: f64,
    /// 응답 지연 범위 (ms)
    latency_ms: (u64, u64),
    /// 레코드 생성 시각 분포 (오늘부터 과거 일수)
    history_days: i64,
    rng: Mutex<StdRng>,
    next_id: Mutex<u64>,
}

impl SimulatedUpstream {
    pub fn new(failure_rate: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            latency_ms: (20, 180),
            history_days: 14,
            rng: Mutex::new(rng),
            next_id: Mutex::new(1),
        }
    }

    /// 응답 지연 범위 지정.
    pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.latency_ms = (min_ms.min(max_ms), max_ms.max(min_ms));
        self
    }

    /// 한 건물의 정비 요청 목록을 조회합니다.
    pub async fn maintenance_requests(
        &self,
        property: &str,
    ) -> Result<Vec<MaintenanceRequest>, DataError> {
        let (delay, roll) = {
            let mut rng = self.rng();
            (rng.gen_range(self.latency_ms.0..=self.latency_ms.1), rng.gen::<f64>())
        };
        tokio::time::sleep(Duration::from_millis(delay)).await;

        if roll < self.failure_rate {
            debug!(property = property, "모의 상류 실패");
            return Err(DataError::FetchError(format!(
                "persistence service unavailable ({property})"
            )));
        }

        Ok(self.generate(property))
    }

    fn generate(&self, property: &str) -> Vec<MaintenanceRequest> {
        let now = Utc::now();
        let mut rng = self.rng();
        let count = rng.gen_range(3..=12);

        let mut next_id = match self.next_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        (0..count)
            .map(|_| {
                let id = *next_id;
                *next_id += 1;

                let age = ChronoDuration::minutes(rng.gen_range(0..self.history_days * 24 * 60));
                // 5%는 깨진 날짜
                let created_at = if rng.gen_bool(0.05) {
                    "n/a".to_string()
                } else {
                    (now - age).to_rfc3339()
                };

                MaintenanceRequest {
                    id,
                    property: property.to_string(),
                    category: if rng.gen_bool(0.9) {
                        Some(CATEGORIES[rng.gen_range(0..CATEGORIES.len())].to_string())
                    } else {
                        None
                    },
                    created_at,
                    cost: if rng.gen_bool(0.8) {
                        Some(Decimal::new(rng.gen_range(5_000..250_000), 2))
                    } else {
                        None
                    },
                }
            })
            .collect()
    }

    fn rng(&self) -> std::sync::MutexGuard<'_, StdRng> {
        match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("SimulatedUpstream Mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
