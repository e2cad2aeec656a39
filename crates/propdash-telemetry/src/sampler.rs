//! 주기 텔레메트리 샘플러.
//!
//! 인스턴스마다 반복 타이머 하나를 소유합니다.
//! 일시정지하면 타이머를 취소하고, 재개하면 새 타이머를 만듭니다. 히스토리는 유지됩니다.
//! 샘플러가 drop되면 타이머도 함께 취소됩니다.

use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use propdash_core::TelemetryConfig;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::history::MetricsHistory;
use crate::metrics::{HealthStatus, MetricTrends, TelemetryMetrics};
use crate::source::MetricsSource;

struct SamplerInner {
    source: Arc<dyn MetricsSource>,
    history: RwLock<MetricsHistory>,
    latest_tx: watch::Sender<Option<TelemetryMetrics>>,
}

impl SamplerInner {
    async fn tick(&self) -> Option<TelemetryMetrics> {
        match self.source.sample().await {
            Ok(sample) => {
                self.write_history().push(sample.clone());
                self.latest_tx.send_replace(Some(sample.clone()));
                debug!(
                    source = self.source.name(),
                    latency_ms = sample.fetch_latency_ms,
                    hit_rate = sample.cache_hit_rate,
                    error_rate = sample.error_rate,
                    health = %sample.health(),
                    "텔레메트리 샘플"
                );
                Some(sample)
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "텔레메트리 샘플링 실패, 이번 틱 건너뜀");
                None
            }
        }
    }

    fn read_history(&self) -> RwLockReadGuard<'_, MetricsHistory> {
        match self.history.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("TelemetrySampler RwLock poisoned (read), recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write_history(&self) -> RwLockWriteGuard<'_, MetricsHistory> {
        match self.history.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("TelemetrySampler RwLock poisoned (write), recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// 텔레메트리 샘플러.
///
/// 생성 직후에는 멈춰 있으며 [`start`](Self::start)로 타이머를 시작합니다.
pub struct TelemetrySampler {
    inner: Arc<SamplerInner>,
    interval: Duration,
    timer: Mutex<Option<CancellationToken>>,
}

impl TelemetrySampler {
    /// 새 샘플러 생성.
    pub fn new(source: Arc<dyn MetricsSource>, interval: Duration, history_size: usize) -> Self {
        let (latest_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(SamplerInner {
                source,
                history: RwLock::new(MetricsHistory::new(history_size)),
                latest_tx,
            }),
            interval: interval.max(Duration::from_millis(1)),
            timer: Mutex::new(None),
        }
    }

    /// 설정에서 생성.
    pub fn from_config(source: Arc<dyn MetricsSource>, config: &TelemetryConfig) -> Self {
        Self::new(source, config.polling_interval(), config.history_size)
    }

    /// 샘플링 주기.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 반복 타이머를 시작합니다. 이미 돌고 있으면 false.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn start(&self) -> bool {
        let mut timer = self.timer();
        if timer.is_some() {
            return false;
        }

        let token = CancellationToken::new();
        let inner = self.inner.clone();
        let period = self.interval;
        let shutdown = token.clone();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        inner.tick().await;
                    }
                    _ = shutdown.cancelled() => {
                        debug!(source = inner.source.name(), "텔레메트리 타이머 종료");
                        break;
                    }
                }
            }
        });

        info!(
            source = self.inner.source.name(),
            interval_ms = period.as_millis() as u64,
            "텔레메트리 샘플링 시작"
        );
        *timer = Some(token);
        true
    }

    /// 샘플 하나를 즉시 만들어 히스토리에 추가합니다.
    ///
    /// 공급원이 실패하면 로그만 남기고 `None`을 반환합니다.
    pub async fn tick(&self) -> Option<TelemetryMetrics> {
        self.inner.tick().await
    }

    /// 일시정지/재개를 전환하고 전환 후 일시정지 여부를 반환합니다.
    pub fn toggle_pause(&self) -> bool {
        let running = self.timer().take();
        match running {
            Some(token) => {
                token.cancel();
                info!(source = self.inner.source.name(), "텔레메트리 샘플링 일시정지");
                true
            }
            None => {
                self.start();
                false
            }
        }
    }

    /// 타이머가 멈춰 있는지 확인.
    pub fn is_paused(&self) -> bool {
        self.timer().is_none()
    }

    /// 히스토리를 비웁니다.
    pub fn reset_history(&self) {
        self.inner.write_history().clear();
    }

    /// 가장 최근 샘플.
    pub fn latest(&self) -> Option<TelemetryMetrics> {
        self.inner.read_history().latest().cloned()
    }

    /// 히스토리 (오래된 순).
    pub fn history(&self) -> Vec<TelemetryMetrics> {
        self.inner.read_history().to_vec()
    }

    /// 최근 샘플 기준 헬스.
    pub fn health(&self) -> Option<HealthStatus> {
        self.inner.read_history().latest().map(TelemetryMetrics::health)
    }

    /// 최근 샘플과 직전 샘플 사이의 추세.
    pub fn trends(&self) -> Option<MetricTrends> {
        let history = self.inner.read_history();
        match (history.latest(), history.previous()) {
            (Some(latest), Some(previous)) => Some(MetricTrends::between(latest, previous)),
            _ => None,
        }
    }

    /// 최신 샘플 구독.
    pub fn subscribe(&self) -> watch::Receiver<Option<TelemetryMetrics>> {
        self.inner.latest_tx.subscribe()
    }

    fn timer(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        match self.timer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("TelemetrySampler Mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Drop for TelemetrySampler {
    fn drop(&mut self) {
        if let Some(token) = self.timer().take() {
            token.cancel();
        }
    }
}
