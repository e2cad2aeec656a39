//! 텔레메트리 관찰 명령.
//!
//! 샘플러를 시작하고 새 샘플이 나올 때마다 헬스와 추세를 로그로 남깁니다.
//! `live` 공급원은 백그라운드 조회 부하를 함께 돌려 실제 fetcher 상태를 관측합니다.

use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use propdash_core::AppConfig;
use propdash_data::CachedFetcher;
use propdash_telemetry::{
    FreshnessMetricsSource, MetricsSource, SyntheticMetricsSource, TelemetryMetrics, TelemetrySampler,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::upstream::{MaintenanceRequest, SimulatedUpstream};

/// 샘플 공급원 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// 합성 텔레메트리
    Synthetic,
    /// 모의 상류에 대한 실제 fetcher 상태
    Live,
}

/// 관찰 옵션.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub source: SourceKind,
    /// 이 수만큼 샘플을 받으면 종료 (없으면 취소될 때까지)
    pub ticks: Option<u32>,
    /// `live` 부하의 상류 실패 확률
    pub failure_rate: f64,
    pub seed: Option<u64>,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            source: SourceKind::Synthetic,
            ticks: None,
            failure_rate: 0.1,
            seed: None,
        }
    }
}

const LIVE_PROPERTIES: [&str; 4] = ["maple-court", "harbor-view", "cedar-lofts", "birch-terrace"];

/// 관찰을 실행하고 받은 샘플을 반환합니다.
pub async fn run_watch(
    config: &AppConfig,
    options: &WatchOptions,
    shutdown: CancellationToken,
) -> Result<Vec<TelemetryMetrics>> {
    let source: Arc<dyn MetricsSource> = match options.source {
        SourceKind::Synthetic => Arc::new(match options.seed {
            Some(seed) => SyntheticMetricsSource::with_seed(seed),
            None => SyntheticMetricsSource::new(),
        }),
        SourceKind::Live => {
            let fetcher = Arc::new(CachedFetcher::from_config(config));
            spawn_workload(
                fetcher.clone(),
                SimulatedUpstream::new(options.failure_rate, options.seed),
                config.telemetry.polling_interval() / 5,
                shutdown.clone(),
            );
            Arc::new(FreshnessMetricsSource::new(
                fetcher,
                config.telemetry.subscription_grace(),
            ))
        }
    };

    let sampler = TelemetrySampler::from_config(source, &config.telemetry);
    let mut updates = sampler.subscribe();
    sampler.start();

    let mut received = Vec::new();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(sample) = updates.borrow_and_update().clone() else {
                    continue;
                };

                log_sample(&sample, &sampler);
                received.push(sample);

                if options.ticks.is_some_and(|limit| received.len() >= limit as usize) {
                    break;
                }
            }
            _ = shutdown.cancelled() => {
                info!("종료 신호 수신, 관찰 종료 중...");
                break;
            }
        }
    }

    // 남은 부하 task 정리
    shutdown.cancel();
    Ok(received)
}

fn log_sample(sample: &TelemetryMetrics, sampler: &TelemetrySampler) {
    let health = sample.health();
    let trends = sampler.trends();

    info!(
        health = %health,
        latency = format!("{:.0}ms", sample.fetch_latency_ms),
        hit_rate = format!("{:.1}%", sample.cache_hit_rate),
        error_rate = format!("{:.2}%", sample.error_rate),
        subscription = sample.subscription_health,
        updates = sample.data_updates,
        latency_trend = ?trends.map(|t| t.fetch_latency),
        error_trend = ?trends.map(|t| t.error_rate),
        "텔레메트리"
    );
}

/// 대시보드 훅 흉내: 주기적으로 건물별 정비 요청을 조회합니다.
fn spawn_workload(
    fetcher: Arc<CachedFetcher<Vec<MaintenanceRequest>>>,
    upstream: SimulatedUpstream,
    period: Duration,
    shutdown: CancellationToken,
) {
    let period = period.max(Duration::from_millis(100));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut cursor = 0usize;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let property = LIVE_PROPERTIES[cursor % LIVE_PROPERTIES.len()];
                    cursor += 1;

                    let key = format!("maintenance:{property}");
                    match fetcher.fetch_fresh(&key, || upstream.maintenance_requests(property)).await {
                        Ok(fetched) => debug!(cache_key = %key, source = ?fetched.source, "부하 조회"),
                        Err(e) => warn!(cache_key = %key, error = %e, "부하 조회 실패"),
                    }
                }
                _ = shutdown.cancelled() => {
                    debug!("조회 부하 종료");
                    break;
                }
            }
        }
    });
}
