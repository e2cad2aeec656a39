//! 시뮬레이션 명령.
//!
//! 불안정한 모의 상류를 상대로 대시보드 조회 흐름을 여러 라운드 반복한 뒤,
//! 캐시된 레코드를 차트용 시계열로 집계합니다.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use propdash_analytics::{
    fill_missing_periods, get_count_by_time_range, get_trend, group_by_field_in_time_range,
    sum_by_time_range, AggregateOptions, PeriodCount, PeriodGroups, PeriodValue, TimeRange, Trend,
};
use propdash_core::{AppConfig, DEFAULT_TREND_THRESHOLD};
use propdash_data::{CachedFetcher, FetchSource};
use propdash_telemetry::{FreshnessMetricsSource, HealthStatus, MetricsSource};
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MonitorError, Result};
use crate::report::RunSummary;
use crate::upstream::{MaintenanceRequest, SimulatedUpstream};

/// 일별 차트에 표시할 일수.
const DAILY_WINDOW_DAYS: i64 = 14;

/// 시뮬레이션 옵션.
#[derive(Debug, Clone)]
pub struct SimulateOptions {
    /// 반복 라운드 수
    pub rounds: u32,
    /// 조회할 건물 목록
    pub properties: Vec<String>,
    /// 상류 실패 확률
    pub failure_rate: f64,
    /// 라운드마다 같은 키에 동시에 보내는 요청 수
    pub burst: usize,
    /// 조회 TTL
    pub ttl: Duration,
    /// 라운드 간격
    pub round_interval: Duration,
    /// 이 라운드 주기마다 첫 건물 캐시를 무효화 (0이면 안 함)
    pub invalidate_every: u32,
    /// 난수 시드
    pub seed: Option<u64>,
}

impl Default for SimulateOptions {
    fn default() -> Self {
        Self {
            rounds: 10,
            properties: vec![
                "maple-court".to_string(),
                "harbor-view".to_string(),
                "cedar-lofts".to_string(),
            ],
            failure_rate: 0.2,
            burst: 3,
            ttl: Duration::from_secs(2),
            round_interval: Duration::from_secs(1),
            invalidate_every: 4,
            seed: None,
        }
    }
}

/// 응답 출처별 집계.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceTally {
    pub cache: u64,
    pub upstream: u64,
    pub stale: u64,
    pub failed: u64,
}

/// 시뮬레이션 결과.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub summary: RunSummary,
    pub sources: SourceTally,
    /// 최근 일별 요청 수 (빈 날 포함, 오름차순)
    pub daily_counts: Vec<PeriodCount>,
    /// 주별 범주 분포
    pub weekly_categories: Vec<PeriodGroups>,
    /// 주별 비용 합계
    pub weekly_cost: Vec<PeriodValue>,
    /// 최근 두 주 비용 추세
    pub cost_trend: Option<Trend>,
    pub health: HealthStatus,
}

fn cache_key(property: &str) -> String {
    format!("maintenance:{property}")
}

/// 시뮬레이션을 실행합니다.
pub async fn run_simulation(config: &AppConfig, options: &SimulateOptions) -> Result<SimulationReport> {
    if options.properties.is_empty() {
        return Err(MonitorError::InvalidArgument("properties가 비어 있습니다".to_string()));
    }
    if options.burst == 0 {
        return Err(MonitorError::InvalidArgument("burst는 1 이상이어야 합니다".to_string()));
    }

    let fetcher: Arc<CachedFetcher<Vec<MaintenanceRequest>>> = Arc::new(CachedFetcher::from_config(config));
    let upstream = SimulatedUpstream::new(options.failure_rate, options.seed);
    let telemetry = FreshnessMetricsSource::new(fetcher.clone(), config.telemetry.subscription_grace());
    let mut tally = SourceTally::default();

    info!(
        rounds = options.rounds,
        properties = options.properties.len(),
        failure_rate = options.failure_rate,
        "=== 시뮬레이션 시작 ==="
    );

    for round in 1..=options.rounds {
        let keys: Vec<(String, &str)> = options
            .properties
            .iter()
            .flat_map(|p| std::iter::repeat((cache_key(p), p.as_str())).take(options.burst))
            .collect();

        let requests = keys.iter().map(|(key, property)| {
            let upstream = &upstream;
            fetcher.fetch(key, options.ttl, move || upstream.maintenance_requests(property))
        });

        for outcome in join_all(requests).await {
            match outcome {
                Ok(fetched) => match fetched.source {
                    FetchSource::Cache => tally.cache += 1,
                    FetchSource::Upstream => tally.upstream += 1,
                    FetchSource::Stale => tally.stale += 1,
                },
                Err(e) => {
                    tally.failed += 1;
                    debug!(round = round, error = %e, "조회 실패");
                }
            }
        }

        if options.invalidate_every > 0 && round % options.invalidate_every == 0 {
            let removed = fetcher.invalidate(&cache_key(&options.properties[0]));
            debug!(round = round, removed = removed, "정비 요청 변경으로 캐시 무효화");
        }

        if round < options.rounds {
            tokio::time::sleep(options.round_interval).await;
        }
    }

    let summary = RunSummary::capture(&*fetcher);
    let health = telemetry.sample().await?.health();

    if summary.high_error_rate {
        warn!(error_rate = summary.errors.error_rate, "에러율이 기준치를 넘었습니다");
    }

    // 마지막으로 받은 데이터 (만료 여부 무관)
    let records: Vec<MaintenanceRequest> = options
        .properties
        .iter()
        .filter_map(|p| fetcher.cache().get_stale(&cache_key(p)))
        .flatten()
        .collect();

    let now = Utc::now();
    let daily = get_count_by_time_range(&records, TimeRange::Day, &AggregateOptions::default());
    let daily_counts = fill_missing_periods(
        &daily,
        TimeRange::Day,
        now - ChronoDuration::days(DAILY_WINDOW_DAYS - 1),
        now,
        Tz::UTC,
    );

    let weekly = AggregateOptions::ascending();
    let weekly_categories =
        group_by_field_in_time_range(&records, TimeRange::Week, &weekly, |r| r.category.clone());
    let weekly_cost = sum_by_time_range(&records, TimeRange::Week, &weekly, |r| r.cost);

    let cost_trend = match weekly_cost.as_slice() {
        [.., previous, latest] => Some(get_trend(
            latest.value.to_f64().unwrap_or(0.0),
            previous.value.to_f64().unwrap_or(0.0),
            DEFAULT_TREND_THRESHOLD,
        )),
        _ => None,
    };

    info!(records = records.len(), health = %health, "=== 시뮬레이션 완료 ===");

    Ok(SimulationReport {
        summary,
        sources: tally,
        daily_counts,
        weekly_categories,
        weekly_cost,
        cost_trend,
        health,
    })
}
