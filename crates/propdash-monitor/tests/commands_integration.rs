//! 모니터 명령 통합 테스트.

use std::time::Duration;

use propdash_core::AppConfig;
use propdash_monitor::commands::{
    run_simulation, run_watch, SimulateOptions, SourceKind, WatchOptions,
};
use propdash_monitor::MonitorError;
use tokio_util::sync::CancellationToken;

fn options(rounds: u32, failure_rate: f64) -> SimulateOptions {
    SimulateOptions {
        rounds,
        properties: vec!["maple-court".to_string(), "harbor-view".to_string()],
        failure_rate,
        burst: 3,
        ttl: Duration::from_secs(2),
        round_interval: Duration::from_secs(1),
        invalidate_every: 0,
        seed: Some(42),
    }
}

#[tokio::test(start_paused = true)]
async fn test_simulation_coalesces_bursts_and_reuses_cache() {
    let config = AppConfig::default();
    let report = run_simulation(&config, &options(2, 0.0)).await.unwrap();

    // 라운드 1: 키당 한 번의 상류 호출, 나머지는 합류
    assert_eq!(report.summary.fetch.upstream_calls, 2);
    assert_eq!(report.summary.fetch.coalesced, 4);
    assert_eq!(report.sources.upstream, 6);
    // 라운드 2: 모두 캐시
    assert_eq!(report.sources.cache, 6);
    assert_eq!(report.sources.stale + report.sources.failed, 0);

    assert_eq!(report.summary.errors.total, 0);
    assert!(!report.summary.high_error_rate);
    assert_eq!(report.summary.cache.size, 2);

    assert_eq!(report.daily_counts.len(), 14);
    let windows: Vec<_> = report.daily_counts.windows(2).collect();
    assert!(windows.iter().all(|w| w[0].period < w[1].period));
}

#[tokio::test(start_paused = true)]
async fn test_simulation_tally_covers_every_request() {
    let config = AppConfig::default();
    let opts = SimulateOptions {
        invalidate_every: 2,
        ..options(6, 0.5)
    };
    let report = run_simulation(&config, &opts).await.unwrap();

    let tally = &report.sources;
    let total = tally.cache + tally.upstream + tally.stale + tally.failed;
    assert_eq!(total, 6 * 2 * 3);

    // 실패한 상류 호출마다 에러 로그 한 건
    let fetch_errors = report.summary.errors.fetch;
    assert_eq!(fetch_errors, report.summary.errors.total);
    assert!(fetch_errors <= report.summary.fetch.upstream_calls);
}

#[tokio::test(start_paused = true)]
async fn test_simulation_with_dead_upstream_reports_failures() {
    let config = AppConfig::default();
    let report = run_simulation(&config, &options(1, 1.0)).await.unwrap();

    assert_eq!(report.sources.failed, 6);
    assert_eq!(report.summary.errors.fetch, 2);
    assert!(report.daily_counts.iter().all(|c| c.count == 0));
    assert!(report.weekly_cost.is_empty());
    assert!(report.cost_trend.is_none());
}

#[tokio::test]
async fn test_simulation_rejects_empty_properties() {
    let config = AppConfig::default();
    let opts = SimulateOptions {
        properties: vec![],
        ..SimulateOptions::default()
    };

    let err = run_simulation(&config, &opts).await.unwrap_err();
    assert!(matches!(err, MonitorError::InvalidArgument(_)));
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_after_tick_limit() {
    let config = AppConfig::default();
    let options = WatchOptions {
        source: SourceKind::Synthetic,
        ticks: Some(3),
        seed: Some(7),
        ..WatchOptions::default()
    };

    let samples = run_watch(&config, &options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(samples.len(), 3);
    for sample in &samples {
        assert!((0.0..=100.0).contains(&sample.cache_hit_rate));
        assert!(sample.error_rate >= 0.0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_watch_live_observes_workload() {
    let config = AppConfig::default();
    let options = WatchOptions {
        source: SourceKind::Live,
        ticks: Some(2),
        failure_rate: 0.0,
        seed: Some(3),
    };

    let samples = run_watch(&config, &options, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(samples.len(), 2);
    // 첫 주기 동안 부하가 캐시를 채움
    assert!(samples[0].data_updates > 0);
    assert_eq!(samples[1].error_rate, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_watch_ends_on_cancel() {
    let config = AppConfig::default();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let samples = run_watch(&config, &WatchOptions::default(), shutdown)
        .await
        .unwrap();
    assert!(samples.is_empty());
}
