//! 데이터 신선도 레이어 모니터 CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use propdash_core::{init_logging, AppConfig, LogConfig, LogFormat};
use propdash_monitor::commands::{
    render_config, run_simulation, run_watch, SimulateOptions, SourceKind, WatchOptions,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "propdash-monitor")]
#[command(about = "PropDash data-freshness monitor", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error). 설정 파일 값보다 우선
    #[arg(long)]
    log_level: Option<String>,

    /// JSON 로그 출력
    #[arg(long)]
    json: bool,

    /// 상류 조회 span 진입/종료 로그 출력
    #[arg(long)]
    spans: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 텔레메트리 샘플러 실행 (Ctrl+C로 종료)
    Watch {
        /// 샘플 공급원
        #[arg(long, value_enum, default_value = "synthetic")]
        source: SourceKind,

        /// 이 수만큼 샘플을 받으면 종료
        #[arg(long)]
        ticks: Option<u32>,

        /// live 부하의 상류 실패 확률 (0.0 ~ 1.0)
        #[arg(long, default_value_t = 0.1)]
        failure_rate: f64,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// 불안정한 상류를 상대로 조회/집계 시뮬레이션
    Simulate {
        #[arg(long, default_value_t = 10)]
        rounds: u32,

        /// 건물 목록 (쉼표로 구분, 예: "maple-court,harbor-view")
        #[arg(long)]
        properties: Option<String>,

        /// 상류 실패 확률 (0.0 ~ 1.0)
        #[arg(long, default_value_t = 0.2)]
        failure_rate: f64,

        /// 라운드마다 같은 키에 보내는 동시 요청 수
        #[arg(long, default_value_t = 3)]
        burst: usize,

        /// 조회 TTL (ms)
        #[arg(long, default_value_t = 2000)]
        ttl_ms: u64,

        /// 라운드 간격 (ms)
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,

        #[arg(long)]
        seed: Option<u64>,

        /// 결과 전체를 JSON으로 출력
        #[arg(long)]
        report: bool,
    },

    /// 적용 중인 설정 출력
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_ref())?;

    // 로깅 초기화
    let mut log_config = LogConfig::from(&config.logging);
    if let Some(level) = &cli.log_level {
        log_config.level = level.clone();
    }
    if cli.json {
        log_config = log_config.with_format(LogFormat::Json);
    }
    init_logging(log_config.with_span_events(cli.spans))?;

    tracing::info!("PropDash Monitor 시작");

    match cli.command {
        Commands::Watch {
            source,
            ticks,
            failure_rate,
            seed,
        } => {
            let shutdown = CancellationToken::new();
            let signal = shutdown.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    signal.cancel();
                }
            });

            let options = WatchOptions {
                source,
                ticks,
                failure_rate,
                seed,
            };
            let samples = run_watch(&config, &options, shutdown).await?;
            tracing::info!(samples = samples.len(), "관찰 종료");
        }
        Commands::Simulate {
            rounds,
            properties,
            failure_rate,
            burst,
            ttl_ms,
            interval_ms,
            seed,
            report,
        } => {
            let mut options = SimulateOptions {
                rounds,
                failure_rate,
                burst,
                ttl: Duration::from_millis(ttl_ms),
                round_interval: Duration::from_millis(interval_ms),
                seed,
                ..Default::default()
            };
            if let Some(list) = properties {
                options.properties = list
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }

            let result = tokio::select! {
                result = run_simulation(&config, &options) => result?,
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("종료 신호 수신, 시뮬레이션 중단");
                    return Ok(());
                }
            };

            result.summary.log_summary("시뮬레이션");
            if report {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        Commands::Config => {
            println!("{}", render_config(&config)?);
        }
    }

    tracing::info!("PropDash Monitor 종료");

    Ok(())
}
