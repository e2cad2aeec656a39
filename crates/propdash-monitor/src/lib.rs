//! 대시보드 데이터 신선도 레이어 모니터 CLI.
//!
//! 이 crate는 다음 명령을 제공합니다:
//! - `watch`: 텔레메트리 샘플러를 돌리며 헬스/추세를 출력
//! - `simulate`: 불안정한 상류를 상대로 fetcher와 집계기를 한 바퀴 돌림
//! - `config`: 적용 중인 설정을 TOML로 출력

pub mod commands;
pub mod error;
pub mod report;
pub mod upstream;

pub use error::{MonitorError, Result};
pub use report::RunSummary;
pub use upstream::{MaintenanceRequest, SimulatedUpstream};
