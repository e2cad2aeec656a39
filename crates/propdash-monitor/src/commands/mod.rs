//! CLI 명령 구현.

pub mod show_config;
pub mod simulate;
pub mod watch;

pub use show_config::render_config;
pub use simulate::{run_simulation, SimulateOptions, SimulationReport};
pub use watch::{run_watch, SourceKind, WatchOptions};
