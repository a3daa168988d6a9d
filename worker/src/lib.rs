pub mod config;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod state;
pub mod worker;

pub use config::NodeConfig;
pub use error::{Result, WorkerErr};
pub use metrics::WorkerMetrics;
pub use monitor::{DEFAULT_MEM_THRESHOLD, RoundReport, SystemMonitor, TelemetrySink};
pub use state::NodeState;
pub use worker::Worker;
