// Refresh Service Library
// Core engine for supervising a scheduled data-refresh pipeline

pub mod config;
pub mod error;
pub mod invoke;
pub mod lock;
pub mod report;
pub mod schedule;
pub mod utils;

// Re-export commonly used types
pub use error::{RunnerError, RunnerResult};

pub use config::{ConfigError, RunnerConfig};
pub use invoke::{InvocationReport, InvokeSpec, Outcome, OutputCallback};
pub use lock::{LockError, RunLock};
pub use report::StatusReport;
pub use schedule::{format_duration, parse_duration, Schedule};
