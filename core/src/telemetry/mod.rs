pub mod log;
pub mod metrics;

pub use log::{LogManager, MessageLevel};
pub use metrics::{Metrics, MetricsRecorder};
