use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};

/// Severity of a message shown to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
}

pub struct LogManager {
    target: &'static str,
}

impl LogManager {
    pub fn new() -> Self {
        Self { target: "render" }
    }

    pub fn for_target(target: &'static str) -> Self {
        Self { target }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.target, message);
    }

    pub fn record_at(&self, level: MessageLevel, message: &str) {
        match level {
            MessageLevel::Debug => debug!("[{}] {}", self.target, message),
            MessageLevel::Info => info!("[{}] {}", self.target, message),
            MessageLevel::Warning => warn!("[{}] {}", self.target, message),
            MessageLevel::Error => error!("[{}] {}", self.target, message),
        }
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}
