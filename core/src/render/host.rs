use crate::telemetry::log::{LogManager, MessageLevel};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Callbacks from a render job to the application running it.
pub trait RenderHost: Send + Sync {
    /// Overall progress in `[0, 1]`.
    fn set_progression(&self, progress: f32);
    fn show_message(&self, level: MessageLevel, text: &str);
    /// Polled once per block; returning `false` cancels the job.
    fn is_running(&self) -> bool;
}

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Host that reports through the log facade and stops on a [`CancelToken`].
pub struct LogHost {
    token: CancelToken,
    logger: LogManager,
    progress_bits: AtomicU32,
}

impl LogHost {
    pub fn new(token: CancelToken) -> Self {
        Self {
            token,
            logger: LogManager::for_target("host"),
            progress_bits: AtomicU32::new(0),
        }
    }

    pub fn progress(&self) -> f32 {
        f32::from_bits(self.progress_bits.load(Ordering::Relaxed))
    }
}

impl RenderHost for LogHost {
    fn set_progression(&self, progress: f32) {
        let previous = self.progress();
        self.progress_bits
            .store(progress.to_bits(), Ordering::Relaxed);
        if (progress * 10.0).floor() > (previous * 10.0).floor() {
            self.logger
                .record_at(MessageLevel::Debug, &format!("progress {:.0}%", progress * 100.0));
        }
    }

    fn show_message(&self, level: MessageLevel, text: &str) {
        self.logger.record_at(level, text);
    }

    fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_stops_the_host() {
        let token = CancelToken::new();
        let host = LogHost::new(token.clone());
        assert!(host.is_running());
        token.cancel();
        assert!(!host.is_running());
    }

    #[test]
    fn progress_is_kept() {
        let host = LogHost::new(CancelToken::new());
        host.set_progression(0.25);
        assert_eq!(host.progress(), 0.25);
    }
}
