use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Counters accumulated over one or more render jobs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Metrics {
    pub blocks: usize,
    pub frames: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub failed: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_block(&self, frames: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.blocks += 1;
            metrics.frames += frames;
        }
    }

    pub fn record_completed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.completed += 1;
        }
    }

    pub fn record_cancelled(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cancelled += 1;
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let recorder = MetricsRecorder::new();
        recorder.record_block(64);
        recorder.record_block(16);
        recorder.record_cancelled();
        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.blocks, 2);
        assert_eq!(snapshot.frames, 80);
        assert_eq!(snapshot.cancelled, 1);
        assert_eq!(snapshot.failed, 0);
    }
}
