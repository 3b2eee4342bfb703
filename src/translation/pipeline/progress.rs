/*!
 * Per-job progress accounting.
 */

use std::sync::Arc;

use parking_lot::Mutex;

/// Receives overall progress as a percentage in `[0, 100]`
pub type ProgressSink = Arc<dyn Fn(f64) + Send + Sync>;

/// Receives human readable status lines
pub type StatusSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Point-in-time view of a job's progress
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    pub processed: usize,
    pub total: usize,
    pub completed_batches: usize,
    pub total_batches: usize,
    pub percent: f64,
}

#[derive(Debug, Default)]
struct ProgressState {
    processed: usize,
    completed_batches: usize,
    last_percent: f64,
}

/// Counts completed entries and batches and forwards updates to the sinks.
///
/// Counter updates and sink calls happen under one lock, so sinks see values in
/// the order they were produced and never observe a lost update.
pub struct ProgressTracker {
    total: usize,
    total_batches: usize,
    state: Mutex<ProgressState>,
    progress_sink: Option<ProgressSink>,
    status_sink: Option<StatusSink>,
}

impl ProgressTracker {
    pub fn new(
        total: usize,
        total_batches: usize,
        progress_sink: Option<ProgressSink>,
        status_sink: Option<StatusSink>,
    ) -> Self {
        Self {
            total,
            total_batches,
            state: Mutex::new(ProgressState::default()),
            progress_sink,
            status_sink,
        }
    }

    fn percent(&self, processed: usize) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (processed as f64 * 100.0 / self.total as f64).clamp(0.0, 100.0)
    }

    /// Account for one finished batch of `entries` entries
    pub fn record_batch(&self, entries: usize) -> ProgressSnapshot {
        let mut state = self.state.lock();
        state.processed = (state.processed + entries).min(self.total);
        state.completed_batches += 1;

        let percent = self.percent(state.processed).max(state.last_percent);
        state.last_percent = percent;

        if let Some(sink) = &self.progress_sink {
            sink(percent);
        }
        if let Some(sink) = &self.status_sink {
            sink(&format!(
                "Translated batch {}/{} ({}/{} entries)",
                state.completed_batches, self.total_batches, state.processed, self.total
            ));
        }

        self.snapshot_of(&state)
    }

    /// Send a status line through the same serialized path as progress updates
    pub fn status(&self, message: &str) {
        let _state = self.state.lock();
        if let Some(sink) = &self.status_sink {
            sink(message);
        }
    }

    /// Report completion: progress 100 and a final status line
    pub fn finish(&self, message: &str) {
        let mut state = self.state.lock();
        state.last_percent = 100.0;
        if let Some(sink) = &self.progress_sink {
            sink(100.0);
        }
        if let Some(sink) = &self.status_sink {
            sink(message);
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let state = self.state.lock();
        self.snapshot_of(&state)
    }

    fn snapshot_of(&self, state: &ProgressState) -> ProgressSnapshot {
        ProgressSnapshot {
            processed: state.processed,
            total: self.total,
            completed_batches: state.completed_batches,
            total_batches: self.total_batches,
            percent: state.last_percent,
        }
    }
}
