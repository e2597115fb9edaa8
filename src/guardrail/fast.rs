use super::corrections::canned_correction;
use super::state::{MonitorState, MonitorVerdict};
use crate::protocol::DetectionContext;

/// Zero-latency monitor: canned corrections, no model calls.
#[derive(Debug, Clone)]
pub struct FastMonitor {
    state: MonitorState,
}

impl FastMonitor {
    pub fn new(ctx: DetectionContext) -> Self {
        Self {
            state: MonitorState::new(ctx),
        }
    }

    /// Inspect the full text streamed so far.
    pub fn check_chunk(&mut self, text: &str) -> Option<MonitorVerdict> {
        let violation = self.state.next_unseen_critical(text)?;
        tracing::debug!(kind = violation.kind.as_str(), "Fast monitor flagged violation");
        Some(MonitorVerdict {
            correction: canned_correction(violation.kind).to_string(),
            violation,
            should_abort: true,
        })
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}
