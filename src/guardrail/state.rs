use crate::protocol::{DetectionContext, Violation, ViolationKind, detect};
use std::collections::HashSet;

/// Per-response monitor state. Each violation kind fires at most once for
/// the life of the state.
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub ctx: DetectionContext,
    seen: HashSet<ViolationKind>,
    chunks_checked: usize,
}

impl MonitorState {
    pub fn new(ctx: DetectionContext) -> Self {
        Self {
            ctx,
            seen: HashSet::new(),
            chunks_checked: 0,
        }
    }

    /// First critical violation in `text` whose kind has not fired yet.
    /// Only that kind is marked as seen.
    pub fn next_unseen_critical(&mut self, text: &str) -> Option<Violation> {
        self.chunks_checked += 1;
        let violation = detect(text, &self.ctx)
            .into_iter()
            .find(|v| v.is_critical() && !self.seen.contains(&v.kind))?;
        self.seen.insert(violation.kind);
        Some(violation)
    }

    pub fn has_seen(&self, kind: ViolationKind) -> bool {
        self.seen.contains(&kind)
    }

    pub fn chunks_checked(&self) -> usize {
        self.chunks_checked
    }

    pub fn reset(&mut self) {
        self.seen.clear();
        self.chunks_checked = 0;
    }
}

/// A monitor's decision for one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorVerdict {
    pub violation: Violation,
    pub correction: String,
    pub should_abort: bool,
}

impl MonitorVerdict {
    pub fn kind(&self) -> ViolationKind {
        self.violation.kind
    }
}
