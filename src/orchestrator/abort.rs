use std::sync::{Arc, Mutex};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Why a stream was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Terminal; the partial response is kept.
    UserRequested,
    /// Non-terminal; the turn restarts with a correction.
    CorrectionRequested,
}

/// Cooperative cancellation handle carrying its cause.
///
/// A child signal is cancelled with its parent, and reports the parent's
/// reason ahead of its own.
#[derive(Debug)]
pub struct AbortSignal {
    token: CancellationToken,
    reason: Mutex<Option<AbortReason>>,
    parent: Option<Arc<AbortSignal>>,
}

impl AbortSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            token: CancellationToken::new(),
            reason: Mutex::new(None),
            parent: None,
        })
    }

    pub fn child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            token: self.token.child_token(),
            reason: Mutex::new(None),
            parent: Some(Arc::clone(self)),
        })
    }

    /// Cancel with `reason`. The first reason recorded wins.
    pub fn abort(&self, reason: AbortReason) {
        {
            let mut slot = self
                .reason
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(reason);
            }
        }
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<AbortReason> {
        let inherited = self.parent.as_ref().and_then(|parent| parent.reason());
        inherited.or_else(|| {
            *self
                .reason
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
        })
    }

    /// Token handed to the model client.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}
