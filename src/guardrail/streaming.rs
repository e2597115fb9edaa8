use super::corrections::router_instruction;
use super::state::{MonitorState, MonitorVerdict};
use crate::error::LlmError;
use crate::llm::ModelClient;
use crate::protocol::DetectionContext;
use std::sync::Arc;
use std::time::Duration;

const CORRECTION_SYSTEM_PROMPT: &str = "You write brief corrective instructions for another \
assistant. Be specific and imperative. Never include code.";

/// Monitor whose corrections are written by the router model.
pub struct StreamingMonitor {
    state: MonitorState,
    client: Arc<dyn ModelClient>,
    router_model: String,
    timeout: Duration,
}

impl StreamingMonitor {
    pub fn new(
        ctx: DetectionContext,
        client: Arc<dyn ModelClient>,
        router_model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            state: MonitorState::new(ctx),
            client,
            router_model: router_model.into(),
            timeout,
        }
    }

    /// Inspect the full text streamed so far. On a new critical violation
    /// the router model is awaited for a correction, which is passed to
    /// `on_correction`. A failed or timed-out router call yields `None`;
    /// the kind still counts as seen.
    pub async fn analyze_chunk<F>(&mut self, text: &str, on_correction: F) -> Option<MonitorVerdict>
    where
        F: FnOnce(&str),
    {
        let violation = self.state.next_unseen_critical(text)?;
        let prompt = router_instruction(&violation);

        let correction = match self.request_correction(&prompt).await {
            Ok(correction) => correction,
            Err(e) => {
                tracing::warn!(
                    kind = violation.kind.as_str(),
                    model = self.router_model.as_str(),
                    "No correction available: {e}"
                );
                return None;
            }
        };

        on_correction(&correction);
        Some(MonitorVerdict {
            violation,
            correction,
            should_abort: true,
        })
    }

    async fn request_correction(&self, prompt: &str) -> Result<String, LlmError> {
        let call = self
            .client
            .complete(CORRECTION_SYSTEM_PROMPT, prompt, &self.router_model);
        let reply = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| LlmError::RouterTimeout {
                model: self.router_model.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(LlmError::from_client)?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(LlmError::Provider {
                message: "router model returned an empty correction".into(),
                request_id: None,
            });
        }
        Ok(reply.to_string())
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}
