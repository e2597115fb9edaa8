use super::types::StopReason;
use anyhow::Result;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub type ProviderStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send + 'static>>;

/// One event emitted by the primary model while a response is streaming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamEvent {
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    ToolCall {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        id: String,
        name: String,
        output: String,
    },
    Finish {
        stop_reason: Option<StopReason>,
        input_tokens: Option<u64>,
        output_tokens: Option<u64>,
    },
}

impl StreamEvent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::ReasoningDelta { text: text.into() }
    }

    pub fn finish(stop_reason: StopReason) -> Self {
        Self::Finish {
            stop_reason: Some(stop_reason),
            input_tokens: None,
            output_tokens: None,
        }
    }
}

/// Collected form of a finished stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectedResponse {
    pub text: String,
    pub reasoning: String,
    pub stop_reason: Option<StopReason>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

impl CollectedResponse {
    pub fn total_tokens(&self) -> Option<u64> {
        match (self.input_tokens, self.output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        }
    }
}

/// Folds stream events into a [`CollectedResponse`], dropping tool traffic.
#[derive(Debug, Default)]
pub struct StreamCollector {
    response: CollectedResponse,
    skipped_tool_events: usize,
}

impl StreamCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => {
                self.response.text.push_str(text);
            }
            StreamEvent::ReasoningDelta { text } => {
                self.response.reasoning.push_str(text);
            }
            StreamEvent::ToolCall { name, .. } | StreamEvent::ToolResult { name, .. } => {
                self.skipped_tool_events += 1;
                tracing::debug!(tool = name.as_str(), "Collector ignoring tool event");
            }
            StreamEvent::Finish {
                stop_reason,
                input_tokens,
                output_tokens,
            } => {
                self.response.stop_reason = *stop_reason;
                self.response.input_tokens = *input_tokens;
                self.response.output_tokens = *output_tokens;
            }
        }
    }

    pub fn finish(self) -> CollectedResponse {
        if self.skipped_tool_events > 0 {
            tracing::debug!(
                skipped = self.skipped_tool_events,
                "Collected response dropped tool events"
            );
        }
        self.response
    }
}

/// Build the event sequence a non-streaming reply would have produced.
pub fn text_to_events(text: impl Into<String>) -> Vec<Result<StreamEvent>> {
    let text = text.into();
    let mut events = Vec::with_capacity(2);
    if !text.is_empty() {
        events.push(Ok(StreamEvent::TextDelta { text }));
    }
    events.push(Ok(StreamEvent::finish(StopReason::EndTurn)));
    events
}
