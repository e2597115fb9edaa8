use crate::llm::ProviderMessage;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events a turn exposes to the UI layer. Errors use their own variant and
/// never appear inside the chunk stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ChatEvent {
    Chunk {
        chat_id: String,
        messages: Vec<ProviderMessage>,
    },
    End {
        chat_id: String,
        updated_files: bool,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        extra_files: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        chat_id: String,
        error: String,
    },
}

impl ChatEvent {
    pub fn chat_id(&self) -> &str {
        match self {
            Self::Chunk { chat_id, .. } | Self::End { chat_id, .. } | Self::Error { chat_id, .. } => {
                chat_id
            }
        }
    }
}

pub trait ChatEventSink: Send + Sync {
    fn emit(&self, event: ChatEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl ChatEventSink for NullEventSink {
    fn emit(&self, _event: ChatEvent) {}
}

/// Forwards events over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl ChannelEventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ChatEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ChatEventSink for ChannelEventSink {
    fn emit(&self, event: ChatEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Chat event receiver dropped");
        }
    }
}
