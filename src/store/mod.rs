pub mod memory;
pub mod sqlite;

pub use memory::InMemoryChatStore;
pub use sqlite::SqliteChatStore;

use crate::workflow::WorkflowState;
use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

/// Durable per-conversation state used by the streaming engine.
///
/// Every entry is keyed by conversation id; implementations never share rows
/// between conversations.
pub trait ChatStore: Send + Sync {
    /// Overwrite the latest response snapshot for a conversation.
    fn save_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

    fn load_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>>;

    /// Missing rows read as [`WorkflowState::Idle`].
    fn read_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowState>> + Send + 'a>>;

    fn write_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
        state: WorkflowState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}
