use super::ChatStore;
use crate::workflow::WorkflowState;
use anyhow::Result;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

/// Process-local store. Keeps every snapshot written so callers can inspect
/// the persistence history of a turn.
#[derive(Default)]
pub struct InMemoryChatStore {
    snapshots: Mutex<HashMap<String, Vec<String>>>,
    workflows: Mutex<HashMap<String, WorkflowState>>,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All snapshots written for `chat_id`, oldest first.
    pub fn snapshot_history(&self, chat_id: &str) -> Vec<String> {
        self.snapshots
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(chat_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl ChatStore for InMemoryChatStore {
    fn save_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
        text: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.snapshots
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .entry(chat_id.to_string())
                .or_default()
                .push(text.to_string());
            Ok(())
        })
    }

    fn load_snapshot<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .snapshots
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(chat_id)
                .and_then(|history| history.last().cloned()))
        })
    }

    fn read_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<WorkflowState>> + Send + 'a>> {
        Box::pin(async move {
            Ok(self
                .workflows
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get(chat_id)
                .copied()
                .unwrap_or_default())
        })
    }

    fn write_workflow_state<'a>(
        &'a self,
        chat_id: &'a str,
        state: WorkflowState,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.workflows
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(chat_id.to_string(), state);
            Ok(())
        })
    }
}
