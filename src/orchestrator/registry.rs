use super::abort::{AbortReason, AbortSignal};
use crate::error::TurnError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Process-wide table of in-flight streams and their latest partial text,
/// keyed by conversation id.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    active: Mutex<HashMap<String, Arc<AbortSignal>>>,
    partials: Mutex<HashMap<String, String>>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, chat_id: &str) -> Option<Arc<AbortSignal>> {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(chat_id)
            .cloned()
    }

    pub fn set(&self, chat_id: &str, signal: Arc<AbortSignal>) {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(chat_id.to_string(), signal);
    }

    pub fn delete(&self, chat_id: &str) -> Option<Arc<AbortSignal>> {
        self.active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(chat_id)
    }

    /// Claim `chat_id` for a new turn. Fails while another turn holds it.
    pub fn register(&self, chat_id: &str) -> Result<Arc<AbortSignal>, TurnError> {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if active.contains_key(chat_id) {
            return Err(TurnError::AlreadyStreaming {
                chat_id: chat_id.to_string(),
            });
        }
        let signal = AbortSignal::new();
        active.insert(chat_id.to_string(), Arc::clone(&signal));
        Ok(signal)
    }

    pub fn is_streaming(&self, chat_id: &str) -> bool {
        self.get(chat_id).is_some()
    }

    /// User-requested cancellation. Returns whether a stream was active.
    pub fn cancel(&self, chat_id: &str) -> bool {
        match self.get(chat_id) {
            Some(signal) => {
                signal.abort(AbortReason::UserRequested);
                tracing::info!(chat_id, "Stream cancelled by user");
                true
            }
            None => false,
        }
    }

    pub fn set_partial(&self, chat_id: &str, text: &str) {
        let mut partials = self
            .partials
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match partials.get_mut(chat_id) {
            Some(existing) => {
                existing.clear();
                existing.push_str(text);
            }
            None => {
                partials.insert(chat_id.to_string(), text.to_string());
            }
        }
    }

    pub fn partial(&self, chat_id: &str) -> Option<String> {
        self.partials
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(chat_id)
            .cloned()
    }

    pub fn clear_partial(&self, chat_id: &str) {
        self.partials
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .remove(chat_id);
    }
}

/// Releases a registry claim when the turn ends, however it ends.
pub(crate) struct ActiveStream<'a> {
    registry: &'a StreamRegistry,
    chat_id: String,
}

impl<'a> ActiveStream<'a> {
    pub(crate) fn new(registry: &'a StreamRegistry, chat_id: &str) -> Self {
        Self {
            registry,
            chat_id: chat_id.to_string(),
        }
    }
}

impl Drop for ActiveStream<'_> {
    fn drop(&mut self) {
        self.registry.delete(&self.chat_id);
    }
}
