use super::streaming::{ProviderStream, StreamCollector};
use super::types::{ProviderMessage, ToolSpec};
use futures_util::StreamExt;
use std::future::Future;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// One model invocation.
#[derive(Debug, Clone, Default)]
pub struct ModelRequest {
    pub system_prompt: String,
    pub messages: Vec<ProviderMessage>,
    pub model: String,
    pub tools: Vec<ToolSpec>,
    pub provider_options: Option<serde_json::Value>,
}

impl ModelRequest {
    pub fn new(
        system_prompt: impl Into<String>,
        messages: Vec<ProviderMessage>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            messages,
            model: model.into(),
            tools: Vec::new(),
            provider_options: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// Opaque model capability. Provider adapters live outside this crate.
pub trait ModelClient: Send + Sync {
    /// Client identifier (e.g. "anthropic", "scripted").
    fn name(&self) -> &str;

    /// Start a streamed response. Implementations should stop emitting events
    /// promptly once `cancel` fires.
    fn stream<'a>(
        &'a self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderStream>> + Send + 'a>>;

    /// Single-shot text completion, used for router-model calls.
    fn complete<'a>(
        &'a self,
        system_prompt: &'a str,
        prompt: &'a str,
        model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            let request = ModelRequest::new(
                system_prompt,
                vec![ProviderMessage::user(prompt)],
                model,
            );
            let mut stream = self.stream(request, CancellationToken::new()).await?;
            let mut collector = StreamCollector::new();
            while let Some(event) = stream.next().await {
                collector.feed(&event?);
            }
            Ok(collector.finish().text)
        })
    }
}
