#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tagwright::Config;
use tagwright::error::LlmError;
use tagwright::llm::{
    MessageRole, ModelClient, ModelRequest, ProviderMessage, ProviderStream, StopReason,
    StreamEvent,
};
use tagwright::orchestrator::{
    ChannelEventSink, ChatEvent, Problem, ProblemChecker, StreamOrchestrator, StreamRegistry,
    VirtualFileTree,
};
use tagwright::store::InMemoryChatStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One scripted model stream.
#[derive(Debug, Clone)]
pub enum Script {
    /// Emit the events, then end.
    Events(Vec<StreamEvent>),
    /// Emit the events, then wait until cancelled.
    Stall(Vec<StreamEvent>),
    /// Fail when the stream is opened.
    Fail { message: String, request_id: Option<String> },
}

impl Script {
    /// Text deltas of `chunks`, then a finish event.
    pub fn text(chunks: &[&str]) -> Self {
        let mut events: Vec<StreamEvent> = chunks.iter().map(|c| StreamEvent::text(*c)).collect();
        events.push(StreamEvent::finish(StopReason::EndTurn));
        Self::Events(events)
    }

    pub fn stall(chunks: &[&str]) -> Self {
        Self::Stall(chunks.iter().map(|c| StreamEvent::text(*c)).collect())
    }

    pub fn fail(message: &str, request_id: Option<&str>) -> Self {
        Self::Fail {
            message: message.to_string(),
            request_id: request_id.map(str::to_string),
        }
    }
}

/// Model client replaying scripted streams and router replies in order.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    streams: Mutex<VecDeque<Script>>,
    completions: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ModelRequest>>,
    completion_prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(streams: Vec<Script>) -> Self {
        Self {
            streams: Mutex::new(VecDeque::from(streams)),
            ..Self::default()
        }
    }

    pub fn with_completions(self, replies: &[&str]) -> Self {
        self.completions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .extend(replies.iter().map(|r| (*r).to_string()));
        self
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn completion_prompts(&self) -> Vec<String> {
        self.completion_prompts
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    fn stream<'a>(
        &'a self,
        request: ModelRequest,
        cancel: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderStream>> + Send + 'a>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(request);
            let script = self
                .streams
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Script::text(&[]));

            let (events, stall) = match script {
                Script::Events(events) => (events, false),
                Script::Stall(events) => (events, true),
                Script::Fail {
                    message,
                    request_id,
                } => {
                    return Err(LlmError::Provider {
                        message,
                        request_id,
                    }
                    .into());
                }
            };

            let stream = async_stream::stream! {
                for event in events {
                    if cancel.is_cancelled() {
                        break;
                    }
                    tokio::task::yield_now().await;
                    yield Ok::<_, anyhow::Error>(event);
                }
                if stall {
                    cancel.cancelled().await;
                }
            };
            Ok(Box::pin(stream) as ProviderStream)
        })
    }

    fn complete<'a>(
        &'a self,
        _system_prompt: &'a str,
        prompt: &'a str,
        _model: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>> {
        Box::pin(async move {
            self.completion_prompts
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(prompt.to_string());
            self.completions
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("no router reply scripted"))
        })
    }
}

/// Reports one problem per file whose content contains `marker`.
#[derive(Debug)]
pub struct MarkerChecker {
    pub marker: &'static str,
    pub base: VirtualFileTree,
    pub checks: Mutex<usize>,
}

impl MarkerChecker {
    pub fn new(marker: &'static str) -> Self {
        Self {
            marker,
            base: VirtualFileTree::new(),
            checks: Mutex::new(0),
        }
    }

    pub fn checks(&self) -> usize {
        *self
            .checks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl ProblemChecker for MarkerChecker {
    fn base_tree<'a>(
        &'a self,
        _chat_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<VirtualFileTree>> + Send + 'a>> {
        Box::pin(async move { Ok(self.base.clone()) })
    }

    fn compute_problems<'a>(
        &'a self,
        tree: &'a VirtualFileTree,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Vec<Problem>>> + Send + 'a>> {
        Box::pin(async move {
            *self
                .checks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) += 1;
            Ok(tree
                .paths()
                .filter(|path| tree.get(path).is_some_and(|c| c.contains(self.marker)))
                .map(|path| Problem {
                    file: path.to_string(),
                    line: 1,
                    column: 1,
                    code: "TS2304".into(),
                    message: format!("Cannot find name '{}'.", self.marker),
                })
                .collect())
        })
    }
}

pub struct Harness {
    pub client: Arc<ScriptedClient>,
    pub store: Arc<InMemoryChatStore>,
    pub registry: Arc<StreamRegistry>,
    pub orchestrator: Arc<StreamOrchestrator>,
    pub events: mpsc::UnboundedReceiver<ChatEvent>,
}

impl Harness {
    pub fn new(client: ScriptedClient, config: &Config) -> Self {
        Self::build(client, config, None)
    }

    pub fn with_checker(
        client: ScriptedClient,
        config: &Config,
        checker: Arc<dyn ProblemChecker>,
    ) -> Self {
        Self::build(client, config, Some(checker))
    }

    fn build(
        client: ScriptedClient,
        config: &Config,
        checker: Option<Arc<dyn ProblemChecker>>,
    ) -> Self {
        let client = Arc::new(client);
        let store = Arc::new(InMemoryChatStore::new());
        let registry = Arc::new(StreamRegistry::new());
        let (sink, events) = ChannelEventSink::channel();
        let mut orchestrator = StreamOrchestrator::new(
            Arc::clone(&client) as Arc<dyn ModelClient>,
            Arc::clone(&store) as Arc<dyn tagwright::store::ChatStore>,
            Arc::clone(&registry),
            config,
        )
        .with_event_sink(Arc::new(sink));
        if let Some(checker) = checker {
            orchestrator = orchestrator.with_problem_checker(checker);
        }
        Self {
            client,
            store,
            registry,
            orchestrator: Arc::new(orchestrator),
            events,
        }
    }

    /// Events emitted so far.
    pub fn drain_events(&mut self) -> Vec<ChatEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }
}

pub fn messages_with_role(messages: &[ProviderMessage], role: MessageRole) -> Vec<String> {
    messages
        .iter()
        .filter(|m| m.role == role)
        .map(ProviderMessage::text_content)
        .collect()
}
