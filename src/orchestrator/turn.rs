use super::abort::{AbortReason, AbortSignal};
use super::events::{ChatEvent, ChatEventSink, NullEventSink};
use super::machine::{Effect, TurnCounters, TurnEvent, TurnLimits, TurnState, transition};
use super::problems::{ProblemChecker, format_fix_prompt, format_problem_report};
use super::registry::{ActiveStream, StreamRegistry};
use crate::config::{Config, GuardrailConfig};
use crate::error::{LlmError, Result, TagwrightError};
use crate::guardrail::{ActiveMonitor, CorrectionDecision, CorrectionRequest, generate_correction};
use crate::llm::{ModelClient, ModelRequest, ProviderMessage, StreamEvent, ToolSpec};
use crate::protocol::tags::{think_close, think_open};
use crate::protocol::{
    ChatMode, DetectionContext, Directive, ReasoningEscaper, Violation, parse_directives, scan,
    strip_thinking, validate_response,
};
use crate::store::ChatStore;
use crate::workflow::{ModelRouter, RouteDecision, WorkflowManager};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

// ── Constants ────────────────────────────────────────────────────────────────

const CONTINUE_INSTRUCTION: &str = "\
Your previous reply stopped inside an unfinished <write> tag. Continue exactly where it \
stopped, without repeating earlier text, and close the tag.";

const CANCELLED_SUFFIX: &str = "\n\n[Response cancelled by user]";

// ── Public types ─────────────────────────────────────────────────────────────

/// One user turn.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub chat_id: String,
    pub prompt: String,
    /// Prior conversation, oldest first. The prompt is appended after it.
    pub history: Vec<ProviderMessage>,
    pub mode: ChatMode,
    pub base_system_prompt: String,
    /// Forwarded to the model client in agent mode.
    pub tools: Vec<ToolSpec>,
}

impl TurnRequest {
    pub fn new(chat_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: ChatMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_history(mut self, history: Vec<ProviderMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.base_system_prompt = prompt.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = tools;
        self
    }
}

/// A tool call the model made during the turn. Execution happens outside
/// this crate; the result is recorded when the stream reports it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
    pub output: Option<String>,
}

/// Final output of [`StreamOrchestrator::run_turn`].
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Everything shown to the user, fix rounds included.
    pub response: String,
    pub directives: Vec<Directive>,
    pub cancelled: bool,
    pub model: String,
    pub counters: TurnCounters,
    /// Problem report left after the auto-fix budget ran out.
    pub unresolved_problems: Option<String>,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Files written or renamed by auto-fix rounds.
    pub extra_files: Vec<String>,
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

/// Drives one model stream per turn through the guardrail state machine.
pub struct StreamOrchestrator {
    client: Arc<dyn ModelClient>,
    store: Arc<dyn ChatStore>,
    registry: Arc<StreamRegistry>,
    workflow: WorkflowManager,
    router: ModelRouter,
    guardrail: GuardrailConfig,
    problems: Option<Arc<dyn ProblemChecker>>,
    events: Arc<dyn ChatEventSink>,
}

// ── Internal types ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AttemptKind {
    /// Fresh response (first try, correction restart or fix round); monitored.
    Primary,
    /// Finishes an unclosed `write`; text deltas only.
    Continuation,
}

/// What the driver does after executing one effect.
enum EffectOutcome {
    Launch(AttemptKind),
    Event(TurnEvent),
    Continue,
    Finish,
    Fail(TagwrightError),
}

/// Text buffers of a turn.
///
/// `committed` holds accepted attempts; the latest response starts at
/// `response_start`. `attempt` is the stream in flight and is only folded
/// into `committed` once the machine moves past it.
#[derive(Debug, Default)]
struct TurnBuffers {
    committed: String,
    attempt: String,
    response_start: usize,
    fix_start: Option<usize>,
}

impl TurnBuffers {
    fn full_text(&self) -> String {
        let mut text = String::with_capacity(self.committed.len() + self.attempt.len());
        text.push_str(&self.committed);
        text.push_str(&self.attempt);
        text
    }

    fn current_response(&self) -> String {
        let mut text = self.committed[self.response_start..].to_string();
        text.push_str(&self.attempt);
        text
    }

    fn commit(&mut self) {
        let attempt = std::mem::take(&mut self.attempt);
        self.committed.push_str(&attempt);
    }

    /// Drop the latest response and return it.
    fn rewind(&mut self) -> String {
        let partial = self.current_response();
        self.committed.truncate(self.response_start);
        self.attempt.clear();
        partial
    }
}

/// Mutable state of one running turn.
struct TurnRun<'a> {
    orchestrator: &'a StreamOrchestrator,
    request: &'a TurnRequest,
    signal: Arc<AbortSignal>,
    ctx: DetectionContext,
    route: RouteDecision,
    system_prompt: String,
    messages: Vec<ProviderMessage>,
    monitor: ActiveMonitor,
    buffers: TurnBuffers,
    tool_calls: Vec<ToolCallRecord>,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
    unresolved_problems: Option<String>,
    cancelled: bool,
    client_error: Option<LlmError>,
    last_snapshot: Option<Instant>,
    pending_snapshot: Option<JoinHandle<()>>,
}

// ── Implementation ───────────────────────────────────────────────────────────

impl StreamOrchestrator {
    pub fn new(
        client: Arc<dyn ModelClient>,
        store: Arc<dyn ChatStore>,
        registry: Arc<StreamRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            client,
            workflow: WorkflowManager::new(Arc::clone(&store)),
            store,
            registry,
            router: ModelRouter::new(config.routing.clone()),
            guardrail: config.guardrail.clone(),
            problems: None,
            events: Arc::new(NullEventSink),
        }
    }

    /// Enable the auto-fix loop.
    pub fn with_problem_checker(mut self, checker: Arc<dyn ProblemChecker>) -> Self {
        self.problems = Some(checker);
        self
    }

    pub fn with_event_sink(mut self, events: Arc<dyn ChatEventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    pub fn workflow(&self) -> &WorkflowManager {
        &self.workflow
    }

    /// User cancellation for `chat_id`. Returns whether a turn was running.
    pub fn cancel(&self, chat_id: &str) -> bool {
        self.registry.cancel(chat_id)
    }

    /// Run one turn to completion.
    ///
    /// Protocol violations, unclosed writes and reported problems are
    /// handled inside the turn within their retry budgets. Only model
    /// client failures surface as errors; a user cancellation returns the
    /// partial response with `cancelled` set.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        let chat_id = request.chat_id.as_str();
        let signal = self.registry.register(chat_id)?;
        let _active = ActiveStream::new(&self.registry, chat_id);

        let guidance = match self.workflow.turn_guidance(chat_id).await {
            Ok(guidance) => guidance,
            Err(e) => {
                tracing::warn!(chat_id, "Workflow state unreadable, running without a step: {e:#}");
                None
            }
        };
        let step = guidance.map(|g| g.step);

        let classified = if self.router.needs_classification(step) {
            Some(
                self.router
                    .classify_prompt(self.client.as_ref(), &request.prompt)
                    .await,
            )
        } else {
            None
        };
        let route = self.router.select(step, classified);
        tracing::info!(
            chat_id,
            model = route.model.as_str(),
            task = %route.task_type,
            source = ?route.source,
            "Turn routed"
        );

        let system_prompt = match guidance {
            Some(g) if request.base_system_prompt.is_empty() => g.prompt_fragment.to_string(),
            Some(g) => format!("{}\n\n{}", request.base_system_prompt, g.prompt_fragment),
            None => request.base_system_prompt.clone(),
        };

        let ctx = DetectionContext::new(request.mode, step);
        let limits = TurnLimits::from_config(
            &self.guardrail,
            ctx.permits_auto_fix() && self.problems.is_some(),
        );
        let monitor = ActiveMonitor::from_config(
            &self.guardrail,
            ctx,
            Arc::clone(&self.client),
            self.router.router_model(),
        );

        let mut messages = request.history.clone();
        messages.push(ProviderMessage::user(request.prompt.as_str()));

        let mut run = TurnRun {
            orchestrator: self,
            request: &request,
            signal,
            ctx,
            route,
            system_prompt,
            messages,
            monitor,
            buffers: TurnBuffers::default(),
            tool_calls: Vec::new(),
            input_tokens: None,
            output_tokens: None,
            unresolved_problems: None,
            cancelled: false,
            client_error: None,
            last_snapshot: None,
            pending_snapshot: None,
        };

        let mut state = TurnState::default();
        let mut effects: VecDeque<Effect> = VecDeque::new();
        let mut launch = Some(AttemptKind::Primary);

        loop {
            if let Some(kind) = launch.take() {
                let event = if run.signal.is_aborted() {
                    TurnEvent::Cancelled
                } else {
                    run.stream_attempt(kind, &mut state, &limits).await
                };
                let (next, more) = transition(state, event, &limits);
                state = next;
                effects.extend(more);
                continue;
            }

            let Some(effect) = effects.pop_front() else {
                break;
            };
            match run.apply(effect).await {
                EffectOutcome::Launch(kind) => launch = Some(kind),
                EffectOutcome::Event(event) => {
                    let (next, more) = transition(state, event, &limits);
                    state = next;
                    effects.extend(more);
                }
                EffectOutcome::Continue => {}
                EffectOutcome::Finish => break,
                EffectOutcome::Fail(err) => return Err(err),
            }
        }

        Ok(run.finish(state.counters).await)
    }
}

impl TurnRun<'_> {
    fn chat_id(&self) -> &str {
        &self.request.chat_id
    }

    fn build_request(&self, kind: AttemptKind) -> ModelRequest {
        let mut messages = self.messages.clone();
        if kind == AttemptKind::Continuation {
            let partial = self.buffers.current_response();
            messages.push(ProviderMessage::assistant(strip_thinking(&partial).into_owned()));
            messages.push(ProviderMessage::user(CONTINUE_INSTRUCTION));
        }
        let request = ModelRequest::new(self.system_prompt.as_str(), messages, self.route.model.as_str());
        if self.request.mode == ChatMode::Agent && kind == AttemptKind::Primary {
            request.with_tools(self.request.tools.clone())
        } else {
            request
        }
    }

    /// Stream one attempt and report how it ended.
    async fn stream_attempt(
        &mut self,
        kind: AttemptKind,
        state: &mut TurnState,
        limits: &TurnLimits,
    ) -> TurnEvent {
        let attempt_signal = self.signal.child();
        self.monitor.reset();
        self.buffers.attempt.clear();
        tracing::debug!(chat_id = self.chat_id(), attempt = ?kind, "Stream attempt started");

        let request = self.build_request(kind);
        let client = Arc::clone(&self.orchestrator.client);
        let mut stream = match client.stream(request, attempt_signal.token()).await {
            Ok(stream) => stream,
            Err(e) => return self.client_failure(e, &attempt_signal),
        };

        let mut escaper = ReasoningEscaper::new();
        let mut in_think = false;

        loop {
            let next = tokio::select! {
                biased;
                () = attempt_signal.cancelled() => break,
                next = stream.next() => next,
            };
            let Some(event) = next else {
                break;
            };
            let event = match event {
                Ok(event) => event,
                Err(_) if attempt_signal.is_aborted() => break,
                Err(e) => return self.client_failure(e, &attempt_signal),
            };

            match event {
                StreamEvent::TextDelta { text } => {
                    if in_think {
                        self.close_think(&mut escaper);
                        in_think = false;
                    }
                    self.buffers.attempt.push_str(&text);
                }
                StreamEvent::ReasoningDelta { text } => {
                    if kind == AttemptKind::Continuation {
                        continue;
                    }
                    if !in_think {
                        self.buffers.attempt.push_str(think_open());
                        in_think = true;
                    }
                    let escaped = escaper.push(&text);
                    self.buffers.attempt.push_str(&escaped);
                }
                StreamEvent::ToolCall { id, name, input } => {
                    if kind == AttemptKind::Primary {
                        tracing::debug!(chat_id = self.chat_id(), tool = name.as_str(), "Tool call recorded");
                        self.tool_calls.push(ToolCallRecord {
                            id,
                            name,
                            input,
                            output: None,
                        });
                    }
                    continue;
                }
                StreamEvent::ToolResult { id, name, output } => {
                    if kind == AttemptKind::Primary {
                        self.record_tool_result(id, name, output);
                    }
                    continue;
                }
                StreamEvent::Finish {
                    input_tokens,
                    output_tokens,
                    ..
                } => {
                    self.add_usage(input_tokens, output_tokens);
                    continue;
                }
            }

            self.publish_progress();

            if kind == AttemptKind::Primary
                && state.counters.corrections < limits.max_correction_attempts
                && let Some(verdict) = self.monitor.inspect(&self.buffers.attempt).await
                && verdict.should_abort
            {
                tracing::info!(
                    chat_id = self.chat_id(),
                    kind = %verdict.kind(),
                    attempt = state.counters.corrections + 1,
                    "Protocol violation flagged mid-stream"
                );
                let (next, effects) = transition(
                    std::mem::take(state),
                    TurnEvent::ViolationFlagged {
                        correction: verdict.correction,
                    },
                    limits,
                );
                *state = next;
                if effects.contains(&Effect::AbortStream) {
                    attempt_signal.abort(AbortReason::CorrectionRequested);
                    break;
                }
            }
        }

        if in_think {
            self.close_think(&mut escaper);
        }

        match attempt_signal.reason() {
            Some(AbortReason::UserRequested) => return TurnEvent::Cancelled,
            Some(AbortReason::CorrectionRequested) => {
                tracing::debug!(chat_id = self.chat_id(), "Attempt aborted for correction");
            }
            None => {}
        }

        let response = self.buffers.current_response();
        let scanned = scan(&response);
        TurnEvent::StreamEnded {
            unclosed_write: scanned.unclosed_write,
            adds_dependencies: scanned.adds_dependencies(),
        }
    }

    fn close_think(&mut self, escaper: &mut ReasoningEscaper) {
        let rest = escaper.finish();
        self.buffers.attempt.push_str(&rest);
        self.buffers.attempt.push_str(think_close());
    }

    fn record_tool_result(&mut self, id: String, name: String, output: String) {
        match self.tool_calls.iter_mut().find(|call| call.id == id) {
            Some(call) => call.output = Some(output),
            None => self.tool_calls.push(ToolCallRecord {
                id,
                name,
                input: serde_json::Value::Null,
                output: Some(output),
            }),
        }
    }

    fn add_usage(&mut self, input: Option<u64>, output: Option<u64>) {
        if let Some(n) = input {
            self.input_tokens = Some(self.input_tokens.unwrap_or(0) + n);
        }
        if let Some(n) = output {
            self.output_tokens = Some(self.output_tokens.unwrap_or(0) + n);
        }
    }

    fn client_failure(&mut self, err: anyhow::Error, signal: &AbortSignal) -> TurnEvent {
        if signal.reason() == Some(AbortReason::UserRequested) {
            return TurnEvent::Cancelled;
        }
        let err = LlmError::from_client(err);
        let message = err.to_string();
        tracing::error!(chat_id = self.chat_id(), model = self.route.model.as_str(), "Model stream failed: {message}");
        self.client_error = Some(err);
        TurnEvent::Failed { message }
    }

    /// Forward the buffer to the UI and registry, and persist a throttled
    /// snapshot.
    fn publish_progress(&mut self) {
        let chat_id = self.request.chat_id.clone();
        let full = self.buffers.full_text();
        let orchestrator = self.orchestrator;

        orchestrator.registry.set_partial(&chat_id, &full);
        orchestrator.events.emit(ChatEvent::Chunk {
            chat_id: chat_id.clone(),
            messages: vec![ProviderMessage::assistant(full.as_str())],
        });

        let interval = Duration::from_millis(orchestrator.guardrail.snapshot_interval_ms);
        if self.last_snapshot.is_some_and(|at| at.elapsed() < interval) {
            return;
        }
        self.last_snapshot = Some(Instant::now());

        // Writes are chained so snapshots land in order.
        let previous = self.pending_snapshot.take();
        let store = Arc::clone(&orchestrator.store);
        self.pending_snapshot = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Err(e) = store.save_snapshot(&chat_id, &full).await {
                tracing::warn!(chat_id = chat_id.as_str(), "Snapshot save failed: {e:#}");
            }
        }));
    }

    async fn save_final_snapshot(&mut self) {
        if let Some(pending) = self.pending_snapshot.take() {
            let _ = pending.await;
        }
        if let Err(e) = self
            .orchestrator
            .store
            .save_snapshot(&self.request.chat_id, &self.buffers.committed)
            .await
        {
            tracing::warn!(chat_id = self.chat_id(), "Final snapshot save failed: {e:#}");
        }
    }

    async fn apply(&mut self, effect: Effect) -> EffectOutcome {
        match effect {
            // Already handled inside the stream loop.
            Effect::AbortStream => EffectOutcome::Continue,

            Effect::RestartWithCorrection { correction } => {
                let partial = self.buffers.rewind();
                let partial = strip_thinking(&partial);
                if !partial.trim().is_empty() {
                    self.messages
                        .push(ProviderMessage::assistant(partial.into_owned()));
                }
                self.messages.push(ProviderMessage::system(correction));
                tracing::info!(chat_id = self.chat_id(), "Restarting stream with correction");
                EffectOutcome::Launch(AttemptKind::Primary)
            }

            Effect::RequestContinuation => {
                self.buffers.commit();
                tracing::info!(chat_id = self.chat_id(), "Continuing unclosed write");
                EffectOutcome::Launch(AttemptKind::Continuation)
            }

            Effect::RunGate => EffectOutcome::Event(self.run_gate().await),

            Effect::CheckProblems => {
                self.buffers.commit();
                let report = self.check_problems().await;
                EffectOutcome::Event(TurnEvent::ProblemsChecked { report })
            }

            Effect::RequestFix { report } => {
                self.buffers.commit();
                let response = self.buffers.current_response();
                self.messages
                    .push(ProviderMessage::assistant(strip_thinking(&response).into_owned()));
                self.messages.push(ProviderMessage::user(format_fix_prompt(&report)));

                self.buffers.committed.push('\n');
                self.buffers.committed.push_str(&report);
                self.buffers.committed.push('\n');
                self.buffers.response_start = self.buffers.committed.len();
                self.buffers.fix_start.get_or_insert(self.buffers.response_start);
                tracing::info!(chat_id = self.chat_id(), "Requesting auto-fix round");
                EffectOutcome::Launch(AttemptKind::Primary)
            }

            Effect::AnnotateProblems { report } => {
                self.buffers.commit();
                self.buffers.committed.push_str("\n\n");
                self.buffers.committed.push_str(&report);
                tracing::warn!(chat_id = self.chat_id(), "Auto-fix budget exhausted, problems remain");
                self.unresolved_problems = Some(report);
                EffectOutcome::Continue
            }

            Effect::PersistCancelled => {
                self.buffers.commit();
                self.buffers.committed.push_str(CANCELLED_SUFFIX);
                self.cancelled = true;
                tracing::info!(chat_id = self.chat_id(), "Turn cancelled, partial response kept");
                EffectOutcome::Continue
            }

            Effect::Fail { message } => {
                if let Some(pending) = self.pending_snapshot.take() {
                    let _ = pending.await;
                }
                let orchestrator = self.orchestrator;
                orchestrator.registry.clear_partial(self.chat_id());
                orchestrator.events.emit(ChatEvent::Error {
                    chat_id: self.request.chat_id.clone(),
                    error: message.clone(),
                });
                let err = self.client_error.take().unwrap_or(LlmError::Provider {
                    message,
                    request_id: None,
                });
                EffectOutcome::Fail(TagwrightError::Llm(err))
            }

            Effect::Finish => EffectOutcome::Finish,
        }
    }

    /// Whole-response check before the response is accepted.
    async fn run_gate(&self) -> TurnEvent {
        let response = self.buffers.current_response();
        let report = validate_response(&response, &self.ctx);
        if report.accepted {
            return TurnEvent::GateChecked { correction: None };
        }

        let critical: Vec<Violation> = report.critical().cloned().collect();
        tracing::info!(
            chat_id = self.chat_id(),
            violations = critical.len(),
            "Final gate rejected response"
        );
        let decision = generate_correction(
            self.orchestrator.client.as_ref(),
            CorrectionRequest {
                violations: &critical,
                user_prompt: &self.request.prompt,
                response: &response,
                router_model: self.orchestrator.router.router_model(),
                excerpt_chars: self.orchestrator.guardrail.response_excerpt_chars,
            },
        )
        .await;

        match decision {
            CorrectionDecision::Retry { prompt } => TurnEvent::GateChecked {
                correction: Some(prompt),
            },
            CorrectionDecision::Skip { reason } => {
                tracing::debug!(chat_id = self.chat_id(), reason = reason.as_str(), "Gate correction skipped");
                TurnEvent::GateChecked { correction: None }
            }
        }
    }

    /// Problem report for the tree the turn's directives would produce.
    async fn check_problems(&self) -> Option<String> {
        let checker = self.orchestrator.problems.as_ref()?;
        let directives = parse_directives(&self.buffers.committed);

        let problems = async {
            let base = checker.base_tree(self.chat_id()).await?;
            let tree = base.apply_directives(&directives);
            checker.compute_problems(&tree).await
        }
        .await;

        match problems {
            Ok(problems) if problems.is_empty() => None,
            Ok(problems) => {
                tracing::info!(chat_id = self.chat_id(), problems = problems.len(), "Problems found");
                Some(format_problem_report(&problems))
            }
            Err(e) => {
                tracing::warn!(chat_id = self.chat_id(), "Problem check failed: {e:#}");
                None
            }
        }
    }

    async fn finish(mut self, counters: TurnCounters) -> TurnOutcome {
        self.buffers.commit();
        self.save_final_snapshot().await;

        let orchestrator = self.orchestrator;
        let chat_id = self.request.chat_id.clone();
        orchestrator.registry.clear_partial(&chat_id);

        let response = std::mem::take(&mut self.buffers.committed);
        let directives = parse_directives(&response);
        let extra_files = self
            .buffers
            .fix_start
            .map(|start| written_paths(&response[start..]))
            .unwrap_or_default();
        let updated_files = !directives.is_empty() && self.ctx.mode.allows_file_mutation();

        orchestrator.events.emit(ChatEvent::End {
            chat_id: chat_id.clone(),
            updated_files,
            extra_files: extra_files.clone(),
            error: None,
        });
        tracing::info!(
            chat_id = chat_id.as_str(),
            directives = directives.len(),
            corrections = counters.corrections,
            continuations = counters.continuations,
            fix_rounds = counters.fix_rounds,
            cancelled = self.cancelled,
            "Turn finished"
        );

        TurnOutcome {
            response,
            directives,
            cancelled: self.cancelled,
            model: self.route.model,
            counters,
            unresolved_problems: self.unresolved_problems,
            tool_calls: self.tool_calls,
            extra_files,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
        }
    }
}

/// Paths written or renamed into by the directives in `text`.
fn written_paths(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();
    for directive in parse_directives(text) {
        let path = match directive {
            Directive::Write { path, .. } => path,
            Directive::Rename { to, .. } => to,
            Directive::Delete { .. } | Directive::AddDependency { .. } => continue,
        };
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
    paths
}
