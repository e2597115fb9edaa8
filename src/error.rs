use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `tagwright`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum TagwrightError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Model client ────────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Persistence ─────────────────────────────────────────────────────
    #[error("store: {0}")]
    Store(#[from] StoreError),

    // ── Turn orchestration ──────────────────────────────────────────────
    #[error("turn: {0}")]
    Turn(#[from] TurnError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Model client errors ────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    /// Raw provider failure, surfaced verbatim to the user.
    #[error("{}", format_provider_message(.message, .request_id.as_deref()))]
    Provider {
        message: String,
        request_id: Option<String>,
    },

    #[error("router model {model} timed out after {timeout_ms}ms")]
    RouterTimeout { model: String, timeout_ms: u64 },
}

fn format_provider_message(message: &str, request_id: Option<&str>) -> String {
    match request_id {
        Some(id) if !id.is_empty() => format!("[request {id}] {message}"),
        _ => message.to_string(),
    }
}

impl LlmError {
    /// Normalize an arbitrary client error into a provider failure.
    pub fn from_client(err: anyhow::Error) -> Self {
        match err.downcast::<LlmError>() {
            Ok(llm) => llm,
            Err(other) => LlmError::Provider {
                message: format!("{other:#}"),
                request_id: None,
            },
        }
    }
}

// ─── Persistence errors ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unknown workflow step persisted for {chat_id}: {raw}")]
    UnknownStep { chat_id: String, raw: String },
}

// ─── Turn errors ────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("a stream is already active for chat {chat_id}")]
    AlreadyStreaming { chat_id: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, TagwrightError>;
