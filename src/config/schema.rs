use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use strum::{Display, EnumString};

// ── Top-level config ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to config.toml - computed from home, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Default tracing filter; `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub guardrail: GuardrailConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            log_level: default_log_level(),
            guardrail: GuardrailConfig::default(),
            routing: RoutingConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

// ── Guardrails ────────────────────────────────────────────────────

/// Which monitor watches the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MonitorKind {
    /// Canned corrections, no extra model call.
    #[default]
    Fast,
    /// Corrections written by the router model.
    Streaming,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailConfig {
    #[serde(default)]
    pub monitor: MonitorKind,
    #[serde(default = "default_max_attempts")]
    pub max_correction_attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_continuation_attempts: u32,
    #[serde(default = "default_max_attempts")]
    pub max_auto_fix_rounds: u32,
    /// Minimum gap between persisted snapshots while streaming.
    #[serde(default = "default_snapshot_interval_ms")]
    pub snapshot_interval_ms: u64,
    /// Prefix of the offending response shown to the corrective agent.
    #[serde(default = "default_response_excerpt_chars")]
    pub response_excerpt_chars: usize,
    #[serde(default = "default_router_timeout_ms")]
    pub router_timeout_ms: u64,
    /// Re-validate the finished response before accepting it.
    #[serde(default = "default_true")]
    pub final_gate: bool,
}

fn default_max_attempts() -> u32 {
    2
}

fn default_snapshot_interval_ms() -> u64 {
    150
}

fn default_response_excerpt_chars() -> usize {
    1000
}

fn default_router_timeout_ms() -> u64 {
    15_000
}

fn default_true() -> bool {
    true
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorKind::default(),
            max_correction_attempts: default_max_attempts(),
            max_continuation_attempts: default_max_attempts(),
            max_auto_fix_rounds: default_max_attempts(),
            snapshot_interval_ms: default_snapshot_interval_ms(),
            response_excerpt_chars: default_response_excerpt_chars(),
            router_timeout_ms: default_router_timeout_ms(),
            final_gate: true,
        }
    }
}

// ── Model routing ─────────────────────────────────────────────────

/// Which signal wins when a workflow step is active and the prompt is
/// classified as debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RoutingPrecedence {
    #[default]
    DebuggingFirst,
    WorkflowFirst,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Secondary model for classification and corrections.
    #[serde(default = "default_router_model")]
    pub router_model: String,
    #[serde(default)]
    pub debugging_model: Option<String>,
    /// Task type (`planning`, `coding`, ...) to model name.
    #[serde(default)]
    pub task_models: BTreeMap<String, String>,
    #[serde(default)]
    pub precedence: RoutingPrecedence,
}

fn default_model() -> String {
    "claude-sonnet-4-5".into()
}

fn default_router_model() -> String {
    "claude-haiku-4-5".into()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_model: default_model(),
            router_model: default_router_model(),
            debugging_model: None,
            task_models: BTreeMap::new(),
            precedence: RoutingPrecedence::default(),
        }
    }
}

// ── Persistence ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// SQLite database file. Empty means `<config dir>/tagwright.db`.
    #[serde(default)]
    pub path: Option<PathBuf>,
}
