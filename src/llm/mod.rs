// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod streaming;
pub mod traits;
pub mod types;

// ── Infrastructure re-exports ───────────────────────────────────────────────
pub use streaming::{
    CollectedResponse, ProviderStream, StreamCollector, StreamEvent, text_to_events,
};
pub use traits::{ModelClient, ModelRequest};
pub use types::{ContentBlock, MessageRole, ProviderMessage, StopReason, ToolSpec};
