//! Real-time guardrails: monitors that watch a streaming response and the
//! corrective agent used when a finished response is rejected.

pub mod corrections;
pub mod corrective;
pub mod fast;
pub mod monitor;
pub mod state;
pub mod streaming;

pub use corrections::{canned_correction, router_instruction};
pub use corrective::{CorrectionDecision, CorrectionRequest, extract_instruction, generate_correction};
pub use fast::FastMonitor;
pub use monitor::ActiveMonitor;
pub use state::{MonitorState, MonitorVerdict};
pub use streaming::StreamingMonitor;
