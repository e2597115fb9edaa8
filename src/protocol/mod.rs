//! The tag protocol embedded in model output: parsing, violation
//! detection and whole-response validation.

pub mod context;
pub mod tags;
pub mod validator;
pub mod violations;

pub use context::{ChatMode, DetectionContext};
pub use tags::{
    Directive, ReasoningEscaper, TagScan, WriteBody, extract_chat_summary, has_unclosed_write,
    parse_directives, scan, strip_thinking,
};
pub use validator::{AuditSummary, ValidationReport, audit, validate_response};
pub use violations::{
    Severity, Violation, ViolationKind, detect, detect_mode_violation, detect_scanned,
};
