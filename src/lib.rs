#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::unnecessary_literal_bound,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::new_without_default,
    clippy::return_self_not_must_use
)]

pub mod config;
pub mod error;
pub mod guardrail;
pub mod llm;
pub mod orchestrator;
pub mod protocol;
pub mod store;
pub mod workflow;

pub use config::Config;
pub use error::{Result, TagwrightError};
pub use orchestrator::{StreamOrchestrator, TurnOutcome, TurnRequest};
