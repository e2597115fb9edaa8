//! The stream orchestrator: runs one guarded model stream per turn and
//! recovers from protocol violations, unclosed writes and reported
//! problems within bounded retry budgets.

pub mod abort;
pub mod events;
pub mod machine;
pub mod problems;
pub mod registry;
pub mod turn;

pub use abort::{AbortReason, AbortSignal};
pub use events::{ChannelEventSink, ChatEvent, ChatEventSink, NullEventSink};
pub use machine::{Effect, Phase, TurnCounters, TurnEvent, TurnLimits, TurnState, transition};
pub use problems::{
    Problem, ProblemChecker, VirtualFileTree, format_fix_prompt, format_problem_report,
};
pub use registry::StreamRegistry;
pub use turn::{StreamOrchestrator, ToolCallRecord, TurnOutcome, TurnRequest};
