//! Pure turn state machine. The driver in `turn.rs` performs the I/O each
//! [`Effect`] asks for and feeds the outcome back as a [`TurnEvent`].

use crate::config::GuardrailConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Phase {
    /// A primary stream is in flight and monitored.
    #[default]
    Streaming,
    /// The stream was cancelled to restart with `correction`.
    AbortingForCorrection { correction: String },
    /// Finishing a `write` the previous stream left open.
    ContinuingUnclosedWrite,
    /// Whole-response validation before acceptance.
    Gating,
    CheckingProblems,
    /// A fix-round stream is in flight and monitored.
    AutoFixing,
    Finished,
}

impl Phase {
    fn is_monitored(&self) -> bool {
        matches!(self, Self::Streaming | Self::AutoFixing)
    }

    fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::Streaming | Self::ContinuingUnclosedWrite | Self::AutoFixing
        )
    }
}

/// Retry usage within one user turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnCounters {
    pub corrections: u32,
    pub continuations: u32,
    pub fix_rounds: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnState {
    pub phase: Phase,
    pub counters: TurnCounters,
    /// Whether the latest response adds packages.
    pub adds_dependencies: bool,
}

impl TurnState {
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnLimits {
    pub max_correction_attempts: u32,
    pub max_continuation_attempts: u32,
    pub max_auto_fix_rounds: u32,
    pub final_gate: bool,
    pub auto_fix: bool,
}

impl TurnLimits {
    pub fn from_config(config: &GuardrailConfig, auto_fix: bool) -> Self {
        Self {
            max_correction_attempts: config.max_correction_attempts,
            max_continuation_attempts: config.max_continuation_attempts,
            max_auto_fix_rounds: config.max_auto_fix_rounds,
            final_gate: config.final_gate,
            auto_fix,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    ViolationFlagged { correction: String },
    StreamEnded {
        unclosed_write: bool,
        adds_dependencies: bool,
    },
    GateChecked { correction: Option<String> },
    ProblemsChecked { report: Option<String> },
    Cancelled,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    AbortStream,
    RestartWithCorrection { correction: String },
    RequestContinuation,
    RunGate,
    CheckProblems,
    RequestFix { report: String },
    AnnotateProblems { report: String },
    PersistCancelled,
    Fail { message: String },
    Finish,
}

fn finish(mut state: TurnState, mut effects: Vec<Effect>) -> (TurnState, Vec<Effect>) {
    state.phase = Phase::Finished;
    effects.push(Effect::Finish);
    (state, effects)
}

fn after_gate(mut state: TurnState, limits: &TurnLimits) -> (TurnState, Vec<Effect>) {
    if limits.auto_fix && limits.max_auto_fix_rounds > 0 && !state.adds_dependencies {
        state.phase = Phase::CheckingProblems;
        (state, vec![Effect::CheckProblems])
    } else {
        finish(state, Vec::new())
    }
}

/// Advance the turn. Events that make no sense in the current phase leave
/// the state untouched and produce no effects.
pub fn transition(
    mut state: TurnState,
    event: TurnEvent,
    limits: &TurnLimits,
) -> (TurnState, Vec<Effect>) {
    if state.is_finished() {
        return (state, Vec::new());
    }

    match event {
        TurnEvent::ViolationFlagged { correction } => {
            if state.phase.is_monitored()
                && state.counters.corrections < limits.max_correction_attempts
            {
                state.counters.corrections += 1;
                state.phase = Phase::AbortingForCorrection { correction };
                (state, vec![Effect::AbortStream])
            } else {
                (state, Vec::new())
            }
        }

        TurnEvent::StreamEnded {
            unclosed_write,
            adds_dependencies,
        } => {
            if let Phase::AbortingForCorrection { correction } = &state.phase {
                let correction = correction.clone();
                state.phase = Phase::Streaming;
                return (state, vec![Effect::RestartWithCorrection { correction }]);
            }
            if !state.phase.is_streaming() {
                return (state, Vec::new());
            }

            state.adds_dependencies = adds_dependencies;
            if unclosed_write && state.counters.continuations < limits.max_continuation_attempts {
                state.counters.continuations += 1;
                state.phase = Phase::ContinuingUnclosedWrite;
                (state, vec![Effect::RequestContinuation])
            } else if limits.final_gate
                && state.counters.corrections < limits.max_correction_attempts
            {
                state.phase = Phase::Gating;
                (state, vec![Effect::RunGate])
            } else {
                after_gate(state, limits)
            }
        }

        TurnEvent::GateChecked { correction } => {
            if state.phase != Phase::Gating {
                return (state, Vec::new());
            }
            match correction {
                Some(correction) => {
                    state.counters.corrections += 1;
                    state.phase = Phase::Streaming;
                    (state, vec![Effect::RestartWithCorrection { correction }])
                }
                None => after_gate(state, limits),
            }
        }

        TurnEvent::ProblemsChecked { report } => {
            if state.phase != Phase::CheckingProblems {
                return (state, Vec::new());
            }
            match report {
                None => finish(state, Vec::new()),
                Some(report) if state.counters.fix_rounds < limits.max_auto_fix_rounds => {
                    state.counters.fix_rounds += 1;
                    state.phase = Phase::AutoFixing;
                    (state, vec![Effect::RequestFix { report }])
                }
                Some(report) => finish(state, vec![Effect::AnnotateProblems { report }]),
            }
        }

        TurnEvent::Cancelled => finish(state, vec![Effect::PersistCancelled]),

        TurnEvent::Failed { message } => {
            state.phase = Phase::Finished;
            (state, vec![Effect::Fail { message }])
        }
    }
}
