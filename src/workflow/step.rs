use super::routing::TaskType;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// One phase of the fixed build sequence.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkflowStep {
    Planning,
    Docs,
    Frontend,
    Backend,
    Testing,
}

const PLANNING_PROMPT: &str = "\
## Workflow step: planning

You are planning the build. Produce a concise, ordered implementation plan covering \
data model, pages, API surface and tests. Do NOT emit any file directives in this step; \
the plan is reviewed before any file is touched.";

const DOCS_PROMPT: &str = "\
## Workflow step: documentation

Write or update project documentation only. You may emit <write> directives for \
Markdown or text files at the project root or under docs/. Source files must not be \
created, modified, renamed or deleted in this step.";

const FRONTEND_PROMPT: &str = "\
## Workflow step: frontend

Implement the user interface described in the plan: components, pages, routing and \
styling. Keep components small and typed. Use <write> directives with complete file \
contents.";

const BACKEND_PROMPT: &str = "\
## Workflow step: backend

Implement server-side logic, data access and API handlers described in the plan. \
Wire the frontend to the new endpoints. Use <write> directives with complete file \
contents and <add-dependency> for new packages.";

const TESTING_PROMPT: &str = "\
## Workflow step: testing

Add or update automated tests for the behaviour built in earlier steps and fix any \
defects they reveal. Use <write> directives with complete file contents.";

impl WorkflowStep {
    /// Fixed step order.
    pub const ORDER: [WorkflowStep; 5] = [
        WorkflowStep::Planning,
        WorkflowStep::Docs,
        WorkflowStep::Frontend,
        WorkflowStep::Backend,
        WorkflowStep::Testing,
    ];

    pub fn first() -> Self {
        Self::ORDER[0]
    }

    /// The step after `self`, or `None` for the last step.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Planning => Some(Self::Docs),
            Self::Docs => Some(Self::Frontend),
            Self::Frontend => Some(Self::Backend),
            Self::Backend => Some(Self::Testing),
            Self::Testing => None,
        }
    }

    /// Task-type hint used for model routing.
    pub fn task_type(self) -> TaskType {
        match self {
            Self::Planning => TaskType::Planning,
            Self::Docs => TaskType::Documentation,
            Self::Frontend | Self::Backend => TaskType::Coding,
            Self::Testing => TaskType::Testing,
        }
    }

    /// System-prompt fragment appended while this step is active.
    pub fn prompt_fragment(self) -> &'static str {
        match self {
            Self::Planning => PLANNING_PROMPT,
            Self::Docs => DOCS_PROMPT,
            Self::Frontend => FRONTEND_PROMPT,
            Self::Backend => BACKEND_PROMPT,
            Self::Testing => TESTING_PROMPT,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    Idle,
    Active,
}

/// Persisted per-conversation workflow position.
///
/// `current_step` only exists on the `Active` variant, so an idle state can
/// never carry a step and an active state always has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowState {
    #[default]
    Idle,
    Active { current_step: WorkflowStep },
}

impl WorkflowState {
    pub fn active(step: WorkflowStep) -> Self {
        Self::Active { current_step: step }
    }

    pub fn status(&self) -> WorkflowStatus {
        match self {
            Self::Idle => WorkflowStatus::Idle,
            Self::Active { .. } => WorkflowStatus::Active,
        }
    }

    pub fn current_step(&self) -> Option<WorkflowStep> {
        match self {
            Self::Idle => None,
            Self::Active { current_step } => Some(*current_step),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active { .. })
    }
}

/// What the active step contributes to the next model invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepGuidance {
    pub step: WorkflowStep,
    pub task_type: TaskType,
    pub prompt_fragment: &'static str,
}

impl From<WorkflowStep> for StepGuidance {
    fn from(step: WorkflowStep) -> Self {
        Self {
            step,
            task_type: step.task_type(),
            prompt_fragment: step.prompt_fragment(),
        }
    }
}
