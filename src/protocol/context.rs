use crate::workflow::WorkflowStep;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Conversation mode chosen by the user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatMode {
    /// Full editing: directives are applied to the project.
    #[default]
    Build,
    /// Read-only question answering.
    Ask,
    /// Tool-call driven; text directives are not accepted.
    Agent,
}

impl ChatMode {
    pub fn allows_file_mutation(self) -> bool {
        matches!(self, Self::Build)
    }
}

/// What a response is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DetectionContext {
    pub mode: ChatMode,
    pub workflow_step: Option<WorkflowStep>,
}

impl DetectionContext {
    pub fn new(mode: ChatMode, workflow_step: Option<WorkflowStep>) -> Self {
        Self {
            mode,
            workflow_step,
        }
    }

    /// Whether the turn may run the auto-fix loop.
    pub fn permits_auto_fix(&self) -> bool {
        self.mode.allows_file_mutation()
            && !matches!(self.workflow_step, Some(WorkflowStep::Planning))
    }
}
