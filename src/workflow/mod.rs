pub mod routing;
pub mod step;

pub use routing::{ModelRouter, RouteDecision, RouteSource, TaskType, heuristic_task_type};
pub use step::{StepGuidance, WorkflowState, WorkflowStatus, WorkflowStep};

use crate::store::ChatStore;
use anyhow::Result;
use std::sync::Arc;

/// Persisted per-conversation step machine.
///
/// All mutations go through `start`, `advance`, `force` and `stop`; the
/// state is read back from the store on every call, never cached.
pub struct WorkflowManager {
    store: Arc<dyn ChatStore>,
}

impl WorkflowManager {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    pub async fn state(&self, chat_id: &str) -> Result<WorkflowState> {
        self.store.read_workflow_state(chat_id).await
    }

    /// Always restarts at the first step.
    pub async fn start(&self, chat_id: &str) -> Result<WorkflowState> {
        let state = WorkflowState::active(WorkflowStep::first());
        self.store.write_workflow_state(chat_id, state).await?;
        tracing::info!(chat_id, step = %WorkflowStep::first(), "Workflow started");
        Ok(state)
    }

    /// Move to the next step; returns the new step, or `None` once the last
    /// step completes (or when no workflow is active).
    pub async fn advance(&self, chat_id: &str) -> Result<Option<WorkflowStep>> {
        let current = match self.store.read_workflow_state(chat_id).await? {
            WorkflowState::Idle => {
                tracing::warn!(chat_id, "advance called with no active workflow");
                return Ok(None);
            }
            WorkflowState::Active { current_step } => current_step,
        };

        let next = current.next();
        let state = next.map_or(WorkflowState::Idle, WorkflowState::active);
        self.store.write_workflow_state(chat_id, state).await?;
        match next {
            Some(step) => tracing::info!(chat_id, from = %current, to = %step, "Workflow advanced"),
            None => tracing::info!(chat_id, from = %current, "Workflow completed"),
        }
        Ok(next)
    }

    /// Jump to `step` regardless of the stored state. Does not read the
    /// stored row, so it also repairs an unreadable one.
    pub async fn force(&self, chat_id: &str, step: WorkflowStep) -> Result<WorkflowState> {
        let state = WorkflowState::active(step);
        self.store.write_workflow_state(chat_id, state).await?;
        tracing::info!(chat_id, step = %step, "Workflow forced");
        Ok(state)
    }

    pub async fn stop(&self, chat_id: &str) -> Result<()> {
        self.store
            .write_workflow_state(chat_id, WorkflowState::Idle)
            .await?;
        tracing::info!(chat_id, "Workflow stopped");
        Ok(())
    }

    /// Prompt fragment and task hint for the next turn, if a step is active.
    pub async fn turn_guidance(&self, chat_id: &str) -> Result<Option<StepGuidance>> {
        let state = self.store.read_workflow_state(chat_id).await?;
        Ok(state.current_step().map(StepGuidance::from))
    }
}
