use super::step::WorkflowStep;
use crate::config::{RoutingConfig, RoutingPrecedence};
use crate::llm::ModelClient;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Task-type hint used to pick a model for a turn.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TaskType {
    Planning,
    Documentation,
    Coding,
    Testing,
    Debugging,
    General,
}

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify requests sent to a code-editing assistant. Reply with exactly one word \
from this list and nothing else: planning, documentation, coding, testing, debugging, general.";

const DEBUGGING_MARKERS: &[&str] = &[
    "error",
    "exception",
    "stack trace",
    "traceback",
    "bug",
    "crash",
    "doesn't work",
    "does not work",
    "broken",
    "failing",
];

const TESTING_MARKERS: &[&str] = &["unit test", "test case", "write tests", "add tests", "coverage"];
const DOCUMENTATION_MARKERS: &[&str] = &["readme", "documentation", "docs", "changelog"];
const PLANNING_MARKERS: &[&str] = &["plan", "roadmap", "architecture", "design"];

/// Why a model was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    DebuggingOverride,
    WorkflowStep,
    Classification,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub model: String,
    pub task_type: TaskType,
    pub source: RouteSource,
}

/// Keyword fallback used when the router model is unavailable.
pub fn heuristic_task_type(prompt: &str) -> TaskType {
    let lower = prompt.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|marker| lower.contains(marker));
    if has(DEBUGGING_MARKERS) {
        TaskType::Debugging
    } else if has(TESTING_MARKERS) {
        TaskType::Testing
    } else if has(DOCUMENTATION_MARKERS) {
        TaskType::Documentation
    } else if has(PLANNING_MARKERS) {
        TaskType::Planning
    } else {
        TaskType::General
    }
}

fn parse_classifier_reply(reply: &str) -> Option<TaskType> {
    let word = reply
        .split(|c: char| !c.is_ascii_alphabetic())
        .find(|token| !token.is_empty())?;
    TaskType::from_str(&word.to_ascii_lowercase()).ok()
}

/// Picks the model for a turn from the workflow step and prompt class.
pub struct ModelRouter {
    config: RoutingConfig,
}

impl ModelRouter {
    pub fn new(config: RoutingConfig) -> Self {
        Self { config }
    }

    pub fn router_model(&self) -> &str {
        &self.config.router_model
    }

    /// Whether a classification can change the routing outcome.
    pub fn needs_classification(&self, step: Option<WorkflowStep>) -> bool {
        self.config.debugging_model.is_some()
            || (step.is_none() && !self.config.task_models.is_empty())
    }

    /// Ask the router model for a task type, falling back to keywords.
    pub async fn classify_prompt(&self, client: &dyn ModelClient, prompt: &str) -> TaskType {
        match client
            .complete(CLASSIFIER_SYSTEM_PROMPT, prompt, &self.config.router_model)
            .await
        {
            Ok(reply) => parse_classifier_reply(&reply).unwrap_or_else(|| {
                tracing::debug!(reply = reply.as_str(), "Unparseable classifier reply");
                heuristic_task_type(prompt)
            }),
            Err(e) => {
                tracing::warn!("Prompt classification failed, using heuristic: {e}");
                heuristic_task_type(prompt)
            }
        }
    }

    /// Select a model. The debugging override only ever applies when a
    /// debugging model is configured.
    pub fn select(&self, step: Option<WorkflowStep>, classified: Option<TaskType>) -> RouteDecision {
        let debugging = classified == Some(TaskType::Debugging)
            && self.config.debugging_model.is_some();

        let by_debugging = || {
            self.config.debugging_model.as_ref().map(|model| RouteDecision {
                model: model.clone(),
                task_type: TaskType::Debugging,
                source: RouteSource::DebuggingOverride,
            })
        };
        let by_step = || {
            step.map(|s| {
                let task_type = s.task_type();
                RouteDecision {
                    model: self.model_for(task_type),
                    task_type,
                    source: RouteSource::WorkflowStep,
                }
            })
        };

        let chosen = match self.config.precedence {
            RoutingPrecedence::DebuggingFirst => {
                if debugging {
                    by_debugging().or_else(by_step)
                } else {
                    by_step()
                }
            }
            RoutingPrecedence::WorkflowFirst => {
                by_step().or_else(|| if debugging { by_debugging() } else { None })
            }
        };

        chosen.unwrap_or_else(|| match classified {
            Some(task_type) => RouteDecision {
                model: self.model_for(task_type),
                task_type,
                source: RouteSource::Classification,
            },
            None => RouteDecision {
                model: self.config.default_model.clone(),
                task_type: TaskType::General,
                source: RouteSource::Default,
            },
        })
    }

    fn model_for(&self, task_type: TaskType) -> String {
        self.config
            .task_models
            .get(task_type.as_ref())
            .cloned()
            .unwrap_or_else(|| self.config.default_model.clone())
    }
}
