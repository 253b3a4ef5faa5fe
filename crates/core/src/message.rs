//! Message, request and trace value objects.
//!
//! These flow through the whole system:
//! caller submits a `Query` → agent appends a `Message` → each executed
//! state produces a `Step` → the steps are returned as a `Response`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::llm::Usage;

/// Caller name used when a query doesn't say who sent it.
pub const DEFAULT_CALLER: &str = "user";

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message (a caller or an agent)
    pub name: String,

    /// The text content
    pub content: String,
}

impl Message {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.content)
    }
}

/// A request to run an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// What the caller wants answered
    pub goal: String,

    /// Name recorded for the caller in the conversation log
    #[serde(default = "default_caller")]
    pub from_caller: String,

    /// Start the run here instead of at the agent's default state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<String>,
}

fn default_caller() -> String {
    DEFAULT_CALLER.to_string()
}

impl Query {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            from_caller: default_caller(),
            initial_state: None,
        }
    }

    pub fn from_caller(mut self, caller: impl Into<String>) -> Self {
        self.from_caller = caller.into();
        self
    }

    pub fn with_initial_state(mut self, state: impl Into<String>) -> Self {
        self.initial_state = Some(state.into());
        self
    }
}

/// Immutable record of one executed state.
///
/// `prompt` and `response` are `None` when the state skipped generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub state_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    pub next_state: String,

    pub token_usage: Usage,

    pub started_at: DateTime<Utc>,

    pub finished_at: DateTime<Utc>,
}

impl Step {
    /// The step's output, or an empty string if it produced none.
    pub fn output(&self) -> &str {
        self.response.as_deref().unwrap_or_default()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetadata {
    pub steps: Vec<Step>,
}

/// The single value delivered to a caller for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub final_output: String,
    pub metadata: ResponseMetadata,
}

impl Response {
    /// Build a response whose final output is the last step's output.
    pub fn from_steps(steps: Vec<Step>) -> Self {
        let final_output = steps
            .last()
            .map(|step| step.output().to_string())
            .unwrap_or_default();
        Self {
            final_output,
            metadata: ResponseMetadata { steps },
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.metadata.steps
    }

    /// Token usage summed over every step.
    pub fn total_usage(&self) -> Usage {
        self.metadata.steps.iter().map(|step| step.token_usage).sum()
    }
}
