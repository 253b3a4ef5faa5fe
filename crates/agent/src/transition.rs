//! Transition and step outcome values.

use assemble_core::llm::Usage;

use crate::state::EXIT;

/// What a state decided after interpreting a response.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next_state: String,

    /// Replaces the raw model text in the trace and scratch pad.
    pub updated_response: Option<String>,

    /// Tokens spent by the state itself, added to the step's usage.
    pub extra_usage: Option<Usage>,

    pub exclude_from_scratch_pad: bool,
}

impl Transition {
    pub fn to(next_state: impl Into<String>) -> Self {
        Self {
            next_state: next_state.into(),
            updated_response: None,
            extra_usage: None,
            exclude_from_scratch_pad: false,
        }
    }

    pub fn exit() -> Self {
        Self::to(EXIT)
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.updated_response = Some(response.into());
        self
    }

    pub fn with_extra_usage(mut self, usage: Usage) -> Self {
        self.extra_usage = Some(usage);
        self
    }

    pub fn excluded_from_scratch_pad(mut self) -> Self {
        self.exclude_from_scratch_pad = true;
        self
    }
}

/// Result of executing one state through the runner.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub next_state: String,

    /// `None` when the state skipped generation.
    pub prompt: Option<String>,

    pub response: Option<String>,

    pub usage: Usage,

    pub exclude_from_scratch_pad: bool,
}

impl StepOutcome {
    /// A state that short-circuited before building a prompt.
    pub fn skipped(next_state: impl Into<String>) -> Self {
        Self {
            next_state: next_state.into(),
            prompt: None,
            response: None,
            usage: Usage::zero(),
            exclude_from_scratch_pad: true,
        }
    }
}
