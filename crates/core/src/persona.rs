//! Persona: the immutable description injected at the top of every prompt.

use serde::{Deserialize, Serialize};

/// Default persona for reasoning agents.
pub const DEFAULT_PERSONA: &str = "You're a helpful assistant. You solve problems by breaking them down into \
multiple steps, thinking on those steps, acting on them, and observing. Given the problem, you will use \
your tools to solve it in as few steps as possible.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    description: String,
}

impl Persona {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Render the persona as prompt text.
    pub fn prompt(&self) -> &str {
        self.description.trim()
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(DEFAULT_PERSONA)
    }
}
