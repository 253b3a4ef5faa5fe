//! LLM port: the abstraction over text-generation backends.
//!
//! The agent core only ever needs three capabilities from a model:
//! generate text for a prompt, count the tokens of a prompt, and report
//! the size of its context window.
//!
//! Implementations: OpenAI-compatible HTTP endpoints (OpenAI, OpenRouter,
//! Ollama, llama.cpp server), plus scripted mocks in tests.

use std::ops::{Add, AddAssign};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }
}

impl Add for Usage {
    type Output = Usage;

    fn add(mut self, rhs: Usage) -> Usage {
        self += rhs;
        self
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(rhs.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(rhs.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(rhs.total_tokens);
    }
}

impl std::iter::Sum for Usage {
    fn sum<I: Iterator<Item = Usage>>(iter: I) -> Self {
        iter.fold(Usage::zero(), Add::add)
    }
}

/// Per-call generation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Ask the backend to constrain output to a JSON object
    #[serde(default)]
    pub json_mode: bool,
}

fn default_temperature() -> f32 {
    0.1
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
            json_mode: false,
        }
    }
}

impl GenerationOptions {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Text and usage produced by one generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub text: String,
    pub usage: Usage,
}

impl Generation {
    pub fn new(text: impl Into<String>, usage: Usage) -> Self {
        Self {
            text: text.into(),
            usage,
        }
    }
}

/// The core LLM port.
///
/// `generate` may be called repeatedly with the same prompt (the agent
/// retries on failure), so implementations must not rely on call-once
/// side effects.
#[async_trait]
pub trait LlmPort: Send + Sync {
    /// The backend's name (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Generate a completion for a single prompt.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<Generation, LlmError>;

    /// Split text into model tokens. Counts only need to be approximate.
    fn tokenize(&self, text: &str) -> std::result::Result<Vec<u32>, LlmError>;

    /// Size of the model's context window, in tokens.
    fn context_length(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_adds_field_wise() {
        let mut usage = Usage::new(10, 5);
        usage += Usage {
            prompt_tokens: 1,
            completion_tokens: 2,
            total_tokens: 7,
        };
        assert_eq!(usage.prompt_tokens, 11);
        assert_eq!(usage.completion_tokens, 7);
        assert_eq!(usage.total_tokens, 22);
    }

    #[test]
    fn usage_sum_starts_from_zero() {
        let total: Usage = vec![Usage::new(1, 1), Usage::new(2, 3)].into_iter().sum();
        assert_eq!(total, Usage::new(3, 4));
        assert!(std::iter::empty::<Usage>().sum::<Usage>().is_zero());
    }

    #[test]
    fn generation_options_builders() {
        let options = GenerationOptions::default()
            .with_temperature(0.4)
            .with_max_tokens(256)
            .json();
        assert!((options.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(options.max_tokens, Some(256));
        assert!(options.json_mode);
    }
}
