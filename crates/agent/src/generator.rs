//! Generator: an LLM port plus the settings one state generates with.

use std::sync::Arc;

use assemble_core::error::LlmError;
use assemble_core::llm::{Generation, GenerationOptions, LlmPort};

/// Tokens kept free below the context window by default.
pub const DEFAULT_SAFETY_BUFFER: usize = 512;

#[derive(Clone)]
pub struct Generator {
    llm: Arc<dyn LlmPort>,
    options: GenerationOptions,
    safety_buffer: usize,
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Generator")
            .field("llm", &self.llm.name())
            .field("options", &self.options)
            .field("safety_buffer", &self.safety_buffer)
            .finish()
    }
}

impl Generator {
    pub fn new(llm: Arc<dyn LlmPort>) -> Self {
        Self {
            llm,
            options: GenerationOptions::default(),
            safety_buffer: DEFAULT_SAFETY_BUFFER,
        }
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = temperature;
        self
    }

    /// Ask the backend for JSON-only output.
    pub fn json(mut self) -> Self {
        self.options.json_mode = true;
        self
    }

    pub fn with_safety_buffer(mut self, tokens: usize) -> Self {
        self.safety_buffer = tokens;
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn llm_name(&self) -> &str {
        self.llm.name()
    }

    pub async fn generate(&self, prompt: &str) -> Result<Generation, LlmError> {
        self.llm.generate(prompt, &self.options).await
    }

    /// Token count of `prompt` under the model's tokenizer.
    pub fn prompt_tokens(&self, prompt: &str) -> Result<usize, LlmError> {
        Ok(self.llm.tokenize(prompt)?.len())
    }

    /// `tokens(prompt) + safety_buffer > context_length`.
    pub fn exceeds_context(&self, prompt: &str) -> Result<bool, LlmError> {
        let tokens = self.prompt_tokens(prompt)?;
        Ok(tokens + self.safety_buffer > self.llm.context_length())
    }
}
