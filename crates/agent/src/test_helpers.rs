//! Shared test helpers: a scripted LLM, simple states and tools.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use assemble_core::error::{LlmError, Result, ToolError};
use assemble_core::llm::{Generation, GenerationOptions, LlmPort, Usage};
use assemble_core::persona::Persona;
use assemble_core::tool::{Tool, ToolBox};
use assemble_memory::Memory;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::generator::Generator;
use crate::state::State;
use crate::transition::Transition;

/// An LLM that replays scripted results in order.
///
/// Tokenizes one token per whitespace-separated word. Once the script
/// runs out every call fails with `InvalidResponse`.
pub struct ScriptedLlm {
    script: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<GenerationOptions>>,
    context_length: usize,
    usage: Usage,
}

impl ScriptedLlm {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn from_results(script: Vec<std::result::Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            context_length: 100_000,
            usage: Usage::new(10, 5),
        }
    }

    pub fn with_context_length(mut self, tokens: usize) -> Self {
        self.context_length = tokens;
        self
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_options(&self) -> Option<GenerationOptions> {
        self.options.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LlmPort for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<Generation, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.options.lock().unwrap().push(options.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(Generation::new(text, self.usage)),
            Some(Err(err)) => Err(err),
            None => Err(LlmError::InvalidResponse("script exhausted".into())),
        }
    }

    fn tokenize(&self, text: &str) -> std::result::Result<Vec<u32>, LlmError> {
        Ok((0..text.split_whitespace().count() as u32).collect())
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

pub fn generator(llm: &Arc<ScriptedLlm>) -> Generator {
    Generator::new(llm.clone())
}

/// A state that prompts with its name plus the scratch pad and always
/// moves to `next`.
pub struct FixedState {
    name: String,
    next: String,
    generator: Generator,
    tools: ToolBox,
    skip: bool,
}

impl FixedState {
    pub fn new(name: &str, next: &str, generator: Generator) -> Self {
        Self {
            name: name.into(),
            next: next.into(),
            generator,
            tools: ToolBox::new(),
            skip: false,
        }
    }

    /// Skip generation through `before_generation`.
    pub fn skipping(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn shared(self) -> Arc<dyn State> {
        Arc::new(self)
    }
}

#[async_trait]
impl State for FixedState {
    fn name(&self) -> &str {
        &self.name
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, persona: &Persona, memory: &Memory, _tools: &ToolBox) -> Result<String> {
        Ok(format!(
            "{}\n{}\n{}",
            persona.prompt(),
            self.name,
            memory.scratch_pad.render()
        ))
    }

    fn before_generation(&self, _memory: &Memory, _tools: &ToolBox) -> Option<Transition> {
        self.skip.then(|| Transition::to(&self.next))
    }

    async fn after_generation(
        &self,
        _response: &str,
        _memory: &mut Memory,
        _tools: &ToolBox,
    ) -> Result<Transition> {
        Ok(Transition::to(&self.next))
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct EchoInput {
    pub text: String,
}

pub struct EchoTool;

#[async_trait]
impl Tool for EchoTool {
    type Input = EchoInput;
    type Output = String;

    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input"
    }

    async fn run(&self, input: EchoInput) -> std::result::Result<String, ToolError> {
        Ok(input.text)
    }
}

/// Echo whose input never reaches the scratch pad.
pub struct SecretEchoTool;

#[async_trait]
impl Tool for SecretEchoTool {
    type Input = EchoInput;
    type Output = String;

    fn name(&self) -> &str {
        "secret_echo"
    }

    fn description(&self) -> &str {
        "Echoes back the input without recording it"
    }

    fn exclude_input_from_scratch_pad(&self) -> bool {
        true
    }

    async fn run(&self, input: EchoInput) -> std::result::Result<String, ToolError> {
        Ok(input.text)
    }
}

pub fn echo_tools() -> ToolBox {
    let mut tools = ToolBox::new();
    tools.register(EchoTool).unwrap();
    tools.register(SecretEchoTool).unwrap();
    tools
}
