//! ReAct agent assembly: Thought → Action → Observe, then a final answer.
//!
//! The builder wires the library states into an [`Agent`] with
//! `thought` as the default initial state and `final_answer` as the
//! step-limit state. Optional pre-steps run first: `summarize_messages`
//! condenses the conversation and `rewrite_question` turns follow-up
//! messages into standalone questions.

use std::sync::Arc;

use assemble_config::{AgentConfig, AppConfig};
use assemble_core::error::Result;
use assemble_core::event::EventBus;
use assemble_core::llm::LlmPort;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{DropOldestStrategy, Memory, SharedMemory, TruncateStrategy};
use tracing::debug;

use crate::agent::{Agent, DEFAULT_STEP_LIMIT};
use crate::generator::{DEFAULT_SAFETY_BUFFER, Generator};
use crate::retry::RetryPolicy;
use crate::runner::Runner;
use crate::state::State;
use crate::states::{
    ActionState, FINAL_ANSWER, FinalAnswerState, ObserveState, REWRITE_QUESTION,
    RewriteQuestionState, SUMMARIZE_MESSAGES, SummarizeMessagesState, THOUGHT, ThoughtState,
};

/// Temperature for the reasoning states.
pub const REASONING_TEMPERATURE: f32 = 0.1;

/// Temperature for the final answer.
pub const ANSWER_TEMPERATURE: f32 = 0.3;

pub struct ReactAgentBuilder {
    /// LLM shared by every state.
    llm: Arc<dyn LlmPort>,
    /// Tools offered to the thought and action states.
    tools: ToolBox,
    persona: Persona,
    /// Memory to run against; a fresh one when unset.
    memory: Option<SharedMemory>,
    step_limit: usize,
    clear_scratch_pad_after_answer: bool,
    clear_data_after_answer: bool,
    retry: RetryPolicy,
    /// Prepend a `rewrite_question` step.
    rewrite_question: bool,
    /// Prepend a `summarize_messages` step.
    summarize_messages: bool,
    reasoning_temperature: f32,
    answer_temperature: f32,
    safety_buffer: usize,
    /// Name and context-loop settings from config, when built from it.
    agent_config: Option<AgentConfig>,
    events: Option<Arc<EventBus>>,
}

impl ReactAgentBuilder {
    pub fn new(llm: Arc<dyn LlmPort>, tools: ToolBox) -> Self {
        Self {
            llm,
            tools,
            persona: Persona::default(),
            memory: None,
            step_limit: DEFAULT_STEP_LIMIT,
            clear_scratch_pad_after_answer: false,
            clear_data_after_answer: false,
            retry: RetryPolicy::default(),
            rewrite_question: false,
            summarize_messages: false,
            reasoning_temperature: REASONING_TEMPERATURE,
            answer_temperature: ANSWER_TEMPERATURE,
            safety_buffer: DEFAULT_SAFETY_BUFFER,
            agent_config: None,
            events: None,
        }
    }

    /// Builder preloaded from the application config: persona, step
    /// limit, clear flags, retry, eviction strategy and token buffer.
    pub fn from_config(llm: Arc<dyn LlmPort>, tools: ToolBox, config: &AppConfig) -> Self {
        let agent = &config.agent;
        let memory = match agent.eviction.as_str() {
            "drop_oldest" => {
                Memory::with_eviction(DropOldestStrategy::new(agent.eviction_drop_count))
            }
            _ => Memory::with_eviction(TruncateStrategy),
        };

        let mut builder = Self::new(llm, tools)
            .with_memory(memory.shared())
            .with_step_limit(agent.step_limit)
            .with_clear_scratch_pad_after_answer(agent.clear_scratch_pad_after_answer)
            .with_clear_data_after_answer(agent.clear_data_after_answer)
            .with_retry_policy(RetryPolicy::from_config(&config.retry))
            .with_reasoning_temperature(config.default_temperature)
            .with_safety_buffer(agent.token_limit_buffer);
        if let Some(persona) = &agent.persona {
            builder = builder.with_persona(Persona::new(persona.as_str()));
        }
        builder.agent_config = Some(agent.clone());
        builder
    }

    pub fn with_persona(mut self, persona: Persona) -> Self {
        self.persona = persona;
        self
    }

    pub fn with_memory(mut self, memory: SharedMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn with_step_limit(mut self, limit: usize) -> Self {
        self.step_limit = limit;
        self
    }

    pub fn with_clear_scratch_pad_after_answer(mut self, clear: bool) -> Self {
        self.clear_scratch_pad_after_answer = clear;
        self
    }

    pub fn with_clear_data_after_answer(mut self, clear: bool) -> Self {
        self.clear_data_after_answer = clear;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Start each run by rewriting the latest message against the history.
    pub fn with_rewrite_question(mut self, enabled: bool) -> Self {
        self.rewrite_question = enabled;
        self
    }

    /// Start each run by summarizing the conversation; the thought state
    /// then prompts with the summary instead of the full history.
    pub fn with_summarize_messages(mut self, enabled: bool) -> Self {
        self.summarize_messages = enabled;
        self
    }

    pub fn with_reasoning_temperature(mut self, temperature: f32) -> Self {
        self.reasoning_temperature = temperature;
        self
    }

    pub fn with_answer_temperature(mut self, temperature: f32) -> Self {
        self.answer_temperature = temperature;
        self
    }

    pub fn with_safety_buffer(mut self, tokens: usize) -> Self {
        self.safety_buffer = tokens;
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    fn generator(&self, temperature: f32) -> Generator {
        Generator::new(Arc::clone(&self.llm))
            .with_temperature(temperature)
            .with_safety_buffer(self.safety_buffer)
    }

    pub fn build(self) -> Result<Agent> {
        let reasoning = self.generator(self.reasoning_temperature);
        let mut states: Vec<Arc<dyn State>> = vec![
            Arc::new(ThoughtState::new(reasoning.clone(), self.tools.clone())),
            Arc::new(ActionState::new(reasoning.clone(), self.tools.clone())),
            Arc::new(ObserveState::new(reasoning.clone(), self.tools.clone())),
            Arc::new(FinalAnswerState::new(self.generator(self.answer_temperature))),
        ];

        let mut initial_state = THOUGHT;
        if self.rewrite_question {
            states.push(Arc::new(RewriteQuestionState::new(initial_state, reasoning.clone())));
            initial_state = REWRITE_QUESTION;
        }
        if self.summarize_messages {
            states.push(Arc::new(SummarizeMessagesState::new(initial_state, reasoning)));
            initial_state = SUMMARIZE_MESSAGES;
        }

        debug!(
            llm = self.llm.name(),
            tools = ?self.tools.names(),
            initial_state,
            "Building ReAct agent"
        );

        let memory = self.memory.unwrap_or_else(|| Memory::new().shared());
        let mut agent = Agent::new(
            Arc::new(self.persona),
            memory,
            states,
            initial_state,
            FINAL_ANSWER,
        )?;
        if let Some(events) = self.events {
            agent = agent.with_event_bus(events);
        }
        let mut runner = Runner::new(self.retry);
        if let Some(config) = &self.agent_config {
            runner = runner.with_context_handler_limit(config.context_handler_limit);
            agent = agent.with_name(&config.name);
        }

        Ok(agent
            .with_runner(runner)
            .with_step_limit(self.step_limit)
            .with_clear_scratch_pad_after_answer(self.clear_scratch_pad_after_answer)
            .with_clear_data_after_answer(self.clear_data_after_answer))
    }
}
