//! The agent: runs a query through its states until `EXIT`.

use std::collections::HashMap;
use std::sync::Arc;

use assemble_config::AgentConfig;
use assemble_core::error::{Error, Result};
use assemble_core::event::{AgentEvent, EventBus};
use assemble_core::llm::Usage;
use assemble_core::message::{Message, Query, Step};
use assemble_core::persona::Persona;
use assemble_memory::SharedMemory;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::retry::RetryPolicy;
use crate::runner::Runner;
use crate::state::{EXIT, IDLE, State, StateName, is_reserved};

/// Steps before the step-limit state is forced, by default.
pub const DEFAULT_STEP_LIMIT: usize = 10;

/// Name the agent records its final message under, by default.
pub const DEFAULT_AGENT_NAME: &str = "assemble";

pub struct Agent {
    name: String,
    persona: Arc<Persona>,
    memory: SharedMemory,
    states: HashMap<StateName, Arc<dyn State>>,
    default_initial_state: String,
    step_limit_state: String,
    step_limit: usize,
    current_state: String,
    step_count: usize,
    clear_scratch_pad_after_answer: bool,
    clear_data_after_answer: bool,
    runner: Runner,
    events: Arc<EventBus>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut states: Vec<_> = self.states.keys().map(StateName::as_str).collect();
        states.sort_unstable();
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("states", &states)
            .field("default_initial_state", &self.default_initial_state)
            .field("step_limit_state", &self.step_limit_state)
            .field("step_limit", &self.step_limit)
            .field("current_state", &self.current_state)
            .finish()
    }
}

impl Agent {
    /// Create an agent over a fixed set of states.
    ///
    /// Fails with a configuration error when `states` is empty, a state
    /// name is blank, reserved or duplicated, or `step_limit_state` is not
    /// one of the states.
    pub fn new(
        persona: Arc<Persona>,
        memory: SharedMemory,
        states: Vec<Arc<dyn State>>,
        default_initial_state: impl Into<String>,
        step_limit_state: impl Into<String>,
    ) -> Result<Self> {
        if states.is_empty() {
            return Err(Error::config("an agent needs at least one state"));
        }

        let mut registry = HashMap::with_capacity(states.len());
        for state in states {
            let name = StateName::new(state.name())?;
            if is_reserved(name.as_str()) {
                return Err(Error::config(format!(
                    "state name '{name}' is reserved"
                )));
            }
            if registry.contains_key(name.as_str()) {
                return Err(Error::config(format!("duplicate state name '{name}'")));
            }
            registry.insert(name, state);
        }

        let step_limit_state = step_limit_state.into();
        if !registry.contains_key(step_limit_state.as_str()) {
            return Err(Error::config(format!(
                "step limit state '{step_limit_state}' is not configured"
            )));
        }

        let events = Arc::new(EventBus::default());
        Ok(Self {
            name: DEFAULT_AGENT_NAME.to_string(),
            persona,
            memory,
            states: registry,
            default_initial_state: default_initial_state.into(),
            step_limit_state,
            step_limit: DEFAULT_STEP_LIMIT,
            current_state: IDLE.to_string(),
            step_count: 0,
            clear_scratch_pad_after_answer: false,
            clear_data_after_answer: false,
            runner: Runner::default().with_event_bus(events.clone()),
            events,
        })
    }

    /// Name recorded for the agent's final message.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
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

    pub fn with_runner(mut self, runner: Runner) -> Self {
        self.runner = runner.with_event_bus(self.events.clone());
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.runner = self.runner.with_retry_policy(retry);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.runner = self.runner.with_event_bus(events.clone());
        self.events = events;
        self
    }

    /// Apply the `[agent]` config section.
    pub fn with_config(self, config: &AgentConfig) -> Self {
        let runner = self
            .runner
            .clone()
            .with_context_handler_limit(config.context_handler_limit);
        self.with_name(&config.name)
            .with_step_limit(config.step_limit)
            .with_clear_scratch_pad_after_answer(config.clear_scratch_pad_after_answer)
            .with_clear_data_after_answer(config.clear_data_after_answer)
            .with_runner(runner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn memory(&self) -> SharedMemory {
        Arc::clone(&self.memory)
    }

    pub fn events(&self) -> Arc<EventBus> {
        Arc::clone(&self.events)
    }

    pub fn current_state(&self) -> &str {
        &self.current_state
    }

    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Run a query to completion and return the trace.
    pub async fn run(&mut self, query: Query) -> Result<Vec<Step>> {
        let run_id = Uuid::new_v4();
        let result = self.run_inner(run_id, query).await;
        if let Err(err) = &result {
            warn!(%run_id, state = %self.current_state, error = %err, "Run failed");
            self.events.publish(AgentEvent::RunFailed {
                run_id,
                error_message: err.to_string(),
                timestamp: Utc::now(),
            });
        }
        result
    }

    async fn run_inner(&mut self, run_id: Uuid, query: Query) -> Result<Vec<Step>> {
        let memory = Arc::clone(&self.memory);
        let mut memory = memory.lock().await;

        memory
            .data
            .add_message(Message::new(query.from_caller, query.goal));

        let initial_state = query
            .initial_state
            .unwrap_or_else(|| self.default_initial_state.clone());
        self.current_state = initial_state.clone();
        self.step_count = 0;

        info!(%run_id, agent = %self.name, initial_state = %initial_state, "Run started");
        self.events.publish(AgentEvent::RunStarted {
            run_id,
            agent: self.name.clone(),
            initial_state: initial_state.clone(),
            timestamp: Utc::now(),
        });

        let mut steps = Vec::new();
        while self.current_state != EXIT && self.states.contains_key(self.current_state.as_str()) {
            // `>=` so a limit of 3 runs three states plus the forced one (four steps).
            if self.step_count >= self.step_limit && self.current_state != self.step_limit_state {
                info!(
                    %run_id,
                    step_limit = self.step_limit,
                    forced_state = %self.step_limit_state,
                    "Step limit reached"
                );
                self.current_state = self.step_limit_state.clone();
            }

            let Some(state) = self.states.get(self.current_state.as_str()).cloned() else {
                break;
            };

            let started_at = Utc::now();
            let outcome = self
                .runner
                .execute(state.as_ref(), &self.persona, &mut memory)
                .await?;

            if !outcome.exclude_from_scratch_pad {
                if let Some(response) = &outcome.response {
                    memory.scratch_pad.push(format!(
                        "{}: {}",
                        state.name().to_uppercase(),
                        response
                    ));
                }
            }

            let next_state = if self.current_state == self.step_limit_state {
                EXIT.to_string()
            } else {
                outcome.next_state
            };

            if next_state != EXIT && !self.states.contains_key(next_state.as_str()) {
                return Err(Error::DanglingTransition {
                    from: self.current_state.clone(),
                    to: next_state,
                });
            }

            self.events.publish(AgentEvent::StepCompleted {
                run_id,
                state: self.current_state.clone(),
                next_state: next_state.clone(),
                usage: outcome.usage,
                timestamp: Utc::now(),
            });

            steps.push(Step {
                state_name: self.current_state.clone(),
                prompt: outcome.prompt,
                response: outcome.response,
                next_state: next_state.clone(),
                token_usage: outcome.usage,
                started_at,
                finished_at: Utc::now(),
            });
            self.step_count += 1;
            self.current_state = next_state;
        }

        if self.clear_scratch_pad_after_answer {
            memory.reset_scratch_pad();
        } else if self.clear_data_after_answer {
            memory.reset_data();
        }

        let Some(last) = steps.last() else {
            return Err(Error::EmptyRun { initial_state });
        };

        memory
            .data
            .add_message(Message::new(self.name.clone(), last.output()));

        let usage: Usage = steps.iter().map(|step| step.token_usage).sum();
        info!(%run_id, steps = steps.len(), total_tokens = usage.total_tokens, "Run finished");
        self.events.publish(AgentEvent::RunFinished {
            run_id,
            steps: steps.len(),
            usage,
            timestamp: Utc::now(),
        });

        Ok(steps)
    }
}
