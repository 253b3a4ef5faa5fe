//! Runner: executes one state end to end.
//!
//! For each attempt the runner:
//!
//! 1. Lets the state skip generation via `before_generation`
//! 2. Builds the prompt, evicting memory until it fits the context window
//! 3. Generates a response
//! 4. Hands the response to `after_generation`
//!
//! Any error in an attempt is retried under the injected [`RetryPolicy`].
//! Running out of memory to evict is not an error: the state is ended
//! with a forced transition to `EXIT`.

use std::sync::Arc;

use assemble_core::error::Result;
use assemble_core::event::{AgentEvent, EventBus};
use assemble_core::llm::Usage;
use assemble_core::persona::Persona;
use assemble_memory::{EvictionError, Memory};
use chrono::Utc;
use tracing::{debug, info, warn};

use crate::retry::RetryPolicy;
use crate::state::{EXIT, State};
use crate::transition::StepOutcome;

/// Evict-and-rebuild rounds allowed per state execution by default.
pub const DEFAULT_CONTEXT_HANDLER_LIMIT: usize = 50;

/// Response recorded when the prompt can no longer be made to fit.
pub const CONTEXT_EXHAUSTED_RESPONSE: &str =
    "Unable to generate anymore: the prompt no longer fits in the model's context window.";

/// Outcome of fitting a prompt into the context window.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextCheck {
    /// Generate with this prompt.
    Ready(String),
    /// Memory could not shrink further; `prompt` is the last one built.
    Exhausted { prompt: String, reason: EvictionError },
}

#[derive(Debug, Clone)]
pub struct Runner {
    retry: RetryPolicy,
    context_handler_limit: usize,
    events: Arc<EventBus>,
}

impl Default for Runner {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl Runner {
    pub fn new(retry: RetryPolicy) -> Self {
        Self {
            retry,
            context_handler_limit: DEFAULT_CONTEXT_HANDLER_LIMIT,
            events: Arc::new(EventBus::default()),
        }
    }

    /// A limit of zero is treated as one.
    pub fn with_context_handler_limit(mut self, limit: usize) -> Self {
        self.context_handler_limit = limit.max(1);
        self
    }

    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Replace the retry policy, keeping the other settings.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn context_handler_limit(&self) -> usize {
        self.context_handler_limit
    }

    /// Execute `state` once, retrying failed attempts.
    pub async fn execute(
        &self,
        state: &dyn State,
        persona: &Persona,
        memory: &mut Memory,
    ) -> Result<StepOutcome> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;
        loop {
            match self.attempt(state, persona, memory).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) => {
                    self.events.publish(AgentEvent::AttemptFailed {
                        state: state.name().to_string(),
                        attempt,
                        max_attempts,
                        error_message: err.to_string(),
                        timestamp: Utc::now(),
                    });

                    if attempt >= max_attempts {
                        warn!(
                            state = state.name(),
                            attempts = attempt,
                            error = %err,
                            "State failed on every attempt"
                        );
                        return Err(err);
                    }

                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        state = state.name(),
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "State attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(
        &self,
        state: &dyn State,
        persona: &Persona,
        memory: &mut Memory,
    ) -> Result<StepOutcome> {
        let tools = state.tools();

        if let Some(transition) = state.before_generation(memory, tools) {
            debug!(
                state = state.name(),
                next_state = %transition.next_state,
                "Skipping generation"
            );
            return Ok(StepOutcome::skipped(transition.next_state));
        }

        let prompt = match self.check_context(state, persona, memory)? {
            ContextCheck::Ready(prompt) => prompt,
            ContextCheck::Exhausted { prompt, reason } => {
                warn!(state = state.name(), %reason, "Context exhausted, ending run");
                return Ok(StepOutcome {
                    next_state: EXIT.to_string(),
                    prompt: Some(prompt),
                    response: Some(CONTEXT_EXHAUSTED_RESPONSE.to_string()),
                    usage: Usage::zero(),
                    exclude_from_scratch_pad: true,
                });
            }
        };

        debug!(state = state.name(), prompt = %prompt, "Generating");
        let generation = state.generator().generate(&prompt).await?;
        let transition = state
            .after_generation(&generation.text, memory, tools)
            .await?;

        let mut usage = generation.usage;
        if let Some(extra) = transition.extra_usage {
            usage += extra;
        }

        info!(
            state = state.name(),
            next_state = %transition.next_state,
            total_tokens = usage.total_tokens,
            "State executed"
        );

        Ok(StepOutcome {
            next_state: transition.next_state,
            prompt: Some(prompt),
            response: Some(transition.updated_response.unwrap_or(generation.text)),
            usage,
            exclude_from_scratch_pad: transition.exclude_from_scratch_pad,
        })
    }

    /// Build the prompt, evicting memory while it exceeds the context budget.
    ///
    /// Gives up after the context handler limit and proceeds with the last
    /// prompt built, oversized or not.
    pub fn check_context(
        &self,
        state: &dyn State,
        persona: &Persona,
        memory: &mut Memory,
    ) -> Result<ContextCheck> {
        let tools = state.tools();
        let generator = state.generator();
        let mut prompt = state.build_prompt(persona, memory, tools)?;

        for _ in 0..self.context_handler_limit {
            if !generator.exceeds_context(&prompt)? {
                return Ok(ContextCheck::Ready(prompt));
            }

            if let Err(reason) = memory.evict() {
                return Ok(ContextCheck::Exhausted { prompt, reason });
            }

            self.events.publish(AgentEvent::ContextEvicted {
                state: state.name().to_string(),
                remaining_notes: memory.scratch_pad.len(),
                timestamp: Utc::now(),
            });
            prompt = state.build_prompt(persona, memory, tools)?;
        }

        if generator.exceeds_context(&prompt)? {
            warn!(
                state = state.name(),
                limit = self.context_handler_limit,
                "Context handler limit reached, generating with an oversized prompt"
            );
        }
        Ok(ContextCheck::Ready(prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FixedState, ScriptedLlm, generator};
    use assemble_core::error::{Error, LlmError};
    use std::time::Duration;

    fn fast_retry(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(
            attempts,
            Duration::from_millis(1),
            2.0,
            Duration::from_millis(4),
        )
    }

    #[tokio::test]
    async fn executes_state_and_records_prompt() {
        let llm = Arc::new(ScriptedLlm::new(["some text"]));
        let state = FixedState::new("a", "b", generator(&llm));
        let mut memory = Memory::new();

        let outcome = Runner::new(RetryPolicy::none())
            .execute(&state, &Persona::new("persona"), &mut memory)
            .await
            .unwrap();
        assert_eq!(outcome.next_state, "b");
        assert_eq!(outcome.response.as_deref(), Some("some text"));
        assert_eq!(outcome.prompt.as_deref(), Some("persona\na\n"));
        assert_eq!(outcome.usage, Usage::new(10, 5));
        assert!(!outcome.exclude_from_scratch_pad);
    }

    #[tokio::test]
    async fn guard_skips_generation() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<&str>::new()));
        let state = FixedState::new("a", "b", generator(&llm)).skipping();
        let mut memory = Memory::new();

        let outcome = Runner::default()
            .execute(&state, &Persona::default(), &mut memory)
            .await
            .unwrap();
        assert_eq!(outcome, StepOutcome::skipped("b"));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried() {
        let llm = Arc::new(ScriptedLlm::from_results(vec![
            Err(LlmError::Network("reset".into())),
            Err(LlmError::RateLimited { retry_after_secs: 1 }),
            Ok("recovered".into()),
        ]));
        let state = FixedState::new("a", "b", generator(&llm));
        let events = Arc::new(EventBus::new(16));
        let mut rx = events.subscribe();
        let mut memory = Memory::new();

        let outcome = Runner::default()
            .with_event_bus(events.clone())
            .execute(&state, &Persona::default(), &mut memory)
            .await
            .unwrap();
        assert_eq!(outcome.response.as_deref(), Some("recovered"));
        assert_eq!(llm.call_count(), 3);

        for expected in 1..=2 {
            match rx.recv().await.unwrap().as_ref() {
                AgentEvent::AttemptFailed {
                    attempt,
                    max_attempts,
                    ..
                } => {
                    assert_eq!(*attempt, expected);
                    assert_eq!(*max_attempts, 5);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn exhausted_attempts_return_last_error() {
        let llm = Arc::new(ScriptedLlm::from_results(vec![
            Err(LlmError::Network("first".into())),
            Err(LlmError::Timeout("second".into())),
        ]));
        let state = FixedState::new("a", "b", generator(&llm));
        let mut memory = Memory::new();

        let err = Runner::new(fast_retry(2))
            .execute(&state, &Persona::default(), &mut memory)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Llm(LlmError::Timeout(msg)) if msg == "second"));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn oversized_prompt_evicts_scratch_pad() {
        // Persona (1 word) + name (1) + each note ("-", "note", "N" = 3 words).
        let llm = Arc::new(ScriptedLlm::new(["fits now"]).with_context_length(12));
        let state = FixedState::new("a", "b", generator(&llm).with_safety_buffer(2));
        let mut memory = Memory::new();
        for i in 0..5 {
            memory.scratch_pad.push(format!("note {i}"));
        }

        let outcome = Runner::new(RetryPolicy::none())
            .execute(&state, &Persona::new("persona"), &mut memory)
            .await
            .unwrap();
        assert_eq!(outcome.response.as_deref(), Some("fits now"));
        assert_eq!(memory.scratch_pad.notes(), ["note 4".to_string()]);
        assert_eq!(outcome.prompt.as_deref(), Some("persona\na\n- note 4"));
    }

    #[tokio::test]
    async fn exhausted_context_forces_exit_without_error() {
        // The persona alone is too large for the window.
        let llm = Arc::new(ScriptedLlm::new(["never used"]).with_context_length(4));
        let state = FixedState::new("a", "b", generator(&llm).with_safety_buffer(0));
        let mut memory = Memory::new();
        memory.scratch_pad.push("note");

        let outcome = Runner::new(fast_retry(3))
            .execute(
                &state,
                &Persona::new("a very long persona description"),
                &mut memory,
            )
            .await
            .unwrap();
        assert_eq!(outcome.next_state, EXIT);
        assert_eq!(outcome.usage, Usage::zero());
        assert_eq!(outcome.response.as_deref(), Some(CONTEXT_EXHAUSTED_RESPONSE));
        assert!(outcome.exclude_from_scratch_pad);
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn context_check_reports_exhaustion() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<&str>::new()).with_context_length(1));
        let state = FixedState::new("a", "b", generator(&llm).with_safety_buffer(0));
        let mut memory = Memory::new();

        let check = Runner::default()
            .check_context(&state, &Persona::new("too long"), &mut memory)
            .unwrap();
        assert!(matches!(
            check,
            ContextCheck::Exhausted {
                reason: EvictionError::Exhausted,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn context_handler_limit_bounds_evictions() {
        let llm = Arc::new(ScriptedLlm::new(["ok"]).with_context_length(1));
        let state = FixedState::new("a", "b", generator(&llm).with_safety_buffer(0));
        let mut memory = Memory::with_eviction(assemble_memory::DropOldestStrategy::new(1));
        for i in 0..10 {
            memory.scratch_pad.push(format!("note {i}"));
        }

        let check = Runner::default()
            .with_context_handler_limit(3)
            .check_context(&state, &Persona::new("persona"), &mut memory)
            .unwrap();
        assert!(matches!(check, ContextCheck::Ready(_)));
        assert_eq!(memory.scratch_pad.len(), 7);
    }
}
