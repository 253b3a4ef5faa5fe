//! The Assemble agent runtime: a state machine over LLM-driven states.
//!
//! The agent follows a **Thought → Action → Observe** cycle by default:
//!
//! 1. **Receive** a query and append it to the message log
//! 2. **Execute** the current state: build a prompt that fits the context
//!    window (evicting scratch-pad notes if needed), generate, interpret
//! 3. **Record** the step and a scratch-pad note
//! 4. **Transition** to the state the interpreter chose
//!
//! The loop ends when a state transitions to `EXIT`. After the step limit
//! the step-limit state is forced, so every run ends with an answer.

pub mod agent;
pub mod generator;
pub mod handle;
pub mod interpreter;
pub mod react;
pub mod retry;
pub mod runner;
pub mod state;
pub mod states;
pub mod transition;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use agent::{Agent, DEFAULT_AGENT_NAME, DEFAULT_STEP_LIMIT};
pub use generator::Generator;
pub use handle::{AgentHandle, PendingResponse};
pub use interpreter::{Interpreter, TextInterpreter, ToolInterpreter};
pub use react::ReactAgentBuilder;
pub use retry::RetryPolicy;
pub use runner::{ContextCheck, Runner};
pub use state::{EXIT, IDLE, State, StateName};
pub use transition::{StepOutcome, Transition};
