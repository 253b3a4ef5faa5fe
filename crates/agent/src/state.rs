//! The state contract: one step of the reasoning loop.

use std::borrow::Borrow;

use assemble_core::error::{Error, Result};
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::Memory;
use async_trait::async_trait;

use crate::generator::Generator;
use crate::transition::Transition;

/// Sentinel before a run starts. Never a configured state.
pub const IDLE: &str = "idle";

/// Sentinel that ends a run. Never a configured state.
pub const EXIT: &str = "exit";

pub fn is_reserved(name: &str) -> bool {
    name == IDLE || name == EXIT
}

/// A validated, non-blank state identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateName(String);

impl StateName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::config("state name must not be blank"));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for StateName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for StateName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StateName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work in an agent's state machine.
///
/// The runner calls `build_prompt` (possibly several times while it
/// evicts memory to fit the context window), generates with
/// `generator()`, then hands the text to `after_generation`.
#[async_trait]
pub trait State: Send + Sync {
    /// Identifier used in transitions. Unique within an agent.
    fn name(&self) -> &str;

    fn generator(&self) -> &Generator;

    fn tools(&self) -> &ToolBox;

    /// Must not mutate anything; called repeatedly.
    fn build_prompt(&self, persona: &Persona, memory: &Memory, tools: &ToolBox) -> Result<String>;

    /// Return a transition to skip generation entirely.
    fn before_generation(&self, _memory: &Memory, _tools: &ToolBox) -> Option<Transition> {
        None
    }

    async fn after_generation(
        &self,
        response: &str,
        memory: &mut Memory,
        tools: &ToolBox,
    ) -> Result<Transition>;
}
