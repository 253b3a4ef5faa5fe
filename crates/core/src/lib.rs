//! # Assemble Core
//!
//! Domain types, ports, and error definitions for the Assemble agent runtime.
//! This crate defines the vocabulary every other crate speaks: personas,
//! messages, queries and step traces, the LLM and tool ports, and the
//! event bus.
//!
//! ## Design Philosophy
//!
//! External capabilities (LLM backends, tools) are traits here.
//! Implementations live in their respective crates, so tests can swap in
//! scripted mocks and the dependency graph points inward on core.

pub mod error;
pub mod event;
pub mod llm;
pub mod message;
pub mod persona;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, LlmError, MemoryError, Result, ToolError};
pub use event::{AgentEvent, EventBus};
pub use llm::{Generation, GenerationOptions, LlmPort, Usage};
pub use message::{DEFAULT_CALLER, Message, Query, Response, ResponseMetadata, Step};
pub use persona::{DEFAULT_PERSONA, Persona};
pub use tool::{ErasedTool, Tool, ToolBox};
