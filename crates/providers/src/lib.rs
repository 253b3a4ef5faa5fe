//! LLM backends for Assemble.
//!
//! Every backend implements [`assemble_core::LlmPort`]. The router picks
//! one from configuration.

pub mod openai_compat;
pub mod router;
pub mod tokenizer;

pub use openai_compat::OpenAiCompatLlm;
pub use router::build_from_config;
pub use tokenizer::HeuristicTokenizer;
