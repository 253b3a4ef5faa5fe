//! Ready-made states for the ReAct loop and conversational pre-steps.
//!
//! Every state takes a [`Generator`](crate::generator::Generator) and a
//! [`ToolBox`](assemble_core::tool::ToolBox); transitions between them use
//! the names below.

pub mod action;
pub mod conversation;
pub mod final_answer;
pub mod observe;
pub mod thought;

pub use action::ActionState;
pub use conversation::{RewriteQuestionState, SummarizeMessagesState};
pub use final_answer::FinalAnswerState;
pub use observe::ObserveState;
pub use thought::ThoughtState;

use assemble_core::error::Result;
use assemble_memory::{Memory, Slot};

pub const THOUGHT: &str = "thought";
pub const ACTION: &str = "action";
pub const OBSERVE: &str = "observe";
pub const FINAL_ANSWER: &str = "final_answer";
pub const REWRITE_QUESTION: &str = "rewrite_question";
pub const SUMMARIZE_MESSAGES: &str = "summarize_messages";

/// The message the loop is working on: the rewritten question when a
/// pre-step produced one, else the latest message in the log.
pub(crate) fn current_problem(memory: &Memory) -> Result<&str> {
    if let Some(rewritten) = memory.data.get(Slot::RewrittenQuestion) {
        return Ok(rewritten);
    }
    Ok(memory.data.require_current_message()?.content.as_str())
}

/// The scratch pad as a prompt block, or a placeholder when empty.
pub(crate) fn notes_block(memory: &Memory) -> String {
    if memory.scratch_pad.is_empty() {
        "(no notes yet)".to_string()
    } else {
        memory.scratch_pad.render()
    }
}
