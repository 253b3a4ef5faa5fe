//! Conversational pre-steps that look at the whole message log.
//!
//! Both skip generation when the log holds a single message, since there
//! is no history to rewrite against or summarize.

use assemble_core::error::Result;
use assemble_core::message::DEFAULT_CALLER;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;
use tracing::debug;

use super::{REWRITE_QUESTION, SUMMARIZE_MESSAGES};
use crate::generator::Generator;
use crate::interpreter::{Interpreter, TextInterpreter};
use crate::state::State;
use crate::transition::Transition;

fn single_message(memory: &Memory) -> bool {
    memory.data.get_all_messages().len() <= 1
}

/// Rewrites the caller's latest message into a standalone question.
pub struct RewriteQuestionState {
    user_name: String,
    generator: Generator,
    tools: ToolBox,
    interpreter: TextInterpreter,
}

impl RewriteQuestionState {
    pub fn new(next_state: impl Into<String>, generator: Generator) -> Self {
        Self {
            user_name: DEFAULT_CALLER.into(),
            generator,
            tools: ToolBox::new(),
            interpreter: TextInterpreter::new(next_state)
                .save_to(Slot::RewrittenQuestion)
                .excluded_from_scratch_pad(),
        }
    }

    /// Name of the caller whose message is rewritten.
    pub fn for_user(mut self, name: impl Into<String>) -> Self {
        self.user_name = name.into();
        self
    }
}

#[async_trait]
impl State for RewriteQuestionState {
    fn name(&self) -> &str {
        REWRITE_QUESTION
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, _persona: &Persona, memory: &Memory, _tools: &ToolBox) -> Result<String> {
        Ok(format!(
            r#"Rewrite the last message from {user} into a single, coherent statement using the context from the conversation history.

Focus solely on rewriting the message clearly; do not respond to any queries it contains. Do not summarize, simply capture the subject being discussed to best rewrite the last message.

Example of a good rewrite:
"""
user: What color is the sky?
assistant: The sky is blue.
user: Why is it that color?
Rewritten message: Why is the sky blue?
"""

Example of a bad rewrite:
"""
user: What color is the sky?
assistant: The sky is blue.
user: Why is it that color?
Rewritten message: The sky is blue because of Rayleigh scattering.
"""

{transcript}
Rewritten message: "#,
            user = self.user_name,
            transcript = memory.data.transcript(),
        ))
    }

    fn before_generation(&self, memory: &Memory, _tools: &ToolBox) -> Option<Transition> {
        single_message(memory).then(|| {
            debug!(state = REWRITE_QUESTION, "Single message, nothing to rewrite");
            Transition::to(self.interpreter.next_state())
        })
    }

    async fn after_generation(
        &self,
        response: &str,
        memory: &mut Memory,
        tools: &ToolBox,
    ) -> Result<Transition> {
        self.interpreter.interpret(response, memory, tools).await
    }
}

/// Summarizes the conversation so far into [`Slot::Summary`].
pub struct SummarizeMessagesState {
    generator: Generator,
    tools: ToolBox,
    interpreter: TextInterpreter,
}

impl SummarizeMessagesState {
    pub fn new(next_state: impl Into<String>, generator: Generator) -> Self {
        Self {
            generator,
            tools: ToolBox::new(),
            interpreter: TextInterpreter::new(next_state).save_to(Slot::Summary),
        }
    }
}

#[async_trait]
impl State for SummarizeMessagesState {
    fn name(&self) -> &str {
        SUMMARIZE_MESSAGES
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, _persona: &Persona, memory: &Memory, _tools: &ToolBox) -> Result<String> {
        Ok(format!(
            r#"Given the conversation history, summarize the messages.

Messages:
"""
{}
"""

Summary:"#,
            memory.data.transcript()
        ))
    }

    fn before_generation(&self, memory: &Memory, _tools: &ToolBox) -> Option<Transition> {
        single_message(memory).then(|| Transition::to(self.interpreter.next_state()))
    }

    async fn after_generation(
        &self,
        response: &str,
        memory: &mut Memory,
        tools: &ToolBox,
    ) -> Result<Transition> {
        self.interpreter.interpret(response, memory, tools).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::states::THOUGHT;
    use crate::test_helpers::{ScriptedLlm, generator};
    use assemble_core::message::Message;
    use std::sync::Arc;

    fn conversation() -> Memory {
        let mut memory = Memory::new();
        memory.data.add_message(Message::new("user", "What color is the sky?"));
        memory.data.add_message(Message::new("assemble", "Blue."));
        memory.data.add_message(Message::new("user", "Why is it that color?"));
        memory
    }

    fn llm() -> Arc<ScriptedLlm> {
        Arc::new(ScriptedLlm::new(Vec::<String>::new()))
    }

    #[test]
    fn single_message_skips_generation() {
        let mut memory = Memory::new();
        memory.data.add_message(Message::new("user", "hello"));

        let rewrite = RewriteQuestionState::new(THOUGHT, generator(&llm()));
        let skip = rewrite.before_generation(&memory, rewrite.tools()).unwrap();
        assert_eq!(skip.next_state, THOUGHT);

        let summarize = SummarizeMessagesState::new(THOUGHT, generator(&llm()));
        assert!(summarize.before_generation(&memory, summarize.tools()).is_some());

        let memory = conversation();
        assert!(rewrite.before_generation(&memory, rewrite.tools()).is_none());
        assert!(summarize.before_generation(&memory, summarize.tools()).is_none());
    }

    #[tokio::test]
    async fn rewrite_saves_question_off_the_scratch_pad() {
        let state = RewriteQuestionState::new(THOUGHT, generator(&llm())).for_user("ada");
        let mut memory = conversation();

        let prompt = state
            .build_prompt(&Persona::default(), &memory, state.tools())
            .unwrap();
        assert!(prompt.starts_with("Rewrite the last message from ada"));
        assert!(prompt.contains("user: Why is it that color?"));

        let transition = state
            .after_generation("Why is the sky blue?", &mut memory, state.tools())
            .await
            .unwrap();
        assert_eq!(transition.next_state, THOUGHT);
        assert!(transition.exclude_from_scratch_pad);
        assert_eq!(
            memory.data.get(Slot::RewrittenQuestion),
            Some("Why is the sky blue?")
        );
    }

    #[tokio::test]
    async fn summary_is_saved() {
        let state = SummarizeMessagesState::new(THOUGHT, generator(&llm()));
        let mut memory = conversation();
        state
            .after_generation("Sky color and why.", &mut memory, state.tools())
            .await
            .unwrap();
        assert_eq!(memory.data.get(Slot::Summary), Some("Sky color and why."));
    }
}
