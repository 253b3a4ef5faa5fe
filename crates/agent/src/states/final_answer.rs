//! Final answer: address the problem using the notes gathered so far.

use assemble_core::error::Result;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;

use super::{FINAL_ANSWER, current_problem, notes_block};
use crate::generator::Generator;
use crate::interpreter::{Interpreter, TextInterpreter};
use crate::state::{EXIT, State};
use crate::transition::Transition;

/// Answers and exits. Also the usual step-limit state.
pub struct FinalAnswerState {
    generator: Generator,
    tools: ToolBox,
    interpreter: TextInterpreter,
}

impl FinalAnswerState {
    pub fn new(generator: Generator) -> Self {
        Self {
            generator,
            tools: ToolBox::new(),
            interpreter: TextInterpreter::new(EXIT).save_to(Slot::Answer),
        }
    }
}

#[async_trait]
impl State for FinalAnswerState {
    fn name(&self) -> &str {
        FINAL_ANSWER
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, persona: &Persona, memory: &Memory, _tools: &ToolBox) -> Result<String> {
        Ok(format!(
            r#"{persona}

Given the problem from the user, use your notes to give an answer. Directly address the problem.

Problem:
"""
{problem}
"""

Notes:
"""
{notes}
"""

Your answer to the problem:"#,
            persona = persona.prompt(),
            problem = current_problem(memory)?,
            notes = notes_block(memory),
        ))
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
    use crate::test_helpers::{ScriptedLlm, generator};
    use assemble_core::message::Message;
    use std::sync::Arc;

    #[tokio::test]
    async fn answers_and_exits() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let state = FinalAnswerState::new(generator(&llm));
        let mut memory = Memory::new();
        memory.data.add_message(Message::new("user", "What is 6 * 7?"));
        memory.scratch_pad.push("OBSERVE: the calculator returned 42");

        let prompt = state
            .build_prompt(&Persona::default(), &memory, state.tools())
            .unwrap();
        assert!(prompt.contains("What is 6 * 7?"));
        assert!(prompt.contains("- OBSERVE: the calculator returned 42"));

        let transition = state
            .after_generation(" 42 \n", &mut memory, state.tools())
            .await
            .unwrap();
        assert_eq!(transition.next_state, EXIT);
        assert_eq!(memory.data.get(Slot::Answer), Some("42"));
    }

    #[test]
    fn prompt_without_messages_is_an_error() {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        let state = FinalAnswerState::new(generator(&llm));
        assert!(
            state
                .build_prompt(&Persona::default(), &Memory::new(), state.tools())
                .is_err()
        );
    }
}
