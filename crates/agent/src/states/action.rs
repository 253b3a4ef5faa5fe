//! Action: turn the last thought into a JSON tool call and run it.

use assemble_core::error::Result;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;

use super::{ACTION, OBSERVE, current_problem, notes_block};
use crate::generator::Generator;
use crate::interpreter::{Interpreter, ToolInterpreter};
use crate::state::State;
use crate::transition::Transition;

pub struct ActionState {
    generator: Generator,
    tools: ToolBox,
    interpreter: ToolInterpreter,
}

impl ActionState {
    /// The generator is switched to JSON mode.
    pub fn new(generator: Generator, tools: ToolBox) -> Self {
        Self {
            generator: generator.json(),
            tools,
            interpreter: ToolInterpreter::new(OBSERVE)
                .on_invalid_tool(OBSERVE)
                .save_to(Slot::LastAction),
        }
    }
}

#[async_trait]
impl State for ActionState {
    fn name(&self) -> &str {
        ACTION
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, persona: &Persona, memory: &Memory, tools: &ToolBox) -> Result<String> {
        let task = match memory.data.get(Slot::LastThought) {
            Some(thought) => thought,
            None => current_problem(memory)?,
        };
        let schemas = serde_json::to_string_pretty(&tools.schemas())?;

        Ok(format!(
            r#"{persona}

Action:
- Given a task, solve it to your best ability.
- You have access to tools which can help you solve the problem. ALWAYS use tools to solve the problem.
- Do not ask for help.
- Don't repeat yourself from previous notes.

Notes:
"""
{notes}
"""

Task:
"""
{task}
"""

Here are the schemas for the tools you have access to, pick only one:
"""
{schemas}
"""

Respond with the JSON input for the tool of your choice to best solve the problem."#,
            persona = persona.prompt(),
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
    use crate::interpreter::INVALID_TOOL_MARKER;
    use crate::test_helpers::{ScriptedLlm, echo_tools, generator};
    use assemble_core::message::Message;
    use std::sync::Arc;

    fn state() -> ActionState {
        let llm = Arc::new(ScriptedLlm::new(Vec::<String>::new()));
        ActionState::new(generator(&llm), echo_tools())
    }

    #[test]
    fn uses_json_mode() {
        assert!(state().generator().options().json_mode);
    }

    #[test]
    fn prompt_lists_task_and_schemas() {
        let state = state();
        let mut memory = Memory::new();
        memory.data.add_message(Message::new("user", "say hi"));

        let prompt = state
            .build_prompt(&Persona::default(), &memory, state.tools())
            .unwrap();
        assert!(prompt.contains("say hi"));
        assert!(prompt.contains("\"tool_name\""));
        assert!(prompt.contains("secret_echo"));

        memory.data.set(Slot::LastThought, "echo the greeting");
        let prompt = state
            .build_prompt(&Persona::default(), &memory, state.tools())
            .unwrap();
        assert!(prompt.contains("echo the greeting"));
    }

    #[tokio::test]
    async fn runs_tool_then_observes() {
        let state = state();
        let mut memory = Memory::new();
        let transition = state
            .after_generation(
                r#"{"tool_name": "echo", "text": "hi"}"#,
                &mut memory,
                state.tools(),
            )
            .await
            .unwrap();
        assert_eq!(transition.next_state, OBSERVE);
        assert!(memory.data.get(Slot::LastAction).unwrap().ends_with("Output: hi"));
    }

    #[tokio::test]
    async fn unknown_tool_is_observed() {
        let state = state();
        let mut memory = Memory::new();
        let transition = state
            .after_generation(r#"{"tool_name": "calendar"}"#, &mut memory, state.tools())
            .await
            .unwrap();
        assert_eq!(transition.next_state, OBSERVE);
        assert!(transition.updated_response.unwrap().contains(INVALID_TOOL_MARKER));
    }
}
