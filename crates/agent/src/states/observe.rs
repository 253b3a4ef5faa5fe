//! Observe: reflect on what the last action produced.

use assemble_core::error::Result;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;

use super::{OBSERVE, THOUGHT};
use crate::generator::Generator;
use crate::interpreter::{Interpreter, TextInterpreter};
use crate::state::State;
use crate::transition::Transition;

pub struct ObserveState {
    generator: Generator,
    tools: ToolBox,
    interpreter: TextInterpreter,
}

impl ObserveState {
    pub fn new(generator: Generator, tools: ToolBox) -> Self {
        Self {
            generator,
            tools,
            interpreter: TextInterpreter::new(THOUGHT),
        }
    }
}

#[async_trait]
impl State for ObserveState {
    fn name(&self) -> &str {
        OBSERVE
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

Given a thought and the action taken from that thought, reflect on what you observe.

The thought:
"""
{thought}
"""

The action from the thought:
"""
{action}
"""

Provide a concise summary of what you observe:"#,
            persona = persona.prompt(),
            thought = memory.data.get(Slot::LastThought).unwrap_or_default(),
            action = memory.data.get(Slot::LastAction).unwrap_or_default(),
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
