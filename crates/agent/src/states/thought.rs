//! Thought: decide whether to act with a tool or answer directly.

use assemble_core::error::Result;
use assemble_core::persona::Persona;
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ACTION, FINAL_ANSWER, THOUGHT, current_problem};
use crate::generator::Generator;
use crate::state::State;
use crate::transition::Transition;

const ANSWER_PREFIX: &str = "Answer:";
const THOUGHT_PREFIX: &str = "Thought:";

/// JSON form of a thought, accepted alongside the prefixed text form.
#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(rename = "type")]
    kind: ChoiceKind,
    reason: String,
}

#[derive(Debug, Deserialize)]
enum ChoiceKind {
    Action,
    Answer,
}

pub struct ThoughtState {
    generator: Generator,
    tools: ToolBox,
    action_state: String,
    answer_state: String,
}

impl ThoughtState {
    pub fn new(generator: Generator, tools: ToolBox) -> Self {
        Self {
            generator,
            tools,
            action_state: ACTION.into(),
            answer_state: FINAL_ANSWER.into(),
        }
    }

    /// Override where an answer goes (defaults to `final_answer`).
    pub fn with_answer_state(mut self, state: impl Into<String>) -> Self {
        self.answer_state = state.into();
        self
    }

    fn thought_instruction(memory: &Memory) -> String {
        match memory.data.get(Slot::LastThought) {
            Some(last) if !last.is_empty() => format!(
                "Create a thought based on the previous steps you have taken. Use the observations \
                 in your notes to help. Don't give the same thought as last time: {last}"
            ),
            _ => "Create a thought based on the message.".to_string(),
        }
    }

    fn notes_section(memory: &Memory) -> String {
        if memory.scratch_pad.is_empty() {
            return String::new();
        }
        format!(
            "\nHere are your notes so far from oldest to newest. If you know the answer from \
             your notes, say so. Don't repeat yourself.\n\nNotes:\n{}\n",
            memory.scratch_pad.render()
        )
    }

    fn history_section(memory: &Memory) -> String {
        let messages = memory.data.get_all_messages();
        if messages.len() <= 1 {
            return String::new();
        }
        if let Some(summary) = memory.data.get(Slot::Summary) {
            return format!(
                "\nSummary of the conversation so far, use it as context for the current message:\n\"\"\"\n{summary}\n\"\"\"\n"
            );
        }
        format!(
            "\nPrevious messages, use these as context for the current message:\n\"\"\"\n{}\n\"\"\"\n",
            memory.data.transcript()
        )
    }
}

#[async_trait]
impl State for ThoughtState {
    fn name(&self) -> &str {
        THOUGHT
    }

    fn generator(&self) -> &Generator {
        &self.generator
    }

    fn tools(&self) -> &ToolBox {
        &self.tools
    }

    fn build_prompt(&self, persona: &Persona, memory: &Memory, tools: &ToolBox) -> Result<String> {
        let problem = current_problem(memory)?;
        Ok(format!(
            r#"{persona}

{instruction}

Thought instructions:
- Give exact details on the task to best answer the message. Do not forget important details.
- You have access to tools that can help you answer the message. Always try to use a tool.
-- In your thought, recommend a tool that will help.
-- If the problem cannot be solved or you are unsure, give your answer with why.
- If you keep running into issues with your tools, give your answer with the problems you're running into.
- If the message doesn't require any tool, just give your answer.

Message:
"""
{problem}
"""
{notes}{history}
Here are the tools you have access to. You DO NOT have access to other tools:
"""
{tools}
"""

Respond with "{THOUGHT_PREFIX} <what to do next and which tool to use>" if you need to act, or
"{ANSWER_PREFIX} <your answer and how you know it>" if you know the answer."#,
            persona = persona.prompt(),
            instruction = Self::thought_instruction(memory),
            notes = Self::notes_section(memory),
            history = Self::history_section(memory),
            tools = tools.describe(),
        ))
    }

    async fn after_generation(
        &self,
        response: &str,
        memory: &mut Memory,
        _tools: &ToolBox,
    ) -> Result<Transition> {
        match parse_thought(response) {
            Parsed::Answer(answer) => {
                debug!(state = THOUGHT, "Model answered directly");
                memory.data.set(Slot::Answer, answer.as_str());
                Ok(Transition::to(&self.answer_state).with_response(answer))
            }
            Parsed::Thought(thought) => {
                memory.data.set(Slot::LastThought, thought.as_str());
                Ok(Transition::to(&self.action_state).with_response(thought))
            }
        }
    }
}

#[derive(Debug, PartialEq)]
enum Parsed {
    Thought(String),
    Answer(String),
}

fn parse_thought(response: &str) -> Parsed {
    let trimmed = response.trim();

    if trimmed.starts_with('{') {
        if let Ok(choice) = serde_json::from_str::<Choice>(trimmed) {
            let reason = choice.reason.trim().to_string();
            return match choice.kind {
                ChoiceKind::Action => Parsed::Thought(reason),
                ChoiceKind::Answer => Parsed::Answer(reason),
            };
        }
    }

    if let Some(index) = trimmed.find(ANSWER_PREFIX) {
        return Parsed::Answer(trimmed[index + ANSWER_PREFIX.len()..].trim().to_string());
    }
    match trimmed.find(THOUGHT_PREFIX) {
        Some(index) => Parsed::Thought(trimmed[index + THOUGHT_PREFIX.len()..].trim().to_string()),
        None => Parsed::Thought(trimmed.to_string()),
    }
}
