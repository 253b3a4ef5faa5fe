//! Response interpreters shared by states.
//!
//! A state either interprets model output itself or delegates to one of
//! these: [`TextInterpreter`] for free text, [`ToolInterpreter`] for a
//! JSON tool call.

use assemble_core::error::{Error, Result};
use assemble_core::tool::ToolBox;
use assemble_memory::{Memory, Slot};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::transition::Transition;

/// Marker included in the response when the model names an unknown tool.
pub const INVALID_TOOL_MARKER: &str = "Invalid tool name";

#[async_trait]
pub trait Interpreter: Send + Sync {
    async fn interpret(
        &self,
        response: &str,
        memory: &mut Memory,
        tools: &ToolBox,
    ) -> Result<Transition>;
}

/// Optionally stores the text, then moves to a fixed next state.
#[derive(Debug, Clone)]
pub struct TextInterpreter {
    next_state: String,
    save_to: Option<Slot>,
    exclude_from_scratch_pad: bool,
}

impl TextInterpreter {
    pub fn new(next_state: impl Into<String>) -> Self {
        Self {
            next_state: next_state.into(),
            save_to: None,
            exclude_from_scratch_pad: false,
        }
    }

    pub fn save_to(mut self, slot: Slot) -> Self {
        self.save_to = Some(slot);
        self
    }

    pub fn excluded_from_scratch_pad(mut self) -> Self {
        self.exclude_from_scratch_pad = true;
        self
    }

    pub fn next_state(&self) -> &str {
        &self.next_state
    }
}

#[async_trait]
impl Interpreter for TextInterpreter {
    async fn interpret(
        &self,
        response: &str,
        memory: &mut Memory,
        _tools: &ToolBox,
    ) -> Result<Transition> {
        if let Some(slot) = self.save_to {
            memory.data.set(slot, response.trim());
        }
        let transition = Transition::to(&self.next_state);
        Ok(if self.exclude_from_scratch_pad {
            transition.excluded_from_scratch_pad()
        } else {
            transition
        })
    }
}

/// Parses `{"tool_name": ..., <params>}`, runs the named tool and
/// reports what happened as the step's response.
#[derive(Debug, Clone)]
pub struct ToolInterpreter {
    next_state: String,
    invalid_tool_state: Option<String>,
    save_to: Option<Slot>,
}

impl ToolInterpreter {
    pub fn new(next_state: impl Into<String>) -> Self {
        Self {
            next_state: next_state.into(),
            invalid_tool_state: None,
            save_to: None,
        }
    }

    /// Where to go when the model names a tool that isn't available.
    /// Defaults to the regular next state.
    pub fn on_invalid_tool(mut self, state: impl Into<String>) -> Self {
        self.invalid_tool_state = Some(state.into());
        self
    }

    pub fn save_to(mut self, slot: Slot) -> Self {
        self.save_to = Some(slot);
        self
    }

    fn invalid_tool(&self, requested: &str, tools: &ToolBox) -> Transition {
        warn!(tool = %requested, available = ?tools.names(), "Model requested an unknown tool");
        let next = self
            .invalid_tool_state
            .as_deref()
            .unwrap_or(&self.next_state);
        Transition::to(next).with_response(format!(
            "{INVALID_TOOL_MARKER} '{requested}' for response. Please try again with one of: {}.",
            tools.names().join(", ")
        ))
    }
}

#[async_trait]
impl Interpreter for ToolInterpreter {
    async fn interpret(
        &self,
        response: &str,
        memory: &mut Memory,
        tools: &ToolBox,
    ) -> Result<Transition> {
        let payload = extract_json(response);
        let mut params: Value = serde_json::from_str(payload)
            .map_err(|e| Error::Prompt(format!("expected a JSON tool call: {e}")))?;

        let requested = params
            .get("tool_name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::Prompt("tool call is missing 'tool_name'".into()))?;

        let Some(tool) = tools.get(&requested) else {
            return Ok(self.invalid_tool(&requested, tools));
        };

        if let Some(object) = params.as_object_mut() {
            object.remove("tool_name");
            object.remove("tool_description");
        }

        debug!(tool = tool.name(), "Running tool");
        let output = tool.invoke(params).await?;

        let mut result = format!("Tool executed for {}.", tool.name());
        if !tool.exclude_input_from_scratch_pad() {
            result.push_str("\nInput: ");
            result.push_str(payload);
        }
        if !tool.exclude_output_from_scratch_pad() {
            result.push_str("\nOutput: ");
            result.push_str(&output);
        }

        if let Some(slot) = self.save_to {
            memory.data.set(slot, result.clone());
        }

        Ok(Transition::to(&self.next_state).with_response(result))
    }
}

/// The outermost `{...}` of a response, which strips code fences and
/// surrounding chatter.
fn extract_json(response: &str) -> &str {
    let trimmed = response.trim();
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    }
}
