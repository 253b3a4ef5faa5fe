//! Tool port: capabilities a state may invoke while interpreting a response.
//!
//! Tools are written against the typed [`Tool`] trait: inputs are
//! deserialized and described by a JSON schema, outputs are serialized
//! back into text for the scratch pad. A [`ToolBox`] stores them behind
//! the object-safe [`ErasedTool`] so a state can hold a heterogeneous set
//! and look them up by exact name.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::ToolError;

/// The core Tool trait.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + Send + 'static;

    /// The unique name of this tool, matched exactly against model output.
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Keep the raw tool input out of the scratch pad.
    fn exclude_input_from_scratch_pad(&self) -> bool {
        false
    }

    /// Keep the tool output out of the scratch pad.
    fn exclude_output_from_scratch_pad(&self) -> bool {
        false
    }

    /// JSON schema the model must follow to call this tool.
    fn schema(&self) -> Value {
        let input = serde_json::to_value(schemars::schema_for!(Self::Input))
            .unwrap_or_else(|_| json!({ "type": "object" }));
        tool_schema(self.name(), self.description(), input)
    }

    /// Turn raw parameters into typed input.
    fn validate(&self, params: &Value) -> Result<Self::Input, ToolError> {
        serde_json::from_value(params.clone())
            .map_err(|e| ToolError::InvalidArguments(format!("{}: {e}", self.name())))
    }

    /// Execute the tool.
    async fn run(&self, input: Self::Input) -> Result<Self::Output, ToolError>;
}

/// Add the `tool_name` discriminator to an input schema.
fn tool_schema(name: &str, description: &str, mut schema: Value) -> Value {
    if let Some(object) = schema.as_object_mut() {
        object.insert("title".into(), Value::String(name.to_string()));
        object.insert("description".into(), Value::String(description.to_string()));

        let properties = object
            .entry("properties")
            .or_insert_with(|| json!({}));
        if let Some(properties) = properties.as_object_mut() {
            properties.insert(
                "tool_name".into(),
                json!({ "type": "string", "const": name }),
            );
        }

        let required = object.entry("required").or_insert_with(|| json!([]));
        if let Some(required) = required.as_array_mut() {
            required.insert(0, Value::String("tool_name".into()));
        }
    }
    schema
}

/// Object-safe view of a [`Tool`].
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> Value;
    fn exclude_input_from_scratch_pad(&self) -> bool;
    fn exclude_output_from_scratch_pad(&self) -> bool;

    /// Validate and run, rendering the output as text.
    async fn invoke(&self, params: Value) -> Result<String, ToolError>;
}

struct TypedTool<T>(T);

#[async_trait]
impl<T: Tool> ErasedTool for TypedTool<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn schema(&self) -> Value {
        self.0.schema()
    }

    fn exclude_input_from_scratch_pad(&self) -> bool {
        self.0.exclude_input_from_scratch_pad()
    }

    fn exclude_output_from_scratch_pad(&self) -> bool {
        self.0.exclude_output_from_scratch_pad()
    }

    async fn invoke(&self, params: Value) -> Result<String, ToolError> {
        let input = self.0.validate(&params)?;
        let output = self.0.run(input).await?;
        render_output(self.0.name(), &output)
    }
}

fn render_output<O: Serialize>(tool_name: &str, output: &O) -> Result<String, ToolError> {
    let value = serde_json::to_value(output).map_err(|e| ToolError::ExecutionFailed {
        tool_name: tool_name.to_string(),
        reason: format!("output is not serializable: {e}"),
    })?;
    Ok(match value {
        Value::String(text) => text,
        other => other.to_string(),
    })
}

/// An ordered set of tools with unique, non-blank names.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn ErasedTool>>,
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBox")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, rejecting blank and duplicate names.
    pub fn register<T: Tool>(&mut self, tool: T) -> Result<(), ToolError> {
        let name = tool.name();
        if name.trim().is_empty() {
            return Err(ToolError::InvalidName(name.to_string()));
        }
        if self.get(name).is_some() {
            return Err(ToolError::DuplicateName(name.to_string()));
        }
        self.tools.push(Arc::new(TypedTool(tool)));
        Ok(())
    }

    /// Builder-style [`ToolBox::register`].
    pub fn with<T: Tool>(mut self, tool: T) -> Result<Self, ToolError> {
        self.register(tool)?;
        Ok(self)
    }

    /// Look up a tool by exact name.
    pub fn get(&self, name: &str) -> Option<&dyn ErasedTool> {
        self.tools
            .iter()
            .find(|tool| tool.name() == name)
            .map(|tool| tool.as_ref())
    }

    /// Validate and run a tool by name.
    pub async fn invoke(&self, name: &str, params: Value) -> Result<String, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tool.invoke(params).await
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|tool| tool.name()).collect()
    }

    pub fn schemas(&self) -> Vec<Value> {
        self.tools.iter().map(|tool| tool.schema()).collect()
    }

    /// Name and description of every tool, for prompts.
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|tool| format!("name: {}\ndescription: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema)]
    struct EchoInput {
        /// Text to echo back
        text: String,
    }

    /// A simple test tool for unit tests.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        type Input = EchoInput;
        type Output = String;

        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes back the input"
        }

        async fn run(&self, input: EchoInput) -> Result<String, ToolError> {
            Ok(input.text)
        }
    }

    #[derive(Serialize)]
    struct Sum {
        total: i64,
    }

    #[derive(Deserialize, JsonSchema)]
    struct AddInput {
        a: i64,
        b: i64,
    }

    struct AddTool;

    #[async_trait]
    impl Tool for AddTool {
        type Input = AddInput;
        type Output = Sum;

        fn name(&self) -> &str {
            "add"
        }

        fn description(&self) -> &str {
            "Adds two integers"
        }

        fn exclude_input_from_scratch_pad(&self) -> bool {
            true
        }

        async fn run(&self, input: AddInput) -> Result<Sum, ToolError> {
            Ok(Sum {
                total: input.a + input.b,
            })
        }
    }

    struct BlankTool;

    #[async_trait]
    impl Tool for BlankTool {
        type Input = EchoInput;
        type Output = String;

        fn name(&self) -> &str {
            "  "
        }

        fn description(&self) -> &str {
            "Has no name"
        }

        async fn run(&self, input: EchoInput) -> Result<String, ToolError> {
            Ok(input.text)
        }
    }

    #[test]
    fn toolbox_register_and_lookup() {
        let tools = ToolBox::new().with(EchoTool).unwrap().with(AddTool).unwrap();
        assert!(tools.get("echo").is_some());
        assert!(tools.get("Echo").is_none());
        assert!(tools.get("nonexistent").is_none());
        assert_eq!(tools.names(), vec!["echo", "add"]);
        assert!(tools.get("add").unwrap().exclude_input_from_scratch_pad());
    }

    #[test]
    fn toolbox_rejects_duplicate_and_blank_names() {
        let mut tools = ToolBox::new();
        tools.register(EchoTool).unwrap();
        assert!(matches!(
            tools.register(EchoTool),
            Err(ToolError::DuplicateName(name)) if name == "echo"
        ));
        assert!(matches!(
            tools.register(BlankTool),
            Err(ToolError::InvalidName(_))
        ));
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn schema_requires_tool_name() {
        let schema = EchoTool.schema();
        assert_eq!(schema["title"], "echo");
        assert_eq!(schema["properties"]["tool_name"]["const"], "echo");
        assert!(schema["properties"]["text"].is_object());
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required[0], "tool_name");
        assert!(required.contains(&json!("text")));
    }

    #[tokio::test]
    async fn invoke_renders_string_and_structured_output() {
        let tools = ToolBox::new().with(EchoTool).unwrap().with(AddTool).unwrap();

        let echoed = tools
            .invoke("echo", json!({ "text": "hello world" }))
            .await
            .unwrap();
        assert_eq!(echoed, "hello world");

        let sum = tools.invoke("add", json!({ "a": 2, "b": 3 })).await.unwrap();
        assert_eq!(sum, r#"{"total":5}"#);
    }

    #[tokio::test]
    async fn invoke_reports_invalid_arguments() {
        let tools = ToolBox::new().with(AddTool).unwrap();
        let err = tools.invoke("add", json!({ "a": "two" })).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(msg) if msg.starts_with("add")));
    }

    #[tokio::test]
    async fn invoke_missing_tool() {
        let tools = ToolBox::new();
        let err = tools.invoke("nonexistent", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::NotFound(_)));
    }

    #[test]
    fn describe_lists_tools_in_order() {
        let tools = ToolBox::new().with(EchoTool).unwrap().with(AddTool).unwrap();
        assert_eq!(
            tools.describe(),
            "name: echo\ndescription: Echoes back the input\n\nname: add\ndescription: Adds two integers"
        );
    }
}
