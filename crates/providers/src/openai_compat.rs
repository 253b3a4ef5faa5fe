//! OpenAI-compatible backend.
//!
//! Works with OpenAI, OpenRouter, Ollama, llama.cpp's server, vLLM and any
//! other endpoint that speaks `/v1/chat/completions`. The whole prompt is
//! sent as a single system message; JSON mode maps to
//! `response_format: {"type": "json_object"}`.

use std::time::Duration;

use assemble_core::error::LlmError;
use assemble_core::llm::{Generation, GenerationOptions, LlmPort, Usage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::tokenizer::HeuristicTokenizer;

/// Context window assumed for models missing from the table.
pub const DEFAULT_CONTEXT_LENGTH: usize = 8_192;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Context window for well-known models, matched by substring so that
/// routed names like `openai/gpt-4o-mini` resolve too.
pub fn known_context_length(model: &str) -> Option<usize> {
    const TABLE: &[(&str, usize)] = &[
        ("gpt-4o-mini", 128_000),
        ("gpt-4o", 128_000),
        ("gpt-4-turbo", 128_000),
        ("gpt-4.1", 1_047_576),
        ("gpt-4-32k", 32_768),
        ("gpt-4", 8_192),
        ("gpt-3.5-turbo", 16_385),
        ("o3-mini", 200_000),
        ("claude", 200_000),
        ("llama3.1", 131_072),
        ("llama-3.1", 131_072),
        ("llama3", 8_192),
        ("mistral", 32_768),
        ("qwen2.5", 32_768),
    ];
    TABLE
        .iter()
        .find(|(name, _)| model.contains(name))
        .map(|(_, tokens)| *tokens)
}

/// An OpenAI-compatible LLM backend bound to one model.
pub struct OpenAiCompatLlm {
    name: String,
    base_url: String,
    api_key: String,
    model: String,
    context_length: usize,
    /// Used when the generation options do not set `max_tokens`.
    default_max_tokens: Option<u32>,
    tokenizer: HeuristicTokenizer,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatLlm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatLlm")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("context_length", &self.context_length)
            .finish()
    }
}

impl OpenAiCompatLlm {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LlmError::NotConfigured(format!("failed to create HTTP client: {e}")))?;
        let model = model.into();

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            context_length: known_context_length(&model).unwrap_or(DEFAULT_CONTEXT_LENGTH),
            model,
            default_max_tokens: None,
            tokenizer: HeuristicTokenizer::default(),
            client,
        })
    }

    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new("openai", "https://api.openai.com/v1", api_key, model)
    }

    pub fn openrouter(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key, model)
    }

    /// Ollama doesn't need a real key.
    pub fn ollama(base_url: Option<&str>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama",
            model,
        )
    }

    /// llama.cpp's bundled server (`llama-server`).
    pub fn llamacpp(base_url: Option<&str>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::new(
            "llamacpp",
            base_url.unwrap_or("http://localhost:8080/v1"),
            "llamacpp",
            model,
        )
    }

    /// Override the context window from the model table.
    pub fn with_context_length(mut self, tokens: usize) -> Self {
        self.context_length = tokens;
        self
    }

    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = Some(max_tokens);
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: HeuristicTokenizer) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request_body(&self, prompt: &str, options: &GenerationOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "system", "content": prompt }],
            "temperature": options.temperature,
            "stream": false,
        });
        if let Some(max_tokens) = options.max_tokens.or(self.default_max_tokens) {
            body["max_tokens"] = json!(max_tokens);
        }
        if options.json_mode {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

/// Map a non-success HTTP status to a typed error.
fn status_error(status: u16, body: String) -> LlmError {
    match status {
        429 => LlmError::RateLimited {
            retry_after_secs: 5,
        },
        401 | 403 => LlmError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        404 => LlmError::ModelNotFound(body),
        _ => LlmError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

fn transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else {
        LlmError::Network(err.to_string())
    }
}

#[async_trait]
impl LlmPort for OpenAiCompatLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Generation, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(prompt, options);

        debug!(
            provider = %self.name,
            model = %self.model,
            json_mode = options.json_mode,
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(status_error(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".into()))?;

        let usage = api_response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_else(Usage::zero);

        Ok(Generation::new(
            choice.message.content.unwrap_or_default(),
            usage,
        ))
    }

    fn tokenize(&self, text: &str) -> Result<Vec<u32>, LlmError> {
        Ok(self.tokenizer.tokenize(text))
    }

    fn context_length(&self) -> usize {
        self.context_length
    }
}

// --- API types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn constructors() {
        let llm = OpenAiCompatLlm::openrouter("sk-test", "openai/gpt-4o-mini").unwrap();
        assert_eq!(llm.name(), "openrouter");
        assert!(llm.base_url().contains("openrouter.ai"));
        assert_eq!(llm.context_length(), 128_000);

        let llm = OpenAiCompatLlm::ollama(None, "llama3.1:8b").unwrap();
        assert!(llm.base_url().contains("localhost:11434"));
        assert_eq!(llm.context_length(), 131_072);

        let llm = OpenAiCompatLlm::llamacpp(Some("http://gpu-box:9000/v1/"), "local").unwrap();
        assert_eq!(llm.base_url(), "http://gpu-box:9000/v1");
        assert_eq!(llm.context_length(), DEFAULT_CONTEXT_LENGTH);
    }

    #[test]
    fn context_override_wins() {
        let llm = OpenAiCompatLlm::openai("sk", "gpt-4o")
            .unwrap()
            .with_context_length(4_096);
        assert_eq!(llm.context_length(), 4_096);
    }

    #[test]
    fn request_body_reflects_options() {
        let llm = OpenAiCompatLlm::openai("sk", "gpt-4o-mini")
            .unwrap()
            .with_default_max_tokens(512);

        let body = llm.request_body("hello", &GenerationOptions::default());
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 512);
        assert!(body.get("response_format").is_none());

        let options = GenerationOptions::default().with_max_tokens(64).json();
        let body = llm.request_body("hello", &options);
        assert_eq!(body["max_tokens"], 64);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(429, String::new()), LlmError::RateLimited { .. }));
        assert!(matches!(status_error(401, String::new()), LlmError::AuthenticationFailed(_)));
        assert!(matches!(status_error(403, String::new()), LlmError::AuthenticationFailed(_)));
        assert!(matches!(status_error(404, "no model".into()), LlmError::ModelNotFound(_)));
        assert!(matches!(
            status_error(500, "boom".into()),
            LlmError::ApiError { status_code: 500, .. }
        ));
    }

    #[test]
    fn tokenizes_with_heuristic() {
        let llm = OpenAiCompatLlm::openai("sk", "gpt-4o").unwrap();
        assert_eq!(llm.tokenize("abcdefgh").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn generate_maps_text_and_usage() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(r#"{"response_format": {"type": "json_object"}}"#);
            then.status(200).json_body(json!({
                "model": "gpt-4o-mini",
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\": true}" } }],
                "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
            }));
        });

        let llm = OpenAiCompatLlm::new("test", server.url("/v1"), "sk-test", "gpt-4o-mini").unwrap();
        let generation = llm
            .generate("prompt", &GenerationOptions::default().json())
            .await
            .unwrap();
        assert_eq!(generation.text, "{\"ok\": true}");
        assert_eq!(generation.usage, Usage::new(12, 3));
        mock.assert();
    }

    #[tokio::test]
    async fn generate_surfaces_auth_failures() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(401).body("unauthorized");
        });

        let llm = OpenAiCompatLlm::new("test", server.url("/v1"), "bad", "gpt-4o").unwrap();
        let err = llm
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn empty_choices_are_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(200).json_body(json!({ "choices": [] }));
        });

        let llm = OpenAiCompatLlm::new("test", server.url("/v1"), "sk", "gpt-4o").unwrap();
        let err = llm
            .generate("prompt", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }
}
