//! Backend selection from configuration.

use std::sync::Arc;

use assemble_config::AppConfig;
use assemble_core::error::{Error, Result};
use assemble_core::llm::LlmPort;
use tracing::info;

use crate::openai_compat::OpenAiCompatLlm;

/// Build the configured default backend.
///
/// The `[providers.<name>]` section, when present, overrides the key,
/// base URL, model and context window of the top-level settings.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn LlmPort>> {
    let name = config.default_provider.as_str();
    let provider = config.providers.get(name);

    let api_key = provider
        .and_then(|p| p.api_key.clone())
        .or_else(|| config.api_key.clone());
    let api_key = match (api_key, is_local(name)) {
        (Some(key), _) => key,
        (None, true) => name.to_string(),
        (None, false) => {
            return Err(Error::config(format!(
                "no API key for provider '{name}'; set ASSEMBLE_API_KEY or api_key in the config"
            )));
        }
    };

    let base_url = provider
        .and_then(|p| p.api_url.clone())
        .unwrap_or_else(|| default_base_url(name));
    let model = provider
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone());

    let mut llm = OpenAiCompatLlm::new(name, base_url, api_key, model)?
        .with_default_max_tokens(config.default_max_tokens);
    if let Some(tokens) = provider.and_then(|p| p.context_window) {
        llm = llm.with_context_length(tokens);
    }

    info!(
        provider = name,
        model = llm.model(),
        context_length = llm.context_length(),
        "LLM backend ready"
    );
    Ok(Arc::new(llm))
}

/// Local servers accept any key.
fn is_local(provider_name: &str) -> bool {
    matches!(provider_name, "ollama" | "llamacpp" | "llama.cpp" | "vllm")
}

/// Default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "deepseek" => "https://api.deepseek.com/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "fireworks" => "https://api.fireworks.ai/inference/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assemble_config::ProviderConfig;

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
        assert!(default_base_url("openai").contains("api.openai.com"));
        assert!(default_base_url("ollama").contains("localhost:11434"));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn builds_default_provider_with_key() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            ..AppConfig::default()
        };
        let llm = build_from_config(&config).unwrap();
        assert_eq!(llm.name(), "openai");
        assert_eq!(llm.context_length(), 128_000);
    }

    #[test]
    fn local_provider_needs_no_key() {
        let mut config = AppConfig {
            default_provider: "ollama".into(),
            default_model: "llama3".into(),
            ..AppConfig::default()
        };
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                context_window: Some(16_384),
                ..ProviderConfig::default()
            },
        );
        let llm = build_from_config(&config).unwrap();
        assert_eq!(llm.name(), "ollama");
        assert_eq!(llm.context_length(), 16_384);
    }
}
