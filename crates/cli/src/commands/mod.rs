pub mod ask;
pub mod chat;
pub mod config_cmd;

use assemble_agent::{Agent, ReactAgentBuilder};
use assemble_config::AppConfig;

/// Load config and assemble the ReAct agent it describes.
pub(crate) fn build_agent(
    rewrite_question: bool,
    summarize: bool,
    step_limit: Option<usize>,
) -> Result<(AppConfig, Agent), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let llm = assemble_providers::build_from_config(&config).inspect_err(|e| {
        if e.is_configuration() && !config.has_api_key() {
            print_api_key_help();
        }
    })?;
    let tools = assemble_tools::toolbox_from_config(&config.tools)?;

    let mut builder = ReactAgentBuilder::from_config(llm, tools, &config)
        .with_rewrite_question(rewrite_question)
        .with_summarize_messages(summarize);
    if let Some(limit) = step_limit {
        builder = builder.with_step_limit(limit);
    }
    let agent = builder.build()?;
    Ok((config, agent))
}

fn print_api_key_help() {
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables:");
    eprintln!("    ASSEMBLE_API_KEY     (generic)");
    eprintln!("    OPENROUTER_API_KEY");
    eprintln!("    OPENAI_API_KEY");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_path().display());
    eprintln!();
    eprintln!("  Local providers (ollama, llamacpp, vllm) need no key:");
    eprintln!("    ASSEMBLE_PROVIDER=ollama ASSEMBLE_MODEL=llama3.1 assemble ask \"...\"");
    eprintln!();
}
