//! Built-in tools for Assemble agents.
//!
//! Tools give the action state something to do: arithmetic, a web search
//! stand-in, and Wikipedia lookups. All of them implement the typed
//! [`assemble_core::Tool`] trait and are collected in a
//! [`ToolBox`](assemble_core::ToolBox).

pub mod calculator;
pub mod web_search;
pub mod wikipedia;

use assemble_config::ToolsConfig;
use assemble_core::error::ToolError;
use assemble_core::tool::ToolBox;
use tracing::debug;

pub use calculator::CalculatorTool;
pub use web_search::WebSearchTool;
pub use wikipedia::WikipediaTool;

/// Offline tools only: calculator and web search.
pub fn default_toolbox() -> Result<ToolBox, ToolError> {
    ToolBox::new().with(CalculatorTool)?.with(WebSearchTool)
}

/// The tools named in `[tools] enabled`, in that order.
///
/// Unknown names fail with [`ToolError::NotFound`].
pub fn toolbox_from_config(config: &ToolsConfig) -> Result<ToolBox, ToolError> {
    let mut tools = ToolBox::new();
    for name in &config.enabled {
        match name.as_str() {
            "calculator" => tools.register(CalculatorTool)?,
            "web_search" => tools.register(WebSearchTool)?,
            "wikipedia" | "wikipedia_query_run" => tools.register(
                WikipediaTool::new()?
                    .with_top_k(config.wikipedia_top_k)
                    .with_max_chars(config.wikipedia_max_chars),
            )?,
            other => return Err(ToolError::NotFound(other.to_string())),
        }
    }
    debug!(tools = ?tools.names(), "Tools registered");
    Ok(tools)
}
