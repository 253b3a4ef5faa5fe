//! Web search tool: an offline stand-in returning canned results.
//!
//! Results are deterministic for a given query so agent runs can be
//! exercised end-to-end without network access.

use assemble_core::error::ToolError;
use assemble_core::tool::Tool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Upper bound on `num_results`.
pub const MAX_RESULTS: usize = 5;

fn default_num_results() -> usize {
    3
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebSearchInput {
    /// The search query.
    pub query: String,

    /// Number of results to return (at most 5).
    #[serde(default = "default_num_results")]
    pub num_results: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    type Input = WebSearchInput;
    type Output = Vec<SearchResult>;

    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information. Returns relevant results with titles, URLs and snippets."
    }

    async fn run(&self, input: WebSearchInput) -> Result<Vec<SearchResult>, ToolError> {
        if input.query.trim().is_empty() {
            return Err(ToolError::InvalidArguments("web_search: query is empty".into()));
        }
        Ok(canned_results(&input.query, input.num_results.clamp(1, MAX_RESULTS)))
    }
}

fn result(title: &str, url: &str, snippet: &str) -> SearchResult {
    SearchResult {
        title: title.into(),
        url: url.into(),
        snippet: snippet.into(),
    }
}

fn canned_results(query: &str, count: usize) -> Vec<SearchResult> {
    let lowered = query.to_lowercase();

    let topics: [(&str, Vec<SearchResult>); 2] = [
        (
            "rust",
            vec![
                result(
                    "The Rust Programming Language",
                    "https://doc.rust-lang.org/book/",
                    "Rust is a systems programming language focused on safety, speed and concurrency.",
                ),
                result(
                    "Rust by Example",
                    "https://doc.rust-lang.org/rust-by-example/",
                    "Runnable examples that illustrate Rust concepts and standard library usage.",
                ),
                result(
                    "crates.io: Rust Package Registry",
                    "https://crates.io/",
                    "The Rust community's registry for sharing and discovering libraries.",
                ),
            ],
        ),
        (
            "weather",
            vec![
                result(
                    "Weather Forecast - National Weather Service",
                    "https://weather.gov/",
                    "Current conditions and forecasts for locations across the United States.",
                ),
                result(
                    "OpenWeatherMap",
                    "https://openweathermap.org/",
                    "Weather API providing current data and forecasts for any location.",
                ),
            ],
        ),
    ];

    if let Some((_, results)) = topics.into_iter().find(|(keyword, _)| lowered.contains(keyword)) {
        return results.into_iter().take(count).collect();
    }

    (1..=count)
        .map(|page| SearchResult {
            title: format!("Result {page} for: {query}"),
            url: format!(
                "https://example.com/search?q={}&p={page}",
                query.split_whitespace().collect::<Vec<_>>().join("+")
            ),
            snippet: format!("No indexed content for '{query}'. This result is a placeholder."),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assemble_core::tool::ToolBox;
    use serde_json::json;

    fn search(query: &str, num_results: usize) -> WebSearchInput {
        WebSearchInput {
            query: query.into(),
            num_results,
        }
    }

    #[tokio::test]
    async fn topic_results() {
        let results = WebSearchTool.run(search("rust programming", 3)).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].title.contains("Rust"));

        let results = WebSearchTool.run(search("Weather in Oslo", 5)).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn generic_results_are_deterministic() {
        let first = WebSearchTool.run(search("tide tables", 2)).await.unwrap();
        let second = WebSearchTool.run(search("tide tables", 2)).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].url, "https://example.com/search?q=tide+tables&p=2");
    }

    #[tokio::test]
    async fn count_is_clamped() {
        let results = WebSearchTool.run(search("anything", 50)).await.unwrap();
        assert_eq!(results.len(), MAX_RESULTS);
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        assert!(WebSearchTool.run(search("  ", 3)).await.is_err());
    }

    #[tokio::test]
    async fn renders_as_json_through_the_toolbox() {
        let tools = ToolBox::new().with(WebSearchTool).unwrap();
        let output = tools
            .invoke("web_search", json!({"query": "rust"}))
            .await
            .unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed.len(), 3);
    }
}
