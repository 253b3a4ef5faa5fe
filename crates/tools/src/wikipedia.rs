//! Wikipedia tool: searches the MediaWiki API and returns page extracts.
//!
//! One request does both the search and the extract fetch
//! (`generator=search` + `prop=extracts`). Each page renders as
//! `Page: <title>\nSummary: <extract>`; the combined text is cut to a
//! character budget.

use std::time::Duration;

use assemble_core::error::ToolError;
use assemble_core::tool::Tool;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, warn};

pub const WIKIPEDIA_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_TOP_K: usize = 3;
pub const DEFAULT_MAX_CHARS: usize = 4_000;

/// Returned when the search has no hits.
pub const NO_RESULTS: &str = "No good Wikipedia Search Result was found";

const TOOL_NAME: &str = "wikipedia_query_run";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WikipediaInput {
    /// The input to search for factual information on Wikipedia.
    pub query: String,
}

pub struct WikipediaTool {
    api_url: String,
    top_k: usize,
    max_chars: usize,
    exclude_input: bool,
    exclude_output: bool,
    client: reqwest::Client,
}

impl WikipediaTool {
    pub fn new() -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("assemble/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: TOOL_NAME.into(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;
        Ok(Self {
            api_url: WIKIPEDIA_API_URL.into(),
            top_k: DEFAULT_TOP_K,
            max_chars: DEFAULT_MAX_CHARS,
            exclude_input: false,
            exclude_output: false,
            client,
        })
    }

    /// Point at another MediaWiki installation.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    pub fn excluding_input(mut self) -> Self {
        self.exclude_input = true;
        self
    }

    pub fn excluding_output(mut self) -> Self {
        self.exclude_output = true;
        self
    }

    fn failed(reason: impl Into<String>) -> ToolError {
        ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    type Input = WikipediaInput;
    type Output = String;

    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Query Wikipedia for factual information about people, places, events and concepts."
    }

    fn exclude_input_from_scratch_pad(&self) -> bool {
        self.exclude_input
    }

    fn exclude_output_from_scratch_pad(&self) -> bool {
        self.exclude_output
    }

    async fn run(&self, input: WikipediaInput) -> Result<String, ToolError> {
        let query = input.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments(format!("{TOOL_NAME}: query is empty")));
        }

        let top_k = self.top_k.to_string();
        debug!(query, top_k = self.top_k, "Querying Wikipedia");
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("formatversion", "2"),
                ("generator", "search"),
                ("gsrsearch", query),
                ("gsrlimit", top_k.as_str()),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("exlimit", "max"),
                ("redirects", "1"),
            ])
            .send()
            .await
            .map_err(|e| Self::failed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Wikipedia returned an error");
            return Err(Self::failed(format!("Wikipedia returned HTTP {status}")));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| Self::failed(format!("unreadable response: {e}")))?;

        Ok(render_pages(body, self.top_k, self.max_chars))
    }
}

fn render_pages(body: ApiResponse, top_k: usize, max_chars: usize) -> String {
    let mut pages = body.query.map(|q| q.pages).unwrap_or_default();
    pages.sort_by_key(|page| page.index);

    let summaries: Vec<String> = pages
        .into_iter()
        .filter(|page| !page.extract.trim().is_empty())
        .take(top_k)
        .map(|page| format!("Page: {}\nSummary: {}", page.title, page.extract.trim()))
        .collect();

    if summaries.is_empty() {
        return NO_RESULTS.to_string();
    }
    truncate_chars(&summaries.join("\n\n"), max_chars)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    query: Option<ApiQuery>,
}

#[derive(Debug, Deserialize)]
struct ApiQuery {
    #[serde(default)]
    pages: Vec<ApiPage>,
}

#[derive(Debug, Deserialize)]
struct ApiPage {
    title: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    extract: String,
}
