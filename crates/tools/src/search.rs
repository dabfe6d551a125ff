//! Search tool — stub that returns mock search results.
//!
//! In production this would call a real search API. The stub waits a
//! configurable latency and returns plausible, deterministic results so the
//! agent loop can be exercised end-to-end without network access.

use std::time::Duration;

use async_trait::async_trait;
use pipeclaw_config::SearchConfig;
use pipeclaw_core::error::ToolError;
use pipeclaw_core::tool::Tool;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::parse_args;

const MAX_RESULTS: usize = 5;

pub struct SearchTool {
    latency: Duration,
    default_results: usize,
}

impl SearchTool {
    pub fn new(latency: Duration, default_results: usize) -> Self {
        Self {
            latency,
            default_results: default_results.clamp(1, MAX_RESULTS),
        }
    }

    pub fn from_config(config: &SearchConfig) -> Self {
        Self::new(Duration::from_millis(config.latency_ms), config.num_results)
    }
}

#[derive(Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    num_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn description(&self) -> &str {
        "Search the web for information and return snippet results with titles and URLs."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "num_results": {
                    "type": "integer",
                    "description": "Number of results to return (default 3, max 5)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: SearchArgs = parse_args(arguments)?;
        let query = args.query.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }

        let count = args
            .num_results
            .unwrap_or(self.default_results)
            .clamp(1, MAX_RESULTS);

        debug!(query = %query, count, "Searching");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        Ok(serde_json::json!({ "results": mock_results(query, count) }))
    }
}

fn mock_results(query: &str, count: usize) -> Vec<SearchResult> {
    let slug = query.split_whitespace().collect::<Vec<_>>().join("_");
    let lower = query.to_lowercase();
    let host = lower.split_whitespace().collect::<String>();

    let all = [
        SearchResult {
            title: format!("{query} - Wikipedia"),
            url: format!("https://en.wikipedia.org/wiki/{slug}"),
            snippet: format!(
                "{query} is a major topic with comprehensive information available. \
                 This article provides an overview of the key concepts, history, and relevant details."
            ),
        },
        SearchResult {
            title: format!("Latest News about {query}"),
            url: format!("https://news.example.com/{}", lower.replace(' ', "-")),
            snippet: format!(
                "Recent developments and news articles related to {query}: trends, updates, and announcements."
            ),
        },
        SearchResult {
            title: format!("{query} - Official Resources"),
            url: format!("https://{host}.com"),
            snippet: format!("Official information and authoritative resources about {query}."),
        },
        SearchResult {
            title: format!("{query} explained"),
            url: format!("https://guides.example.com/{slug}"),
            snippet: format!("A beginner-friendly guide that walks through what {query} is and why it matters."),
        },
        SearchResult {
            title: format!("Discussions about {query}"),
            url: format!("https://forum.example.com/search?q={}", lower.replace(' ', "+")),
            snippet: format!("Community threads, questions, and answers mentioning {query}."),
        },
    ];

    all.into_iter().take(count).collect()
}
