//! Simulated responder — a deterministic, offline stand-in for a model.
//!
//! Routes on keywords in the latest user message and requests the matching
//! tool, or answers with a canned reply. Once a tool result is the last
//! message it wraps up with a summary. No randomness and no hidden state:
//! the reply is a pure function of the history it is given.

use std::time::Duration;

use async_trait::async_trait;
use pipeclaw_config::AppConfig;
use pipeclaw_core::error::ModelError;
use pipeclaw_core::message::{Message, ModelStep, Role, ToolCall};
use pipeclaw_core::responder::ModelResponder;
use tracing::debug;

const SUMMARY: &str = "Based on the tool results above, I've gathered the requested information. \
                       Is there anything specific you'd like me to explain or help you with next?";

const CANNED_REPLIES: [&str; 6] = [
    "I understand. How can I help you further with this?",
    "That's interesting. What would you like to explore about this topic?",
    "I can help you with that. What specific aspect would you like me to focus on?",
    "Let me know if you'd like me to search for more information or help in another way.",
    "I'm here to assist. What's the next step you'd like to take?",
    "Great question! Is there anything specific you'd like me to help you with?",
];

const SEARCH_KEYWORDS: [&str; 3] = ["search", "look up", "find information"];
const CODE_KEYWORDS: [&str; 4] = ["execute", "console.log", "javascript", "code"];
const WORKFLOW_KEYWORDS: [&str; 2] = ["workflow", "aipipe"];

const QUERY_LEAD_INS: [&str; 6] = [
    "search for ",
    "look up ",
    "find information about ",
    "what is ",
    "tell me about ",
    "information about ",
];

pub struct SimulatedResponder {
    latency: Duration,
    default_workflow: String,
}

impl SimulatedResponder {
    pub fn new(latency: Duration, default_workflow: impl Into<String>) -> Self {
        Self {
            latency,
            default_workflow: default_workflow.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            Duration::from_millis(config.responder.latency_ms),
            config.tools.aipipe.default_workflow.clone(),
        )
    }

    /// The reply for `history`, without the simulated latency.
    pub fn decide(&self, history: &[Message]) -> ModelStep {
        let Some(last) = history.last() else {
            return ModelStep::text(CANNED_REPLIES[0]);
        };

        if last.role == Role::Tool {
            return ModelStep::text(SUMMARY);
        }

        let text = last.text();
        let lower = text.to_lowercase();
        let call_id = |index: usize| format!("call_sim_{}_{index}", history.len());

        if contains_any(&lower, &SEARCH_KEYWORDS) {
            let query = extract_search_query(text);
            return ModelStep::text_and_tools(
                format!("I'll search for information about \"{query}\"."),
                vec![ToolCall::with_id(
                    call_id(0),
                    "search",
                    serde_json::json!({ "query": query }),
                )],
            );
        }

        if contains_any(&lower, &CODE_KEYWORDS)
            && let Some(code) = extract_code(text)
        {
            return ModelStep::text_and_tools(
                "I'll execute this JavaScript code for you.",
                vec![ToolCall::with_id(
                    call_id(0),
                    "execute_js",
                    serde_json::json!({ "code": code }),
                )],
            );
        }

        if contains_any(&lower, &WORKFLOW_KEYWORDS) {
            return ModelStep::text_and_tools(
                "I'll process this through an AI workflow.",
                vec![ToolCall::with_id(
                    call_id(0),
                    "aipipe",
                    serde_json::json!({
                        "prompt": text,
                        "workflow": self.default_workflow,
                    }),
                )],
            );
        }

        ModelStep::text(CANNED_REPLIES[history.len() % CANNED_REPLIES.len()])
    }
}

#[async_trait]
impl ModelResponder for SimulatedResponder {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn step(&self, history: &[Message]) -> Result<ModelStep, ModelError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let step = self.decide(history);
        debug!(
            history_len = history.len(),
            tool_calls = step.requested_tools().len(),
            "Simulated step"
        );
        Ok(step)
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// The text after the first known lead-in, or the whole text.
fn extract_search_query(text: &str) -> String {
    let lower = text.to_ascii_lowercase();
    for lead_in in QUERY_LEAD_INS {
        if let Some(pos) = lower.find(lead_in) {
            let rest = text[pos + lead_in.len()..].trim();
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    text.trim().to_string()
}

/// Code from a fenced block, the text after `execute`, or a `console.log(...)` call.
fn extract_code(text: &str) -> Option<String> {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        if let Some(end) = after.find("```") {
            let block = &after[..end];
            let block = match block.split_once('\n') {
                Some((lang, body)) if is_fence_language(lang) => body,
                _ => block,
            };
            let block = block.trim();
            if !block.is_empty() {
                return Some(block.to_string());
            }
        }
    }

    let lower = text.to_ascii_lowercase();
    if let Some(pos) = lower.find("execute") {
        let rest = text[pos + "execute".len()..].trim();
        if !rest.is_empty() && text[pos + "execute".len()..].starts_with(char::is_whitespace) {
            return Some(rest.to_string());
        }
    }

    let start = text.find("console.log(")?;
    let end = text[start..].find(')')?;
    Some(text[start..start + end + 1].to_string())
}

fn is_fence_language(tag: &str) -> bool {
    matches!(tag.trim().to_ascii_lowercase().as_str(), "" | "js" | "javascript")
}
