//! OpenAI-compatible responder.
//!
//! Works with OpenAI, OpenRouter, Ollama, vLLM and any endpoint exposing
//! `/chat/completions` with function calling. One request per model step,
//! non-streaming.

use std::time::Duration;

use async_trait::async_trait;
use pipeclaw_config::ResponderConfig;
use pipeclaw_core::error::{Error, ModelError};
use pipeclaw_core::message::{Message, ModelStep, Role, ToolCall};
use pipeclaw_core::responder::ModelResponder;
use pipeclaw_core::tool::ToolDefinition;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A responder backed by an OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatResponder {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    system_prompt: Option<String>,
    tools: Vec<ToolDefinition>,
    client: reqwest::Client,
}

impl std::fmt::Debug for OpenAiCompatResponder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatResponder")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}

impl OpenAiCompatResponder {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Internal(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.7,
            max_tokens: 4096,
            system_prompt: None,
            tools: Vec::new(),
            client,
        })
    }

    pub fn from_config(
        config: &ResponderConfig,
        api_key: String,
        tools: Vec<ToolDefinition>,
    ) -> Result<Self, Error> {
        let mut responder = Self::new(
            config.api_url.as_str(),
            api_key,
            config.model.as_str(),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        responder.temperature = config.temperature;
        responder.max_tokens = config.max_tokens;
        responder.system_prompt = config.system_prompt.clone();
        responder.tools = tools;
        Ok(responder)
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Convert the history to OpenAI API format, system prompt first.
    fn to_api_messages(&self, history: &[Message]) -> Vec<ApiMessage> {
        let system = self.system_prompt.as_ref().map(|prompt| ApiMessage {
            role: "system".into(),
            content: Some(prompt.clone()),
            tool_calls: None,
            tool_call_id: None,
        });

        system
            .into_iter()
            .chain(history.iter().map(|m| ApiMessage {
                role: match m.role {
                    Role::User => "user".into(),
                    Role::Assistant => "assistant".into(),
                    Role::Tool => "tool".into(),
                },
                content: m.content.clone(),
                tool_calls: m.tool_calls.as_ref().map(|calls| {
                    calls
                        .iter()
                        .map(|tc| ApiToolCall {
                            id: tc.id.clone(),
                            r#type: "function".into(),
                            function: ApiFunction {
                                name: tc.name.clone(),
                                arguments: tc.arguments.to_string(),
                            },
                        })
                        .collect()
                }),
                tool_call_id: m.tool_call_id.clone(),
            }))
            .collect()
    }

    /// Convert tool definitions to OpenAI API format.
    fn to_api_tools(tools: &[ToolDefinition]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    fn request_body(&self, history: &[Message]) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": self.to_api_messages(history),
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": false,
        });

        if !self.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(&self.tools));
        }

        body
    }
}

/// Turn the first choice's message into a [`ModelStep`].
fn to_step(message: ApiMessage) -> ModelStep {
    let tool_calls = message.tool_calls.filter(|calls| !calls.is_empty()).map(|calls| {
        calls
            .into_iter()
            .map(|tc| ToolCall::with_id(tc.id, tc.function.name, parse_arguments(tc.function.arguments)))
            .collect()
    });

    ModelStep {
        content: message.content,
        tool_calls,
    }
}

/// Arguments arrive as a JSON string. Anything unparseable is passed through
/// as a string value so the tool rejects it as invalid.
fn parse_arguments(raw: String) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(&raw).unwrap_or(serde_json::Value::String(raw))
}

#[async_trait]
impl ModelResponder for OpenAiCompatResponder {
    fn name(&self) -> &str {
        "openai_compat"
    }

    async fn step(&self, history: &[Message]) -> Result<ModelStep, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(history);

        debug!(model = %self.model, messages = history.len(), "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 429 {
            return Err(ModelError::RateLimited {
                retry_after_secs: 5,
            });
        }

        if status == 401 || status == 403 {
            return Err(ModelError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Model endpoint returned error");
            return Err(ModelError::Api {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("No choices in response".into()))?;

        let step = to_step(choice.message);
        debug!(
            model = %api_response.model,
            tool_calls = step.requested_tools().len(),
            "Completion received"
        );
        Ok(step)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}
