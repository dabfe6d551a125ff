//! AI pipe tool — run a prompt through a named workflow.
//!
//! The workflow backend is simulated: the tool validates the workflow name,
//! waits a configurable latency and reports a processed result with metadata.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use pipeclaw_config::{AiPipeConfig, is_workflow_name};
use pipeclaw_core::error::ToolError;
use pipeclaw_core::tool::Tool;
use serde::Deserialize;
use tracing::debug;

use crate::parse_args;

const CONFIDENCE: f64 = 0.94;

pub struct AiPipeTool {
    latency: Duration,
}

impl AiPipeTool {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    pub fn from_config(config: &AiPipeConfig) -> Self {
        Self::new(Duration::from_millis(config.latency_ms))
    }
}

#[derive(Deserialize)]
struct AiPipeArgs {
    prompt: String,
    workflow: String,
}

#[async_trait]
impl Tool for AiPipeTool {
    fn name(&self) -> &str {
        "aipipe"
    }

    fn description(&self) -> &str {
        "Execute AI workflows: process a prompt through a named analysis pipeline."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "The prompt to process"
                },
                "workflow": {
                    "type": "string",
                    "description": "The workflow to execute, e.g. 'general_analysis'"
                }
            },
            "required": ["prompt", "workflow"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: AiPipeArgs = parse_args(arguments)?;
        if args.prompt.trim().is_empty() {
            return Err(ToolError::InvalidArguments("'prompt' must not be empty".into()));
        }
        if !is_workflow_name(&args.workflow) {
            return Err(ToolError::InvalidArguments(format!(
                "Invalid workflow name '{}': use letters, digits, '_' or '-'",
                args.workflow
            )));
        }

        debug!(workflow = %args.workflow, prompt_len = args.prompt.len(), "Running workflow");
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let elapsed = started.elapsed().max(self.latency);

        Ok(serde_json::json!({
            "workflow": args.workflow,
            "processed_prompt": args.prompt,
            "result": format!(
                "Successfully processed \"{}\" through the {} workflow. The analysis has been completed \
                 with structured output and actionable recommendations based on the input.",
                args.prompt, args.workflow
            ),
            "metadata": {
                "processing_time": format!("{:.1}s", elapsed.as_secs_f64()),
                "tokens_used": 200 + args.prompt.len() / 4,
                "confidence": CONFIDENCE,
            }
        }))
    }
}
