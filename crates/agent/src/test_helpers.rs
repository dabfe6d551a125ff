//! Shared test helpers for loop and session tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use pipeclaw_core::error::{ModelError, ToolError};
use pipeclaw_core::event::TurnObserver;
use pipeclaw_core::message::{Message, ModelStep, ToolCall, ToolOutcome};
use pipeclaw_core::responder::ModelResponder;
use pipeclaw_core::tool::ToolExecutor;

/// A responder that replays scripted steps in order.
///
/// Once the script is exhausted it answers with the text `"done"`.
pub struct ScriptedResponder {
    steps: Mutex<VecDeque<Result<ModelStep, ModelError>>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl ScriptedResponder {
    pub fn new(steps: Vec<Result<ModelStep, ModelError>>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn steps(steps: Vec<ModelStep>) -> Self {
        Self::new(steps.into_iter().map(Ok).collect())
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelResponder for ScriptedResponder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn step(&self, _history: &[Message]) -> Result<ModelStep, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelStep::text("done")))
    }
}

/// Always requests an `echo` call, never finishing on its own.
pub struct EndlessToolResponder;

#[async_trait]
impl ModelResponder for EndlessToolResponder {
    fn name(&self) -> &str {
        "endless"
    }

    async fn step(&self, _history: &[Message]) -> Result<ModelStep, ModelError> {
        Ok(ModelStep::tools(vec![ToolCall::new("echo", serde_json::json!({"n": 1}))]))
    }
}

/// Tool executor with a few fixed behaviours:
/// `echo` returns its arguments, `fail` always fails,
/// `sleep` waits `ms` milliseconds and reports it.
#[derive(Default)]
pub struct StubTools {
    pub started: Mutex<Vec<String>>,
}

#[async_trait]
impl ToolExecutor for StubTools {
    async fn execute(&self, name: &str, arguments: &serde_json::Value) -> Result<serde_json::Value, ToolError> {
        self.started.lock().unwrap().push(name.to_string());
        match name {
            "echo" => Ok(arguments.clone()),
            "fail" => Err(ToolError::ExecutionFailed {
                tool_name: "fail".into(),
                reason: "always fails".into(),
            }),
            "sleep" => {
                let ms = arguments["ms"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(serde_json::json!({ "slept": ms }))
            }
            other => Err(ToolError::UnknownTool(other.to_string())),
        }
    }
}

/// Observer that records every callback as a short string.
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl TurnObserver for RecordingObserver {
    fn on_assistant_text(&self, text: &str) {
        self.record(format!("text:{text}"));
    }

    fn on_tool_requested(&self, call: &ToolCall) {
        self.record(format!("requested:{}", call.name));
    }

    fn on_tool_result(&self, _tool_call_id: &str, outcome: &ToolOutcome) {
        self.record(format!("result:{}", outcome.success));
    }

    fn on_turn_error(&self, message: &str) {
        self.record(format!("error:{message}"));
    }

    fn on_processing_changed(&self, processing: bool) {
        self.record(format!("processing:{processing}"));
    }
}

pub fn call(id: &str, name: &str, arguments: serde_json::Value) -> ToolCall {
    ToolCall::with_id(id, name, arguments)
}
