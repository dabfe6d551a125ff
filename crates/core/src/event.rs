//! Turn events — how the loop talks to whatever presents the conversation.
//!
//! The loop calls a [`TurnObserver`] as the turn progresses. A presenter (the
//! CLI console, a test recorder, a UI bridge) implements the callbacks it
//! cares about. [`EventBus`] is an observer that republishes every callback
//! as a [`TurnEvent`] on a broadcast channel for decoupled subscribers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::message::{ToolCall, ToolOutcome};

/// Events emitted during a turn, in serializable form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// The model produced text for the user.
    AssistantText { text: String },

    /// The loop is about to run a tool call.
    ToolRequested { call: ToolCall },

    /// A tool call finished (successfully or not).
    ToolResult { tool_call_id: String, outcome: ToolOutcome },

    /// The turn was aborted.
    TurnError { message: String },

    /// The session started or stopped processing a turn.
    ProcessingChanged { processing: bool },
}

impl TurnEvent {
    /// Stable event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::AssistantText { .. } => "assistant_text",
            Self::ToolRequested { .. } => "tool_requested",
            Self::ToolResult { .. } => "tool_result",
            Self::TurnError { .. } => "turn_error",
            Self::ProcessingChanged { .. } => "processing_changed",
        }
    }
}

/// Callbacks fired by the agent loop and session. All default to no-ops.
///
/// Every `on_tool_requested` is followed by exactly one `on_tool_result` for
/// the same call, including calls closed out as cancelled before they ran.
pub trait TurnObserver: Send + Sync {
    fn on_assistant_text(&self, _text: &str) {}

    fn on_tool_requested(&self, _call: &ToolCall) {}

    fn on_tool_result(&self, _tool_call_id: &str, _outcome: &ToolOutcome) {}

    fn on_turn_error(&self, _message: &str) {}

    fn on_processing_changed(&self, _processing: bool) {}
}

/// An observer that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {}

/// A broadcast-based event bus for turn events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<TurnEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: TurnEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<TurnEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl TurnObserver for EventBus {
    fn on_assistant_text(&self, text: &str) {
        self.publish(TurnEvent::AssistantText { text: text.to_string() });
    }

    fn on_tool_requested(&self, call: &ToolCall) {
        self.publish(TurnEvent::ToolRequested { call: call.clone() });
    }

    fn on_tool_result(&self, tool_call_id: &str, outcome: &ToolOutcome) {
        self.publish(TurnEvent::ToolResult {
            tool_call_id: tool_call_id.to_string(),
            outcome: outcome.clone(),
        });
    }

    fn on_turn_error(&self, message: &str) {
        self.publish(TurnEvent::TurnError { message: message.to_string() });
    }

    fn on_processing_changed(&self, processing: bool) {
        self.publish(TurnEvent::ProcessingChanged { processing });
    }
}
