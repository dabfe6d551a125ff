//! Message and conversation domain types.
//!
//! These are the value objects that flow through the loop:
//! user text → [`ConversationHistory`] → [`ModelStep`] → [`ToolCall`]s →
//! [`ToolOutcome`]s → back into the history as `tool` messages.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{HistoryError, ToolError};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The model, speaking either through text or through tool calls
    Assistant,
    /// A tool execution result
    Tool,
}

/// A structured request, emitted by a model step, to run one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID, correlates the call with its result
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a call with a freshly generated id.
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: Self::fresh_id(),
            name: name.into(),
            arguments,
        }
    }

    /// Create a call with an explicit id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// A new globally unique call id (`call_<uuid>`).
    pub fn fresh_id() -> String {
        format!("call_{}", Uuid::new_v4().simple())
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who sent this message
    pub role: Role,

    /// The text content; `None` when the assistant speaks through tools
    #[serde(default)]
    pub content: Option<String>,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role) -> Self {
        Self {
            role,
            content: None,
            tool_calls: None,
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::new(Role::User)
        }
    }

    /// Create a new assistant text message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::new(Role::Assistant)
        }
    }

    /// Create the assistant record of a tool-requesting step (`content = None`).
    pub fn tool_request(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::new(Role::Assistant)
        }
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool)
        }
    }

    /// Text content, or `""` when there is none.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Tool calls carried by this message (empty slice if none).
    pub fn calls(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// The ordered, append-only message log of one session.
///
/// Only [`ConversationHistory::push`] mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    /// Unique conversation ID
    pub id: ConversationId,

    messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl ConversationHistory {
    /// Create a new empty history.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Whether any assistant message in the history issued a call with this id.
    pub fn contains_call_id(&self, id: &str) -> bool {
        self.messages
            .iter()
            .flat_map(|m| m.calls())
            .any(|c| c.id == id)
    }

    /// Calls of the most recent tool request that have no result yet.
    ///
    /// Only the last request can be open: the loop answers every call
    /// before the model is queried again.
    pub fn unanswered_calls(&self) -> Vec<&ToolCall> {
        let Some(start) = self.messages.iter().rposition(|m| !m.calls().is_empty()) else {
            return Vec::new();
        };
        let answered: HashSet<&str> = self.messages[start + 1..]
            .iter()
            .filter_map(|m| m.tool_call_id.as_deref())
            .collect();
        self.messages[start]
            .calls()
            .iter()
            .filter(|c| !answered.contains(c.id.as_str()))
            .collect()
    }

    /// Append a cancelled result for every unanswered call and return the
    /// outcomes that were added.
    pub fn close_unanswered_calls(&mut self) -> Vec<ToolOutcome> {
        let outcomes: Vec<ToolOutcome> = self
            .unanswered_calls()
            .into_iter()
            .map(|c| ToolOutcome::failure(&c.id, &ToolError::Cancelled))
            .collect();
        for outcome in &outcomes {
            self.push(outcome.to_message());
        }
        outcomes
    }

    /// Verify the structural invariants of the history.
    ///
    /// Every call issued by an assistant message must be answered by exactly
    /// one tool message before the next user or assistant message.
    pub fn check_invariants(&self) -> Result<(), HistoryError> {
        let mut issued: HashSet<&str> = HashSet::new();
        // (call id, index of the issuing message), in call order
        let mut pending: Vec<(&str, usize)> = Vec::new();

        for (index, msg) in self.messages.iter().enumerate() {
            if msg.role != Role::Tool
                && let Some(&(call_id, at)) = pending.first()
            {
                return Err(HistoryError::UnansweredToolCall {
                    index: at,
                    call_id: call_id.to_string(),
                });
            }

            match msg.role {
                Role::Assistant => {
                    let Some(calls) = &msg.tool_calls else {
                        continue;
                    };
                    if msg.content.is_some() {
                        return Err(HistoryError::ContentWithToolCalls { index });
                    }
                    if calls.is_empty() {
                        return Err(HistoryError::EmptyToolCalls { index });
                    }
                    for call in calls {
                        if !issued.insert(call.id.as_str()) {
                            return Err(HistoryError::DuplicateCallId {
                                index,
                                call_id: call.id.clone(),
                            });
                        }
                        pending.push((call.id.as_str(), index));
                    }
                }
                Role::Tool => {
                    let Some(call_id) = &msg.tool_call_id else {
                        return Err(HistoryError::MissingToolCallId { index });
                    };
                    if !issued.contains(call_id.as_str()) {
                        return Err(HistoryError::OrphanToolResult {
                            index,
                            call_id: call_id.clone(),
                        });
                    }
                    let Some(pos) = pending.iter().position(|(id, _)| id == call_id) else {
                        return Err(HistoryError::DuplicateToolResult {
                            index,
                            call_id: call_id.clone(),
                        });
                    };
                    pending.remove(pos);
                }
                Role::User => {}
            }
        }

        match pending.first() {
            Some(&(call_id, index)) => Err(HistoryError::UnansweredToolCall {
                index,
                call_id: call_id.to_string(),
            }),
            None => Ok(()),
        }
    }
}

impl Default for ConversationHistory {
    fn default() -> Self {
        Self::new()
    }
}

/// What a [`crate::ModelResponder`] returns for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStep {
    /// Text to show the user, if any
    #[serde(default)]
    pub content: Option<String>,

    /// Tools the model wants to run, if any
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl ModelStep {
    /// A terminal text reply.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: None,
        }
    }

    /// A pure tool request.
    pub fn tools(calls: Vec<ToolCall>) -> Self {
        Self {
            content: None,
            tool_calls: Some(calls),
        }
    }

    /// Speak first, then request tools.
    pub fn text_and_tools(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            content: Some(content.into()),
            tool_calls: Some(calls),
        }
    }

    /// The requested tool calls (empty slice if none).
    pub fn requested_tools(&self) -> &[ToolCall] {
        self.tool_calls.as_deref().unwrap_or(&[])
    }
}

/// The result or error of one tool call, ready to fold into the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub tool_call_id: String,

    /// Serialized result payload, or serialized `{"error": ...}` object
    pub content: String,

    pub success: bool,
}

impl ToolOutcome {
    pub fn success(tool_call_id: impl Into<String>, payload: &serde_json::Value) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: payload.to_string(),
            success: true,
        }
    }

    pub fn failure(tool_call_id: impl Into<String>, error: &ToolError) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            content: error.to_payload().to_string(),
            success: false,
        }
    }

    pub fn from_result(
        tool_call_id: impl Into<String>,
        result: &Result<serde_json::Value, ToolError>,
    ) -> Self {
        match result {
            Ok(payload) => Self::success(tool_call_id, payload),
            Err(e) => Self::failure(tool_call_id, e),
        }
    }

    /// The `tool` message that records this outcome.
    pub fn to_message(&self) -> Message {
        Message::tool_result(&self.tool_call_id, &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall::with_id(id, "search", serde_json::json!({"query": "Rome"}))
    }

    #[test]
    fn create_user_message() {
        let msg = Message::user("Hello, agent!");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), "Hello, agent!");
        assert!(msg.tool_calls.is_none());
        assert!(msg.tool_call_id.is_none());
    }

    #[test]
    fn tool_request_has_no_content() {
        let msg = Message::tool_request(vec![call("call_1")]);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_none());
        assert_eq!(msg.calls().len(), 1);
    }

    #[test]
    fn fresh_ids_are_unique() {
        let a = ToolCall::new("search", serde_json::json!({}));
        let b = ToolCall::new("search", serde_json::json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }

    #[test]
    fn history_tracks_updates() {
        let mut history = ConversationHistory::new();
        let created = history.created_at;

        history.push(Message::user("First message"));
        assert_eq!(history.len(), 1);
        assert!(history.updated_at >= created);
        assert_eq!(history.last().unwrap().text(), "First message");
    }

    #[test]
    fn valid_tool_exchange_passes_invariants() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("search for Rome"));
        history.push(Message::assistant("Searching."));
        history.push(Message::tool_request(vec![call("call_1"), call("call_2")]));
        history.push(Message::tool_result("call_1", "{}"));
        history.push(Message::tool_result("call_2", "{}"));
        history.push(Message::assistant("Done."));

        assert!(history.check_invariants().is_ok());
        assert!(history.contains_call_id("call_2"));
        assert!(!history.contains_call_id("call_3"));
    }

    #[test]
    fn orphan_tool_result_is_rejected() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("hi"));
        history.push(Message::tool_result("call_missing", "{}"));

        assert_eq!(
            history.check_invariants(),
            Err(HistoryError::OrphanToolResult {
                index: 1,
                call_id: "call_missing".into()
            })
        );
    }

    #[test]
    fn duplicate_call_ids_are_rejected() {
        let mut history = ConversationHistory::new();
        history.push(Message::tool_request(vec![call("call_1")]));
        history.push(Message::tool_result("call_1", "{}"));
        history.push(Message::tool_request(vec![call("call_1")]));

        assert!(matches!(
            history.check_invariants(),
            Err(HistoryError::DuplicateCallId { index: 2, .. })
        ));
    }

    #[test]
    fn unanswered_call_is_rejected() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("go"));
        history.push(Message::tool_request(vec![call("call_1"), call("call_2")]));
        history.push(Message::tool_result("call_1", "{}"));

        assert_eq!(
            history.check_invariants(),
            Err(HistoryError::UnansweredToolCall {
                index: 1,
                call_id: "call_2".into()
            })
        );

        history.push(Message::user("next"));
        assert!(matches!(
            history.check_invariants(),
            Err(HistoryError::UnansweredToolCall { index: 1, .. })
        ));
    }

    #[test]
    fn second_result_for_one_call_is_rejected() {
        let mut history = ConversationHistory::new();
        history.push(Message::tool_request(vec![call("call_1")]));
        history.push(Message::tool_result("call_1", "{}"));
        history.push(Message::tool_result("call_1", "{}"));

        assert_eq!(
            history.check_invariants(),
            Err(HistoryError::DuplicateToolResult {
                index: 2,
                call_id: "call_1".into()
            })
        );
    }

    #[test]
    fn closing_unanswered_calls_restores_invariants() {
        let mut history = ConversationHistory::new();
        history.push(Message::user("go"));
        history.push(Message::tool_request(vec![call("call_1"), call("call_2")]));
        history.push(Message::tool_result("call_1", "{}"));

        let ids: Vec<&str> = history.unanswered_calls().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["call_2"]);

        let closed = history.close_unanswered_calls();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0].tool_call_id, "call_2");
        assert!(!closed[0].success);
        assert_eq!(history.last().unwrap().text(), r#"{"error":"cancelled"}"#);
        assert!(history.unanswered_calls().is_empty());
        assert!(history.check_invariants().is_ok());
        assert!(history.close_unanswered_calls().is_empty());
    }

    #[test]
    fn assistant_speaking_and_calling_in_one_message_is_rejected() {
        let mut history = ConversationHistory::new();
        let mut msg = Message::assistant("both");
        msg.tool_calls = Some(vec![call("call_1")]);
        history.push(msg);

        assert_eq!(
            history.check_invariants(),
            Err(HistoryError::ContentWithToolCalls { index: 0 })
        );
    }

    #[test]
    fn message_serialization_uses_null_content() {
        let msg = Message::tool_request(vec![call("call_1")]);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["id"], "call_1");
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn outcome_from_error_is_serialized_error_object() {
        let outcome = ToolOutcome::failure("call_1", &ToolError::UnknownTool("nope".into()));
        assert!(!outcome.success);
        let parsed: serde_json::Value = serde_json::from_str(&outcome.content).unwrap();
        assert_eq!(parsed["error"], "Unknown tool: nope");

        let msg = outcome.to_message();
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn model_step_accessors() {
        assert!(ModelStep::text("hi").requested_tools().is_empty());
        let step = ModelStep::text_and_tools("looking", vec![call("call_1")]);
        assert_eq!(step.content.as_deref(), Some("looking"));
        assert_eq!(step.requested_tools().len(), 1);
    }
}
