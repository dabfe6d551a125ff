//! The agent loop implementation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use pipeclaw_config::AgentSettings;
use pipeclaw_core::agent::TurnState;
use pipeclaw_core::error::{ModelError, ToolError, TurnError};
use pipeclaw_core::event::TurnObserver;
use pipeclaw_core::message::{ConversationHistory, Message, ModelStep, ToolCall, ToolOutcome};
use pipeclaw_core::responder::ModelResponder;
use pipeclaw_core::tool::ToolExecutor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What a completed turn did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnSummary {
    /// Model queries made during the turn
    pub model_steps: u32,

    /// Tool calls executed, failures included
    pub tool_calls_made: usize,

    /// Messages appended to the history by the loop
    pub messages_appended: usize,

    /// The last assistant text of the turn, if any
    pub final_text: Option<String>,
}

/// Orchestrates model steps and tool execution for one turn at a time.
///
/// The loop holds no conversation state of its own: it appends to the
/// history it is handed and nothing else.
pub struct AgentLoop {
    responder: Arc<dyn ModelResponder>,

    tools: Arc<dyn ToolExecutor>,

    /// Maximum model queries per turn, `0` for unbounded
    max_iterations: u32,

    model_timeout: Option<Duration>,

    tool_timeout: Option<Duration>,

    /// Run the calls of one step concurrently
    parallel_tool_calls: bool,
}

impl AgentLoop {
    pub fn new(responder: Arc<dyn ModelResponder>, tools: Arc<dyn ToolExecutor>) -> Self {
        Self {
            responder,
            tools,
            max_iterations: 25,
            model_timeout: None,
            tool_timeout: None,
            parallel_tool_calls: false,
        }
    }

    /// Create a loop with the guards from `[agent]` settings.
    pub fn from_config(
        responder: Arc<dyn ModelResponder>,
        tools: Arc<dyn ToolExecutor>,
        settings: &AgentSettings,
    ) -> Self {
        let mut agent = Self::new(responder, tools)
            .with_max_iterations(settings.max_iterations)
            .with_parallel_tool_calls(settings.parallel_tool_calls);
        if let Some(secs) = settings.model_timeout_secs {
            agent = agent.with_model_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = settings.tool_timeout_secs {
            agent = agent.with_tool_timeout(Duration::from_secs(secs));
        }
        agent
    }

    /// Set the maximum number of model queries per turn (`0` disables the guard).
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_model_timeout(mut self, timeout: Duration) -> Self {
        self.model_timeout = Some(timeout);
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = Some(timeout);
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = enabled;
        self
    }

    pub fn responder_name(&self) -> &str {
        self.responder.name()
    }

    /// Run one turn against `history`, which should end with the user message.
    ///
    /// Returns once a model step requests no tools. Tool failures are folded
    /// into the history as data; model failures, the iteration guard and
    /// cancellation end the turn with a [`TurnError`]. Whatever was appended
    /// before an error stays in the history.
    pub async fn run(
        &self,
        history: &mut ConversationHistory,
        observer: &dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary, TurnError> {
        let started_len = history.len();
        let mut summary = TurnSummary::default();
        let mut state = TurnState::AwaitingModelStep;

        info!(
            conversation_id = %history.id,
            messages = started_len,
            responder = self.responder.name(),
            "Starting turn"
        );

        loop {
            if cancel.is_cancelled() {
                info!(conversation_id = %history.id, "Turn cancelled before model query");
                return Err(TurnError::Cancelled);
            }

            if self.max_iterations > 0 && summary.model_steps >= self.max_iterations {
                warn!(
                    conversation_id = %history.id,
                    limit = self.max_iterations,
                    "Iteration limit reached without a final answer"
                );
                return Err(TurnError::IterationLimit {
                    limit: self.max_iterations,
                });
            }

            summary.model_steps += 1;
            debug!(
                conversation_id = %history.id,
                iteration = summary.model_steps,
                "Querying model"
            );

            let step = self.query_model(history.messages(), cancel).await?;

            if let Some(text) = step.content.as_deref().filter(|t| !t.is_empty()) {
                history.push(Message::assistant(text));
                observer.on_assistant_text(text);
                summary.final_text = Some(text.to_string());
            }

            let calls = step.tool_calls.unwrap_or_default();
            if calls.is_empty() {
                advance(&mut state, TurnState::Done);
                summary.messages_appended = history.len() - started_len;
                info!(
                    conversation_id = %history.id,
                    model_steps = summary.model_steps,
                    tool_calls = summary.tool_calls_made,
                    "Turn complete"
                );
                return Ok(summary);
            }

            advance(&mut state, TurnState::ToolsRequested);
            let calls = normalize_call_ids(history, calls);
            debug!(
                conversation_id = %history.id,
                tool_count = calls.len(),
                "Executing tool calls"
            );
            history.push(Message::tool_request(calls.clone()));

            let executed = if self.parallel_tool_calls {
                self.run_parallel(history, &calls, observer, cancel).await
            } else {
                self.run_sequential(history, &calls, observer, cancel).await
            };
            summary.tool_calls_made += executed?;

            advance(&mut state, TurnState::AwaitingModelStep);
        }
    }

    async fn query_model(
        &self,
        messages: &[Message],
        cancel: &CancellationToken,
    ) -> Result<ModelStep, TurnError> {
        let query = async {
            match self.model_timeout {
                Some(limit) => tokio::time::timeout(limit, self.responder.step(messages))
                    .await
                    .unwrap_or_else(|_| {
                        Err(ModelError::Timeout {
                            timeout_secs: limit.as_secs(),
                        })
                    }),
                None => self.responder.step(messages).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TurnError::Cancelled),
            result = query => result.map_err(|e| {
                warn!(error = %e, "Model query failed");
                TurnError::ModelUnavailable(e)
            }),
        }
    }

    async fn execute_call(&self, call: &ToolCall) -> (Result<serde_json::Value, ToolError>, Duration) {
        let start = Instant::now();
        let exec = self.tools.execute(&call.name, &call.arguments);
        let result = match self.tool_timeout {
            Some(limit) => tokio::time::timeout(limit, exec).await.unwrap_or_else(|_| {
                Err(ToolError::Timeout {
                    tool_name: call.name.clone(),
                    timeout_secs: limit.as_secs(),
                })
            }),
            None => exec.await,
        };
        (result, start.elapsed())
    }

    /// Run calls one at a time, in order. Returns how many produced a result.
    async fn run_sequential(
        &self,
        history: &mut ConversationHistory,
        calls: &[ToolCall],
        observer: &dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<usize, TurnError> {
        for (index, call) in calls.iter().enumerate() {
            observer.on_tool_requested(call);

            let finished = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                finished = self.execute_call(call) => Some(finished),
            };

            let Some((result, elapsed)) = finished else {
                let outcome = ToolOutcome::failure(&call.id, &ToolError::Cancelled);
                history.push(outcome.to_message());
                observer.on_tool_result(&call.id, &outcome);
                record_cancelled(history, &calls[index + 1..], observer, true);
                return Err(TurnError::Cancelled);
            };

            record(history, call, result, elapsed, observer);
        }
        Ok(calls.len())
    }

    /// Run all calls together; results are still appended in call order.
    async fn run_parallel(
        &self,
        history: &mut ConversationHistory,
        calls: &[ToolCall],
        observer: &dyn TurnObserver,
        cancel: &CancellationToken,
    ) -> Result<usize, TurnError> {
        for call in calls {
            observer.on_tool_requested(call);
        }

        let batch = join_all(calls.iter().map(|call| self.execute_call(call)));
        let finished = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            finished = batch => Some(finished),
        };

        let Some(finished) = finished else {
            record_cancelled(history, calls, observer, false);
            return Err(TurnError::Cancelled);
        };

        for (call, (result, elapsed)) in calls.iter().zip(finished) {
            record(history, call, result, elapsed, observer);
        }
        Ok(calls.len())
    }
}

fn advance(state: &mut TurnState, next: TurnState) {
    debug_assert!(
        state.can_transition_to(next),
        "illegal turn transition {state:?} -> {next:?}"
    );
    *state = next;
}

/// Give every call an id that is non-empty and unused in the history and
/// within the step.
fn normalize_call_ids(history: &ConversationHistory, calls: Vec<ToolCall>) -> Vec<ToolCall> {
    let mut seen = HashSet::new();
    calls
        .into_iter()
        .map(|mut call| {
            let reuse = call.id.is_empty()
                || history.contains_call_id(&call.id)
                || !seen.insert(call.id.clone());
            if reuse {
                let fresh = ToolCall::fresh_id();
                debug!(old = %call.id, new = %fresh, tool = %call.name, "Re-keyed tool call id");
                call.id = fresh;
                seen.insert(call.id.clone());
            }
            call
        })
        .collect()
}

fn record(
    history: &mut ConversationHistory,
    call: &ToolCall,
    result: Result<serde_json::Value, ToolError>,
    elapsed: Duration,
    observer: &dyn TurnObserver,
) {
    let duration_ms = elapsed.as_millis() as u64;
    match &result {
        Ok(_) => debug!(tool = %call.name, tool_call_id = %call.id, duration_ms, "Tool succeeded"),
        Err(e) => warn!(tool = %call.name, tool_call_id = %call.id, duration_ms, error = %e, "Tool failed"),
    }

    let outcome = ToolOutcome::from_result(&call.id, &result);
    history.push(outcome.to_message());
    observer.on_tool_result(&call.id, &outcome);
}

/// Close out calls that will never finish so every call keeps its result.
///
/// `announce` fires `on_tool_requested` first for calls the observer has
/// not seen yet, keeping requests and results paired.
fn record_cancelled(
    history: &mut ConversationHistory,
    calls: &[ToolCall],
    observer: &dyn TurnObserver,
    announce: bool,
) {
    for call in calls {
        if announce {
            observer.on_tool_requested(call);
        }
        let outcome = ToolOutcome::failure(&call.id, &ToolError::Cancelled);
        history.push(outcome.to_message());
        observer.on_tool_result(&call.id, &outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{EndlessToolResponder, RecordingObserver, ScriptedResponder, StubTools, call};
    use pipeclaw_core::event::NoopObserver;
    use pipeclaw_core::message::Role;

    fn agent(responder: ScriptedResponder) -> (AgentLoop, Arc<ScriptedResponder>, Arc<StubTools>) {
        let responder = Arc::new(responder);
        let tools = Arc::new(StubTools::default());
        (AgentLoop::new(responder.clone(), tools.clone()), responder, tools)
    }

    fn history_with(text: &str) -> ConversationHistory {
        let mut history = ConversationHistory::new();
        history.push(Message::user(text));
        history
    }

    #[tokio::test]
    async fn text_only_step_appends_one_message() {
        let (agent, responder, _) = agent(ScriptedResponder::steps(vec![ModelStep::text("hi")]));
        let mut history = history_with("hello");

        let summary = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].role, Role::Assistant);
        assert_eq!(history.messages()[1].text(), "hi");
        assert_eq!(summary.model_steps, 1);
        assert_eq!(summary.messages_appended, 1);
        assert_eq!(summary.final_text.as_deref(), Some("hi"));
        assert_eq!(responder.call_count(), 1);
    }

    #[tokio::test]
    async fn tool_step_appends_request_and_results_in_order() {
        let calls = vec![
            call("a", "echo", serde_json::json!({"n": 1})),
            call("b", "echo", serde_json::json!({"n": 2})),
            call("c", "echo", serde_json::json!({"n": 3})),
        ];
        let (agent, responder, _) = agent(ScriptedResponder::steps(vec![
            ModelStep::tools(calls),
            ModelStep::text("all done"),
        ]));
        let mut history = history_with("go");

        let summary = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        let msgs = history.messages();
        // user + tool request + 3 results + final text
        assert_eq!(msgs.len(), 6);
        assert!(msgs[1].content.is_none());
        assert_eq!(msgs[1].calls().len(), 3);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            assert_eq!(msgs[2 + i].role, Role::Tool);
            assert_eq!(msgs[2 + i].tool_call_id.as_deref(), Some(*id));
        }
        assert_eq!(msgs[2].text(), r#"{"n":1}"#);
        assert_eq!(msgs[5].text(), "all done");
        assert_eq!(summary.tool_calls_made, 3);
        assert_eq!(summary.messages_appended, 5);
        assert_eq!(responder.call_count(), 2);
        history.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn text_is_surfaced_before_tool_work() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![
            ModelStep::text_and_tools("Let me check.", vec![call("a", "echo", serde_json::json!({}))]),
            ModelStep::text("Checked."),
        ]));
        let observer = RecordingObserver::default();
        let mut history = history_with("check");

        agent
            .run(&mut history, &observer, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            observer.events(),
            vec!["text:Let me check.", "requested:echo", "result:true", "text:Checked."]
        );
        assert_eq!(history.messages()[1].text(), "Let me check.");
        assert_eq!(history.messages()[2].calls().len(), 1);
    }

    #[tokio::test]
    async fn failing_tool_is_data_and_loop_continues() {
        let (agent, responder, _) = agent(ScriptedResponder::steps(vec![
            ModelStep::tools(vec![
                call("a", "fail", serde_json::json!({})),
                call("b", "nope", serde_json::json!({})),
            ]),
            ModelStep::text("recovered"),
        ]));
        let observer = RecordingObserver::default();
        let mut history = history_with("go");

        let summary = agent
            .run(&mut history, &observer, &CancellationToken::new())
            .await
            .unwrap();

        let failed: serde_json::Value = serde_json::from_str(history.messages()[2].text()).unwrap();
        assert!(failed["error"].as_str().unwrap().contains("always fails"));
        let unknown: serde_json::Value = serde_json::from_str(history.messages()[3].text()).unwrap();
        assert_eq!(unknown["error"], "Unknown tool: nope");
        assert_eq!(summary.final_text.as_deref(), Some("recovered"));
        assert_eq!(responder.call_count(), 2);
        assert!(observer.events().contains(&"result:false".to_string()));
    }

    #[tokio::test]
    async fn model_failure_aborts_and_keeps_history() {
        let (agent, _, _) = agent(ScriptedResponder::new(vec![
            Ok(ModelStep::tools(vec![call("a", "echo", serde_json::json!({}))])),
            Err(ModelError::Network("connection reset".into())),
        ]));
        let mut history = history_with("go");

        let err = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::ModelUnavailable(ModelError::Network(_))));
        assert_eq!(history.len(), 3);
        history.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn empty_content_is_not_appended() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![ModelStep {
            content: Some(String::new()),
            tool_calls: Some(Vec::new()),
        }]));
        let mut history = history_with("go");

        let summary = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(summary.messages_appended, 0);
        assert!(summary.final_text.is_none());
    }

    #[tokio::test]
    async fn colliding_ids_are_rekeyed() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![
            ModelStep::tools(vec![call("dup", "echo", serde_json::json!({}))]),
            ModelStep::tools(vec![
                call("dup", "echo", serde_json::json!({})),
                call("x", "echo", serde_json::json!({})),
                call("x", "echo", serde_json::json!({})),
                call("", "echo", serde_json::json!({})),
            ]),
        ]));
        let mut history = history_with("go");

        agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        history.check_invariants().unwrap();
        let second = history.messages()[3].calls();
        assert_ne!(second[0].id, "dup");
        assert_eq!(second[1].id, "x");
        assert_ne!(second[2].id, "x");
        assert!(!second[3].id.is_empty());
    }

    #[tokio::test]
    async fn iteration_limit_stops_runaway_tools() {
        let tools = Arc::new(StubTools::default());
        let agent = AgentLoop::new(Arc::new(EndlessToolResponder), tools).with_max_iterations(3);
        let mut history = history_with("loop forever");

        let err = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::IterationLimit { limit: 3 }));
        // user + 3 * (request + result)
        assert_eq!(history.len(), 7);
        history.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn zero_iterations_disables_guard() {
        let steps = (0..30)
            .map(|i| ModelStep::tools(vec![call(&format!("c{i}"), "echo", serde_json::json!({}))]))
            .chain(std::iter::once(ModelStep::text("finally")))
            .collect();
        let (agent, _, _) = agent(ScriptedResponder::steps(steps));
        let agent = agent.with_max_iterations(0);
        let mut history = history_with("go");

        let summary = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(summary.model_steps, 31);
    }

    #[tokio::test(start_paused = true)]
    async fn model_timeout_aborts_turn() {
        let (agent, _, _) = agent(
            ScriptedResponder::steps(vec![ModelStep::text("late")]).with_delay(Duration::from_secs(10)),
        );
        let agent = agent.with_model_timeout(Duration::from_secs(2));
        let mut history = history_with("go");

        let err = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::ModelUnavailable(ModelError::Timeout { timeout_secs: 2 })));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tool_timeout_is_recorded_as_data() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![
            ModelStep::tools(vec![call("a", "sleep", serde_json::json!({"ms": 10_000}))]),
            ModelStep::text("moving on"),
        ]));
        let agent = agent.with_tool_timeout(Duration::from_secs(1));
        let mut history = history_with("go");

        let summary = agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        let payload: serde_json::Value = serde_json::from_str(history.messages()[2].text()).unwrap();
        assert!(payload["error"].as_str().unwrap().contains("timed out"));
        assert_eq!(summary.final_text.as_deref(), Some("moving on"));
    }

    #[tokio::test]
    async fn cancelled_before_start() {
        let (agent, responder, _) = agent(ScriptedResponder::steps(vec![ModelStep::text("hi")]));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut history = history_with("go");

        let err = agent.run(&mut history, &NoopObserver, &cancel).await.unwrap_err();

        assert!(matches!(err, TurnError::Cancelled));
        assert_eq!(responder.call_count(), 0);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_tools_closes_every_call() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![ModelStep::tools(vec![
            call("a", "echo", serde_json::json!({})),
            call("b", "sleep", serde_json::json!({"ms": 5_000})),
            call("c", "echo", serde_json::json!({})),
        ])]));
        let observer = RecordingObserver::default();
        let cancel = CancellationToken::new();
        let mut history = history_with("go");

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(agent.run(&mut history, &observer, &cancel), canceller);

        assert!(matches!(result, Err(TurnError::Cancelled)));
        let msgs = history.messages();
        assert_eq!(msgs.len(), 5);
        assert_eq!(msgs[2].text(), r#"{}"#);
        assert_eq!(msgs[3].text(), r#"{"error":"cancelled"}"#);
        assert_eq!(msgs[4].text(), r#"{"error":"cancelled"}"#);
        history.check_invariants().unwrap();
        assert_eq!(
            observer.events(),
            vec![
                "requested:echo",
                "result:true",
                "requested:sleep",
                "result:false",
                "requested:echo",
                "result:false",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_parallel_tools_reports_every_result() {
        let (agent, _, _) = agent(ScriptedResponder::steps(vec![ModelStep::tools(vec![
            call("a", "sleep", serde_json::json!({"ms": 5_000})),
            call("b", "sleep", serde_json::json!({"ms": 5_000})),
        ])]));
        let agent = agent.with_parallel_tool_calls(true);
        let observer = RecordingObserver::default();
        let cancel = CancellationToken::new();
        let mut history = history_with("go");

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(agent.run(&mut history, &observer, &cancel), canceller);

        assert!(matches!(result, Err(TurnError::Cancelled)));
        assert_eq!(history.len(), 4);
        history.check_invariants().unwrap();
        assert_eq!(
            observer.events(),
            vec!["requested:sleep", "requested:sleep", "result:false", "result:false"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_during_model_query() {
        let (agent, _, _) = agent(
            ScriptedResponder::steps(vec![ModelStep::text("late")]).with_delay(Duration::from_secs(30)),
        );
        let cancel = CancellationToken::new();
        let mut history = history_with("go");

        let canceller = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            cancel.cancel();
        };
        let (result, ()) = tokio::join!(agent.run(&mut history, &NoopObserver, &cancel), canceller);

        assert!(matches!(result, Err(TurnError::Cancelled)));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_calls_keep_call_order() {
        let (agent, _, tools) = agent(ScriptedResponder::steps(vec![
            ModelStep::tools(vec![
                call("slow", "sleep", serde_json::json!({"ms": 300})),
                call("fast", "sleep", serde_json::json!({"ms": 10})),
            ]),
            ModelStep::text("done"),
        ]));
        let agent = agent.with_parallel_tool_calls(true);
        let mut history = history_with("go");
        let start = tokio::time::Instant::now();

        agent
            .run(&mut history, &NoopObserver, &CancellationToken::new())
            .await
            .unwrap();

        assert!(start.elapsed() < Duration::from_millis(310));
        let msgs = history.messages();
        assert_eq!(msgs[2].tool_call_id.as_deref(), Some("slow"));
        assert_eq!(msgs[3].tool_call_id.as_deref(), Some("fast"));
        assert_eq!(tools.started.lock().unwrap().len(), 2);
        history.check_invariants().unwrap();
    }

    #[test]
    fn from_config_applies_settings() {
        let settings = AgentSettings {
            max_iterations: 4,
            model_timeout_secs: Some(30),
            tool_timeout_secs: None,
            parallel_tool_calls: true,
        };
        let agent = AgentLoop::from_config(
            Arc::new(ScriptedResponder::steps(Vec::new())),
            Arc::new(StubTools::default()),
            &settings,
        );
        assert_eq!(agent.max_iterations, 4);
        assert_eq!(agent.model_timeout, Some(Duration::from_secs(30)));
        assert!(agent.tool_timeout.is_none());
        assert!(agent.parallel_tool_calls);
        assert_eq!(agent.responder_name(), "scripted");
    }
}
