//! A single conversation: history, loop and observer, one turn at a time.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use pipeclaw_core::agent::SessionState;
use pipeclaw_core::error::TurnError;
use pipeclaw_core::event::TurnObserver;
use pipeclaw_core::message::{ConversationHistory, ConversationId, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::loop_runner::{AgentLoop, TurnSummary};

/// Why a submission was not turned into a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The text was empty or whitespace only
    Empty,
    /// Another turn is still in progress
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Ignored(IgnoreReason),
    Completed(TurnSummary),
}

/// Owns one conversation and runs its turns through an [`AgentLoop`].
///
/// Submissions are single-flight: while a turn is running, further
/// submissions are ignored rather than queued.
pub struct Session {
    id: ConversationId,
    agent: AgentLoop,
    observer: Arc<dyn TurnObserver>,
    history: tokio::sync::Mutex<ConversationHistory>,
    processing: AtomicBool,
    current_turn: Mutex<Option<CancellationToken>>,
    turns_completed: AtomicU64,
    turns_failed: AtomicU64,
    tool_calls_made: AtomicU64,
}

impl Session {
    pub fn new(agent: AgentLoop, observer: Arc<dyn TurnObserver>) -> Self {
        Self::with_history(agent, observer, ConversationHistory::new())
    }

    /// Resume an existing conversation.
    pub fn with_history(
        agent: AgentLoop,
        observer: Arc<dyn TurnObserver>,
        history: ConversationHistory,
    ) -> Self {
        Self {
            id: history.id.clone(),
            agent,
            observer,
            history: tokio::sync::Mutex::new(history),
            processing: AtomicBool::new(false),
            current_turn: Mutex::new(None),
            turns_completed: AtomicU64::new(0),
            turns_failed: AtomicU64::new(0),
            tool_calls_made: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    /// Submit user text and run a turn to completion.
    ///
    /// Empty text and submissions during a running turn are ignored without
    /// touching the history or the observer. A turn error is reported once
    /// through `on_turn_error` and returned.
    pub async fn submit_user_message(&self, text: &str) -> Result<TurnOutcome, TurnError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(TurnOutcome::Ignored(IgnoreReason::Empty));
        }

        let Some(_guard) = ProcessingGuard::acquire(self) else {
            debug!(conversation_id = %self.id, "Turn in progress, ignoring submission");
            return Ok(TurnOutcome::Ignored(IgnoreReason::Busy));
        };

        let cancel = CancellationToken::new();
        *self.lock_current_turn() = Some(cancel.clone());

        let mut history = self.history.lock().await;
        self.close_abandoned_calls(&mut history);
        history.push(Message::user(text));

        match self.agent.run(&mut history, self.observer.as_ref(), &cancel).await {
            Ok(summary) => {
                self.turns_completed.fetch_add(1, Ordering::Relaxed);
                self.tool_calls_made
                    .fetch_add(summary.tool_calls_made as u64, Ordering::Relaxed);
                Ok(TurnOutcome::Completed(summary))
            }
            Err(e) => {
                self.turns_failed.fetch_add(1, Ordering::Relaxed);
                warn!(conversation_id = %self.id, error = %e, "Turn failed");
                self.observer.on_turn_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Cancel the running turn, if any. Returns whether one was running.
    pub fn cancel_turn(&self) -> bool {
        match self.lock_current_turn().as_ref() {
            Some(token) => {
                info!(conversation_id = %self.id, "Cancelling turn");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// A copy of the history. Waits for a running turn to finish.
    pub async fn history(&self) -> ConversationHistory {
        self.history.lock().await.clone()
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            processing: self.is_processing(),
            turns_completed: self.turns_completed.load(Ordering::Relaxed),
            turns_failed: self.turns_failed.load(Ordering::Relaxed),
            tool_calls_made: self.tool_calls_made.load(Ordering::Relaxed),
        }
    }

    /// Answer calls left open by a turn whose future was dropped mid-tool.
    fn close_abandoned_calls(&self, history: &mut ConversationHistory) {
        let closed = history.close_unanswered_calls();
        if closed.is_empty() {
            return;
        }
        warn!(
            conversation_id = %self.id,
            count = closed.len(),
            "Closed tool calls left open by an abandoned turn"
        );
        for outcome in &closed {
            self.observer.on_tool_result(&outcome.tool_call_id, outcome);
        }
    }

    fn lock_current_turn(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.current_turn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Holds the processing flag for the duration of a turn.
///
/// Dropping it releases the flag whether the turn succeeded, failed or was
/// abandoned mid-flight. An abandoned turn's open tool calls are closed with
/// cancelled results here when the history is free, and otherwise before
/// the next user message is appended.
struct ProcessingGuard<'a> {
    session: &'a Session,
}

impl<'a> ProcessingGuard<'a> {
    fn acquire(session: &'a Session) -> Option<Self> {
        session
            .processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        session.observer.on_processing_changed(true);
        Some(Self { session })
    }
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut history) = self.session.history.try_lock() {
            self.session.close_abandoned_calls(&mut history);
        }
        self.session.lock_current_turn().take();
        self.session.processing.store(false, Ordering::SeqCst);
        self.session.observer.on_processing_changed(false);
    }
}
