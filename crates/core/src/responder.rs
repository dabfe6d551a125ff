//! ModelResponder trait — the abstraction over "the model".
//!
//! A responder looks at the conversation so far and decides the next step:
//! a terminal text reply, a set of tool calls, or both (text first).
//!
//! Implementations: a local simulated responder and an OpenAI-compatible
//! HTTP client (see `pipeclaw-providers`), plus scripted stubs in tests.

use async_trait::async_trait;

use crate::error::ModelError;
use crate::message::{Message, ModelStep};

/// The core ModelResponder trait.
///
/// `step` must depend only on the history snapshot it receives; the loop
/// calls it repeatedly with a monotonically growing history.
#[async_trait]
pub trait ModelResponder: Send + Sync {
    /// A human-readable name for this responder (e.g., "simulated", "openai").
    fn name(&self) -> &str;

    /// Decide the next step for the given history.
    async fn step(&self, history: &[Message]) -> Result<ModelStep, ModelError>;
}
