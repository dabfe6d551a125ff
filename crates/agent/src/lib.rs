//! The agent loop: the heart of PipeClaw.
//!
//! A turn follows an **ask → act → fold** cycle:
//!
//! 1. **Ask** the model responder for the next step, given the history
//! 2. **Speak**: any text in the step is appended and shown first
//! 3. **Act**: each requested tool call runs through the tool executor
//! 4. **Fold**: every result (or error) is appended as a `tool` message
//! 5. Loop back to 1 until a step requests no tools
//!
//! [`Session`] wraps the loop with the conversation history and makes
//! turns single-flight.

pub mod loop_runner;
pub mod session;

pub use loop_runner::{AgentLoop, TurnSummary};
pub use session::{IgnoreReason, Session, TurnOutcome};

#[cfg(test)]
pub(crate) mod test_helpers;
