//! # PipeClaw Core
//!
//! Domain types, traits, and error definitions for the PipeClaw agent loop.
//! This crate has **no runtime wiring**. It defines the conversation model
//! and the two narrow seams the loop drives:
//!
//! - [`ModelResponder`] — given the history, decide the next step
//! - [`ToolExecutor`] — given a tool name and arguments, produce a payload
//!
//! Everything else (the loop itself, concrete tools, concrete responders,
//! the CLI presenter) lives in the crates that depend on this one.

pub mod agent;
pub mod error;
pub mod event;
pub mod message;
pub mod responder;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{SessionState, TurnState};
pub use error::{Error, HistoryError, ModelError, Result, ToolError, TurnError};
pub use event::{EventBus, NoopObserver, TurnEvent, TurnObserver};
pub use message::{ConversationHistory, ConversationId, Message, ModelStep, Role, ToolCall, ToolOutcome};
pub use responder::ModelResponder;
pub use tool::{Tool, ToolDefinition, ToolExecutor, ToolRegistry};
