//! Built-in tool implementations for PipeClaw.
//!
//! Three distinct capabilities:
//! - `search` — web search lookup (simulated results)
//! - `aipipe` — run a prompt through a named workflow pipeline (simulated)
//! - `execute_js` — run JavaScript in a sandboxed child process

pub mod aipipe;
pub mod execute_js;
pub mod search;

use pipeclaw_config::ToolsConfig;
use pipeclaw_core::error::ToolError;
use pipeclaw_core::tool::ToolRegistry;
use serde::de::DeserializeOwned;

pub use aipipe::AiPipeTool;
pub use execute_js::ExecuteJsTool;
pub use search::SearchTool;

/// Create a tool registry with every built-in tool enabled by `config`.
pub fn default_registry(config: &ToolsConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(SearchTool::from_config(&config.search)));
    registry.register(Box::new(AiPipeTool::from_config(&config.aipipe)));
    if config.execute_js.enabled {
        registry.register(Box::new(ExecuteJsTool::from_config(&config.execute_js)));
    }
    registry
}

/// Deserialize tool arguments into their typed form.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: serde_json::Value) -> Result<T, ToolError> {
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}
