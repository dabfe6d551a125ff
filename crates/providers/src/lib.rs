//! Model responder implementations for PipeClaw.
//!
//! All responders implement `pipeclaw_core::ModelResponder`.
//! [`build_from_config`] selects one based on configuration.

pub mod openai_compat;
pub mod simulated;

use std::sync::Arc;

use pipeclaw_config::AppConfig;
use pipeclaw_core::error::Error;
use pipeclaw_core::responder::ModelResponder;
use pipeclaw_core::tool::ToolDefinition;
use tracing::info;

pub use openai_compat::OpenAiCompatResponder;
pub use simulated::SimulatedResponder;

/// Build the responder named by `config.responder.kind`.
///
/// `tools` are advertised to network responders so the model can request them.
pub fn build_from_config(
    config: &AppConfig,
    tools: Vec<ToolDefinition>,
) -> Result<Arc<dyn ModelResponder>, Error> {
    let rc = &config.responder;
    let responder: Arc<dyn ModelResponder> = match rc.kind.as_str() {
        "simulated" => Arc::new(SimulatedResponder::from_config(config)),
        "openai_compat" => {
            let api_key = rc.api_key.clone().ok_or_else(|| Error::Config {
                message: "responder 'openai_compat' needs an API key \
                          (set responder.api_key or PIPECLAW_API_KEY)"
                    .into(),
            })?;
            Arc::new(OpenAiCompatResponder::from_config(rc, api_key, tools)?)
        }
        other => {
            return Err(Error::Config {
                message: format!("unknown responder kind '{other}'"),
            });
        }
    };

    info!(responder = responder.name(), "Model responder ready");
    Ok(responder)
}
