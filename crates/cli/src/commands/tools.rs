//! `pipeclaw tools` — Print the tool definitions advertised to the model.

use pipeclaw_config::AppConfig;
use pipeclaw_core::tool::ToolExecutor;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    println!("{}", definitions_json(&config)?);
    Ok(())
}

fn definitions_json(config: &AppConfig) -> Result<String, serde_json::Error> {
    let registry = pipeclaw_tools::default_registry(&config.tools);
    serde_json::to_string_pretty(&registry.definitions())
}
