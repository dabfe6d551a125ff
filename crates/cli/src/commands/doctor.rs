//! `pipeclaw doctor` — Diagnose setup.

use pipeclaw_config::AppConfig;
use pipeclaw_core::tool::ToolExecutor;
use pipeclaw_tools::ExecuteJsTool;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 PipeClaw Doctor — System Diagnostics");
    println!("=======================================\n");

    let mut issues = 0;

    println!("  ✅ Rust binary running");

    // Check config
    let config_path = AppConfig::config_dir().join("config.toml");
    if !config_path.exists() {
        println!("  ⚠️  No config file, using defaults — run `pipeclaw onboard`");
    }
    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  ⚠️  1 issue(s) found. Fix the config and re-run.");
            return Ok(());
        }
    };

    // Check responder
    let registry = pipeclaw_tools::default_registry(&config.tools);
    match pipeclaw_providers::build_from_config(&config, registry.definitions()) {
        Ok(responder) => println!("  ✅ Responder ready: {}", responder.name()),
        Err(e) => {
            println!("  ❌ Responder: {e}");
            issues += 1;
        }
    }
    if config.responder.kind == "openai_compat" {
        println!("     Model: {} at {}", config.responder.model, config.responder.api_url);
    }

    // Check JavaScript runtime
    let js = &config.tools.execute_js;
    if js.enabled {
        let tool = ExecuteJsTool::from_config(js);
        match tool.sandbox_flag().await {
            Some(flag) => println!(
                "  ✅ JavaScript runtime found: {} (sandboxed with {flag})",
                tool.runtime()
            ),
            None if tool.runtime_available().await => {
                println!(
                    "  ⚠️  JavaScript runtime '{}' has no permission model (Node.js 20+ required) — execute_js calls will be refused",
                    tool.runtime()
                );
                issues += 1;
            }
            None => {
                println!(
                    "  ⚠️  JavaScript runtime '{}' not found — execute_js calls will fail",
                    tool.runtime()
                );
                issues += 1;
            }
        }
    } else {
        println!("  ⏭️  execute_js disabled");
    }

    println!("  ✅ Tools: {}", registry.names().join(", "));

    // Summary
    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
