//! `pipeclaw onboard` — First-time setup.

use std::path::Path;

use pipeclaw_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();

    println!("🦀 PipeClaw — First-Time Setup");
    println!("==============================\n");

    if write_default_config(&config_dir)? {
        let config_path = config_dir.join("config.toml");
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Optionally set responder.kind = \"openai_compat\" and add your API key");
        println!("   2. Run: pipeclaw doctor");
        println!("   3. Run: pipeclaw chat\n");
    } else {
        println!(
            "⚠️  Config already exists at: {}",
            config_dir.join("config.toml").display()
        );
        println!("   Edit it manually or delete and re-run onboard.\n");
    }

    println!("🎉 Setup complete! Run `pipeclaw chat` to start chatting.\n");

    Ok(())
}

/// Write the default `config.toml` into `dir`, creating it if needed.
/// Returns `false` when a config already exists.
pub fn write_default_config(dir: &Path) -> std::io::Result<bool> {
    std::fs::create_dir_all(dir)?;
    let config_path = dir.join("config.toml");
    if config_path.exists() {
        return Ok(false);
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;
    Ok(true)
}
