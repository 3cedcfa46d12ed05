//! `codewright init`: write a starter config file.

use codewright_config::AppConfig;

use super::Overrides;

pub fn run(overrides: &Overrides, force: bool) -> anyhow::Result<()> {
    let config_path = overrides.config_path();

    if config_path.exists() && !force {
        println!("⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or re-run with --force.");
        return Ok(());
    }

    if let Some(parent) = config_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config_path, AppConfig::default_toml())?;

    println!("✅ Created config at: {}", config_path.display());
    println!();
    println!("📝 Next steps:");
    println!("   1. Set `provider` (mock, openai, openrouter, anthropic, ollama, custom)");
    println!("   2. Add an API key, or export LLM_API_KEY");
    println!("   3. Run: codewright chat");
    Ok(())
}
