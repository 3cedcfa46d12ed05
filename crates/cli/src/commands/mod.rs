//! Subcommands and the config loading they share.

pub mod ask;
pub mod chat;
pub mod init;
pub mod tools;

use std::path::PathBuf;

use codewright_config::AppConfig;
use tracing::debug;

/// Global flags that take precedence over the config file.
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl Overrides {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
    }
}

/// File, then environment, then command-line flags.
pub fn load_config(overrides: &Overrides) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load_from(&overrides.config_path())?;
    config.apply_env_with(|key| std::env::var(key).ok());

    if let Some(provider) = &overrides.provider {
        config.provider = provider.clone();
    }
    if let Some(model) = &overrides.model {
        config.model = model.clone();
    }

    config.validate()?;
    debug!(
        provider = %config.provider,
        model = %config.model,
        intelligent = config.intelligent_mode,
        "Configuration loaded"
    );
    Ok(config)
}

/// Fail early, with setup hints, when a hosted provider has no key.
pub fn ensure_api_key(config: &AppConfig) -> anyhow::Result<()> {
    let needs_key = matches!(
        config.provider.to_lowercase().as_str(),
        "openai" | "openrouter" | "anthropic"
    );
    if !needs_key || config.has_api_key() {
        return Ok(());
    }

    eprintln!();
    eprintln!("  ERROR: provider '{}' needs an API key.", config.provider);
    eprintln!();
    eprintln!("  Export one of:");
    eprintln!("    LLM_API_KEY=...");
    eprintln!("    CODEWRIGHT_API_KEY=...");
    eprintln!();
    eprintln!("  Or set `api_key` in {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!("  Use `--provider mock` to try Codewright offline.");
    eprintln!();
    anyhow::bail!("no API key configured for provider '{}'", config.provider)
}

/// Login name for request logs, when the platform exposes one.
pub fn current_user() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .filter(|u| !u.is_empty())
}
