//! Transport factory: selects the model backend named in the configuration.

use std::sync::Arc;

use codewright_config::AppConfig;
use codewright_core::error::TransportError;
use codewright_core::transport::Transport;
use tracing::info;

use crate::anthropic::AnthropicTransport;
use crate::mock::MockTransport;
use crate::openai_compat::OpenAiCompatTransport;

/// Provider names accepted by [`build_transport`].
pub const PROVIDERS: &[&str] = &["openai", "openrouter", "anthropic", "ollama", "mock", "custom"];

/// Build the transport selected by `config.provider`.
///
/// Hosted backends need an API key; `custom` needs a `base_url`. An unknown
/// provider name is [`TransportError::NotConfigured`].
pub fn build_transport(config: &AppConfig) -> Result<Arc<dyn Transport>, TransportError> {
    let settings = config.model_settings();
    let provider = config.provider.to_lowercase();

    let transport: Arc<dyn Transport> = match provider.as_str() {
        "mock" => Arc::new(MockTransport::new()),
        "openai" => Arc::new(with_base_url(
            OpenAiCompatTransport::openai(Some(require_key(config)?), settings.clone())?,
            config,
            "openai",
        )?),
        "openrouter" => Arc::new(with_base_url(
            OpenAiCompatTransport::openrouter(Some(require_key(config)?), settings.clone())?,
            config,
            "openrouter",
        )?),
        "ollama" => Arc::new(OpenAiCompatTransport::ollama(
            config.base_url.as_deref(),
            settings,
        )?),
        "anthropic" => {
            let mut transport = AnthropicTransport::new(require_key(config)?, settings)?;
            if let Some(url) = &config.base_url {
                transport = transport.with_base_url(url);
            }
            Arc::new(transport)
        }
        "custom" => {
            let base_url = config.base_url.clone().ok_or_else(|| {
                TransportError::NotConfigured("provider 'custom' requires base_url".into())
            })?;
            Arc::new(OpenAiCompatTransport::new(
                "custom",
                base_url,
                config.api_key.clone(),
                settings,
            )?)
        }
        other => {
            return Err(TransportError::NotConfigured(format!(
                "unknown provider '{other}' (expected one of: {})",
                PROVIDERS.join(", ")
            )));
        }
    };

    info!(provider = %transport.name(), model = %config.model, "Model transport ready");
    Ok(transport)
}

fn require_key(config: &AppConfig) -> Result<String, TransportError> {
    config.api_key.clone().ok_or_else(|| {
        TransportError::NotConfigured(format!(
            "provider '{}' requires an API key (set api_key or LLM_API_KEY)",
            config.provider
        ))
    })
}

/// Re-point a hosted OpenAI-compatible transport when `base_url` is set.
fn with_base_url(
    transport: OpenAiCompatTransport,
    config: &AppConfig,
    name: &str,
) -> Result<OpenAiCompatTransport, TransportError> {
    match &config.base_url {
        Some(url) => OpenAiCompatTransport::new(
            name,
            url.clone(),
            config.api_key.clone(),
            config.model_settings(),
        ),
        None => Ok(transport),
    }
}
