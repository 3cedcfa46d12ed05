//! Shared HTTP plumbing for the network transports.

use std::time::Duration;

use codewright_core::error::TransportError;
use tracing::warn;

/// Build a client whose request timeout is the only bounded wait.
pub(crate) fn client(timeout_secs: u64) -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| TransportError::NotConfigured(format!("failed to build HTTP client: {e}")))
}

/// Map a reqwest failure onto the transport taxonomy.
pub(crate) fn classify(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout(e.to_string())
    } else {
        TransportError::Network(e.to_string())
    }
}

/// Read the body of a response, turning a non-success status into
/// [`TransportError::Status`].
pub(crate) async fn success_body(response: reqwest::Response) -> Result<String, TransportError> {
    let status = response.status();
    let body = response.text().await.map_err(classify)?;

    if !status.is_success() {
        let message = error_message(&body);
        warn!(status = status.as_u16(), body = %message, "Model backend returned error");
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        });
    }
    Ok(body)
}

/// The server's `error.message` when the body carries one, else the raw body.
pub(crate) fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_structured_field() {
        let body = r#"{"error":{"message":"Rate limit exceeded","code":429}}"#;
        assert_eq!(error_message(body), "Rate limit exceeded");
    }

    #[test]
    fn error_message_falls_back_to_body() {
        assert_eq!(error_message("Service Unavailable"), "Service Unavailable");
        assert_eq!(error_message(r#"{"detail":"x"}"#), r#"{"detail":"x"}"#);
    }
}
