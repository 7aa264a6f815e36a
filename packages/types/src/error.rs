use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Fixed taxonomy for failed suggestion calls. Raw provider messages are
/// classified into one of these codes at the boundary; the rest of the core
/// only ever branches on the code, never on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Auth,
    Configuration,
    Parse,
    RateLimit,
    Network,
    Unknown,
}

impl ErrorCode {
    /// Whether a retry with identical inputs can reasonably succeed.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorCode::RateLimit | ErrorCode::Network | ErrorCode::Unknown
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Auth => "auth",
            ErrorCode::Configuration => "configuration",
            ErrorCode::Parse => "parse",
            ErrorCode::RateLimit => "rate_limit",
            ErrorCode::Network => "network",
            ErrorCode::Unknown => "unknown",
        }
    }
}

/// Error payload attached to a generated node while it sits in the error
/// state. `retryable` is recorded on the payload (not recomputed) so the
/// retry gate works on exactly what the classification decided at failure
/// time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, thiserror::Error)]
#[error("{provider}: {message}")]
pub struct GenerationError {
    pub message: String,
    pub code: ErrorCode,
    pub retryable: bool,
    pub provider: String,
}

impl GenerationError {
    pub fn new(
        provider: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            code,
            retryable: code.retryable(),
            provider: provider.into(),
        }
    }

    pub fn configuration(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorCode::Configuration, message)
    }

    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ErrorCode::Parse, message)
    }

    /// Classify a raw transport/provider failure by its message. Anything
    /// that matches no known pattern stays `Unknown`, which is retryable.
    pub fn classify(provider: impl Into<String>, raw: &str) -> Self {
        let lower = raw.to_lowercase();
        let matches_any = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        let code = if matches_any(&["401", "403", "unauthorized", "invalid api key", "forbidden"]) {
            ErrorCode::Auth
        } else if matches_any(&["429", "rate limit", "too many requests"]) {
            ErrorCode::RateLimit
        } else if matches_any(&["network", "fetch"]) {
            ErrorCode::Network
        } else {
            ErrorCode::Unknown
        };

        Self::new(provider, code, raw)
    }
}
