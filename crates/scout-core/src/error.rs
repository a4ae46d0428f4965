use thiserror::Error;

/// Application-wide error types for Scout.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// LLM API call failed.
    #[error("LLM error (HTTP {status_code}): {message}")]
    LlmError { message: String, status_code: u16 },

    /// A source replied, but the reply could not be turned into company data.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Browser engine could not be launched or driven.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// A freshly constructed driver failed its smoke test.
    #[error("Smoke test failed for {engine}: {reason}")]
    SmokeTestFailed { engine: String, reason: String },

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Short label used in structured logs.
    ///
    /// Purely informational: the breakers treat every kind the same way.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::HttpError(_) => "http",
            AppError::LlmError { .. } => "llm",
            AppError::ParseError(_) | AppError::SerializationError(_) => "malformed_response",
            AppError::Timeout(_) => "timeout",
            AppError::RateLimitExceeded => "rate_limit",
            AppError::NetworkError(_) => "network",
            AppError::BrowserError(_) => "browser",
            AppError::SmokeTestFailed { .. } => "smoke_test",
            AppError::ConfigError(_) => "config",
            AppError::Generic(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("timeout") {
                    "timeout"
                } else if lower.contains("rate limit") {
                    "rate_limit"
                } else {
                    "generic"
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        assert_eq!(AppError::Timeout(30).kind(), "timeout");
        assert_eq!(AppError::RateLimitExceeded.kind(), "rate_limit");
        assert_eq!(AppError::ParseError("bad".into()).kind(), "malformed_response");
        assert_eq!(
            AppError::LlmError {
                message: "overloaded".into(),
                status_code: 503,
            }
            .kind(),
            "llm"
        );
    }

    #[test]
    fn test_generic_kind_sniffs_message() {
        assert_eq!(
            AppError::Generic("Request timeout for Gemini API".into()).kind(),
            "timeout"
        );
        assert_eq!(
            AppError::Generic("Rate limit exceeded for Gemini API".into()).kind(),
            "rate_limit"
        );
        assert_eq!(AppError::Generic("boom".into()).kind(), "generic");
    }

    #[test]
    fn test_display() {
        let err = AppError::SmokeTestFailed {
            engine: "chrome".into(),
            reason: "empty page source".into(),
        };
        assert_eq!(
            err.to_string(),
            "Smoke test failed for chrome: empty page source"
        );
    }
}
