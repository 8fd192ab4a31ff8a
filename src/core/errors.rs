use serde_json::Value;
use thiserror::Error;

/// Status used when the upstream gave us nothing to classify
pub const DEFAULT_ERROR_STATUS: u16 = 500;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Structured business error returned by the exchange (`{"code": .., "msg": ..}`)
    #[error("API error: {code} - {message}")]
    ApiError { code: i64, message: String },

    /// Error payload that carries no `msg` field, passed through untouched
    #[error("Malformed API error: {code} - {payload}")]
    MalformedApiError { code: i64, payload: Value },

    /// No usable response payload (connect failure, timeout, empty body)
    #[error("Network error: {status} - {message}")]
    NetworkError { status: u16, message: String },

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// Build a transport failure with the default server-error classification
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            status: DEFAULT_ERROR_STATUS,
            message: message.into(),
        }
    }

    /// Numeric code surfaced to callers, when the error has one
    pub fn status_code(&self) -> Option<i64> {
        match self {
            Self::ApiError { code, .. } | Self::MalformedApiError { code, .. } => Some(*code),
            Self::NetworkError { status, .. } => Some(i64::from(*status)),
            _ => None,
        }
    }

    /// Whether the exchange answered with an error payload of its own
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::ApiError { .. } | Self::MalformedApiError { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_network_error_defaults_to_500() {
        let err = ExchangeError::network("connection refused");
        assert_eq!(err.status_code(), Some(500));
        assert!(!err.is_upstream());
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_api_error_code_is_surfaced() {
        let err = ExchangeError::ApiError {
            code: -1102,
            message: "Mandatory parameter 'txId' was not sent".to_string(),
        };
        assert_eq!(err.status_code(), Some(-1102));
        assert!(err.is_upstream());
    }

    #[test]
    fn test_malformed_error_keeps_payload() {
        let err = ExchangeError::MalformedApiError {
            code: 400,
            payload: json!({"error": "bad"}),
        };
        assert_eq!(err.status_code(), Some(400));
        assert!(err.to_string().contains("\"error\":\"bad\""));
    }

    #[test]
    fn test_local_errors_have_no_code() {
        let err = ExchangeError::InvalidParameters("nested object".to_string());
        assert_eq!(err.status_code(), None);
    }
}
