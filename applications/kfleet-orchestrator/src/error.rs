//! Error types for the fleet orchestrator

use thiserror::Error;

/// Orchestrator result type
pub type Result<T> = std::result::Result<T, FleetError>;

/// Errors that can occur while maintaining a fleet
#[derive(Error, Debug)]
pub enum FleetError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Control plane rejected a request; status and body are kept verbatim
    #[error("control plane error ({status}): {body}")]
    Api {
        /// Upstream HTTP status code
        status: reqwest::StatusCode,
        /// Raw response body
        body: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filter key outside the recognized field set
    #[error("unknown filter field '{field}', recognized fields: {allowed}")]
    UnknownFilterField {
        /// The rejected key
        field: String,
        /// Comma-separated list of accepted keys
        allowed: String,
    },

    /// Operator declined a confirmation prompt
    #[error("aborted by operator: {0}")]
    Aborted(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl FleetError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an operator-abort error
    pub fn aborted(msg: impl Into<String>) -> Self {
        Self::Aborted(msg.into())
    }

    /// Whether this error is a 401 from the control plane
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == reqwest::StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_keeps_status_and_body() {
        let err = FleetError::Api {
            status: reqwest::StatusCode::BAD_GATEWAY,
            body: "upstream exploded".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("upstream exploded"));
    }

    #[test]
    fn test_is_unauthorized() {
        let unauthorized = FleetError::Api {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: String::new(),
        };
        assert!(unauthorized.is_unauthorized());

        let forbidden = FleetError::Api {
            status: reqwest::StatusCode::FORBIDDEN,
            body: String::new(),
        };
        assert!(!forbidden.is_unauthorized());
        assert!(!FleetError::config("nope").is_unauthorized());
    }
}
