//! Error types for the financial health monitor

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Error, Debug)]
pub enum MonitorError {

    // =============================
    // Monitor Pipeline Errors
    // =============================

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Entity store error: {0}")]
    Store(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// HTTP status this error surfaces as
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            MonitorError::Unauthorized => axum::http::StatusCode::UNAUTHORIZED,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        assert_eq!(MonitorError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            MonitorError::Llm("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(MonitorError::Store("down".into()).to_string(), "Entity store error: down");
    }
}
