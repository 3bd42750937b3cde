use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Main Error Type
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    // Convenience constructors
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Transport, message)
    }

    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::Backend,
            format!("backend returned {}: {}", status, message.into()),
        )
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Decode, message)
    }

    pub fn invalid_query(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidQuery, message)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Search cancelled")
    }

    pub fn stream(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Stream, message)
    }

    pub fn is_cancelled(&self) -> bool {
        self.code == ErrorCode::Cancelled
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}

// ============================================================================
// Error Codes
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ErrorCode {
    /// Request never reached the backend or the connection dropped.
    Transport,
    /// Backend answered with a non-OK HTTP status.
    Backend,
    /// Event stream broke mid-read.
    Stream,
    /// Frame payload could not be decoded.
    Decode,
    /// Query rejected before any network call.
    InvalidQuery,
    /// Session cancelled or superseded by a newer search.
    Cancelled,
}

impl ErrorCode {
    /// Whether starting a fresh session is worth trying. The session itself
    /// is never retried automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport | Self::Backend | Self::Stream)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Transport => "TRANSPORT_ERROR",
            Self::Backend => "BACKEND_ERROR",
            Self::Stream => "STREAM_ERROR",
            Self::Decode => "DECODE_ERROR",
            Self::InvalidQuery => "INVALID_QUERY",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

// ============================================================================
// Result Type Alias
// ============================================================================

pub type Result<T> = std::result::Result<T, AppError>;

// ============================================================================
// Config Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

// ============================================================================
// Error Conversion Implementations
// ============================================================================

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            Self::transport(format!("Connection error: {}", err))
        } else {
            Self::stream(format!("Request error: {}", err))
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(format!("JSON error: {}", err))
    }
}

impl From<std::convert::Infallible> for AppError {
    fn from(err: std::convert::Infallible) -> Self {
        match err {}
    }
}

// ============================================================================
// Error Context Extension
// ============================================================================

pub trait ErrorContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<AppError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let mut err = e.into();
            err.message = format!("{}: {}", context.into(), err.message);
            err
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn log_error(error: &AppError) {
    if error.is_cancelled() {
        log::debug!("{}", error);
    } else {
        log::warn!("{}", error);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = AppError::backend(502, "bad gateway");
        assert_eq!(err.code, ErrorCode::Backend);
        assert!(err.message.contains("502"));
    }

    #[test]
    fn test_error_display() {
        let err = AppError::transport("connection refused");
        let display = format!("{}", err);
        assert!(display.contains("TRANSPORT_ERROR"));
        assert!(display.contains("connection refused"));
    }

    #[test]
    fn test_error_classification() {
        assert!(ErrorCode::Transport.is_retryable());
        assert!(!ErrorCode::Cancelled.is_retryable());
        assert!(AppError::cancelled().is_cancelled());
    }

    #[test]
    fn test_error_context() {
        let result: std::result::Result<(), AppError> = Err(AppError::decode("bad frame"));
        let err = result.context("while reading stream").unwrap_err();
        assert!(err.message.starts_with("while reading stream"));
    }

    #[test]
    fn test_json_serialization() {
        let err = AppError::invalid_query("empty query")
            .with_details(serde_json::json!({"query": ""}));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("InvalidQuery"));
        assert!(json.contains("details"));
    }
}
