//! Error type system for the inventory console
//!
//! Two families live here:
//! - `ErrorInfo`: the uniform outcome of a failed request, written into the
//!   state of whichever container triggered it
//! - `ConsoleError`: setup and infrastructure failures (configuration,
//!   database, HTTP client construction)

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a failed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No response reached us (DNS, refused connection, timeout, offline)
    Transport,
    /// 4xx response (validation or auth failures)
    Client,
    /// 5xx response
    Server,
    /// 2xx response whose body could not be understood
    Decode,
    /// Payload rejected locally before dispatch
    Invalid,
    /// Operation not exposed by the resource
    Unsupported,
}

impl ErrorKind {
    /// Classify an HTTP status code that is not a success
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            ErrorKind::Server
        } else {
            ErrorKind::Client
        }
    }
}

/// Uniform error shape produced by the HTTP client and stored on entity state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ErrorInfo {
    /// Human-readable message, taken from the server body when available
    pub message: String,
    /// HTTP status code; `None` when no HTTP status applies
    pub status_code: Option<u16>,
    pub kind: ErrorKind,
}

impl ErrorInfo {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            kind: ErrorKind::Transport,
        }
    }

    /// Error for a non-2xx HTTP status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: Some(status),
            kind: ErrorKind::from_status(status),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            kind: ErrorKind::Decode,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code: None,
            kind: ErrorKind::Invalid,
        }
    }

    pub fn unsupported(operation: &str, resource: &str) -> Self {
        Self {
            message: format!("{} does not support {}", resource, operation),
            status_code: None,
            kind: ErrorKind::Unsupported,
        }
    }

    /// Get the error type name used in logs
    pub fn error_type(&self) -> &'static str {
        match self.kind {
            ErrorKind::Transport => "TransportError",
            ErrorKind::Client => "ClientError",
            ErrorKind::Server => "ServerError",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Invalid => "InvalidPayload",
            ErrorKind::Unsupported => "UnsupportedOperation",
        }
    }

    /// Whether the failure originated on the wire (as opposed to locally)
    pub fn is_remote(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Transport | ErrorKind::Client | ErrorKind::Server
        )
    }
}

/// Result type for request outcomes
pub type ApiResult<T> = std::result::Result<T, ErrorInfo>;

/// Setup and infrastructure errors
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Initialization failed: {0}")]
    InitializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    PoolError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClientError(String),
}

impl From<r2d2::Error> for ConsoleError {
    fn from(err: r2d2::Error) -> Self {
        ConsoleError::PoolError(err.to_string())
    }
}

impl From<crate::core::config::ConfigError> for ConsoleError {
    fn from(err: crate::core::config::ConfigError) -> Self {
        ConsoleError::ConfigError(err.to_string())
    }
}

/// Result type alias for setup operations
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Context extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context to an error using a closure
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ConsoleError::InitializationError(format!("{}: {}", context.into(), e)))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| ConsoleError::InitializationError(format!("{}: {}", f(), e)))
    }
}
