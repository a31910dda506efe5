//! Errors raised by the remote API boundary

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for operations that talk to the remote server
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Coarse classification of a [`RemoteError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Endpoint unreachable or connection refused
    Connection,
    /// Operation exceeded its deadline
    Timeout,
    /// Remote answered with a failure status
    Server,
    /// Credentials or token refresh rejected by the issuer
    Auth,
    /// Request rejected as malformed (4xx-equivalent)
    InvalidRequest,
    /// Response could not be decoded
    Protocol,
    /// Operation was cancelled locally
    Cancelled,
    /// Rejected locally by an open circuit breaker
    CircuitOpen,
}

/// Error returned by every call that crosses the remote boundary
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Endpoint unreachable or refused
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Deadline exceeded
    #[error("Timeout: {message}")]
    Timeout { message: String },

    /// Failure status from the remote without a connection-level fault
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// Issuer rejected credentials; requires user re-authentication
    #[error("Auth error: {message}")]
    Auth { message: String },

    /// Request rejected by the remote as invalid
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Undecodable or unexpected response payload
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    /// Cancelled by disconnect or shutdown
    #[error("Operation cancelled")]
    Cancelled,

    /// Rejected without contacting the remote while its circuit is open
    #[error("Circuit breaker open: {message}")]
    CircuitOpen { message: String },
}

impl RemoteError {
    /// Create a new Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a new Timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    /// Create a new Server error with an HTTP-equivalent status
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a new Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
        }
    }

    /// Create a new InvalidRequest error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new Protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Create a new CircuitOpen error
    pub fn circuit_open(message: impl Into<String>) -> Self {
        Self::CircuitOpen {
            message: message.into(),
        }
    }

    /// The tag consumed by the retry classifier
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Server { .. } => ErrorKind::Server,
            Self::Auth { .. } => ErrorKind::Auth,
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Protocol { .. } => ErrorKind::Protocol,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::CircuitOpen { .. } => ErrorKind::CircuitOpen,
        }
    }

    /// HTTP-equivalent status, when the remote supplied one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error is worth retrying
    ///
    /// Connection and timeout errors are transient. Server errors are
    /// transient only for 5xx statuses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Timeout { .. } => true,
            Self::Server { status, .. } => *status >= 500,
            Self::Auth { .. }
            | Self::InvalidRequest { .. }
            | Self::Protocol { .. }
            | Self::Cancelled
            | Self::CircuitOpen { .. } => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
