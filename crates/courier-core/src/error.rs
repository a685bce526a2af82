//! Error types for the courier client.
//!
//! One error type covers transport, authentication, protocol, input
//! validation and storage failures. Authentication failures are split into
//! terminal ones (the session has been torn down) and retryable ones (the
//! session is intact and a later attempt may succeed).

use std::fmt;
use thiserror::Error;

/// The unified error type for courier operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport errors (DNS, TLS, connection, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Authentication errors raised by the refresh protocol.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Non-success responses from the backend.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input validation errors (invalid URL, header, JSON).
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InvalidInputError),

    /// Durable session storage errors.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl Error {
    /// True when the session was ended and the user must sign in again.
    pub fn is_session_ended(&self) -> bool {
        matches!(self, Error::Auth(AuthError::SessionEnded { .. }))
    }

    /// True when the failure left the session intact and the call may be
    /// attempted again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Auth(AuthError::RefreshFailed { .. }) | Error::Transport(_)
        )
    }
}

/// Transport-level errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network connection failed.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// Request timed out.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Generic HTTP error.
    #[error("HTTP error: {message}")]
    Http { message: String },
}

/// Authentication errors produced while recovering from a 401.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The refresh credential was rejected or missing. The session has been
    /// logged out.
    #[error("session ended: {reason}")]
    SessionEnded { reason: String },

    /// The refresh call failed for a reason unrelated to the credential.
    /// The session is preserved.
    #[error("token refresh failed: {reason}")]
    RefreshFailed { reason: String },
}

/// A non-success HTTP response.
#[derive(Debug, Clone)]
pub struct ProtocolError {
    /// HTTP status code.
    pub status: u16,
    /// Error code from the response body (if present).
    pub error: Option<String>,
    /// Error message from the response body (if present).
    pub message: Option<String>,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(ref error) = self.error {
            write!(f, " [{}]", error)?;
        }
        if let Some(ref message) = self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ProtocolError {}

impl ProtocolError {
    /// Create a new protocol error.
    pub fn new(status: u16, error: Option<String>, message: Option<String>) -> Self {
        Self {
            status,
            error,
            message,
        }
    }

    /// Check if the backend rejected the access token.
    pub fn is_auth_error(&self) -> bool {
        self.status == 401
    }

    /// Check if a refresh call failed because the refresh credential itself
    /// was rejected.
    pub fn is_terminal_refresh_failure(&self) -> bool {
        self.status == 401 || self.status == 403
    }
}

/// Input validation errors.
#[derive(Debug, Error)]
pub enum InvalidInputError {
    /// Invalid API base URL.
    #[error("invalid API URL '{value}': {reason}")]
    ApiUrl { value: String, reason: String },

    /// Header name or value that cannot be sent.
    #[error("invalid header '{name}': {reason}")]
    Header { name: String, reason: String },

    /// Body that could not be encoded or decoded as JSON.
    #[error("invalid JSON: {message}")]
    Json { message: String },

    /// Generic invalid input.
    #[error("invalid input: {message}")]
    Other { message: String },
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(InvalidInputError::Json {
            message: err.to_string(),
        })
    }
}

/// Durable storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing medium failed.
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Stored data could not be decoded.
    #[error("corrupt store: {message}")]
    Corrupt { message: String },
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io {
            message: err.to_string(),
        }
    }
}
