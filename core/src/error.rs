//! Error types for the banking client.
//!
//! # Design
//! Four families of failure reach callers:
//! - `ValidationError`: bad input caught before any network activity.
//! - transport (`Timeout` / `Connection`): retried up to the budget, then
//!   reported with the number of attempts made. `InvalidRequest` covers a
//!   request the transport could not send at all and is never retried.
//! - `HttpError`: the server answered with a non-2xx status. Never retried.
//! - `DeserializationError`: a 2xx body that does not decode. Never retried.

use crate::http::TransportError;

/// Input rejected at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    EmptyField { field: &'static str },

    #[error("amount must be greater than 0, got {0}")]
    NonPositiveAmount(f64),

    #[error("timeout must be positive")]
    NonPositiveTimeout,

    #[error("retry delay must be positive")]
    NonPositiveRetryDelay,

    #[error("request path cannot be empty")]
    EmptyPath,
}

/// Errors returned by `RequestExecutor` and `BankingClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Every attempt timed out; `attempts` is the total number made.
    #[error("request timed out after {attempts} attempt(s): {message}")]
    Timeout { attempts: u32, message: String },

    /// The last attempt failed to connect; `attempts` is the total number made.
    #[error("connection failed after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    /// The transport rejected the request before any exchange, e.g. a
    /// malformed URL.
    #[error("request could not be sent: {0}")]
    InvalidRequest(String),

    /// The server returned a status outside 200..300.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// A 2xx body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The authenticate response carried no usable token.
    #[error("no token received in authentication response")]
    MissingToken,
}

impl ApiError {
    /// Wrap the transport failure that ended the retry loop.
    pub(crate) fn exhausted(err: TransportError, attempts: u32) -> Self {
        match err {
            TransportError::Timeout(message) => ApiError::Timeout { attempts, message },
            TransportError::Connection(message) => ApiError::Connection { attempts, message },
            TransportError::Request(message) => ApiError::InvalidRequest(message),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Timeout { .. } | ApiError::Connection { .. })
    }

    /// HTTP status for application failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
