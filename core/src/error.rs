//! Error types for the network-model client.
//!
//! # Design
//! Everything a caller can see collapses into `ApiError`: a closed `ErrorKind`
//! plus the raw message the server sent, if any. Failures that happen before
//! a response exists (`BuildError`, `TransportError`) convert into `ApiError`
//! so the service hands back a single error type on every path.

use std::fmt;

use thiserror::Error;

/// Closed set of failure categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The connectivity probe reported no network; nothing was sent.
    NoConnection,
    /// 400.
    BadRequest,
    /// 401 and 403.
    Unauthorized,
    /// Not produced by the default status table; available to custom
    /// transports and callers that want to distinguish it.
    Forbidden,
    /// 404.
    NotFound,
    /// 402, used by the login endpoints for a rejected username/password.
    BadCredentials,
    /// 500.
    InternalError,
    /// A success response whose body could not be decoded.
    ProcessingError,
    /// Anything else, including transport and build failures.
    UnknownError,
}

impl ErrorKind {
    /// Message shown when the server did not supply one.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorKind::NoConnection => "This operation requires an active internet connection",
            ErrorKind::BadRequest => "Bad Request",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::NotFound => "Object Not Found",
            ErrorKind::BadCredentials => "Incorrect Username or Password",
            ErrorKind::InternalError => "An internal server error occurred",
            ErrorKind::ProcessingError => "There was an error processing the response",
            ErrorKind::UnknownError => "An unknown error occurred with your request",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoConnection => "no connection",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not found",
            ErrorKind::BadCredentials => "bad credentials",
            ErrorKind::InternalError => "internal error",
            ErrorKind::ProcessingError => "processing error",
            ErrorKind::UnknownError => "unknown error",
        };
        f.write_str(name)
    }
}

/// Error returned by every `WebService` operation and by the decoder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {}", self.message())]
pub struct ApiError {
    kind: ErrorKind,
    server_message: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            server_message: None,
        }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            server_message: Some(message.into()),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The raw message supplied by the server or transport, if any.
    pub fn server_message(&self) -> Option<&str> {
        self.server_message.as_deref()
    }

    /// User-facing text: the server message when present, otherwise the
    /// kind's default.
    pub fn message(&self) -> &str {
        self.server_message
            .as_deref()
            .unwrap_or_else(|| self.kind.default_message())
    }

    pub fn no_connection() -> Self {
        Self::new(ErrorKind::NoConnection)
    }
}

/// Failure to turn a `RequestModel` into an `HttpRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Parameter encoding failed: {0}")]
    EncodingFailed(String),
}

/// Failure below HTTP: DNS, connect, TLS, body read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<BuildError> for ApiError {
    fn from(err: BuildError) -> Self {
        ApiError::with_message(ErrorKind::UnknownError, err.to_string())
    }
}

impl From<TransportError> for ApiError {
    fn from(err: TransportError) -> Self {
        ApiError::with_message(ErrorKind::UnknownError, err.0)
    }
}
