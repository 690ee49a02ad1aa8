/// Unified error types for the Skythread client
use serde_json::Value;
use thiserror::Error;

/// Main error type for the client
#[derive(Error, Debug)]
pub enum ClientError {
    /// Post URL failed validation before any network call
    #[error(transparent)]
    InvalidUrl(#[from] UrlError),

    /// Remote endpoint returned a non-success status
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Transport-level failures (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A success response carried a body that is not valid JSON
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Durable store errors
    #[error("Store error: {0}")]
    Store(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A response was missing a field the client depends on
    #[error("Response is missing field '{0}'")]
    MissingField(&'static str),

    /// An authenticated call was made without a session
    #[error("Not logged in")]
    NotAuthenticated,

    /// The shared session refresh failed
    #[error(transparent)]
    SessionRefresh(#[from] RefreshError),
}

/// Post URL validation failure. Never carries a status code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UrlError {
    pub message: String,
}

impl UrlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// XRPC error: status code plus whatever body the server sent back
#[derive(Error, Debug, Clone, PartialEq)]
#[error("APIError status {status}")]
pub struct ApiError {
    pub status: u16,
    pub body: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, body: Option<Value>) -> Self {
        Self { status, body }
    }

    /// XRPC error name (e.g. `ExpiredToken`), if the body has one
    pub fn error_name(&self) -> Option<&str> {
        self.body.as_ref()?.get("error")?.as_str()
    }

    /// Human-readable message from the error body
    pub fn message(&self) -> Option<&str> {
        self.body.as_ref()?.get("message")?.as_str()
    }

    /// Whether the failure means the access token is no longer usable
    pub fn is_expired_token(&self) -> bool {
        match self.status {
            401 => true,
            400 => matches!(self.error_name(), Some("ExpiredToken") | Some("InvalidToken")),
            _ => false,
        }
    }
}

/// Refresh failure shared with every request waiting on the same refresh.
///
/// Cloneable so one outcome can be handed to all waiters.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Session refresh failed: {message}")]
pub struct RefreshError {
    pub status: Option<u16>,
    pub message: String,
}

impl From<&ClientError> for RefreshError {
    fn from(err: &ClientError) -> Self {
        let status = match err {
            ClientError::Api(api) => Some(api.status),
            _ => None,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl ClientError {
    /// The API error behind this failure, if the server produced one
    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
