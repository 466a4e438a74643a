//! Error types for the Elidune portal core

use thiserror::Error;

/// Closed set of error kinds the presentation layer chooses copy from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAuthenticated,
    AlreadyInProgress,
    Network,
    Auth,
    Validation,
    Server,
    Config,
    Storage,
}

/// Main application error type
///
/// Every coordinator operation returns one of these instead of panicking, so
/// the UI never has to look at transport internals.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Operation already in progress")]
    AlreadyInProgress,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authorization failed")]
    Auth,

    /// Server rejected the request (4xx with a message). The message is the
    /// server's reason, kept verbatim.
    #[error("{0}")]
    Validation(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credential storage error: {0}")]
    Storage(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotAuthenticated => ErrorKind::NotAuthenticated,
            AppError::AlreadyInProgress => ErrorKind::AlreadyInProgress,
            AppError::Network(_) => ErrorKind::Network,
            AppError::Auth => ErrorKind::Auth,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Server { .. } => ErrorKind::Server,
            AppError::Config(_) => ErrorKind::Config,
            AppError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Whether retrying the same input can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::Server { .. })
    }
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Storage(e.to_string())
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
