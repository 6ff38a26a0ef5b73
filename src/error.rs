use std::fmt;

use thiserror::Error;

use crate::permissions::PermissionKind;

/// Errors surfaced by the agent library.
#[derive(Error, Debug)]
pub enum Error {
    /// Foreground or background location access was refused
    #[error("{0} location permission denied")]
    PermissionDenied(PermissionKind),

    /// Missing or invalid token, or a failed sign-in
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Rejected sign-up fields, client-side or by the backend
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend answered with a non-success status
    #[error("Request failed with status {status}{}", .message.as_deref().map(|m| format!(": {}", m)).unwrap_or_default())]
    Request { status: u16, message: Option<String> },

    /// Response body could not be decoded
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// Failure inside a scheduled delivery callback
    #[error("Background task error: {0}")]
    BackgroundTask(String),

    /// Local persistence failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// OS-level scheduler or location provider failure
    #[error("Platform error: {0}")]
    Platform(String),

    /// Transport failure before a status was received
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Unusable configuration value or missing data directory
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn authentication<T: fmt::Display>(msg: T) -> Self {
        Error::Authentication(msg.to_string())
    }

    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    pub fn parsing<T: fmt::Display>(msg: T) -> Self {
        Error::Parsing(msg.to_string())
    }

    pub fn storage<T: fmt::Display>(msg: T) -> Self {
        Error::Storage(msg.to_string())
    }

    pub fn platform<T: fmt::Display>(msg: T) -> Self {
        Error::Platform(msg.to_string())
    }

    /// True when the session is missing or was rejected and the user has to sign in again.
    pub fn requires_login(&self) -> bool {
        match self {
            Error::Authentication(_) => true,
            Error::Request { status, .. } => *status == 401 || *status == 403,
            _ => false,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<keyring::Error> for Error {
    fn from(e: keyring::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parsing(e.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Parsing(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
