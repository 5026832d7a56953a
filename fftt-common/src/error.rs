//! Common error types for the FFTT proxy

use thiserror::Error;

/// Common result type for FFTT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Startup and infrastructure errors
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

/// Outcome of a failed registry lookup
///
/// `NotFound` is the common case for an unknown licence and is not a
/// transport problem. Every other variant means the registry could not
/// give a usable answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The registry answered but holds no record for this licence
    #[error("Licence introuvable: {licence}")]
    NotFound { licence: String },

    /// The registry answered with its own error envelope
    #[error("Registry rejected the request: {0}")]
    Rejected(String),

    /// No answer within the configured timeout
    #[error("Registry did not answer in time")]
    Timeout,

    /// Connection, TLS or body read failure
    #[error("Registry unreachable: {0}")]
    Transport(String),

    /// Body is not a well-formed XML document
    #[error("Malformed registry response: {0}")]
    MalformedResponse(String),
}

impl LookupError {
    /// True for every failure caused by the registry or the network
    pub fn is_upstream_failure(&self) -> bool {
        !matches!(self, LookupError::NotFound { .. })
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LookupError::Timeout
        } else {
            LookupError::Transport(err.to_string())
        }
    }
}
