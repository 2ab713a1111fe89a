//! Error types for apmwatch

use thiserror::Error;

/// Result type alias using apmwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for apmwatch operations
///
/// `Config` is fatal at startup. The remaining variants are per-cycle
/// failures: the scheduler logs them and waits for the next tick.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection, DNS or timeout failure talking to the metrics backend
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The metrics backend answered with a non-success status
    #[error("Metrics backend returned {status}: {body}")]
    Response {
        /// HTTP status code
        status: u16,
        /// Response body, as far as it could be read
        body: String,
    },

    /// The response body did not match the expected search result shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl Error {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}
