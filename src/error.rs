//! Error Module
//!
//! Defines the error taxonomy shared across the STA mock: caller errors
//! (unknown protocol, bad range expressions), local buffer I/O failures,
//! and remote store failures.

use thiserror::Error;

/// Main error type for the STA mock
#[derive(Error, Debug, Clone)]
pub enum StaError {
    /// No open session and no finalized object for the protocol
    #[error("no session or finalized object for protocol {0}")]
    SessionNotFound(String),

    /// Unparseable range expression, rejected before bounds validation
    #[error("malformed range expression: {0}")]
    RangeMalformed(String),

    /// Well-formed range that falls outside a known total size
    #[error("range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    /// Local buffer read/write failure; fatal to the operation, not the session
    #[error("I/O error: {0}")]
    IoError(String),

    /// Remote store put/stat/get failure
    #[error("store error: {0}")]
    StoreError(String),

    #[error("HTTP error: {0}")]
    HttpError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for StaError {
    fn from(err: std::io::Error) -> Self {
        StaError::IoError(err.to_string())
    }
}

impl From<hyper::Error> for StaError {
    fn from(err: hyper::Error) -> Self {
        StaError::HttpError(err.to_string())
    }
}

impl From<hyper::http::Error> for StaError {
    fn from(err: hyper::http::Error) -> Self {
        StaError::HttpError(err.to_string())
    }
}

impl From<serde_yaml::Error> for StaError {
    fn from(err: serde_yaml::Error) -> Self {
        StaError::ConfigError(err.to_string())
    }
}

/// Result type alias for the STA mock
pub type Result<T> = std::result::Result<T, StaError>;
