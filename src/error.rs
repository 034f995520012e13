//! Error handling and custom error types
//!
//! Provides unified error handling across the deploy pipeline using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("S3 error: {0}")]
    S3(String),

    #[error(
        "unexpected response code {status} when {method} {path}. Here's a dump of the response:\n{dump}"
    )]
    UnexpectedStatus {
        status: u16,
        method: String,
        path: String,
        dump: String,
    },

    #[error("Directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),

    #[error("Mock output error: {0}")]
    Mock(String),
}

pub type Result<T> = std::result::Result<T, Error>;
