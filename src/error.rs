//! Common error types for firewatch

use thiserror::Error;

/// Common result type for firewatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared across the service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// RSS feed retrieval or parsing error
    #[error("Feed error: {0}")]
    Feed(String),

    /// Telegram Bot API call failed
    #[error("Telegram error: {0}")]
    Telegram(String),

    /// Incident repository (Supabase REST) call failed
    #[error("Repository error: {0}")]
    Repository(String),

    /// Underlying HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
