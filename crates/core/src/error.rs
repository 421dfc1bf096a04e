//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
