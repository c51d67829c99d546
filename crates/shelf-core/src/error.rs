//! Error types for the shelf core library.

use thiserror::Error;

/// Core error types for shelf operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Schema validation error: {0}")]
    SchemaValidation(String),
}

/// Result type alias using the shelf Error type.
pub type Result<T> = std::result::Result<T, Error>;
