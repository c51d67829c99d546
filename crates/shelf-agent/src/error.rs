//! Error types for the SQL agent

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Refusing to run query: {0}")]
    UnsafeQuery(String),

    #[error("Query failed: {0}")]
    Query(#[from] shelf_storage::StoreError),
}

pub type Result<T> = std::result::Result<T, AgentError>;
