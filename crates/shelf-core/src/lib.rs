//! Core types and configuration for the shelf library service.
//!
//! Two bounded contexts live side by side and are never merged:
//!
//! - **library**: users borrow books, each book has at most one borrower
//! - **tasks**: users identified by email own a list of tasks
//!
//! This crate holds the plain data types for both, the input validation
//! rules, the shared error type and the `shelf.toml` configuration.

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{AgentConfig, ServerConfig, ShelfConfig, StorageConfig, DEFAULT_CONFIG_FILE};
pub use error::{Error, Result};
pub use schema::{NewTask, NewTaskUser, TASK_TITLE_MAX_LEN};

// Re-export main types for convenience
pub use types::{
    Book, BookId, BookRecord, BookSummary, BorrowReceipt, Task, TaskId, TaskUser, User,
    UserId, UserSummary,
};
