//! Shelf Storage - record store for the shelf library service
//!
//! This crate provides turso database integration for the two shelf
//! contexts. Each context has its own database file and its own store type:
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │         Application Layer                   │
//! │  (CLI, HTTP API, SQL agent)                 │
//! └──────────┬──────────────────────┬───────────┘
//!            │                      │
//! ┌──────────▼──────────┐ ┌─────────▼───────────┐
//! │  LibraryStore       │ │  TaskStore          │
//! │  • users, books     │ │  • users, tasks     │
//! │  • borrow workflow  │ │  • cascade delete   │
//! │  • query facade     │ │                     │
//! └──────────┬──────────┘ └─────────┬───────────┘
//!            │                      │
//! ┌──────────▼──────────────────────▼───────────┐
//! │  Store: turso handle, one connection per    │
//! │  operation, WAL mode                        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use shelf_storage::LibraryStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let library = LibraryStore::open("library.db").await?;
//!
//! library.add_user("swadhi").await?;
//! library.add_book("english").await?;
//! library.borrow_book("swadhi", "english", Some(5)).await?;
//!
//! for book in library.get_books().await? {
//!     println!("{} -> {:?}", book.title, book.borrower);
//! }
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod library;
pub mod tasks;

// Re-export commonly used types
pub use db::{Result, Store, StoreError};
pub use library::{BookFilter, BorrowError, LibraryStore, SeedStats, LIBRARY_SCHEMA};
pub use tasks::{TaskStore, TASKS_SCHEMA};
