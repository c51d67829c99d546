//! HTTP API for the shelf library service.
//!
//! Exposes the library store and the natural-language query adapter over
//! a small JSON API. All parameters come from the query string.
//!
//! # Endpoints
//!
//! | Method | Path        | Params                            |
//! |--------|-------------|-----------------------------------|
//! | GET    | `/`         |                                   |
//! | GET    | `/users/`   |                                   |
//! | GET    | `/books/`   |                                   |
//! | POST   | `/users/`   | `name`                            |
//! | POST   | `/books/`   | `title`                           |
//! | POST   | `/borrow/`  | `username`, `title`, `days` (opt) |
//! | GET    | `/question` | `question`                        |
//!
//! # Example
//!
//! ```no_run
//! use shelf_agent::{LlmSqlAgent, QueryAdapter};
//! use shelf_core::ShelfConfig;
//! use shelf_server::{ApiServer, AppState};
//! use shelf_storage::LibraryStore;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ShelfConfig::default();
//! let library = LibraryStore::open(&config.storage.library_db).await?;
//! let agent = LlmSqlAgent::from_config(&config.agent, library.store().clone())?;
//!
//! let state = AppState::new(library, QueryAdapter::new(agent));
//! ApiServer::new(config.server.bind.parse()?, state).run().await?;
//! # Ok(())
//! # }
//! ```

pub mod api;

pub use api::{router, ApiError, ApiServer, AppState};
