//! # shelf-agent
//!
//! Natural-language question answering over the library database.
//!
//! A question goes through three layers:
//! - [`QueryAdapter`]: the boundary. Never fails; callers get either a
//!   structured [`Answer`] or, via [`QueryAdapter::ask_text`], a plain
//!   string where failures read `error: ...`.
//! - [`SqlAgent`]: anything that turns a question into an answer.
//!   [`LlmSqlAgent`] is the real one.
//! - [`ChatModel`]: the language model seam. [`ChatClient`] talks to an
//!   OpenAI-compatible chat completions API.
//!
//! The generated SQL is only ever run after [`sql::ensure_read_only`]
//! accepted it.

mod adapter;
mod agent;
mod auth;
mod client;
mod error;
pub mod sql;
mod types;

pub use adapter::{Answer, QueryAdapter};
pub use agent::{LlmSqlAgent, SqlAgent};
pub use auth::get_api_key;
pub use client::{ChatClient, ChatModel};
pub use error::{AgentError, Result};
pub use types::*;
