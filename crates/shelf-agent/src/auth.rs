//! API key lookup for the chat completions endpoint
//!
//! The variable name comes from `[agent] api_key_env` in `shelf.toml`
//! (`OPENAI_API_KEY` by default), so the key itself never lives in config.

use crate::{AgentError, Result};
use std::env;

/// Get the API key from the environment variable `var`.
///
/// Empty values count as missing.
pub fn get_api_key(var: &str) -> Result<String> {
    match env::var(var) {
        Ok(key) if !key.trim().is_empty() => {
            tracing::debug!("Using API key from {}", var);
            Ok(key)
        }
        _ => Err(AgentError::Auth(format!(
            "No API key found. Set {} (or point [agent] api_key_env at another variable)",
            var
        ))),
    }
}
