//! Pulling SQL out of model replies and deciding whether it may run.
//!
//! The guard is intentionally blunt: one statement, starting with `SELECT`
//! or `WITH`, and none of the write/DDL keywords anywhere as a whole word.
//! A string literal that happens to contain `delete` is rejected too.

use crate::{AgentError, Result};
use regex::Regex;
use std::sync::OnceLock;

static FENCE: OnceLock<Regex> = OnceLock::new();
static FORBIDDEN: OnceLock<Regex> = OnceLock::new();

fn fence() -> &'static Regex {
    FENCE.get_or_init(|| Regex::new(r"(?s)```(?:sqlite|sql)?\s*(.*?)```").unwrap())
}

fn forbidden() -> &'static Regex {
    FORBIDDEN.get_or_init(|| {
        Regex::new(
            r"(?i)\b(insert|update|delete|drop|alter|create|attach|detach|pragma|vacuum|reindex|truncate)\b",
        )
        .unwrap()
    })
}

/// Markers that end the query section of a `SQLQuery:` style reply
const SECTION_MARKERS: &[&str] = &["SQLResult:", "Answer:", "Question:"];

/// Extract the SQL statement from a model reply.
///
/// Prefers the first fenced code block, then the text between an `SQLQuery:`
/// marker and the next section marker, then the whole reply. Surrounding
/// whitespace and one trailing semicolon are removed.
pub fn extract_sql(reply: &str) -> String {
    let body = if let Some(caps) = fence().captures(reply) {
        caps.get(1).map_or("", |m| m.as_str())
    } else if let Some((_, rest)) = reply.split_once("SQLQuery:") {
        let end = SECTION_MARKERS
            .iter()
            .filter_map(|marker| rest.find(marker))
            .min()
            .unwrap_or(rest.len());
        &rest[..end]
    } else {
        reply
    };

    let trimmed = body.trim();
    trimmed.strip_suffix(';').unwrap_or(trimmed).trim().to_string()
}

/// Accept `sql` only if it is a single read-only statement.
pub fn ensure_read_only(sql: &str) -> Result<()> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(AgentError::UnsafeQuery("empty query".to_string()));
    }

    if sql.contains(';') {
        return Err(AgentError::UnsafeQuery(
            "multiple statements are not allowed".to_string(),
        ));
    }

    let first_word = sql
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase();
    if first_word != "SELECT" && first_word != "WITH" {
        return Err(AgentError::UnsafeQuery(format!(
            "only SELECT queries may run, got {}",
            first_word
        )));
    }

    if let Some(m) = forbidden().find(sql) {
        return Err(AgentError::UnsafeQuery(format!(
            "query contains forbidden keyword {}",
            m.as_str().to_ascii_uppercase()
        )));
    }

    Ok(())
}
