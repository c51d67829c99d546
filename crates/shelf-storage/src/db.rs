//! Database handle and shared helpers using Turso.
//!
//! A `Store` owns the turso database handle for one file. It never hands out
//! a long-lived session: every operation calls [`Store::connect`], uses the
//! connection for the duration of that operation and drops it.
//!
//! Architecture:
//!   - Database files: library.db, tasks.db (one `Store` each)
//!   - WAL mode: Write-Ahead Logging for concurrent reads during writes
//!   - Dates: stored as `YYYY-MM-DD` text

use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use turso::{params, Builder, Connection};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database handle wrapper for Turso
#[derive(Clone)]
pub struct Store {
    db: Arc<turso::Database>,
    path: String,
}

/// Database errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("turso error: {0}")]
    Turso(#[from] turso::Error),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to parse {column}: {message}")]
    Parse { column: &'static str, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("core error: {0}")]
    Core(#[from] shelf_core::Error),
}

impl StoreError {
    /// Map a turso write failure, turning constraint violations into
    /// `Integrity` and passing everything else through.
    pub fn from_write(err: turso::Error) -> Self {
        let message = err.to_string();
        if message.contains("UNIQUE constraint failed")
            || message.contains("FOREIGN KEY constraint failed")
        {
            StoreError::Integrity(message)
        } else {
            StoreError::Turso(err)
        }
    }

    /// Turn schema validation failures from the core crate into `Validation`.
    pub(crate) fn from_core(err: shelf_core::Error) -> Self {
        match err {
            shelf_core::Error::SchemaValidation(message) => StoreError::Validation(message),
            other => StoreError::Core(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;

impl Store {
    /// Open creates the database handle at the specified path using Turso.
    ///
    /// If the file doesn't exist it is created, along with any missing
    /// parent directories. No tables are created here; each context owns
    /// its own `init_schema`.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use shelf_storage::Store;
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let store = Store::open("library.db").await?;
    /// let conn = store.connect().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let db = Builder::new_local(&path_str).build().await?;

        let store = Store {
            db: Arc::new(db),
            path: path_str,
        };

        // journal_mode is persistent for the file, the rest is per connection
        let conn = store.db.connect()?;
        let _ = conn.query("PRAGMA journal_mode=WAL", params![]).await?;

        tracing::debug!("Opened database {}", store.path);
        Ok(store)
    }

    /// Acquire a fresh connection scoped to one operation.
    pub async fn connect(&self) -> Result<Connection> {
        let conn = self.db.connect()?;
        // Use query() for PRAGMA statements as they may return results
        let _ = conn.query("PRAGMA busy_timeout=5000", params![]).await?;
        let _ = conn.query("PRAGMA foreign_keys=ON", params![]).await?;
        Ok(conn)
    }

    /// Returns the database file path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Run each statement in order on one connection.
    pub async fn execute_batch(&self, statements: &[&str]) -> Result<()> {
        let conn = self.connect().await?;
        for stmt in statements {
            conn.execute(stmt, params![]).await?;
        }
        Ok(())
    }

    /// Count the rows of `table`.
    pub async fn count(&self, table: &str) -> Result<i64> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(&format!("SELECT COUNT(*) FROM {}", table), params![])
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(row.get(0)?)
        } else {
            Ok(0)
        }
    }

    /// Run a read statement and render up to `max_rows` rows as text.
    ///
    /// Values are rendered SQL-literal style (`NULL`, `42`, `'text'`) so the
    /// output can be shown to a language model as-is. Callers are
    /// responsible for making sure `sql` does not write.
    pub async fn read_query(&self, sql: &str, max_rows: usize) -> Result<Vec<Vec<String>>> {
        let conn = self.connect().await?;
        let mut rows = conn.query(sql, params![]).await?;
        let mut out = Vec::new();

        while let Some(row) = rows.next().await? {
            if out.len() >= max_rows {
                break;
            }
            let mut cells = Vec::with_capacity(row.column_count());
            for idx in 0..row.column_count() {
                cells.push(render_value(&row.get_value(idx)?));
            }
            out.push(cells);
        }

        Ok(out)
    }
}

fn render_value(value: &turso::Value) -> String {
    match value {
        turso::Value::Null => "NULL".to_string(),
        turso::Value::Integer(i) => i.to_string(),
        turso::Value::Real(f) => f.to_string(),
        turso::Value::Text(s) => format!("'{}'", s),
        turso::Value::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

/// Format a date for storage
pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse an optional stored date column
pub(crate) fn parse_date(
    column: &'static str,
    value: Option<String>,
) -> Result<Option<NaiveDate>> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT).map_err(|e| StoreError::Parse {
                column,
                message: format!("{:?}: {}", s, e),
            })
        })
        .transpose()
}
