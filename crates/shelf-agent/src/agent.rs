//! SQL agent: question -> SELECT -> rows -> answer
//!
//! Two model calls per question. The first writes a query against the
//! library schema, the second phrases the answer from the rows. Generated
//! SQL that is not read-only never reaches the database.

use crate::client::{ChatClient, ChatModel};
use crate::sql::{ensure_read_only, extract_sql};
use crate::types::ChatMessage;
use crate::Result;
use async_trait::async_trait;
use shelf_core::AgentConfig;
use shelf_storage::{Store, LIBRARY_SCHEMA};

/// Anything that can answer a free-text question about the library.
#[async_trait]
pub trait SqlAgent: Send + Sync {
    async fn run(&self, question: &str) -> Result<String>;
}

/// SQL agent backed by a chat model and the library store
pub struct LlmSqlAgent<M> {
    model: M,
    store: Store,
    schema: String,
    max_rows: usize,
}

impl<M: ChatModel> LlmSqlAgent<M> {
    pub fn new(model: M, store: Store) -> Self {
        let schema = LIBRARY_SCHEMA
            .iter()
            .filter(|stmt| stmt.trim_start().starts_with("CREATE TABLE"))
            .map(|stmt| format!("{};", stmt.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");

        Self {
            model,
            store,
            schema,
            max_rows: AgentConfig::default().max_rows,
        }
    }

    /// Cap the number of result rows shown to the model
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows.max(1);
        self
    }

    /// Ask the model for a query and return it once it passed the guard.
    pub async fn generate_sql(&self, question: &str) -> Result<String> {
        let messages = [
            ChatMessage::system(format!(
                "You are a SQLite expert. Given a question about a library database, \
                 write one syntactically correct SQLite SELECT query that answers it. \
                 Never modify data. Unless the question asks for a specific number of \
                 results, return at most {} rows. Use only these tables:\n\n{}\n\n\
                 Reply with the SQL query only.",
                self.max_rows, self.schema
            )),
            ChatMessage::user(question),
        ];

        let reply = self.model.complete(&messages).await?;
        let sql = extract_sql(&reply);
        tracing::debug!("Generated SQL: {}", sql);

        ensure_read_only(&sql)?;
        Ok(sql)
    }

    async fn answer_from_rows(
        &self,
        question: &str,
        sql: &str,
        rows: &[Vec<String>],
    ) -> Result<String> {
        let result = if rows.is_empty() {
            "(no rows)".to_string()
        } else {
            rows.iter()
                .map(|row| format!("({})", row.join(", ")))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let messages = [
            ChatMessage::system(
                "You answer questions about a library using the result of an SQL query. \
                 Use only the result. Keep the answer short.",
            ),
            ChatMessage::user(format!(
                "Question: {}\nSQLQuery: {}\nSQLResult:\n{}\nAnswer:",
                question, sql, result
            )),
        ];

        let answer = self.model.complete(&messages).await?;
        Ok(answer.trim().to_string())
    }
}

impl LlmSqlAgent<ChatClient> {
    /// Build the agent from the `[agent]` config section.
    pub fn from_config(config: &AgentConfig, store: Store) -> Result<Self> {
        let client = ChatClient::from_config(config)?;
        Ok(Self::new(client, store).with_max_rows(config.max_rows))
    }
}

#[async_trait]
impl<M: ChatModel> SqlAgent for LlmSqlAgent<M> {
    async fn run(&self, question: &str) -> Result<String> {
        tracing::info!("Answering question: {}", question);

        let sql = self.generate_sql(question).await?;
        let rows = self.store.read_query(&sql, self.max_rows).await?;
        tracing::debug!("Query returned {} rows", rows.len());

        self.answer_from_rows(question, &sql, &rows).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AgentError;
    use shelf_storage::LibraryStore;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Model that replays canned replies and records every prompt
    struct ScriptedModel {
        replies: Mutex<VecDeque<String>>,
        prompts: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.prompts.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AgentError::Api("no scripted reply".to_string()))
        }
    }

    async fn seeded_library() -> (LibraryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let library = LibraryStore::open(temp_dir.path().join("library.db"))
            .await
            .unwrap();
        library.add_user("swadhi").await.unwrap();
        library.add_book("english").await.unwrap();
        library.add_book("tamil").await.unwrap();
        library
            .borrow_book("swadhi", "english", Some(5))
            .await
            .unwrap();
        (library, temp_dir)
    }

    #[tokio::test]
    async fn test_run_answers_from_rows() {
        let (library, _dir) = seeded_library().await;
        let model = ScriptedModel::new(&[
            "```sql\nSELECT title FROM books WHERE user_id IS NULL ORDER BY id;\n```",
            "Only tamil is available.",
        ]);
        let agent = LlmSqlAgent::new(model, library.store().clone());

        let answer = agent.run("Which books are available?").await.unwrap();
        assert_eq!(answer, "Only tamil is available.");

        let prompts = agent.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0][0].content.contains("CREATE TABLE IF NOT EXISTS books"));
        assert!(!prompts[0][0].content.contains("CREATE INDEX"));
        let final_prompt = &prompts[1][1].content;
        assert!(final_prompt.contains("SQLQuery: SELECT title FROM books"));
        assert!(final_prompt.contains("('tamil')"));
        assert!(!final_prompt.contains("'english'"));
    }

    #[tokio::test]
    async fn test_row_cap_defaults_to_config() {
        let (library, _dir) = seeded_library().await;
        let agent = LlmSqlAgent::new(ScriptedModel::new(&[]), library.store().clone());
        assert_eq!(agent.max_rows, AgentConfig::default().max_rows);
        assert_eq!(agent.with_max_rows(0).max_rows, 1);
    }

    #[tokio::test]
    async fn test_unsafe_query_never_runs() {
        let (library, _dir) = seeded_library().await;
        let model = ScriptedModel::new(&["DELETE FROM books"]);
        let agent = LlmSqlAgent::new(model, library.store().clone());

        let err = agent.run("Remove every book").await.unwrap_err();
        assert!(matches!(err, AgentError::UnsafeQuery(_)));
        assert_eq!(library.book_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_broken_sql_is_query_error() {
        let (library, _dir) = seeded_library().await;
        let model = ScriptedModel::new(&["SELECT nope FROM missing_table"]);
        let agent = LlmSqlAgent::new(model, library.store().clone());

        let err = agent.run("What is missing?").await.unwrap_err();
        assert!(matches!(err, AgentError::Query(_)));
    }

    #[tokio::test]
    async fn test_empty_result_is_reported_to_model() {
        let (library, _dir) = seeded_library().await;
        let model = ScriptedModel::new(&[
            "SELECT name FROM users WHERE name = 'ghost_user'",
            "Nobody by that name.",
        ]);
        let agent = LlmSqlAgent::new(model, library.store().clone()).with_max_rows(5);

        let answer = agent.run("Is ghost_user a member?").await.unwrap();
        assert_eq!(answer, "Nobody by that name.");

        let prompts = agent.model.prompts.lock().unwrap();
        assert!(prompts[1][1].content.contains("(no rows)"));
    }
}
