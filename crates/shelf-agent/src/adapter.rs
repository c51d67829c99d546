//! Boundary between callers and the SQL agent
//!
//! Whatever goes wrong inside the agent (auth, HTTP, bad SQL, a panic) ends
//! up as `Answer::Failed`. `ask_text` flattens that into the string contract
//! the HTTP API exposes, where a failure is just text starting with
//! `error: `.

use crate::agent::SqlAgent;
use serde::Serialize;
use std::sync::Arc;

/// Outcome of a question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum Answer {
    Answered(String),
    Failed(String),
}

impl Answer {
    pub fn is_answered(&self) -> bool {
        matches!(self, Answer::Answered(_))
    }

    /// Flatten to the plain-text contract.
    pub fn into_text(self) -> String {
        match self {
            Answer::Answered(text) => text,
            Answer::Failed(message) => format!("error: {}", message),
        }
    }
}

/// Wraps an agent so that asking a question always yields an answer
#[derive(Clone)]
pub struct QueryAdapter {
    agent: Arc<dyn SqlAgent>,
}

impl QueryAdapter {
    pub fn new(agent: impl SqlAgent + 'static) -> Self {
        Self {
            agent: Arc::new(agent),
        }
    }

    /// Ask the agent, keeping success and failure apart.
    pub async fn ask(&self, question: &str) -> Answer {
        let agent = Arc::clone(&self.agent);
        let question_owned = question.to_string();

        // Run on its own task so a panicking agent is reported, not propagated
        let outcome = tokio::spawn(async move { agent.run(&question_owned).await }).await;

        match outcome {
            Ok(Ok(answer)) => Answer::Answered(answer),
            Ok(Err(e)) => {
                tracing::warn!("Agent failed on {:?}: {}", question, e);
                Answer::Failed(e.to_string())
            }
            Err(e) => {
                tracing::error!("Agent task aborted on {:?}: {}", question, e);
                Answer::Failed(format!("agent task failed: {}", e))
            }
        }
    }

    /// Ask the agent and flatten the outcome to text.
    pub async fn ask_text(&self, question: &str) -> String {
        self.ask(question).await.into_text()
    }
}
