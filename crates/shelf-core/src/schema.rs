//! Input definitions for the task context.
//!
//! These are the shapes accepted by the task store before anything is
//! written, mirroring the column constraints of the `users` and `tasks`
//! tables in `tasks.db`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Maximum length of a task title (the `tasks.title` column is `VARCHAR(50)`).
pub const TASK_TITLE_MAX_LEN: usize = 50;

/// NewTaskUser is a task owner about to be created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTaskUser {
    pub name: String,
    pub email: String,
}

impl NewTaskUser {
    /// Validate checks the user has an email; names may be anything.
    pub fn validate(&self) -> crate::Result<()> {
        if self.email.trim().is_empty() {
            return Err(crate::Error::SchemaValidation(
                "email is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// NewTask is a task about to be attached to a user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due_date(mut self, due_date: NaiveDate) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Validate checks if the NewTask has valid field values.
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.is_empty() {
            return Err(crate::Error::SchemaValidation(
                "title is required".to_string(),
            ));
        }
        let len = self.title.chars().count();
        if len > TASK_TITLE_MAX_LEN {
            return Err(crate::Error::SchemaValidation(format!(
                "title must be {} characters or less (got {})",
                TASK_TITLE_MAX_LEN, len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_user_requires_email() {
        let user = NewTaskUser {
            name: "usha".to_string(),
            email: "   ".to_string(),
        };
        assert!(user.validate().is_err());

        let user = NewTaskUser {
            name: "usha".to_string(),
            email: "usha@example.com".to_string(),
        };
        assert!(user.validate().is_ok());
    }

    #[test]
    fn test_task_title_rules() {
        assert!(NewTask::new("").validate().is_err());
        assert!(NewTask::new("a".repeat(TASK_TITLE_MAX_LEN)).validate().is_ok());

        let err = NewTask::new("a".repeat(TASK_TITLE_MAX_LEN + 1))
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("51"));
    }

    #[test]
    fn test_task_builder() {
        let due = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let task = NewTask::new("write report")
            .with_description("quarterly")
            .with_due_date(due);
        assert_eq!(task.description.as_deref(), Some("quarterly"));
        assert_eq!(task.due_date, Some(due));
    }
}
