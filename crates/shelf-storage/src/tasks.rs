//! Task context: users identified by email, each owning a list of tasks.
//!
//! This lives in its own database file and shares nothing with the library
//! context, not even the `User` type.

use crate::db::{format_date, parse_date, Result, Store, StoreError};
use shelf_core::{NewTask, NewTaskUser, Task, TaskUser};
use std::path::Path;
use turso::{params, Connection};

/// DDL for the tasks database, in creation order.
pub const TASKS_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE
    )"#,
    r#"CREATE TABLE IF NOT EXISTS tasks (
        id INTEGER PRIMARY KEY,
        title VARCHAR(50) NOT NULL,
        description TEXT,
        user_id INTEGER,
        due_date TEXT,
        FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id)",
];

/// Record store for the task context
#[derive(Clone)]
pub struct TaskStore {
    store: Store,
}

impl TaskStore {
    /// Open the tasks database at `path` and make sure its tables exist.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let tasks = Self::new(Store::open(path).await?);
        tasks.init_schema().await?;
        Ok(tasks)
    }

    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Creates the users and tasks tables if they don't exist.
    pub async fn init_schema(&self) -> Result<()> {
        self.store.execute_batch(TASKS_SCHEMA).await
    }

    /// Drop all tables and recreate them cleanly.
    pub async fn reset(&self) -> Result<()> {
        self.store
            .execute_batch(&["DROP TABLE IF EXISTS tasks", "DROP TABLE IF EXISTS users"])
            .await?;
        self.init_schema().await?;
        tracing::info!("Tasks database reset: {}", self.store.path());
        Ok(())
    }

    /// Create a task owner.
    ///
    /// Returns `Validation` for a blank email and `Integrity` when the email
    /// is already taken.
    pub async fn add_user(&self, user: &NewTaskUser) -> Result<TaskUser> {
        user.validate().map_err(StoreError::from_core)?;

        let conn = self.store.connect().await?;
        if find_user(&conn, &user.email).await?.is_some() {
            return Err(StoreError::Integrity(format!(
                "user already exists: {}",
                user.email
            )));
        }

        conn.execute(
            "INSERT INTO users (name, email) VALUES (?, ?)",
            params![user.name.clone(), user.email.clone()],
        )
        .await
        .map_err(StoreError::from_write)?;

        let created = TaskUser {
            id: conn.last_insert_rowid(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        tracing::info!("User created: {} <{}>", created.name, created.email);
        Ok(created)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<TaskUser>> {
        let conn = self.store.connect().await?;
        find_user(&conn, email).await
    }

    /// All task owners ordered by id.
    pub async fn list_users(&self) -> Result<Vec<TaskUser>> {
        let conn = self.store.connect().await?;
        let mut rows = conn
            .query("SELECT id, name, email FROM users ORDER BY id ASC", params![])
            .await?;

        let mut users = Vec::new();
        while let Some(row) = rows.next().await? {
            users.push(parse_user_row(&row)?);
        }
        Ok(users)
    }

    /// Attach a new task to the user with `email`.
    pub async fn add_task(&self, email: &str, task: &NewTask) -> Result<Task> {
        task.validate().map_err(StoreError::from_core)?;

        let conn = self.store.connect().await?;
        let user = find_user(&conn, email)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no user with email: {}", email)))?;

        conn.execute(
            "INSERT INTO tasks (title, description, user_id, due_date) VALUES (?, ?, ?, ?)",
            params![
                task.title.clone(),
                task.description.clone(),
                user.id,
                task.due_date.map(format_date),
            ],
        )
        .await
        .map_err(StoreError::from_write)?;

        let created = Task {
            id: conn.last_insert_rowid(),
            title: task.title.clone(),
            description: task.description.clone(),
            user_id: user.id,
            due_date: task.due_date,
        };
        tracing::info!("Task added for {}: {}", email, created.title);
        Ok(created)
    }

    /// Tasks of the user with `email`, ordered by id.
    pub async fn list_tasks(&self, email: &str) -> Result<Vec<Task>> {
        let conn = self.store.connect().await?;
        let user = find_user(&conn, email)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("no user with email: {}", email)))?;

        let mut rows = conn
            .query(
                "SELECT id, title, description, user_id, due_date
                 FROM tasks
                 WHERE user_id = ?
                 ORDER BY id ASC",
                params![user.id],
            )
            .await?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(Task {
                id: row.get(0)?,
                title: row.get(1)?,
                description: row.get(2)?,
                user_id: row.get(3)?,
                due_date: parse_date("due_date", row.get(4)?)?,
            });
        }
        Ok(tasks)
    }

    /// Delete a user and every task they own.
    ///
    /// Returns false when no user has this email. Both deletes happen in one
    /// transaction so a user never disappears while leaving tasks behind.
    pub async fn delete_user(&self, email: &str) -> Result<bool> {
        let mut conn = self.store.connect().await?;
        let Some(user) = find_user(&conn, email).await? else {
            return Ok(false);
        };

        let tx = conn.transaction().await?;
        let removed = tx
            .execute("DELETE FROM tasks WHERE user_id = ?", params![user.id])
            .await?;
        tx.execute("DELETE FROM users WHERE id = ?", params![user.id])
            .await?;
        tx.commit().await?;

        tracing::info!("User deleted: {} ({} tasks removed)", email, removed);
        Ok(true)
    }

    pub async fn task_count(&self) -> Result<i64> {
        self.store.count("tasks").await
    }
}

async fn find_user(conn: &Connection, email: &str) -> Result<Option<TaskUser>> {
    let mut rows = conn
        .query(
            "SELECT id, name, email FROM users WHERE email = ? LIMIT 1",
            params![email],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(parse_user_row(&row)?)),
        None => Ok(None),
    }
}

fn parse_user_row(row: &turso::Row) -> Result<TaskUser> {
    Ok(TaskUser {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}
