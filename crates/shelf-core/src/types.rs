//! Core data structures for the library and task contexts.
//!
//! Library rows (`User`, `Book`) and task rows (`TaskUser`, `Task`) come from
//! different database files and are intentionally separate types, even where
//! the shapes overlap.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type UserId = i64;
pub type BookId = i64;
pub type TaskId = i64;

// ===== Library context =====

/// A library member. Names are not unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
}

/// A book row as stored in `books`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Borrower reference; `None` means the book is on the shelf.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl Book {
    /// A book is available when nobody borrows it.
    pub fn is_available(&self) -> bool {
        self.user_id.is_none()
    }
}

/// Projection of a user with the titles they currently borrow.
///
/// `borrowed` is `None` rather than an empty list when the user holds no
/// books, which is what API clients have always received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub name: String,
    pub borrowed: Option<Vec<String>>,
}

/// Projection of a book with its borrower's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookSummary {
    pub id: BookId,
    pub title: String,
    pub borrower: Option<String>,
}

/// Full book listing row used by the CLI tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    pub id: BookId,
    pub title: String,
    pub borrower: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl BookRecord {
    /// Returns true when the book is out and its due date is before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.borrower.is_some() && self.due_date.is_some_and(|due| due < today)
    }
}

/// Result of a successful borrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowReceipt {
    pub user: User,
    pub book_id: BookId,
    pub book_title: String,
    pub due_date: Option<NaiveDate>,
}

impl fmt::Display for BorrowReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.due_date {
            Some(due) => write!(
                f,
                "User \"{}\" has borrowed \"{}\" (due {})",
                self.user.name, self.book_title, due
            ),
            None => write!(
                f,
                "User \"{}\" has borrowed \"{}\"",
                self.user.name, self.book_title
            ),
        }
    }
}

// ===== Task context =====

/// A task owner, identified by a unique email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// A task belonging to exactly one `TaskUser`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
}
