//! Library context: users, books and the borrowing workflow.
//!
//! Tables:
//!   - users: id, name (names are not unique)
//!   - books: id, title, due_date, user_id (NULL = on the shelf)
//!
//! There is deliberately no operation that clears a borrower or a due date;
//! once a book is borrowed it stays borrowed.

use crate::db::{format_date, parse_date, Result, Store, StoreError};
use chrono::{Local, NaiveDate, TimeDelta};
use shelf_core::{Book, BookRecord, BookSummary, BorrowReceipt, User, UserSummary};
use std::path::Path;
use turso::{params, Connection};

/// DDL for the library database, in creation order.
pub const LIBRARY_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    )"#,
    r#"CREATE TABLE IF NOT EXISTS books (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        due_date TEXT,
        user_id INTEGER,
        FOREIGN KEY (user_id) REFERENCES users(id)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_books_user ON books(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_books_title ON books(title)",
    "CREATE INDEX IF NOT EXISTS idx_users_name ON users(name)",
];

const SAMPLE_BOOKS: &[&str] = &[
    "english",
    "tamil",
    "1984",
    "Mystery Islands",
    "Heart Beat",
    "Heart Beat 2",
    "office",
    "Kerala",
];

const SAMPLE_USERS: &[&str] = &["swadhi", "usha", "sangamithra", "reva", "krithika", "suji"];

// Two of these borrowers do not exist; seeding reports and skips them.
const SAMPLE_BORROWS: &[(&str, &str, i64)] = &[
    ("revan", "Kerala", 10),
    ("swadhi", "Heart Beat 2", 15),
    ("kirth", "1984", 13),
    ("swadhi", "english", 5),
];

/// Loan length used when seeding overdue books.
pub const OVERDUE_LOAN_DAYS: i64 = -100;

/// Default borrower for [`LibraryStore::seed_overdue_books`].
pub const DUMMY_USER: &str = "dummy_user";

/// Reasons a borrow is refused.
///
/// The Display text is the report shown to people; none of these mutate
/// anything.
#[derive(Debug, thiserror::Error)]
pub enum BorrowError {
    #[error("User: \"{0}\" does not exist")]
    UserNotFound(String),

    #[error("Book: \"{0}\" does not exist")]
    BookNotFound(String),

    #[error("Book: \"{0}\" is already borrowed")]
    AlreadyBorrowed(String),

    #[error("invalid loan length: {0} days")]
    InvalidLoan(i64),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<turso::Error> for BorrowError {
    fn from(err: turso::Error) -> Self {
        BorrowError::Store(StoreError::Turso(err))
    }
}

/// Filter options for listing books
#[derive(Debug, Clone, Copy, Default)]
pub struct BookFilter {
    /// Only books nobody has borrowed
    pub only_available: bool,
}

/// Counts reported by the seeding helpers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedStats {
    pub users_added: usize,
    pub books_added: usize,
    pub borrowed: usize,
    pub skipped: usize,
}

/// Record store for the library context
#[derive(Clone)]
pub struct LibraryStore {
    store: Store,
}

impl LibraryStore {
    /// Open the library database at `path` and make sure its tables exist.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let library = Self::new(Store::open(path).await?);
        library.init_schema().await?;
        Ok(library)
    }

    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The underlying store, for callers that query it directly.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Creates the users and books tables if they don't exist.
    /// Idempotent; existing rows are left alone.
    pub async fn init_schema(&self) -> Result<()> {
        self.store.execute_batch(LIBRARY_SCHEMA).await
    }

    /// Drop all tables and recreate them cleanly.
    pub async fn reset(&self) -> Result<()> {
        self.store
            .execute_batch(&["DROP TABLE IF EXISTS books", "DROP TABLE IF EXISTS users"])
            .await?;
        self.init_schema().await?;
        tracing::info!("Library database reset: {}", self.store.path());
        Ok(())
    }

    pub async fn add_user(&self, name: &str) -> Result<User> {
        let conn = self.store.connect().await?;
        conn.execute("INSERT INTO users (name) VALUES (?)", params![name])
            .await
            .map_err(StoreError::from_write)?;

        let user = User {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        };
        tracing::info!("User added: {}", user.name);
        Ok(user)
    }

    pub async fn add_book(&self, title: &str) -> Result<Book> {
        let conn = self.store.connect().await?;
        conn.execute("INSERT INTO books (title) VALUES (?)", params![title])
            .await
            .map_err(StoreError::from_write)?;

        let book = Book {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            due_date: None,
            user_id: None,
        };
        tracing::info!("Book added: {}", book.title);
        Ok(book)
    }

    /// First user (lowest id) with exactly this name.
    pub async fn find_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.store.connect().await?;
        find_user(&conn, name).await
    }

    /// First book (lowest id) with exactly this title.
    pub async fn find_book_by_title(&self, title: &str) -> Result<Option<Book>> {
        let conn = self.store.connect().await?;
        find_book(&conn, title).await
    }

    /// Borrow a book for a user, due `loan_days` from today.
    ///
    /// With `loan_days = None` the book is linked to the user and left
    /// without a due date.
    pub async fn borrow_book(
        &self,
        username: &str,
        title: &str,
        loan_days: Option<i64>,
    ) -> std::result::Result<BorrowReceipt, BorrowError> {
        self.borrow_book_on(username, title, loan_days, Local::now().date_naive())
            .await
    }

    /// Borrow as of `today`. See [`LibraryStore::borrow_book`].
    ///
    /// The book is claimed with `UPDATE ... WHERE user_id IS NULL`, so when
    /// two callers race for the same book exactly one of them wins and the
    /// other gets `AlreadyBorrowed`. Nothing is retried.
    pub async fn borrow_book_on(
        &self,
        username: &str,
        title: &str,
        loan_days: Option<i64>,
        today: NaiveDate,
    ) -> std::result::Result<BorrowReceipt, BorrowError> {
        let conn = self.store.connect().await?;

        let user = find_user(&conn, username)
            .await?
            .ok_or_else(|| BorrowError::UserNotFound(username.to_string()))?;

        let book = find_book(&conn, title)
            .await?
            .ok_or_else(|| BorrowError::BookNotFound(title.to_string()))?;

        if !book.is_available() {
            tracing::warn!("Book \"{}\" is already borrowed", title);
            return Err(BorrowError::AlreadyBorrowed(title.to_string()));
        }

        let due_date = match loan_days {
            Some(days) => Some(
                TimeDelta::try_days(days)
                    .and_then(|delta| today.checked_add_signed(delta))
                    .ok_or(BorrowError::InvalidLoan(days))?,
            ),
            None => None,
        };

        let changed = conn
            .execute(
                "UPDATE books SET user_id = ?, due_date = ? WHERE id = ? AND user_id IS NULL",
                params![user.id, due_date.map(format_date), book.id],
            )
            .await?;

        if changed == 0 {
            tracing::warn!("Book \"{}\" was borrowed concurrently", title);
            return Err(BorrowError::AlreadyBorrowed(title.to_string()));
        }

        let receipt = BorrowReceipt {
            user,
            book_id: book.id,
            book_title: book.title,
            due_date,
        };
        tracing::info!("{}", receipt);
        Ok(receipt)
    }

    /// All users with the titles they borrow, ordered by user id then book id.
    pub async fn get_users(&self) -> Result<Vec<UserSummary>> {
        let conn = self.store.connect().await?;
        let mut rows = conn
            .query(
                "SELECT u.id, u.name, b.title
                 FROM users u
                 LEFT JOIN books b ON b.user_id = u.id
                 ORDER BY u.id ASC, b.id ASC",
                params![],
            )
            .await?;

        let mut users: Vec<UserSummary> = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: i64 = row.get(0)?;
            let title: Option<String> = row.get(2)?;

            if users.last().map(|u| u.id) != Some(id) {
                users.push(UserSummary {
                    id,
                    name: row.get(1)?,
                    borrowed: None,
                });
            }

            if let (Some(title), Some(summary)) = (title, users.last_mut()) {
                summary.borrowed.get_or_insert_with(Vec::new).push(title);
            }
        }

        Ok(users)
    }

    /// All books with their borrower's name, ordered by id.
    pub async fn get_books(&self) -> Result<Vec<BookSummary>> {
        let conn = self.store.connect().await?;
        let mut rows = conn
            .query(
                "SELECT b.id, b.title, u.name
                 FROM books b
                 LEFT JOIN users u ON u.id = b.user_id
                 ORDER BY b.id ASC",
                params![],
            )
            .await?;

        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            books.push(BookSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                borrower: row.get(2)?,
            });
        }

        Ok(books)
    }

    /// Book listing with due dates, optionally only the available ones.
    pub async fn list_books(&self, filter: BookFilter) -> Result<Vec<BookRecord>> {
        let mut query = String::from(
            "SELECT b.id, b.title, u.name, b.due_date
             FROM books b
             LEFT JOIN users u ON u.id = b.user_id",
        );
        if filter.only_available {
            query.push_str(" WHERE b.user_id IS NULL");
        }
        query.push_str(" ORDER BY b.id ASC");

        let conn = self.store.connect().await?;
        let mut rows = conn.query(&query, params![]).await?;

        let mut books = Vec::new();
        while let Some(row) = rows.next().await? {
            books.push(BookRecord {
                id: row.get(0)?,
                title: row.get(1)?,
                borrower: row.get(2)?,
                due_date: parse_date("due_date", row.get(3)?)?,
            });
        }

        Ok(books)
    }

    pub async fn user_count(&self) -> Result<i64> {
        self.store.count("users").await
    }

    pub async fn book_count(&self) -> Result<i64> {
        self.store.count("books").await
    }

    /// Add the sample books and users, then attempt the sample borrows.
    ///
    /// Borrows naming unknown users or taken books are logged and counted
    /// as skipped.
    pub async fn seed_sample_data(&self) -> Result<SeedStats> {
        let mut stats = SeedStats::default();

        for title in SAMPLE_BOOKS {
            self.add_book(title).await?;
            stats.books_added += 1;
        }

        for name in SAMPLE_USERS {
            self.add_user(name).await?;
            stats.users_added += 1;
        }

        for (user, title, days) in SAMPLE_BORROWS {
            match self.borrow_book(user, title, Some(*days)).await {
                Ok(_) => stats.borrowed += 1,
                Err(BorrowError::Store(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping sample borrow: {}", e);
                    stats.skipped += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Lend every available book to `username` with a due date 100 days in
    /// the past, creating the user first when needed.
    pub async fn seed_overdue_books(&self, username: &str) -> Result<SeedStats> {
        let mut stats = SeedStats::default();

        if self.find_user_by_name(username).await?.is_none() {
            self.add_user(username).await?;
            stats.users_added += 1;
        }

        let available = self
            .list_books(BookFilter {
                only_available: true,
            })
            .await?;

        for book in available {
            match self
                .borrow_book(username, &book.title, Some(OVERDUE_LOAN_DAYS))
                .await
            {
                Ok(_) => stats.borrowed += 1,
                Err(BorrowError::Store(e)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping overdue seed for \"{}\": {}", book.title, e);
                    stats.skipped += 1;
                }
            }
        }

        tracing::info!("Dummy overdue dates set for user: {}", username);
        Ok(stats)
    }
}

async fn find_user(conn: &Connection, name: &str) -> Result<Option<User>> {
    let mut rows = conn
        .query(
            "SELECT id, name FROM users WHERE name = ? ORDER BY id ASC LIMIT 1",
            params![name],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(User {
            id: row.get(0)?,
            name: row.get(1)?,
        })),
        None => Ok(None),
    }
}

async fn find_book(conn: &Connection, title: &str) -> Result<Option<Book>> {
    let mut rows = conn
        .query(
            "SELECT id, title, due_date, user_id FROM books WHERE title = ? ORDER BY id ASC LIMIT 1",
            params![title],
        )
        .await?;

    match rows.next().await? {
        Some(row) => Ok(Some(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            due_date: parse_date("due_date", row.get(2)?)?,
            user_id: row.get(3)?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_library() -> (LibraryStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let library = LibraryStore::open(temp_dir.path().join("library.db"))
            .await
            .unwrap();
        (library, temp_dir)
    }

    #[tokio::test]
    async fn test_library_open_and_init() {
        let (library, _dir) = create_test_library().await;
        assert_eq!(library.user_count().await.unwrap(), 0);
        assert_eq!(library.book_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_borrow_without_loan_days_leaves_due_date_unset() {
        let (library, _dir) = create_test_library().await;
        library.add_user("usha").await.unwrap();
        library.add_book("tamil").await.unwrap();

        let receipt = library.borrow_book("usha", "tamil", None).await.unwrap();
        assert_eq!(receipt.due_date, None);

        let book = library.find_book_by_title("tamil").await.unwrap().unwrap();
        assert_eq!(book.user_id, Some(receipt.user.id));
        assert_eq!(book.due_date, None);
    }

    #[tokio::test]
    async fn test_borrow_rejects_overflowing_loan() {
        let (library, _dir) = create_test_library().await;
        library.add_user("usha").await.unwrap();
        library.add_book("tamil").await.unwrap();

        let err = library
            .borrow_book("usha", "tamil", Some(i64::MAX))
            .await
            .unwrap_err();
        assert!(matches!(err, BorrowError::InvalidLoan(_)));

        let book = library.find_book_by_title("tamil").await.unwrap().unwrap();
        assert!(book.is_available());
    }
}
