//! Shelf CLI - Command-line frontend for the shelf library service.

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use shelf_agent::{LlmSqlAgent, QueryAdapter};
use shelf_core::{NewTask, NewTaskUser, ShelfConfig, TaskUser, DEFAULT_CONFIG_FILE};
use shelf_server::{ApiServer, AppState};
use shelf_storage::library::DUMMY_USER;
use shelf_storage::{BookFilter, LibraryStore, SeedStats, StoreError, TaskStore};
use std::io::{self, Write as IoWrite};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "shelf")]
#[command(about = "Shelf - Library records with natural-language questions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a config file (defaults to ./shelf.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API in the foreground
    Serve {
        /// Address to listen on (overrides the config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Create the library and task schemas
    Init {
        /// Also write a default shelf.toml if none exists
        #[arg(long)]
        write_config: bool,
    },

    /// Drop and recreate both databases
    Reset {
        /// Reset without confirmation
        #[arg(short, long)]
        force: bool,
    },

    /// Load the sample books, users and borrowings
    Seed,

    /// Lend every available book to one user with a due date in the past
    SeedOverdue {
        /// Borrower for the overdue books
        #[arg(short, long, default_value = DUMMY_USER)]
        user: String,
    },

    /// Manage library users
    #[command(subcommand)]
    User(UserCommands),

    /// Manage books
    #[command(subcommand)]
    Book(BookCommands),

    /// Borrow a book
    Borrow {
        /// Borrowing user
        username: String,

        /// Book title (prompts for titles when omitted)
        #[arg(short, long)]
        title: Option<String>,

        /// Loan length in days
        #[arg(short, long)]
        days: Option<i64>,
    },

    /// List books
    Books {
        /// Only show books nobody has borrowed
        #[arg(short, long)]
        available: bool,
    },

    /// List users and what they borrowed
    Users,

    /// Ask a question about the library in plain language
    Ask {
        /// The question
        question: String,
    },

    /// Task tracker
    #[command(subcommand)]
    Tasks(TaskCommands),
}

#[derive(Subcommand)]
enum UserCommands {
    /// Add a user
    Add {
        /// User name
        name: String,
    },
}

#[derive(Subcommand)]
enum BookCommands {
    /// Add a book
    Add {
        /// Book title
        title: String,
    },
}

#[derive(Subcommand)]
enum TaskCommands {
    /// Create a task user
    AddUser {
        /// User name (prompted when omitted)
        #[arg(short, long)]
        name: Option<String>,

        /// Email address (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List task users
    Users,

    /// Add tasks for a user, one after another
    Add {
        /// Owner's email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List a user's tasks
    List {
        /// Owner's email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Delete a task user and all their tasks
    DeleteUser {
        /// Email of the user to delete
        email: String,

        /// Delete without confirmation
        #[arg(short, long)]
        force: bool,
    },
}

/// Print `label` and read one trimmed line from stdin.
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Ask a yes/no question; only "yes" and "y" count as yes.
fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} (yes/no): ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "yes" | "y"))
}

fn is_quit(input: &str) -> bool {
    matches!(input.to_lowercase().as_str(), "q" | "quit")
}

fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

fn print_seed_stats(stats: &SeedStats) {
    println!("  Users added:  {}", stats.users_added.to_string().bright_green());
    println!("  Books added:  {}", stats.books_added.to_string().bright_green());
    println!("  Borrowed:     {}", stats.borrowed.to_string().bright_green());
    if stats.skipped > 0 {
        println!("  Skipped:      {}", stats.skipped.to_string().yellow());
    }
}

async fn print_books(library: &LibraryStore, only_available: bool) -> Result<()> {
    let books = library.list_books(BookFilter { only_available }).await?;

    if books.is_empty() {
        println!("{}", "No books found".yellow());
        return Ok(());
    }

    let today = Local::now().date_naive();

    println!(
        "{:<4} {:<32} {:<14} {}",
        "ID".bold(),
        "TITLE".bold(),
        "BORROWER".bold(),
        "DUE".bold()
    );
    println!("{}", "─".repeat(64));

    for book in books {
        let borrower = book.borrower.as_deref().unwrap_or("-");
        let due = book
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let due_colored = if book.is_overdue(today) {
            due.red().bold()
        } else {
            due.normal()
        };

        println!(
            "{:<4} {:<32} {:<14} {}",
            book.id,
            truncate(&book.title, 32),
            truncate(borrower, 14),
            due_colored
        );
    }

    println!();
    Ok(())
}

async fn print_users(library: &LibraryStore) -> Result<()> {
    let users = library.get_users().await?;

    if users.is_empty() {
        println!("{}", "No users found".yellow());
        return Ok(());
    }

    println!("{:<4} {:<14} {}", "ID".bold(), "NAME".bold(), "BORROWED".bold());
    println!("{}", "─".repeat(64));

    for user in users {
        let borrowed = user
            .borrowed
            .map(|titles| {
                titles
                    .iter()
                    .map(|t| truncate(t, 12))
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();

        println!("{:<4} {:<14} {}", user.id, truncate(&user.name, 14), borrowed);
    }

    println!();
    Ok(())
}

/// Borrow one title and report the outcome. Rejections are printed, not raised.
async fn borrow_and_report(
    library: &LibraryStore,
    username: &str,
    title: &str,
    days: Option<i64>,
) -> Result<bool> {
    match library.borrow_book(username, title, days).await {
        Ok(receipt) => {
            println!("{}", format!("✓ {}", receipt).green().bold());
            Ok(true)
        }
        Err(shelf_storage::BorrowError::Store(e)) => Err(e.into()),
        Err(e) => {
            println!("{}", e.to_string().red());
            Ok(false)
        }
    }
}

fn email_or_prompt(email: Option<String>, label: &str) -> Result<String> {
    match email {
        Some(email) => Ok(email.trim().to_string()),
        None => prompt(label),
    }
}

/// Create a task user; `None` when the email is already taken.
async fn create_task_user(
    tasks: &TaskStore,
    name: String,
    email: &str,
) -> Result<Option<TaskUser>> {
    let new_user = NewTaskUser {
        name,
        email: email.to_string(),
    };
    match tasks.add_user(&new_user).await {
        Ok(user) => Ok(Some(user)),
        Err(StoreError::Integrity(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn duplicate_user_notice(email: &str) -> String {
    format!("User already exists: {}", email)
}

async fn run_tasks(command: TaskCommands, tasks: &TaskStore) -> Result<()> {
    match command {
        TaskCommands::AddUser { name, email } => {
            let name = match name {
                Some(name) => name,
                None => prompt("Enter user name: ")?,
            };
            let email = email_or_prompt(email, "Enter the email address: ")?;

            if email.is_empty() {
                println!("{}", "No email provided. Not creating user!".yellow());
                return Ok(());
            }

            match create_task_user(tasks, name, &email).await? {
                Some(user) => {
                    println!("{}", "✓ User created".green().bold());
                    println!("  ID:    {}", user.id.to_string().bright_cyan());
                    println!("  Name:  {}", user.name);
                    println!("  Email: {}", user.email);
                }
                None => println!("{}", duplicate_user_notice(&email).yellow()),
            }
        }

        TaskCommands::Users => {
            let users = tasks.list_users().await?;
            if users.is_empty() {
                println!("{}", "No users found".yellow());
                return Ok(());
            }

            println!("{:<4} {:<20} {}", "ID".bold(), "NAME".bold(), "EMAIL".bold());
            println!("{}", "─".repeat(64));
            for user in users {
                println!("{:<4} {:<20} {}", user.id, truncate(&user.name, 20), user.email);
            }
        }

        TaskCommands::Add { email } => {
            let email = email_or_prompt(email, "Enter the email of the user to add task: ")?;
            if email.is_empty() {
                println!("{}", "No email provided. Not adding tasks!".yellow());
                return Ok(());
            }

            if tasks.get_user_by_email(&email).await?.is_none() {
                println!("{}", format!("No user found with email: {}", email).yellow());
                return Ok(());
            }

            loop {
                let title = prompt("Enter title: ")?;
                let description = prompt("Enter description: ")?;

                let mut task = NewTask::new(title);
                if !description.is_empty() {
                    task = task.with_description(description);
                }

                match tasks.add_task(&email, &task).await {
                    Ok(task) => {
                        println!("{}", format!("✓ Task {} added", task.id).green().bold());
                    }
                    Err(StoreError::Validation(msg)) => {
                        println!("{}", format!("Task not added: {}", msg).red());
                    }
                    Err(e) => return Err(e.into()),
                }

                if !confirm("Do you wish to add more tasks?")? {
                    break;
                }
            }
        }

        TaskCommands::List { email } => {
            let email = email_or_prompt(email, "Enter the email of the user to list tasks: ")?;
            if email.is_empty() {
                println!("{}", "No email provided. Not querying tasks!".yellow());
                return Ok(());
            }

            let list = match tasks.list_tasks(&email).await {
                Ok(list) => list,
                Err(StoreError::NotFound(_)) => {
                    println!("{}", format!("No user found with email: {}", email).yellow());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };

            if list.is_empty() {
                println!("{}", "No tasks found".yellow());
                return Ok(());
            }

            println!(
                "{:<4} {:<50} {}",
                "ID".bold(),
                "TITLE".bold(),
                "DESCRIPTION".bold()
            );
            println!("{}", "─".repeat(80));
            for task in list {
                println!(
                    "{:<4} {:<50} {}",
                    task.id,
                    task.title,
                    task.description.as_deref().unwrap_or("")
                );
            }
        }

        TaskCommands::DeleteUser { email, force } => {
            if !force && !confirm(&format!("Delete user {} and all their tasks?", email))? {
                println!("{}", "Deletion cancelled".yellow());
                return Ok(());
            }

            if tasks.delete_user(&email).await? {
                println!("{}", format!("✓ Deleted user {}", email).green().bold());
            } else {
                println!("{}", format!("No user found with email: {}", email).yellow());
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // A missing .env is fine
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let config = ShelfConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("Invalid bind address: {}", bind))?;

            let library = LibraryStore::open(&config.storage.library_db).await?;
            let agent = LlmSqlAgent::from_config(&config.agent, library.store().clone())?;
            let state = AppState::new(library, QueryAdapter::new(agent));

            println!("{}", "Starting library API...".green());
            println!("  Database: {}", config.storage.library_db.display());
            println!("  Listening: http://{}", addr);
            println!("  Press Ctrl+C to stop");
            println!();

            ApiServer::new(addr, state).run().await?;
        }

        Commands::Init { write_config } => {
            LibraryStore::open(&config.storage.library_db).await?;
            TaskStore::open(&config.storage.tasks_db).await?;

            println!("{}", "✓ Initialized shelf databases".green().bold());
            println!("  Library: {}", config.storage.library_db.display());
            println!("  Tasks:   {}", config.storage.tasks_db.display());

            if write_config {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    println!("  Config:  {} (kept)", path.display());
                } else {
                    ShelfConfig::write_default(path)?;
                    println!("  Config:  {}", path.display());
                }
            }
        }

        Commands::Reset { force } => {
            if !force {
                println!(
                    "{}",
                    "About to delete every user, book and task".yellow().bold()
                );
                print!("Are you sure? [y/N]: ");
                io::stdout().flush()?;

                let mut input = String::new();
                io::stdin().read_line(&mut input)?;

                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("{}", "Reset cancelled".yellow());
                    return Ok(());
                }
            }

            LibraryStore::open(&config.storage.library_db).await?.reset().await?;
            TaskStore::open(&config.storage.tasks_db).await?.reset().await?;
            info!("Databases reset");
            println!("{}", "✓ Databases reset".green().bold());
        }

        Commands::Seed => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            let stats = library.seed_sample_data().await?;

            println!("{}", "✓ Sample data loaded".green().bold());
            print_seed_stats(&stats);
        }

        Commands::SeedOverdue { user } => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            let stats = library.seed_overdue_books(&user).await?;

            println!(
                "{}",
                format!("✓ Overdue books lent to {}", user).green().bold()
            );
            print_seed_stats(&stats);
        }

        Commands::User(UserCommands::Add { name }) => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            let user = library.add_user(&name).await?;
            println!("{}", format!("✓ User '{}' added", user.name).green().bold());
            println!("  ID: {}", user.id.to_string().bright_cyan());
        }

        Commands::Book(BookCommands::Add { title }) => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            let book = library.add_book(&title).await?;
            println!("{}", format!("✓ Book '{}' added", book.title).green().bold());
            println!("  ID: {}", book.id.to_string().bright_cyan());
        }

        Commands::Borrow {
            username,
            title,
            days,
        } => {
            let library = LibraryStore::open(&config.storage.library_db).await?;

            match title {
                Some(title) => {
                    borrow_and_report(&library, &username, &title, days).await?;
                }
                None => {
                    print_users(&library).await?;
                    loop {
                        print_books(&library, true).await?;
                        let title = prompt("Enter book title to borrow (q to quit): ")?;
                        if is_quit(&title) {
                            break;
                        }
                        if title.is_empty() {
                            continue;
                        }
                        borrow_and_report(&library, &username, &title, days).await?;
                    }
                }
            }
        }

        Commands::Books { available } => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            print_books(&library, available).await?;
        }

        Commands::Users => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            print_users(&library).await?;
        }

        Commands::Ask { question } => {
            let library = LibraryStore::open(&config.storage.library_db).await?;
            let agent = LlmSqlAgent::from_config(&config.agent, library.store().clone())?;
            let adapter = QueryAdapter::new(agent);

            let answer = adapter.ask(&question).await;
            if answer.is_answered() {
                println!("{}", answer.into_text());
            } else {
                eprintln!("{}", answer.into_text().red());
            }
        }

        Commands::Tasks(command) => {
            let tasks = TaskStore::open(&config.storage.tasks_db).await?;
            run_tasks(command, &tasks).await?;
        }
    }

    Ok(())
}
