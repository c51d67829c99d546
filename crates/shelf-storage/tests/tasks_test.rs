//! Integration tests for the task context

use chrono::NaiveDate;
use shelf_core::{NewTask, NewTaskUser};
use shelf_storage::{StoreError, TaskStore};
use tempfile::TempDir;

async fn create_test_tasks() -> (TaskStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let tasks = TaskStore::open(temp_dir.path().join("tasks.db"))
        .await
        .expect("Failed to open tasks db");
    (tasks, temp_dir)
}

fn new_user(name: &str, email: &str) -> NewTaskUser {
    NewTaskUser {
        name: name.to_string(),
        email: email.to_string(),
    }
}

#[tokio::test]
async fn test_add_user_and_lookup_by_email() {
    let (tasks, _dir) = create_test_tasks().await;

    let created = tasks
        .add_user(&new_user("Usha", "usha@example.com"))
        .await
        .expect("Failed to add user");

    let found = tasks
        .get_user_by_email("usha@example.com")
        .await
        .unwrap()
        .expect("User should exist");
    assert_eq!(found, created);

    assert!(tasks
        .get_user_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_integrity_error() {
    let (tasks, _dir) = create_test_tasks().await;

    tasks
        .add_user(&new_user("Usha", "usha@example.com"))
        .await
        .unwrap();
    let err = tasks
        .add_user(&new_user("Usha Again", "usha@example.com"))
        .await
        .expect_err("Duplicate email should fail");
    assert!(matches!(err, StoreError::Integrity(_)));

    assert_eq!(tasks.list_users().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_blank_email_is_validation_error() {
    let (tasks, _dir) = create_test_tasks().await;

    let err = tasks
        .add_user(&new_user("Nobody", "  "))
        .await
        .expect_err("Blank email should fail");
    assert!(matches!(err, StoreError::Validation(_)));
    assert!(tasks.list_users().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_add_and_list_tasks() {
    let (tasks, _dir) = create_test_tasks().await;

    tasks
        .add_user(&new_user("Reva", "reva@example.com"))
        .await
        .unwrap();
    tasks
        .add_user(&new_user("Suji", "suji@example.com"))
        .await
        .unwrap();

    let due = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
    tasks
        .add_task(
            "reva@example.com",
            &NewTask::new("water plants").with_description("balcony"),
        )
        .await
        .unwrap();
    tasks
        .add_task("reva@example.com", &NewTask::new("pay rent").with_due_date(due))
        .await
        .unwrap();
    tasks
        .add_task("suji@example.com", &NewTask::new("call mom"))
        .await
        .unwrap();

    let reva_tasks = tasks.list_tasks("reva@example.com").await.unwrap();
    assert_eq!(reva_tasks.len(), 2);
    assert_eq!(reva_tasks[0].title, "water plants");
    assert_eq!(reva_tasks[0].description.as_deref(), Some("balcony"));
    assert_eq!(reva_tasks[1].due_date, Some(due));

    let suji_tasks = tasks.list_tasks("suji@example.com").await.unwrap();
    assert_eq!(suji_tasks.len(), 1);
}

#[tokio::test]
async fn test_tasks_for_unknown_email_are_not_found() {
    let (tasks, _dir) = create_test_tasks().await;

    let err = tasks
        .add_task("ghost@example.com", &NewTask::new("haunt"))
        .await
        .expect_err("Unknown email should fail");
    assert!(matches!(err, StoreError::NotFound(_)));

    let err = tasks
        .list_tasks("ghost@example.com")
        .await
        .expect_err("Unknown email should fail");
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_long_title_is_rejected() {
    let (tasks, _dir) = create_test_tasks().await;
    tasks
        .add_user(&new_user("Reva", "reva@example.com"))
        .await
        .unwrap();

    let err = tasks
        .add_task("reva@example.com", &NewTask::new("x".repeat(51)))
        .await
        .expect_err("Long title should fail");
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(tasks.task_count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_delete_user_cascades_to_tasks() {
    let (tasks, _dir) = create_test_tasks().await;

    tasks
        .add_user(&new_user("Reva", "reva@example.com"))
        .await
        .unwrap();
    tasks
        .add_user(&new_user("Suji", "suji@example.com"))
        .await
        .unwrap();
    tasks
        .add_task("reva@example.com", &NewTask::new("one"))
        .await
        .unwrap();
    tasks
        .add_task("reva@example.com", &NewTask::new("two"))
        .await
        .unwrap();
    tasks
        .add_task("suji@example.com", &NewTask::new("three"))
        .await
        .unwrap();

    assert!(tasks.delete_user("reva@example.com").await.unwrap());
    assert!(!tasks.delete_user("reva@example.com").await.unwrap());

    assert!(tasks
        .get_user_by_email("reva@example.com")
        .await
        .unwrap()
        .is_none());
    assert_eq!(tasks.task_count().await.unwrap(), 1);
    assert_eq!(tasks.list_tasks("suji@example.com").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_reset_clears_tasks_db() {
    let (tasks, _dir) = create_test_tasks().await;
    tasks
        .add_user(&new_user("Reva", "reva@example.com"))
        .await
        .unwrap();

    tasks.reset().await.unwrap();
    assert!(tasks.list_users().await.unwrap().is_empty());
}
