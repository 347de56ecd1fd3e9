//! Integration tests against SQLite.
//!
//! Every statement opens its own connection, so the database lives in a
//! temporary file rather than `:memory:` (an in-memory database would vanish
//! between statements).

#![cfg(feature = "sqlite")]

use sqlbridge::{BackendKind, Database, DbError, connect, impl_record, params};
use tempfile::TempDir;

#[derive(Debug, Default, PartialEq)]
struct User {
    name: String,
    age: i64,
}

impl_record!(User { name, age });

struct TestDb {
    db: Database,
    // Held so the directory outlives the handle
    _dir: TempDir,
}

async fn setup() -> TestDb {
    let _ = tracing_subscriber::fmt().with_env_filter("sqlbridge=debug").try_init();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.db");
    let db = connect(
        BackendKind::SQLite,
        &format!("sqlite:{}?mode=rwc", path.display()),
    )
    .unwrap();
    db.execute(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER)",
        &params! {},
    )
    .await
    .unwrap();
    TestDb { db, _dir: dir }
}

async fn seed(db: &Database) {
    for (name, age) in [("Alice", Some(30i64)), ("Bob", Some(25)), ("Carol", None)] {
        db.execute(
            "INSERT INTO users (name, age) VALUES (@Name, @Age)",
            &params! { "Name" => name, "Age" => age },
        )
        .await
        .unwrap();
    }
}

#[tokio::test]
async fn test_insert_reports_affected_rows() {
    let t = setup().await;
    let affected = t
        .db
        .execute(
            "INSERT INTO users (name, age) VALUES (@Name, @Age)",
            &params! { "Name" => "Alice", "Age" => 30i64 },
        )
        .await
        .unwrap();
    assert_eq!(affected, 1);
}

#[tokio::test]
async fn test_query_maps_records() {
    let t = setup().await;
    seed(&t.db).await;

    let users: Vec<User> = t
        .db
        .query(
            "SELECT name, age FROM users WHERE age >= @MinAge ORDER BY age",
            &params! { "MinAge" => 25i64 },
        )
        .await
        .unwrap();
    assert_eq!(
        users,
        vec![
            User { name: "Bob".into(), age: 25 },
            User { name: "Alice".into(), age: 30 },
        ]
    );
}

#[tokio::test]
async fn test_null_column_keeps_field_default() {
    let t = setup().await;
    seed(&t.db).await;

    let carol: Option<User> = t
        .db
        .query_single(
            "SELECT name, age FROM users WHERE name = @Name",
            &params! { "Name" => "Carol" },
        )
        .await
        .unwrap();
    assert_eq!(carol, Some(User { name: "Carol".into(), age: 0 }));
}

#[tokio::test]
async fn test_query_ignores_extra_columns() {
    let t = setup().await;
    seed(&t.db).await;

    // `id` has no matching field on User
    let users: Vec<User> = t
        .db
        .query("SELECT id, name, age FROM users WHERE name = @N", &params! { "N" => "Bob" })
        .await
        .unwrap();
    assert_eq!(users, vec![User { name: "Bob".into(), age: 25 }]);
}

#[tokio::test]
async fn test_query_scalar_collects_first_column() {
    let t = setup().await;
    seed(&t.db).await;

    let names: Vec<String> = t
        .db
        .query_scalar(
            "SELECT name FROM users WHERE age > @MinAge ORDER BY name",
            &params! { "MinAge" => 26i64 },
        )
        .await
        .unwrap();
    assert_eq!(names, vec!["Alice".to_string()]);

    let count: Vec<i64> = t
        .db
        .query_scalar("SELECT COUNT(*) FROM users", &params! {})
        .await
        .unwrap();
    assert_eq!(count, vec![3]);
}

#[tokio::test]
async fn test_query_scalar_null_yields_default() {
    let t = setup().await;
    seed(&t.db).await;

    let ages: Vec<i64> = t
        .db
        .query_scalar(
            "SELECT age FROM users WHERE name = @N",
            &params! { "N" => "Carol" },
        )
        .await
        .unwrap();
    assert_eq!(ages, vec![0]);

    // The nullable shape keeps the distinction
    let ages: Vec<Option<i64>> = t
        .db
        .query_scalar(
            "SELECT age FROM users WHERE name = @N",
            &params! { "N" => "Carol" },
        )
        .await
        .unwrap();
    assert_eq!(ages, vec![None]);
}

#[tokio::test]
async fn test_query_single_on_empty_result() {
    let t = setup().await;
    let user: Option<User> = t
        .db
        .query_single("SELECT name, age FROM users", &params! {})
        .await
        .unwrap();
    assert_eq!(user, None);

    let name: Option<String> = t
        .db
        .query_single_scalar("SELECT name FROM users", &params! {})
        .await
        .unwrap();
    assert_eq!(name, None);
}

#[tokio::test]
async fn test_update_and_delete_counts() {
    let t = setup().await;
    seed(&t.db).await;

    let updated = t
        .db
        .execute(
            "UPDATE users SET age = @Age WHERE name = @Name",
            &params! { "Age" => 31i64, "Name" => "Alice" },
        )
        .await
        .unwrap();
    assert_eq!(updated, 1);

    let deleted = t
        .db
        .execute("DELETE FROM users WHERE age < @Cut", &params! { "Cut" => 28i64 })
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let deleted = t
        .db
        .execute("DELETE FROM users WHERE name = @N", &params! { "N" => "nobody" })
        .await
        .unwrap();
    assert_eq!(deleted, 0);
}

#[tokio::test]
async fn test_repeated_parameter_marker() {
    let t = setup().await;
    seed(&t.db).await;

    let n: Option<i64> = t
        .db
        .query_single_scalar(
            "SELECT COUNT(*) FROM users WHERE name = @V OR name = @V",
            &params! { "V" => "Alice" },
        )
        .await
        .unwrap();
    assert_eq!(n, Some(1));
}

#[tokio::test]
async fn test_missing_parameter_fails_before_io() {
    let t = setup().await;
    let err = t
        .db
        .execute("DELETE FROM users WHERE name = @Name", &params! {})
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::InvalidArgument { .. }));
    assert!(err.to_string().contains("@Name"));
}

#[tokio::test]
async fn test_parameter_lookup_ignores_sigil_and_case() {
    let t = setup().await;
    seed(&t.db).await;

    let n: Option<i64> = t
        .db
        .query_single_scalar(
            "SELECT COUNT(*) FROM users WHERE name = @UserName",
            &params! { ":username" => "Bob" },
        )
        .await
        .unwrap();
    assert_eq!(n, Some(1));
}

#[tokio::test]
async fn test_coercion_failure_surfaces() {
    let t = setup().await;
    seed(&t.db).await;

    let err = t
        .db
        .query_scalar::<i64>("SELECT name FROM users", &params! {})
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Coercion { .. }));
}

#[tokio::test]
async fn test_statement_error_from_backend() {
    let t = setup().await;
    let err = t
        .db
        .execute("INSERT INTO no_such_table (x) VALUES (1)", &params! {})
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Statement { .. }));
}

#[tokio::test]
async fn test_text_round_trips_utf8() {
    let t = setup().await;
    t.db.execute(
        "INSERT INTO users (name, age) VALUES (@Name, @Age)",
        &params! { "Name" => "李明 🚀", "Age" => 1i64 },
    )
    .await
    .unwrap();
    let name: Option<String> = t
        .db
        .query_single_scalar("SELECT name FROM users WHERE age = @A", &params! { "A" => 1i64 })
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("李明 🚀"));
}

#[tokio::test]
async fn test_at_literal_inside_string_is_untouched() {
    let t = setup().await;
    t.db.execute(
        "INSERT INTO users (name, age) VALUES ('user@example.com', @Age)",
        &params! { "Age" => 5i64 },
    )
    .await
    .unwrap();
    let name: Option<String> = t
        .db
        .query_single_scalar("SELECT name FROM users WHERE age = @A", &params! { "A" => 5i64 })
        .await
        .unwrap();
    assert_eq!(name.as_deref(), Some("user@example.com"));
}

#[tokio::test]
async fn test_closed_handle_rejects_statements() {
    let t = setup().await;
    t.db.close();
    let err = t.db.execute("SELECT 1", &params! {}).await.unwrap_err();
    assert!(matches!(err, DbError::Disposed { .. }));
    // Closing again is a no-op
    t.db.close();
}
