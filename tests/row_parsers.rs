use sqlx::SqlitePool;
use uuid::Uuid;
use chrono::Utc;

use cms_scopes::db::row_parsers::{section_scope_from_row, user_from_row};

async fn setup_pool() -> SqlitePool {
    SqlitePool::connect("sqlite::memory:").await.expect("connect")
}

#[tokio::test]
async fn parse_user_row_with_integer_flags() {
    let pool = setup_pool().await;
    sqlx::query(
        "CREATE TABLE users (id TEXT, name TEXT, is_superuser INTEGER, is_active INTEGER, created_at TEXT, updated_at TEXT)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let id = Uuid::new_v4();
    let now = Utc::now().to_rfc3339();

    sqlx::query("INSERT INTO users (id, name, is_superuser, is_active, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)")
        .bind(id.to_string())
        .bind("ada")
        .bind(0i64)
        .bind(1i64)
        .bind(now.clone())
        .bind(now)
        .execute(&pool)
        .await
        .unwrap();

    let row = sqlx::query("SELECT * FROM users WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();

    let parsed = user_from_row(&row).expect("parse");
    assert_eq!(parsed.id, id);
    assert_eq!(parsed.name, "ada");
    assert!(!parsed.is_superuser);
    assert!(parsed.is_active);
}

#[tokio::test]
async fn parse_section_scope_row_with_sqlite_timestamp() {
    let pool = setup_pool().await;
    sqlx::query("CREATE TABLE section_scopes (id TEXT, group_id TEXT, path_prefix TEXT, name TEXT, created_at TEXT)")
        .execute(&pool)
        .await
        .unwrap();

    let id = Uuid::new_v4();
    let group_id = Uuid::new_v4();

    sqlx::query("INSERT INTO section_scopes (id, group_id, path_prefix, name, created_at) VALUES (?, ?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(group_id.to_string())
        .bind("/blog")
        .bind("Blog")
        .bind("2026-01-01 10:00:00")
        .execute(&pool)
        .await
        .unwrap();

    let row = sqlx::query("SELECT * FROM section_scopes WHERE id = ?")
        .bind(id.to_string())
        .fetch_one(&pool)
        .await
        .unwrap();

    let parsed = section_scope_from_row(&row).expect("parse");
    assert_eq!(parsed.group_id, group_id);
    assert_eq!(parsed.path_prefix, "/blog");
    assert_eq!(parsed.name, "Blog");
}

#[tokio::test]
async fn malformed_uuid_is_an_error() {
    let pool = setup_pool().await;
    sqlx::query("CREATE TABLE section_scopes (id TEXT, group_id TEXT, path_prefix TEXT, name TEXT, created_at TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO section_scopes VALUES ('nope', 'nope', '/', '', '2026-01-01T00:00:00Z')")
        .execute(&pool)
        .await
        .unwrap();

    let row = sqlx::query("SELECT * FROM section_scopes").fetch_one(&pool).await.unwrap();
    assert!(section_scope_from_row(&row).is_err());
}
