//! Schema creation and upgrades for the `documents` table.
//!
//! Databases created before summaries and content hashing existed lack the
//! `summary` and `content_hash` columns; they are added in place. The
//! uniqueness of `content_hash` is enforced by a unique index, which SQLite
//! applies only to non-NULL values.

use anyhow::Result;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotently create or upgrade the schema on an open pool.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            extracted_text TEXT,
            word_count INTEGER NOT NULL DEFAULT 0,
            character_length INTEGER NOT NULL DEFAULT 0,
            summary TEXT,
            content_hash TEXT,
            created_timestamp INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let columns: Vec<String> = sqlx::query("PRAGMA table_info(documents)")
        .fetch_all(pool)
        .await?
        .iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();

    for (column, ddl) in [
        ("summary", "ALTER TABLE documents ADD COLUMN summary TEXT"),
        ("content_hash", "ALTER TABLE documents ADD COLUMN content_hash TEXT"),
    ] {
        if !columns.iter().any(|c| c == column) {
            tracing::info!(column, "upgrading documents table");
            sqlx::query(ddl).execute(pool).await?;
        }
    }

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_content_hash ON documents(content_hash)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_timestamp DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
