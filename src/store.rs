//! SQLite-backed record store and duplicate guard.
//!
//! One row per successfully ingested document. After insert only `summary`
//! is ever rewritten. The unique index on `content_hash` is the authority on
//! duplicates: [`RecordStore::is_duplicate`] is a fast-path check that lets
//! the pipeline skip OCR, while a racing insert of the same content fails
//! with [`StoreError::DuplicateHash`].

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::migrate;
use crate::models::{DocumentRecord, NewDocument, StoreStats};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a document with content hash {0} already exists")]
    DuplicateHash(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

const RECORD_COLUMNS: &str = "id, filename, extracted_text, word_count, character_length, summary, content_hash, created_timestamp";

#[derive(Clone)]
pub struct RecordStore {
    pool: SqlitePool,
}

impl RecordStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to the configured database and make sure the schema exists.
    pub async fn open(config: &Config) -> anyhow::Result<Self> {
        let pool = db::connect(config).await?;
        migrate::apply_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Whether a record with this hash exists. A missing hash is never a duplicate.
    pub async fn is_duplicate(&self, content_hash: Option<&str>) -> StoreResult<bool> {
        let Some(hash) = content_hash else {
            return Ok(false);
        };
        let exists: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM documents WHERE content_hash = ?")
                .bind(hash)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Insert a new record and return its id.
    pub async fn insert(&self, doc: &NewDocument) -> StoreResult<i64> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO documents (filename, extracted_text, word_count, character_length, summary, content_hash, created_timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.filename)
        .bind(&doc.extracted_text)
        .bind(doc.metrics.word_count as i64)
        .bind(doc.metrics.character_length as i64)
        .bind(&doc.summary)
        .bind(&doc.content_hash)
        .bind(now)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                StoreError::DuplicateHash(doc.content_hash.clone().unwrap_or_default()),
            ),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get(&self, id: i64) -> StoreResult<Option<DocumentRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ?",
            RECORD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    /// Newest first.
    pub async fn list_recent(&self, limit: i64) -> StoreResult<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents ORDER BY created_timestamp DESC, id DESC LIMIT ?",
            RECORD_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Records whose summary is absent or empty, newest first.
    pub async fn list_missing_summary(&self, limit: i64) -> StoreResult<Vec<DocumentRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE summary IS NULL OR summary = '' ORDER BY created_timestamp DESC, id DESC LIMIT ?",
            RECORD_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    /// Attach or replace a summary; an empty summary clears it. Returns false
    /// when no such record exists.
    pub async fn update_summary(&self, id: i64, summary: &str) -> StoreResult<bool> {
        let done = sqlx::query("UPDATE documents SET summary = ? WHERE id = ?")
            .bind(Some(summary).filter(|s| !s.is_empty()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Returns false when no such record exists.
    pub async fn delete(&self, id: i64) -> StoreResult<bool> {
        let done = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn count(&self) -> StoreResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total_records, COALESCE(SUM(word_count), 0) AS total_words, COALESCE(SUM(character_length), 0) AS total_characters FROM documents",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(StoreStats {
            total_records: row.try_get("total_records")?,
            total_words: row.try_get("total_words")?,
            total_characters: row.try_get("total_characters")?,
        })
    }
}

/// Map a row, reporting undecodable legacy values as database errors.
fn row_to_record(row: &SqliteRow) -> StoreResult<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.try_get("id")?,
        filename: row.try_get("filename")?,
        extracted_text: row.try_get("extracted_text")?,
        word_count: row.try_get("word_count")?,
        character_length: row.try_get("character_length")?,
        summary: row.try_get("summary")?,
        content_hash: row.try_get("content_hash")?,
        created_timestamp: row.try_get("created_timestamp")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_store(tmp: &TempDir) -> RecordStore {
        let config = Config::minimal(tmp.path().join("store.sqlite"));
        RecordStore::open(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        let id = store
            .insert(&NewDocument::new("a.pdf", "Hello world".into(), Some("h1".into())))
            .await
            .unwrap();
        let rec = store.get(id).await.unwrap().unwrap();
        assert_eq!(rec.filename, "a.pdf");
        assert_eq!(rec.word_count, 2);
        assert_eq!(rec.character_length, 11);
        assert_eq!(rec.summary, None);
        assert_eq!(rec.content_hash.as_deref(), Some("h1"));
        assert!(rec.created_timestamp > 0);
        assert!(store.get(id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_null_hash_is_never_duplicate() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store
            .insert(&NewDocument::new("a.pdf", "one".into(), None))
            .await
            .unwrap();
        store
            .insert(&NewDocument::new("a.pdf", "one".into(), None))
            .await
            .unwrap();
        assert!(!store.is_duplicate(None).await.unwrap());
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_hash_enforced_by_store() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        store
            .insert(&NewDocument::new("a.pdf", "one".into(), Some("same".into())))
            .await
            .unwrap();
        assert!(store.is_duplicate(Some("same")).await.unwrap());
        assert!(!store.is_duplicate(Some("other")).await.unwrap());

        let err = store
            .insert(&NewDocument::new("b.pdf", "two".into(), Some("same".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateHash(ref h) if h == "same"));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_ids_not_reused_after_delete() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        let first = store
            .insert(&NewDocument::new("a.pdf", "a".into(), None))
            .await
            .unwrap();
        assert!(store.delete(first).await.unwrap());
        assert!(!store.delete(first).await.unwrap());
        let second = store
            .insert(&NewDocument::new("b.pdf", "b".into(), None))
            .await
            .unwrap();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_and_limited() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            store
                .insert(&NewDocument::new(name, name.into(), None))
                .await
                .unwrap();
        }
        let recent = store.list_recent(2).await.unwrap();
        let names: Vec<&str> = recent.iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["c.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn test_missing_summary_and_update() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;

        let a = store
            .insert(&NewDocument::new("a.pdf", "alpha".into(), None))
            .await
            .unwrap();
        store
            .insert(
                &NewDocument::new("b.pdf", "beta".into(), None)
                    .with_summary(Some("beta summary".into())),
            )
            .await
            .unwrap();

        let missing = store.list_missing_summary(10).await.unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, a);

        assert!(store.update_summary(a, "alpha summary").await.unwrap());
        assert!(store.list_missing_summary(10).await.unwrap().is_empty());
        assert!(!store.update_summary(9999, "nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_stats() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp).await;
        assert_eq!(store.stats().await.unwrap(), StoreStats::default());

        store
            .insert(&NewDocument::new("a.pdf", "Hello world".into(), None))
            .await
            .unwrap();
        store
            .insert(&NewDocument::new("b.pdf", "Hello    world   test".into(), None))
            .await
            .unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_records, 2);
        assert_eq!(stats.total_words, 5);
        assert_eq!(stats.total_characters, 32);
    }

    #[tokio::test]
    async fn test_schema_upgrade_adds_columns() {
        let tmp = TempDir::new().unwrap();
        let config = Config::minimal(tmp.path().join("legacy.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        sqlx::query(
            "CREATE TABLE documents (id INTEGER PRIMARY KEY AUTOINCREMENT, filename TEXT NOT NULL, extracted_text TEXT, word_count INTEGER NOT NULL DEFAULT 0, character_length INTEGER NOT NULL DEFAULT 0, created_timestamp INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO documents (filename, extracted_text, created_timestamp) VALUES ('old.pdf', 'old text', 1)")
            .execute(&pool)
            .await
            .unwrap();

        migrate::apply_schema(&pool).await.unwrap();
        migrate::apply_schema(&pool).await.unwrap();

        let store = RecordStore::new(pool);
        let old = store.list_recent(10).await.unwrap();
        assert_eq!(old.len(), 1);
        assert_eq!(old[0].content_hash, None);
        assert_eq!(old[0].summary, None);
    }

    #[tokio::test]
    async fn test_undecodable_legacy_row_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let config = Config::minimal(tmp.path().join("legacy.sqlite"));
        let pool = db::connect(&config).await.unwrap();
        sqlx::query(
            "CREATE TABLE documents (id INTEGER PRIMARY KEY AUTOINCREMENT, filename TEXT NOT NULL, extracted_text TEXT, word_count INTEGER, character_length INTEGER, created_timestamp INTEGER NOT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO documents (filename, extracted_text, word_count, character_length, created_timestamp) VALUES ('old.pdf', 'old text', NULL, 8, 1)")
            .execute(&pool)
            .await
            .unwrap();
        migrate::apply_schema(&pool).await.unwrap();

        let store = RecordStore::new(pool);
        assert!(matches!(store.get(1).await, Err(StoreError::Database(_))));
        assert!(matches!(store.list_recent(10).await, Err(StoreError::Database(_))));
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
