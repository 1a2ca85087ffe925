//! Ingestion pipeline orchestration.
//!
//! Coordinates the per-file flow, cheapest step first:
//!
//! ```text
//! fingerprint → duplicate check ─(dup)→ skipped
//!                     │
//!                     ▼
//!               OCR extract → metrics → [summarize] → insert
//! ```
//!
//! The duplicate check runs before OCR so known content never reaches the
//! OCR engine. The store's unique index stays the authority: an insert that
//! loses a race with an identical submission is reported as skipped.
//!
//! Files are processed one at a time in input order. Every per-file error is
//! captured as [`FileOutcome::Failed`] and the batch moves on.

use anyhow::Context;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::{Config, LlmOverrides};
use crate::extract::TextExtractor;
use crate::fingerprint::fingerprint_file;
use crate::models::{BatchResult, FileOutcome, NewDocument};
use crate::progress::{BatchProgressEvent, BatchProgressReporter};
use crate::store::{RecordStore, StoreError};
use crate::summarize::Summarizer;

pub struct Ingestor {
    store: RecordStore,
    extractor: TextExtractor,
    summarizer: Summarizer,
}

impl Ingestor {
    pub fn new(store: RecordStore, extractor: TextExtractor, summarizer: Summarizer) -> Self {
        Self {
            store,
            extractor,
            summarizer,
        }
    }

    /// Open the store and build the default OCR engine and summarizer.
    pub async fn from_config(config: &Config, overrides: &LlmOverrides) -> anyhow::Result<Self> {
        let store = RecordStore::open(config).await?;
        let extractor = TextExtractor::from_config(&config.ocr);
        let summarizer = Summarizer::from_config(config, overrides)?;
        Ok(Self::new(store, extractor, summarizer))
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    /// Ingest one PDF from disk.
    pub async fn process_file(
        &self,
        path: &Path,
        filename: &str,
        generate_summary: bool,
    ) -> FileOutcome {
        tracing::info!(filename, "processing file");
        match self.try_process_file(path, filename, generate_summary).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(filename, error = %e, "processing failed");
                FileOutcome::failed(&e)
            }
        }
    }

    async fn try_process_file(
        &self,
        path: &Path,
        filename: &str,
        generate_summary: bool,
    ) -> anyhow::Result<FileOutcome> {
        let hash = fingerprint_blocking(path).await?;
        tracing::debug!(filename, hash = %hash, "content hash computed");

        if self.store.is_duplicate(Some(&hash)).await? {
            tracing::info!(filename, hash = %hash, "duplicate detected, skipping");
            return Ok(duplicate(filename));
        }

        let text = self.extractor.extract(path).await?;
        self.persist(filename, text, Some(hash), generate_summary)
            .await
    }

    /// Ingest text that was extracted elsewhere. `content_hash` is optional;
    /// without it the duplicate check is skipped.
    pub async fn process_text(
        &self,
        filename: &str,
        text: String,
        content_hash: Option<String>,
        generate_summary: bool,
    ) -> FileOutcome {
        match self
            .try_process_text(filename, text, content_hash, generate_summary)
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(filename, error = %e, "processing failed");
                FileOutcome::failed(&e)
            }
        }
    }

    async fn try_process_text(
        &self,
        filename: &str,
        text: String,
        content_hash: Option<String>,
        generate_summary: bool,
    ) -> anyhow::Result<FileOutcome> {
        if self.store.is_duplicate(content_hash.as_deref()).await? {
            tracing::info!(filename, "duplicate detected, skipping");
            return Ok(duplicate(filename));
        }
        self.persist(filename, text, content_hash, generate_summary)
            .await
    }

    /// Stage uploaded bytes in a temporary `.pdf` file and ingest it. The
    /// staging file is removed when this returns.
    pub async fn process_upload(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        generate_summary: bool,
    ) -> FileOutcome {
        let staged = match stage_upload_blocking(bytes).await {
            Ok(file) => file,
            Err(e) => {
                tracing::error!(filename, error = %e, "could not stage upload");
                return FileOutcome::failed(&e);
            }
        };
        tracing::debug!(filename, staged = %staged.path().display(), "upload staged");
        self.process_file(staged.path(), filename, generate_summary)
            .await
    }

    /// Process files sequentially, in order.
    pub async fn process_batch(
        &self,
        paths: &[PathBuf],
        generate_summary: bool,
        progress: &dyn BatchProgressReporter,
    ) -> BatchResult {
        let total = paths.len() as u64;
        tracing::info!(files = paths.len(), "starting batch");
        progress.report(BatchProgressEvent::Started { total });

        let mut batch = BatchResult::new();
        for (i, path) in paths.iter().enumerate() {
            let filename = display_name(path);
            let outcome = self.process_file(path, &filename, generate_summary).await;
            progress.report(BatchProgressEvent::File {
                n: i as u64 + 1,
                total,
                filename: filename.clone(),
                status: status_label(&outcome),
            });
            batch.record(filename, outcome);
        }

        tracing::info!(
            successful = batch.successful(),
            skipped = batch.skipped(),
            failed = batch.failed(),
            "batch complete"
        );
        progress.report(BatchProgressEvent::Finished {
            successful: batch.successful() as u64,
            skipped: batch.skipped() as u64,
            failed: batch.failed() as u64,
        });
        batch
    }

    async fn persist(
        &self,
        filename: &str,
        text: String,
        content_hash: Option<String>,
        generate_summary: bool,
    ) -> anyhow::Result<FileOutcome> {
        let mut doc = NewDocument::new(filename, text, content_hash);
        tracing::info!(
            filename,
            words = doc.metrics.word_count,
            chars = doc.metrics.character_length,
            "text metrics"
        );

        if generate_summary {
            let summary = self.summarizer.summarize(&doc.extracted_text).await;
            doc = doc.with_summary(Some(summary));
        }

        match self.store.insert(&doc).await {
            Ok(id) => {
                tracing::info!(filename, id, "document stored");
                Ok(FileOutcome::Processed {
                    id,
                    message: format!("Successfully processed {}", filename),
                    word_count: doc.metrics.word_count,
                    character_length: doc.metrics.character_length,
                    summary: doc.summary,
                })
            }
            Err(StoreError::DuplicateHash(hash)) => {
                tracing::info!(filename, hash = %hash, "lost insert race to identical content");
                Ok(duplicate(filename))
            }
            Err(e) => Err(anyhow::Error::new(e).context("failed to save to database")),
        }
    }
}

fn duplicate(filename: &str) -> FileOutcome {
    FileOutcome::Skipped {
        message: format!("File {} already exists (duplicate)", filename),
    }
}

fn status_label(outcome: &FileOutcome) -> &'static str {
    match outcome {
        FileOutcome::Processed { .. } => "processed",
        FileOutcome::Skipped { .. } => "skipped",
        FileOutcome::Failed { .. } => "failed",
    }
}

/// Final path component, or the whole path when it has none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Hash a file on the blocking pool; PDFs can be large.
async fn fingerprint_blocking(path: &Path) -> anyhow::Result<String> {
    let owned = path.to_path_buf();
    let hash = tokio::task::spawn_blocking(move || fingerprint_file(&owned)).await?;
    hash.with_context(|| format!("failed to read {}", path.display()))
}

async fn stage_upload_blocking(bytes: Vec<u8>) -> anyhow::Result<tempfile::NamedTempFile> {
    tokio::task::spawn_blocking(move || stage_upload(&bytes)).await?
}

fn stage_upload(bytes: &[u8]) -> anyhow::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("ocrh-upload-")
        .suffix(".pdf")
        .tempfile()
        .context("failed to create staging file")?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/a/b/report.pdf")), "report.pdf");
        assert_eq!(display_name(Path::new("scan.PDF")), "scan.PDF");
    }

    #[test]
    fn test_stage_upload_removed_on_drop() {
        let staged = stage_upload(b"%PDF-1.4").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "pdf");
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
        drop(staged);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_blocking_helpers() {
        let staged = stage_upload_blocking(b"%PDF-1.7 upload".to_vec()).await.unwrap();
        let hash = fingerprint_blocking(staged.path()).await.unwrap();
        assert_eq!(hash, crate::fingerprint::fingerprint_bytes(b"%PDF-1.7 upload"));

        let missing = Path::new("/nonexistent/ocrh/missing.pdf");
        let err = fingerprint_blocking(missing).await.unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn test_duplicate_message() {
        let outcome = duplicate("a.pdf");
        assert!(outcome.skipped());
        assert!(outcome.message().contains("already exists"));
    }
}
