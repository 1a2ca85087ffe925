//! Document operations shared by the HTTP server and the CLI.
//!
//! Each operation maps store and pipeline results onto [`ServiceError`], so
//! callers can tell a missing record and a bad request apart from a server
//! fault without inspecting messages.

use serde::Serialize;

use crate::ingest::Ingestor;
use crate::models::{DocumentRecord, FileOutcome, StoreStats};
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Internal(anyhow::Error::new(e))
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Content of one submission.
#[derive(Debug, Clone)]
pub enum SubmitContent {
    /// Raw PDF bytes. Fingerprinted and run through OCR.
    Pdf(Vec<u8>),
    /// Text extracted elsewhere, with the fingerprint of its source if known.
    Text {
        text: String,
        content_hash: Option<String>,
    },
}

/// Response shape of [`DocumentService::submit`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubmitResponse {
    pub success: bool,
    pub skipped: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

impl From<FileOutcome> for SubmitResponse {
    fn from(outcome: FileOutcome) -> Self {
        match outcome {
            FileOutcome::Processed {
                id,
                message,
                summary,
                ..
            } => SubmitResponse {
                success: true,
                skipped: false,
                message,
                id: Some(id),
                summary,
                trace: None,
            },
            FileOutcome::Skipped { message } => SubmitResponse {
                success: true,
                skipped: true,
                message,
                id: None,
                summary: None,
                trace: None,
            },
            FileOutcome::Failed { error, trace } => SubmitResponse {
                success: false,
                skipped: false,
                message: error,
                id: None,
                summary: None,
                trace: Some(trace),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SummaryUpdate {
    pub success: bool,
    pub summary: String,
}

pub struct DocumentService {
    ingestor: Ingestor,
}

impl DocumentService {
    pub fn new(ingestor: Ingestor) -> Self {
        Self { ingestor }
    }

    /// Ingest one file. Failures are reported in the response, not as errors.
    pub async fn submit(
        &self,
        filename: &str,
        content: SubmitContent,
        generate_summary: bool,
    ) -> SubmitResponse {
        let outcome = match content {
            SubmitContent::Pdf(bytes) => {
                self.ingestor
                    .process_upload(filename, bytes, generate_summary)
                    .await
            }
            SubmitContent::Text { text, content_hash } => {
                self.ingestor
                    .process_text(filename, text, content_hash, generate_summary)
                    .await
            }
        };
        outcome.into()
    }

    pub async fn check_duplicate(&self, content_hash: &str) -> ServiceResult<bool> {
        if content_hash.trim().is_empty() {
            return Err(ServiceError::BadRequest("hash must not be empty".to_string()));
        }
        Ok(self.ingestor.store().is_duplicate(Some(content_hash)).await?)
    }

    pub async fn list_recent(&self, limit: i64) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self.ingestor.store().list_recent(limit).await?)
    }

    pub async fn list_missing_summary(&self, limit: i64) -> ServiceResult<Vec<DocumentRecord>> {
        Ok(self.ingestor.store().list_missing_summary(limit).await?)
    }

    pub async fn get(&self, id: i64) -> ServiceResult<DocumentRecord> {
        self.ingestor
            .store()
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Summarize a stored record's text and replace its summary.
    pub async fn update_summary(&self, id: i64) -> ServiceResult<SummaryUpdate> {
        let record = self.get(id).await?;
        let text = record
            .extracted_text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                ServiceError::BadRequest("No text available for summarization".to_string())
            })?;

        tracing::info!(id, filename = %record.filename, "generating summary");
        let summary = self.ingestor.summarizer().summarize(&text).await;

        if !self.ingestor.store().update_summary(id, &summary).await? {
            return Err(not_found(id));
        }
        Ok(SummaryUpdate {
            success: true,
            summary,
        })
    }

    pub async fn delete(&self, id: i64) -> ServiceResult<()> {
        if self.ingestor.store().delete(id).await? {
            tracing::info!(id, "record deleted");
            Ok(())
        } else {
            Err(not_found(id))
        }
    }

    pub async fn stats(&self) -> ServiceResult<StoreStats> {
        Ok(self.ingestor.store().stats().await?)
    }
}

fn not_found(id: i64) -> ServiceError {
    ServiceError::NotFound(format!("Record {} not found", id))
}
