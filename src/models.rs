//! Core data models used throughout OCR Harness.
//!
//! These types represent the persisted document records and the outcomes
//! that flow out of the ingestion pipeline.

use serde::Serialize;

use crate::metrics::TextMetrics;

/// Number of characters of extracted text shown in record previews.
pub const PREVIEW_CHARS: usize = 200;

/// A persisted document row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: i64,
    pub filename: String,
    pub extracted_text: Option<String>,
    pub word_count: i64,
    pub character_length: i64,
    pub summary: Option<String>,
    pub content_hash: Option<String>,
    pub created_timestamp: i64,
}

impl DocumentRecord {
    /// First [`PREVIEW_CHARS`] characters of the text followed by `...`.
    pub fn preview(&self) -> Option<String> {
        self.extracted_text.as_ref().map(|text| {
            let head: String = text.chars().take(PREVIEW_CHARS).collect();
            format!("{}...", head)
        })
    }

    pub fn has_summary(&self) -> bool {
        self.summary.as_deref().map(|s| !s.is_empty()).unwrap_or(false)
    }

    pub fn created_at_iso(&self) -> String {
        chrono::DateTime::from_timestamp(self.created_timestamp, 0)
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_else(|| self.created_timestamp.to_string())
    }
}

/// A row about to be inserted. Metrics are derived from the text here and
/// nowhere else, so they always agree with `extracted_text`.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub filename: String,
    pub extracted_text: String,
    pub metrics: TextMetrics,
    pub summary: Option<String>,
    pub content_hash: Option<String>,
}

impl NewDocument {
    pub fn new(filename: &str, extracted_text: String, content_hash: Option<String>) -> Self {
        let metrics = TextMetrics::of(&extracted_text);
        Self {
            filename: filename.to_string(),
            extracted_text,
            metrics,
            summary: None,
            content_hash,
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary.filter(|s| !s.is_empty());
        self
    }
}

/// Terminal outcome of ingesting one file.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// A new record was stored.
    Processed {
        id: i64,
        message: String,
        word_count: usize,
        character_length: usize,
        summary: Option<String>,
    },
    /// Content already stored; nothing was extracted or written.
    Skipped { message: String },
    /// Processing stopped with an error. `trace` holds the full cause chain.
    Failed { error: String, trace: String },
}

impl FileOutcome {
    /// Processed and skipped files both count as success.
    pub fn success(&self) -> bool {
        !matches!(self, FileOutcome::Failed { .. })
    }

    pub fn skipped(&self) -> bool {
        matches!(self, FileOutcome::Skipped { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            FileOutcome::Processed { message, .. } | FileOutcome::Skipped { message } => message,
            FileOutcome::Failed { error, .. } => error,
        }
    }

    pub fn summary(&self) -> Option<&str> {
        match self {
            FileOutcome::Processed { summary, .. } => summary.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn failed(err: &anyhow::Error) -> Self {
        FileOutcome::Failed {
            error: err.to_string(),
            trace: format!("{:?}", err),
        }
    }
}

/// Outcome for one file in a batch, tagged with its display name.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub filename: String,
    pub result: FileOutcome,
}

/// Aggregate of one ingestion run. Counts only change through
/// [`BatchResult::record`], so they always sum to `results.len()`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchResult {
    successful: usize,
    skipped: usize,
    failed: usize,
    results: Vec<FileResult>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, filename: impl Into<String>, outcome: FileOutcome) {
        match &outcome {
            FileOutcome::Processed { .. } => self.successful += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed { .. } => self.failed += 1,
        }
        self.results.push(FileResult {
            filename: filename.into(),
            result: outcome,
        });
    }

    pub fn successful(&self) -> usize {
        self.successful
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn total(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &[FileResult] {
        &self.results
    }
}

/// Aggregate sums over the whole store.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_records: i64,
    pub total_words: i64,
    pub total_characters: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: Option<&str>, summary: Option<&str>) -> DocumentRecord {
        DocumentRecord {
            id: 1,
            filename: "a.pdf".into(),
            extracted_text: text.map(String::from),
            word_count: 0,
            character_length: 0,
            summary: summary.map(String::from),
            content_hash: None,
            created_timestamp: 0,
        }
    }

    #[test]
    fn test_preview_truncates_to_200_chars() {
        let long = "x".repeat(500);
        let preview = record(Some(&long), None).preview().unwrap();
        assert_eq!(preview.chars().count(), 203);
        assert!(preview.ends_with("..."));
        assert_eq!(record(None, None).preview(), None);
    }

    #[test]
    fn test_has_summary() {
        assert!(!record(None, None).has_summary());
        assert!(!record(None, Some("")).has_summary());
        assert!(record(None, Some("short")).has_summary());
    }

    #[test]
    fn test_new_document_metrics_follow_text() {
        let doc = NewDocument::new("t.pdf", "This is test text".into(), None);
        assert_eq!(doc.metrics.word_count, 4);
        assert_eq!(doc.metrics.character_length, 17);
        assert_eq!(doc.with_summary(Some(String::new())).summary, None);
    }

    #[test]
    fn test_batch_counts_sum_to_total() {
        let mut batch = BatchResult::new();
        batch.record(
            "a.pdf",
            FileOutcome::Processed {
                id: 1,
                message: "ok".into(),
                word_count: 0,
                character_length: 0,
                summary: None,
            },
        );
        batch.record("b.pdf", FileOutcome::Skipped { message: "dup".into() });
        batch.record(
            "c.pdf",
            FileOutcome::Failed {
                error: "boom".into(),
                trace: "boom".into(),
            },
        );
        assert_eq!(batch.successful() + batch.skipped() + batch.failed(), 3);
        assert_eq!(batch.total(), 3);
        let names: Vec<&str> = batch.results().iter().map(|r| r.filename.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn test_outcome_flags() {
        let skipped = FileOutcome::Skipped { message: "x".into() };
        assert!(skipped.success());
        assert!(skipped.skipped());
        let failed = FileOutcome::Failed {
            error: "e".into(),
            trace: "t".into(),
        };
        assert!(!failed.success());
        assert_eq!(failed.message(), "e");
    }
}
