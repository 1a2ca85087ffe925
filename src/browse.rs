//! Record browsing state for interactive front ends.
//!
//! Filtering, sorting and the two-step delete confirmation are plain
//! functions of their inputs. A front end keeps the returned state and
//! passes it back with the next action.

use crate::models::DocumentRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryFilter {
    #[default]
    All,
    #[value(name = "with")]
    WithSummary,
    #[value(name = "without")]
    WithoutSummary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortBy {
    #[default]
    IdDesc,
    IdAsc,
    Filename,
    #[value(name = "words")]
    WordsDesc,
    #[value(name = "chars")]
    CharsDesc,
}

/// Keep records whose filename contains `filename` (case-insensitive) and
/// that match the summary filter. An empty filename matches everything.
pub fn filter_records(
    records: Vec<DocumentRecord>,
    filename: &str,
    summary: SummaryFilter,
) -> Vec<DocumentRecord> {
    let needle = filename.trim().to_lowercase();
    records
        .into_iter()
        .filter(|r| needle.is_empty() || r.filename.to_lowercase().contains(&needle))
        .filter(|r| match summary {
            SummaryFilter::All => true,
            SummaryFilter::WithSummary => r.has_summary(),
            SummaryFilter::WithoutSummary => !r.has_summary(),
        })
        .collect()
}

/// Stable sort; ties keep their incoming order.
pub fn sort_records(mut records: Vec<DocumentRecord>, by: SortBy) -> Vec<DocumentRecord> {
    match by {
        SortBy::IdDesc => records.sort_by(|a, b| b.id.cmp(&a.id)),
        SortBy::IdAsc => records.sort_by_key(|r| r.id),
        SortBy::Filename => records.sort_by_key(|r| r.filename.to_lowercase()),
        SortBy::WordsDesc => records.sort_by(|a, b| b.word_count.cmp(&a.word_count)),
        SortBy::CharsDesc => records.sort_by(|a, b| b.character_length.cmp(&a.character_length)),
    }
    records
}

/// First `len` characters of a hash followed by `...`, or `N/A` when absent.
pub fn shorten_hash(hash: Option<&str>, len: usize) -> String {
    match hash {
        Some(h) if !h.is_empty() => {
            let head: String = h.chars().take(len).collect();
            if head.len() < h.len() {
                format!("{}...", head)
            } else {
                head
            }
        }
        _ => "N/A".to_string(),
    }
}

/// Two-step delete confirmation for one selected record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub selected: Option<i64>,
    pub pending: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteAction {
    Select(i64),
    RequestDelete(i64),
    Confirm(i64),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Ask the user to confirm deleting this record.
    Prompt(i64),
    Delete(i64),
}

impl DeleteConfirmation {
    pub fn apply(self, action: DeleteAction) -> (Self, Effect) {
        match action {
            DeleteAction::Select(id) => {
                let pending = if self.selected == Some(id) {
                    self.pending
                } else {
                    None
                };
                (
                    Self {
                        selected: Some(id),
                        pending,
                    },
                    Effect::None,
                )
            }
            DeleteAction::RequestDelete(id) => (
                Self {
                    selected: Some(id),
                    pending: Some(id),
                },
                Effect::Prompt(id),
            ),
            DeleteAction::Confirm(id) if self.pending == Some(id) => (
                Self {
                    selected: None,
                    pending: None,
                },
                Effect::Delete(id),
            ),
            DeleteAction::Confirm(_) => (self, Effect::None),
            DeleteAction::Cancel => (
                Self {
                    selected: self.selected,
                    pending: None,
                },
                Effect::None,
            ),
        }
    }
}
