//! Chunked document summarization.
//!
//! Per document the summarizer takes one of three paths:
//!
//! ```text
//! empty text ───────────────────────────────────────────▶ ""
//! fits budget ──▶ summarize directly ───────────────────▶ summary
//! over budget ──▶ chunk ─▶ summarize each ─▶ join ─┬─────▶ combined
//!                                                  └─ still over budget
//!                                                     ─▶ collapse once ─▶ summary
//! ```
//!
//! Every external call is bounded by `timeout_secs`, including any client
//! retries. When no client is
//! configured, or a call fails or times out, that one chunk falls back to a
//! truncated prefix of itself, so real summaries and fallbacks can coexist
//! in one combined result.

use std::sync::Arc;
use std::time::Duration;

use crate::chunk::{chunk_text, estimate_tokens};
use crate::config::{Config, LlmConfig, LlmOverrides, SummarizationConfig};
use crate::llm::{ChatClient, ChatRequest, OpenAiChatClient};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that creates concise summaries of text documents.";
const CHUNK_SEPARATOR: &str = "\n\n";

/// Which path a summarization took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryPath {
    /// Input was empty or whitespace; no calls were made.
    Empty,
    /// Input fit the budget and was summarized in one call.
    Direct,
    /// Input was chunked; `collapsed` is true when a final pass ran over the
    /// joined chunk summaries.
    Chunked { chunks: usize, collapsed: bool },
}

/// Result of summarizing one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryReport {
    pub summary: String,
    pub path: SummaryPath,
    /// Number of calls that fell back to truncation.
    pub fallbacks: usize,
}

/// Output of a single summarization call.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ChunkSummary {
    Generated(String),
    Fallback(String),
}

impl ChunkSummary {
    fn into_text(self) -> String {
        match self {
            ChunkSummary::Generated(s) | ChunkSummary::Fallback(s) => s,
        }
    }

    fn is_fallback(&self) -> bool {
        matches!(self, ChunkSummary::Fallback(_))
    }
}

pub struct Summarizer {
    client: Option<Arc<dyn ChatClient>>,
    max_tokens_per_chunk: usize,
    summary_max_tokens: u32,
    temperature: f32,
    timeout: Duration,
    fallback_chars: usize,
}

impl Summarizer {
    pub fn new(client: Option<Arc<dyn ChatClient>>, settings: &SummarizationConfig) -> Self {
        Self {
            client,
            max_tokens_per_chunk: settings.max_tokens_per_chunk,
            summary_max_tokens: settings.summary_max_tokens,
            temperature: settings.temperature,
            timeout: Duration::from_secs(settings.timeout_secs),
            fallback_chars: settings.fallback_chars,
        }
    }

    /// Resolve the LLM settings once and build a summarizer. Without a
    /// credential the summarizer runs in truncation-only mode.
    pub fn from_config(config: &Config, overrides: &LlmOverrides) -> anyhow::Result<Self> {
        let settings = &config.summarization;
        let llm = LlmConfig::resolve(&settings.llm_config_path, overrides);
        let client: Option<Arc<dyn ChatClient>> = if llm.has_credential() {
            tracing::info!(model = %llm.model, base_url = %llm.base_url, "summarization enabled");
            let client = OpenAiChatClient::new(&llm, settings)?;
            Some(Arc::new(client) as Arc<dyn ChatClient>)
        } else {
            tracing::warn!("API key not set, summaries will be truncated text");
            None
        };
        Ok(Self::new(client, settings))
    }

    pub async fn summarize(&self, text: &str) -> String {
        self.summarize_detailed(text).await.summary
    }

    pub async fn summarize_detailed(&self, text: &str) -> SummaryReport {
        if text.trim().is_empty() {
            tracing::warn!("empty text provided for summarization");
            return SummaryReport {
                summary: String::new(),
                path: SummaryPath::Empty,
                fallbacks: 0,
            };
        }

        let tokens = estimate_tokens(text);
        tracing::info!(chars = text.chars().count(), tokens, "starting summarization");

        if tokens <= self.max_tokens_per_chunk {
            let out = self.summarize_chunk(text).await;
            let fallbacks = usize::from(out.is_fallback());
            return SummaryReport {
                summary: out.into_text(),
                path: SummaryPath::Direct,
                fallbacks,
            };
        }

        let chunks = chunk_text(text, self.max_tokens_per_chunk);
        tracing::info!(chunks = chunks.len(), budget = self.max_tokens_per_chunk, "text chunked");

        let mut fallbacks = 0;
        let mut summaries = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            tracing::info!(chunk = i + 1, total = chunks.len(), "summarizing chunk");
            let out = self.summarize_chunk(chunk).await;
            if out.is_fallback() {
                fallbacks += 1;
            }
            summaries.push(out.into_text());
        }

        let combined = summaries.join(CHUNK_SEPARATOR);
        let combined_tokens = estimate_tokens(&combined);
        tracing::info!(chars = combined.chars().count(), tokens = combined_tokens, "combined chunk summaries");

        if combined_tokens <= self.max_tokens_per_chunk {
            return SummaryReport {
                summary: combined,
                path: SummaryPath::Chunked {
                    chunks: chunks.len(),
                    collapsed: false,
                },
                fallbacks,
            };
        }

        tracing::info!("combined summaries over budget, collapsing");
        let out = self.summarize_chunk(&combined).await;
        if out.is_fallback() {
            fallbacks += 1;
        }
        SummaryReport {
            summary: out.into_text(),
            path: SummaryPath::Chunked {
                chunks: chunks.len(),
                collapsed: true,
            },
            fallbacks,
        }
    }

    async fn summarize_chunk(&self, chunk: &str) -> ChunkSummary {
        let Some(client) = &self.client else {
            return ChunkSummary::Fallback(truncate_with_ellipsis(chunk, self.fallback_chars));
        };

        let request = ChatRequest {
            system: SYSTEM_PROMPT.to_string(),
            user: format!(
                "Please provide a concise summary of the following text:\n\n{}",
                chunk
            ),
            max_tokens: self.summary_max_tokens,
            temperature: self.temperature,
        };

        match tokio::time::timeout(self.timeout, client.complete(&request)).await {
            Ok(Ok(summary)) => {
                tracing::info!(
                    model = client.model_name(),
                    input_chars = chunk.chars().count(),
                    output_chars = summary.chars().count(),
                    "chunk summarized"
                );
                ChunkSummary::Generated(summary)
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "error summarizing chunk, using truncated text");
                ChunkSummary::Fallback(truncate_with_ellipsis(chunk, self.fallback_chars))
            }
            Err(_) => {
                tracing::error!(timeout_secs = self.timeout.as_secs(), "summarization timed out, using truncated text");
                ChunkSummary::Fallback(truncate_with_ellipsis(chunk, self.fallback_chars))
            }
        }
    }
}

/// The first `max_chars` characters followed by `...`, or the text unchanged
/// when it is not longer than `max_chars`.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
