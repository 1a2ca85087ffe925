//! Paragraph-then-sentence text chunker for summarization.
//!
//! Token counts are estimated as `chars / 4` (integer division). This is a
//! stand-in for a real tokenizer and is kept fixed so chunk boundaries are
//! reproducible.
//!
//! Splitting is greedy: paragraphs (`\n\n`) are accumulated while the
//! running estimate fits the budget. A paragraph that alone exceeds the
//! budget is split on `". "` with the same greedy rule. A single sentence
//! that is still too long is emitted whole, never truncated.

/// Approximate chars-per-token ratio.
pub const CHARS_PER_TOKEN: usize = 4;

const PARAGRAPH_SEP: &str = "\n\n";
const SENTENCE_SEP: &str = ". ";

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Split text into chunks whose estimated token count fits `max_tokens`.
/// Text that already fits is returned unchanged as a single chunk.
pub fn chunk_text(text: &str, max_tokens: usize) -> Vec<String> {
    if estimate_tokens(text) <= max_tokens {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split(PARAGRAPH_SEP) {
        let candidate = join_nonempty(&current, PARAGRAPH_SEP, paragraph);
        if estimate_tokens(&candidate) <= max_tokens {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if estimate_tokens(paragraph) > max_tokens {
            chunks.extend(split_sentences(paragraph, max_tokens));
        } else {
            current = paragraph.to_string();
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

fn split_sentences(paragraph: &str, max_tokens: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for sentence in paragraph.split(SENTENCE_SEP) {
        let candidate = join_nonempty(&current, SENTENCE_SEP, sentence);
        if estimate_tokens(&candidate) <= max_tokens {
            current = candidate;
        } else {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            current = sentence.to_string();
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn join_nonempty(head: &str, sep: &str, tail: &str) -> String {
    if head.is_empty() {
        tail.to_string()
    } else {
        let mut s = String::with_capacity(head.len() + sep.len() + tail.len());
        s.push_str(head);
        s.push_str(sep);
        s.push_str(tail);
        s
    }
}
