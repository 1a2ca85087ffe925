//! Batch ingestion progress reporting.
//!
//! Reports observable progress during `ocrh ingest` so users see which file
//! is being processed and how many are left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchProgressEvent {
    /// Batch accepted with this many files.
    Started { total: u64 },
    /// File `n` of `total` finished with `status` (processed, skipped, failed).
    File {
        n: u64,
        total: u64,
        filename: String,
        status: &'static str,
    },
    /// Batch finished.
    Finished {
        successful: u64,
        skipped: u64,
        failed: u64,
    },
}

/// Reports batch progress. Implementations write to stderr (human or JSON).
pub trait BatchProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest pipeline.
    fn report(&self, event: BatchProgressEvent);
}

/// Human-friendly progress on stderr: "ingest  12 / 1,000  report.pdf  processed".
pub struct StderrProgress;

impl BatchProgressReporter for StderrProgress {
    fn report(&self, event: BatchProgressEvent) {
        let line = match &event {
            BatchProgressEvent::Started { total } => {
                format!("ingest  {} files\n", format_number(*total))
            }
            BatchProgressEvent::File {
                n,
                total,
                filename,
                status,
            } => format!(
                "ingest  {} / {}  {}  {}\n",
                format_number(*n),
                format_number(*total),
                filename,
                status
            ),
            BatchProgressEvent::Finished {
                successful,
                skipped,
                failed,
            } => format!(
                "ingest  done  {} processed, {} skipped, {} failed\n",
                successful, skipped, failed
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl BatchProgressReporter for JsonProgress {
    fn report(&self, event: BatchProgressEvent) {
        let obj = match &event {
            BatchProgressEvent::Started { total } => serde_json::json!({
                "event": "progress",
                "phase": "started",
                "total": total
            }),
            BatchProgressEvent::File {
                n,
                total,
                filename,
                status,
            } => serde_json::json!({
                "event": "progress",
                "phase": "file",
                "n": n,
                "total": total,
                "filename": filename,
                "status": status
            }),
            BatchProgressEvent::Finished {
                successful,
                skipped,
                failed,
            } => serde_json::json!({
                "event": "progress",
                "phase": "finished",
                "successful": successful,
                "skipped": skipped,
                "failed": failed
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl BatchProgressReporter for NoProgress {
    fn report(&self, _event: BatchProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller can pass it to ingest.
    pub fn reporter(&self) -> Box<dyn BatchProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_number_comma() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }
}
