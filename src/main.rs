//! # OCR Harness CLI (`ocrh`)
//!
//! ## Usage
//!
//! ```bash
//! ocrh --config ./config/ocrh.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ocrh init` | Create the SQLite database and run schema migrations |
//! | `ocrh ingest <paths..>` | OCR PDF files and directories into the store |
//! | `ocrh list` | Recent records with filtering and sorting |
//! | `ocrh get <id>` | Print one record in full |
//! | `ocrh summarize <id>` / `--missing` | (Re)generate summaries |
//! | `ocrh delete <id>` | Delete a record after confirmation |
//! | `ocrh stats` | Record, word and character totals |
//! | `ocrh check <file>` | Fingerprint a file and report whether it is stored |
//! | `ocrh serve` | Start the HTTP API |
//! | `ocrh settings show` / `set` | Inspect or persist LLM endpoint settings |
//!
//! Results go to stdout; logs and progress go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ocr_harness::browse::{
    filter_records, shorten_hash, sort_records, DeleteAction, DeleteConfirmation, Effect, SortBy,
    SummaryFilter,
};
use ocr_harness::config::{self, Config, LlmConfig, LlmOverrides};
use ocr_harness::fingerprint::fingerprint_file;
use ocr_harness::ingest::Ingestor;
use ocr_harness::models::DocumentRecord;
use ocr_harness::progress::ProgressMode;
use ocr_harness::service::DocumentService;
use ocr_harness::{migrate, scan, server};

/// OCR Harness CLI: OCR PDFs into a deduplicated SQLite store with
/// optional LLM summaries.
#[derive(Parser)]
#[command(
    name = "ocrh",
    about = "OCR Harness: OCR PDFs into a deduplicated store with optional LLM summaries",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ocrh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// OCR PDF files into the store.
    ///
    /// Directories are scanned for `*.pdf`. Files are processed one at a
    /// time in order; duplicates are skipped before OCR runs.
    Ingest {
        /// Files and/or directories.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Generate a summary for each new record.
        #[arg(long)]
        summarize: bool,

        /// Descend into subdirectories.
        #[arg(long)]
        recursive: bool,

        /// Progress output on stderr. Defaults to `human` on a terminal.
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Print the batch result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List recent records.
    List {
        #[arg(long, default_value_t = 10)]
        limit: i64,

        /// Case-insensitive filename substring.
        #[arg(long, default_value = "")]
        filter: String,

        #[arg(long, value_enum, default_value_t = SummaryFilter::All)]
        summary: SummaryFilter,

        #[arg(long, value_enum, default_value_t = SortBy::IdDesc)]
        sort: SortBy,

        #[arg(long)]
        json: bool,
    },

    /// Print a record with its full text.
    Get {
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Generate a summary for one record, or for every record without one.
    Summarize {
        #[arg(required_unless_present = "missing", conflicts_with = "missing")]
        id: Option<i64>,

        #[arg(long)]
        missing: bool,

        /// Maximum records to process with `--missing`.
        #[arg(long, default_value_t = 100)]
        limit: i64,
    },

    /// Delete a record.
    Delete {
        id: i64,

        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Show store totals.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// Fingerprint a file and report whether its content is already stored.
    Check { file: PathBuf },

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Inspect or persist LLM endpoint settings.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Subcommand)]
enum SettingsAction {
    /// Print the resolved settings with the API key masked.
    Show,
    /// Write settings to the LLM config file. Omitted fields are kept.
    Set {
        #[arg(long)]
        base_url: Option<String>,
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ocr_harness=info,ocrh=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest {
            paths,
            summarize,
            recursive,
            progress,
            json,
        } => {
            run_ingest(&cfg, &paths, summarize, recursive, progress, json).await?;
        }
        Commands::List {
            limit,
            filter,
            summary,
            sort,
            json,
        } => {
            let service = open_service(&cfg).await?;
            let records = service.list_recent(limit.clamp(1, 1000)).await?;
            let records = sort_records(filter_records(records, &filter, summary), sort);
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                print_record_table(&records);
            }
        }
        Commands::Get { id, json } => {
            let service = open_service(&cfg).await?;
            let record = service.get(id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                print_record(&record);
            }
        }
        Commands::Summarize { id, missing, limit } => {
            let service = open_service(&cfg).await?;
            if missing {
                run_summarize_missing(&service, limit).await?;
            } else if let Some(id) = id {
                let update = service.update_summary(id).await?;
                println!("{}", update.summary);
            }
        }
        Commands::Delete { id, yes } => {
            let service = open_service(&cfg).await?;
            run_delete(&service, id, yes).await?;
        }
        Commands::Stats { json } => {
            let service = open_service(&cfg).await?;
            let stats = service.stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("records:     {}", stats.total_records);
                println!("words:       {}", stats.total_words);
                println!("characters:  {}", stats.total_characters);
            }
        }
        Commands::Check { file } => {
            let hash = fingerprint_file(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let service = open_service(&cfg).await?;
            let duplicate = service.check_duplicate(&hash).await?;
            println!("{}  {}", hash, if duplicate { "duplicate" } else { "new" });
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => {
                let path = &cfg.summarization.llm_config_path;
                let llm = LlmConfig::resolve(path, &LlmOverrides::default());
                println!("config file: {}", path.display());
                println!("base_url:    {}", llm.base_url);
                println!("api_key:     {}", llm.masked_api_key());
                println!("model:       {}", llm.model);
            }
            SettingsAction::Set {
                base_url,
                api_key,
                model,
            } => {
                if let Some(url) = &base_url {
                    config::validate_base_url(url).map_err(anyhow::Error::msg)?;
                }
                let path = &cfg.summarization.llm_config_path;
                let mut file = config::load_llm_config_file(path).unwrap_or_default();
                if base_url.is_some() {
                    file.base_url = base_url;
                }
                if api_key.is_some() {
                    file.api_key = api_key;
                }
                if model.is_some() {
                    file.model = model;
                }
                config::save_llm_config(path, &file)?;
                println!("Settings saved to {}", path.display());
            }
        },
    }

    Ok(())
}

async fn open_service(cfg: &Config) -> anyhow::Result<DocumentService> {
    let ingestor = Ingestor::from_config(cfg, &LlmOverrides::default()).await?;
    Ok(DocumentService::new(ingestor))
}

async fn run_ingest(
    cfg: &Config,
    paths: &[PathBuf],
    summarize: bool,
    recursive: bool,
    progress: Option<ProgressMode>,
    json: bool,
) -> anyhow::Result<()> {
    let files = scan::collect_inputs(paths, recursive)?;
    if files.is_empty() {
        println!("No PDF files found.");
        return Ok(());
    }

    let ingestor = Ingestor::from_config(cfg, &LlmOverrides::default()).await?;
    let reporter = progress.unwrap_or_else(ProgressMode::default_for_tty).reporter();
    let batch = ingestor
        .process_batch(&files, summarize, reporter.as_ref())
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&batch)?);
        return Ok(());
    }

    for entry in batch.results() {
        let mark = if !entry.result.success() {
            "✗"
        } else if entry.result.skipped() {
            "-"
        } else {
            "✓"
        };
        println!("{} {}: {}", mark, entry.filename, entry.result.message());
    }
    println!(
        "{} processed, {} skipped, {} failed ({} total)",
        batch.successful(),
        batch.skipped(),
        batch.failed(),
        batch.total()
    );
    Ok(())
}

async fn run_summarize_missing(service: &DocumentService, limit: i64) -> anyhow::Result<()> {
    let records = service.list_missing_summary(limit.clamp(1, 1000)).await?;
    if records.is_empty() {
        println!("All records have summaries.");
        return Ok(());
    }

    let mut done = 0;
    for record in &records {
        match service.update_summary(record.id).await {
            Ok(_) => {
                done += 1;
                println!("✓ {} {}", record.id, record.filename);
            }
            Err(e) => println!("✗ {} {}: {}", record.id, record.filename, e),
        }
    }
    println!("{} of {} summaries generated", done, records.len());
    Ok(())
}

async fn run_delete(service: &DocumentService, id: i64, yes: bool) -> anyhow::Result<()> {
    let record = service.get(id).await?;

    let (state, effect) = DeleteConfirmation::default().apply(DeleteAction::RequestDelete(id));
    let action = match effect {
        Effect::Prompt(_) if !yes => {
            if confirm(&format!("Delete record {} ({})?", id, record.filename))? {
                DeleteAction::Confirm(id)
            } else {
                DeleteAction::Cancel
            }
        }
        _ => DeleteAction::Confirm(id),
    };

    match state.apply(action).1 {
        Effect::Delete(id) => {
            service.delete(id).await?;
            println!("Deleted record {}.", id);
        }
        _ => println!("Cancelled."),
    }
    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    eprint!("{} [y/N] ", question);
    std::io::stderr().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn print_record_table(records: &[DocumentRecord]) {
    if records.is_empty() {
        println!("No records found.");
        return;
    }
    println!(
        "{:>6}  {:<32}  {:>8}  {:>10}  {:<11}  {:<7}  created",
        "id", "filename", "words", "chars", "hash", "summary"
    );
    for r in records {
        println!(
            "{:>6}  {:<32}  {:>8}  {:>10}  {:<11}  {:<7}  {}",
            r.id,
            r.filename,
            r.word_count,
            r.character_length,
            shorten_hash(r.content_hash.as_deref(), 8),
            if r.has_summary() { "yes" } else { "no" },
            r.created_at_iso()
        );
    }
}

fn print_record(record: &DocumentRecord) {
    println!("id:         {}", record.id);
    println!("filename:   {}", record.filename);
    println!("created:    {}", record.created_at_iso());
    println!(
        "hash:       {}",
        record.content_hash.as_deref().unwrap_or("N/A")
    );
    println!("words:      {}", record.word_count);
    println!("characters: {}", record.character_length);
    println!();
    println!("--- summary ---");
    println!("{}", record.summary.as_deref().unwrap_or("(none)"));
    println!();
    println!("--- text ---");
    println!("{}", record.extracted_text.as_deref().unwrap_or(""));
}
