//! # OCR Harness
//!
//! A local PDF ingestion pipeline: OCR every page, store the text with
//! content-hash deduplication, and optionally attach an LLM summary.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────────────────────────┐   ┌──────────┐
//! │ PDF file │──▶│ hash → dup check → OCR →     │──▶│  SQLite  │
//! │ / upload │   │ metrics → [summarize]        │   │ documents│
//! └──────────┘   └──────────────────────────────┘   └────┬─────┘
//!                                                        │
//!                           ┌────────────────────────────┤
//!                           ▼                            ▼
//!                      ┌──────────┐                ┌──────────┐
//!                      │   CLI    │                │   HTTP   │
//!                      │  (ocrh)  │                │   API    │
//!                      └──────────┘                └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ocrh init                         # create database
//! ocrh ingest ./scans --summarize   # OCR every PDF in a directory
//! ocrh list --summary without       # records still lacking a summary
//! ocrh summarize --missing          # backfill them
//! ocrh serve                        # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and LLM endpoint resolution |
//! | [`models`] | Records, per-file outcomes, batch results |
//! | [`fingerprint`] | SHA-256 content hashes |
//! | [`store`] | Record store and duplicate guard |
//! | [`extract`] | Page rendering + OCR |
//! | [`metrics`] | Word and character counts |
//! | [`chunk`] | Token-budgeted text chunking |
//! | [`llm`] | Chat-completion client |
//! | [`summarize`] | Chunked summarization with fallback |
//! | [`ingest`] | Per-file and batch pipeline |
//! | [`scan`] | PDF discovery in directories |
//! | [`service`] | Document operations shared by CLI and server |
//! | [`server`] | JSON HTTP API |
//! | [`browse`] | Record filter/sort and delete confirmation |
//! | [`progress`] | Batch progress on stderr |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod browse;
pub mod chunk;
pub mod config;
pub mod db;
pub mod extract;
pub mod fingerprint;
pub mod ingest;
pub mod llm;
pub mod metrics;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod scan;
pub mod server;
pub mod service;
pub mod store;
pub mod summarize;
