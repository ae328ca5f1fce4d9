//! Book Genre Classifier
//!
//! Reads book titles from a column of a Google Sheet, classifies each one as
//! fiction or non-fiction with a zero-shot model, and writes the label into
//! the column immediately to the right of the title.
//!
//! # Overview
//!
//! - **Authentication**: service account credentials, spreadsheets scope
//! - **Reading**: titles from an A1 range, blank rows skipped, sheet rows kept
//! - **Classification**: zero-shot inference with a confidence threshold and
//!   optional keyword rules
//! - **Writing**: one batched update per run, with per-row reconciliation
//!
//! # Example Usage
//!
//! ```no_run
//! use book_genre_classifier::{auth, cli, config::Config};
//! use book_genre_classifier::client::ProductionSheetsClient;
//! use book_genre_classifier::pipeline::{run_pipeline, ProgressReporter, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // GOOGLE_CREDENTIALS_PATH, SPREADSHEET_ID, SHEET_RANGE, CONFIDENCE_THRESHOLD
//!     let config = Config::load("genre.toml".as_ref()).await?;
//!
//!     let hub = auth::initialize_sheets_hub(&config.credentials_path).await?;
//!     let client = ProductionSheetsClient::new(hub, config.spreadsheet_id.clone());
//!     let classifier = cli::build_classifier(&config.classifier, config.confidence_threshold)?;
//!
//!     let report = run_pipeline(
//!         &client,
//!         &config.sheet_range,
//!         &classifier,
//!         &RunOptions::default(),
//!         &ProgressReporter::hidden(),
//!     )
//!     .await?;
//!     println!("{} rows written", report.rows_written());
//!     Ok(())
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - Service account authentication and Sheets hub setup
//! - [`client`] - Sheets API client trait and production implementation
//! - [`classifier`] - Zero-shot genre classification and keyword rules
//! - [`cli`] - Command-line interface
//! - [`config`] - Environment and file configuration
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures
//! - [`pipeline`] - Read, classify, write orchestration and run reports
//! - [`range`] - A1 range parsing and output column arithmetic
//! - [`reader`] - Title extraction from the sheet
//! - [`writer`] - Batched label writes

pub mod auth;
pub mod classifier;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod range;
pub mod reader;
pub mod writer;

pub use error::{GenreError, Result};

pub use models::{CellUpdate, Classification, ClassificationSource, Genre, LabelScore, TitleRecord};

pub use classifier::{GenreClassifier, HuggingFaceModel, KeywordRules, ZeroShotModel};

pub use config::{ClassifierConfig, Config, FileConfig};

pub use client::{BatchWriteResponse, ProductionSheetsClient, SheetsClient};

pub use range::SheetRange;

pub use reader::TitleReader;
pub use writer::{GenreWriter, WriteSummary};

pub use pipeline::{run_pipeline, ProgressReporter, RunOptions, RunOutcome, RunReport};

pub use cli::{Cli, Commands};
