//! Command-line interface

use clap::{Parser, Subcommand};
use indicatif::MultiProgress;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::auth;
use crate::classifier::{GenreClassifier, HuggingFaceModel};
use crate::client::ProductionSheetsClient;
use crate::config::{self, ClassifierConfig, Config, FileConfig};
use crate::error::{GenreError, Result};
use crate::models::Classification;
use crate::pipeline::{run_pipeline, ProgressReporter, RunOptions, RunReport};
use crate::reader::TitleReader;

#[derive(Parser, Debug)]
#[command(name = "book-genres")]
#[command(version)]
#[command(about = "Classify book titles in a Google Sheet as fiction or non-fiction", long_about = None)]
pub struct Cli {
    /// Path to the optional classifier configuration file
    #[arg(short, long, default_value = "genre.toml")]
    pub config: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify every title in the configured range and write the labels back
    Run {
        /// Classify but don't write anything to the sheet
        #[arg(long)]
        dry_run: bool,

        /// Leave rows that already have fiction/non-fiction in the label column
        #[arg(long)]
        skip_labeled: bool,

        /// Write a Markdown report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Classify titles given on the command line, without touching the sheet
    Classify {
        /// Titles to classify
        #[arg(required = true)]
        titles: Vec<String>,
    },

    /// Authenticate and count the titles the run would process
    Check,

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "genre.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Build the classifier from configuration
pub fn build_classifier(config: &ClassifierConfig, threshold: f32) -> Result<GenreClassifier> {
    let model = HuggingFaceModel::new(config)?;
    Ok(GenreClassifier::new(Box::new(model), threshold).with_keyword_rules(config.keyword_rules))
}

/// Authenticate with the service account and bind a client to the spreadsheet
pub async fn connect(config: &Config, reporter: &ProgressReporter) -> Result<ProductionSheetsClient> {
    let spinner = reporter.add_spinner("Authenticating with Google Sheets...");
    let account = auth::inspect_credentials(&config.credentials_path).await?;
    let hub = auth::initialize_sheets_hub(&config.credentials_path).await?;
    reporter.finish_spinner(
        &spinner,
        &format!("Authenticated as {}", account.client_email),
    );
    Ok(ProductionSheetsClient::new(hub, config.spreadsheet_id.clone()))
}

/// Configure → authenticate → run the pipeline
pub async fn run(cli: &Cli, options: RunOptions, multi: MultiProgress) -> Result<RunReport> {
    let reporter = ProgressReporter::new(multi);

    let config_spinner = reporter.add_spinner("Loading configuration...");
    let config = Config::load(&cli.config).await?;
    reporter.finish_spinner(
        &config_spinner,
        &format!(
            "Configuration loaded (range {}, threshold {:.2})",
            config.sheet_range, config.confidence_threshold
        ),
    );

    let client = connect(&config, &reporter).await?;
    let classifier = build_classifier(&config.classifier, config.confidence_threshold)?;

    run_pipeline(&client, &config.sheet_range, &classifier, &options, &reporter).await
}

/// Classify free-standing titles; needs only the classifier settings
pub async fn classify_titles(
    cli: &Cli,
    titles: &[String],
) -> Result<Vec<(String, Result<Classification>)>> {
    config::load_dotenv();
    let mut file = FileConfig::load(&cli.config).await?;
    file.classifier.apply_env(|key| env::var(key).ok());
    file.classifier.validate()?;
    let threshold = config::threshold_from_lookup(|key| env::var(key).ok())?;

    let classifier = build_classifier(&file.classifier, threshold)?;
    let mut results = Vec::with_capacity(titles.len());
    for (i, title) in titles.iter().enumerate() {
        let outcome = classifier.classify(i as u32 + 1, title).await;
        results.push((title.clone(), outcome));
    }
    Ok(results)
}

/// Save the Markdown report. A failure is logged and does not change the
/// run's outcome.
pub async fn save_report(report: &RunReport, path: &Path) -> bool {
    match report.save(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Could not save report to {:?}: {}", path, e);
            false
        }
    }
}

/// Authenticate and read the range without classifying or writing
pub async fn check(cli: &Cli, multi: MultiProgress) -> Result<usize> {
    let reporter = ProgressReporter::new(multi);
    let config = Config::load(&cli.config).await?;
    let client = connect(&config, &reporter).await?;

    let records = TitleReader::new(&client, &config.sheet_range)
        .read_titles()
        .await?;
    info!(
        "Spreadsheet {} range {} holds {} titles",
        client.spreadsheet_id(),
        config.sheet_range,
        records.len()
    );
    Ok(records.len())
}

/// Write an example config file, refusing to clobber one unless forced
pub async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        return Err(GenreError::ConfigError(format!(
            "{:?} already exists (use --force to overwrite)",
            output
        )));
    }
    FileConfig::create_example(output).await
}
