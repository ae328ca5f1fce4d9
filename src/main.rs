use anyhow::Result;
use book_genre_classifier::cli::{self, Cli, Commands};
use book_genre_classifier::error::{format_rows, GenreError};
use book_genre_classifier::pipeline::{RunOptions, RunOutcome};
use clap::Parser;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const EXIT_SUCCESS: i32 = 0;
const EXIT_ABORTED: i32 = 1;
const EXIT_PARTIAL_FAILURE: i32 = 2;

/// Buffers one log line and prints it above the progress bars
struct ProgressLogWriter {
    multi: MultiProgress,
    buffer: Vec<u8>,
}

impl Write for ProgressLogWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            let msg = String::from_utf8_lossy(&self.buffer);
            let msg = msg.trim_end_matches('\n');
            if !msg.is_empty() {
                let _ = self.multi.println(msg);
            }
            self.buffer.clear();
        }
        Ok(())
    }
}

impl Drop for ProgressLogWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// MakeWriter implementation for tracing
#[derive(Clone)]
struct ProgressMakeWriter {
    multi: Arc<Mutex<MultiProgress>>,
}

impl<'a> MakeWriter<'a> for ProgressMakeWriter {
    type Writer = ProgressLogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        let multi = match self.multi.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        ProgressLogWriter {
            multi,
            buffer: Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            display_error(&e);
            process::exit(EXIT_ABORTED);
        }
    }
}

async fn run() -> Result<i32> {
    // Install default crypto provider for rustls
    // This is necessary because multiple dependencies use different crypto providers
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("book_genre_classifier=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("book_genre_classifier=info,warn"))
    };

    // Logs print above progress bars
    let multi_progress = MultiProgress::new();
    let make_writer = ProgressMakeWriter {
        multi: Arc::new(Mutex::new(multi_progress.clone())),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(make_writer)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match &cli.command {
        Commands::Run {
            dry_run,
            skip_labeled,
            report,
        } => {
            if *dry_run {
                println!("Running in DRY RUN mode - no cells will be written");
            }
            let options = RunOptions {
                dry_run: *dry_run,
                skip_labeled: *skip_labeled,
            };

            let run_report = cli::run(&cli, options, multi_progress).await?;

            println!("\n========================================");
            println!("Book Genre Classification Summary");
            println!("========================================");
            for line in run_report.summary_lines() {
                println!("{}", line);
            }
            println!("========================================");

            for failure in &run_report.classification_failures {
                eprintln!(
                    "Row {} ('{}') could not be classified: {}",
                    failure.row, failure.title, failure.message
                );
            }

            let outcome = run_report.outcome();
            if outcome == RunOutcome::PartialFailure {
                eprintln!(
                    "Partial failure: rows {} were not written. Re-run to retry them.",
                    format_rows(run_report.failed_rows())
                );
            }

            if let Some(path) = report {
                if cli::save_report(&run_report, path).await {
                    println!("Report saved to {:?}", path);
                }
            }

            match outcome {
                RunOutcome::Success => Ok(EXIT_SUCCESS),
                RunOutcome::PartialFailure => Ok(EXIT_PARTIAL_FAILURE),
            }
        }

        Commands::Classify { titles } => {
            let results = cli::classify_titles(&cli, titles).await?;
            let mut failed = false;
            for (title, outcome) in results {
                match outcome {
                    Ok(c) => println!(
                        "{:<12} {:.2}  {}",
                        c.genre.to_string(),
                        c.confidence,
                        title
                    ),
                    Err(e) => {
                        failed = true;
                        eprintln!("error        -     {} ({})", title, e);
                    }
                }
            }
            Ok(if failed { EXIT_PARTIAL_FAILURE } else { EXIT_SUCCESS })
        }

        Commands::Check => {
            let count = cli::check(&cli, multi_progress).await?;
            println!("Authenticated. {} titles would be classified.", count);
            Ok(EXIT_SUCCESS)
        }

        Commands::InitConfig { output, force } => {
            cli::init_config(output, *force).await?;
            println!("Created example configuration at {:?}", output);
            Ok(EXIT_SUCCESS)
        }
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(genre_err) = error.downcast_ref::<GenreError>() {
        match genre_err {
            GenreError::AuthError(_) => {
                eprintln!("\nHint: Check GOOGLE_CREDENTIALS_PATH points at a service account key");
                eprintln!("      and that the sheet is shared with the service account's email.");
            }
            GenreError::NotFound(_) => {
                eprintln!("\nHint: Check SPREADSHEET_ID and the sheet name in SHEET_RANGE.");
            }
            GenreError::ConfigError(_) | GenreError::InvalidRange { .. } => {
                eprintln!("\nHint: Required: GOOGLE_CREDENTIALS_PATH, SPREADSHEET_ID.");
                eprintln!("      Optional: SHEET_RANGE (e.g. Sheet1!A2:A), CONFIDENCE_THRESHOLD (0-1).");
            }
            GenreError::WriteError { rows, .. } => {
                eprintln!("\nNo labels were written. Rows affected: {}", format_rows(rows));
                eprintln!("      Re-run the command once the problem is resolved.");
            }
            GenreError::QuotaExceeded(_) => {
                eprintln!("\nHint: You've hit Sheets API quota. Wait a minute and try again.");
            }
            _ => {}
        }
    }
}
