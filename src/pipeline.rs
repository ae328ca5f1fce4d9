//! Read → classify → write orchestration and the run report

use chrono::{DateTime, Utc};
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::classifier::GenreClassifier;
use crate::client::SheetsClient;
use crate::error::{format_rows, Result};
use crate::models::{Classification, ClassificationSource, Genre, TitleRecord};
use crate::range::SheetRange;
use crate::reader::TitleReader;
use crate::writer::{GenreWriter, WriteSummary};

/// Truncate a string to max_len characters, adding "..." if truncated
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len.saturating_sub(3)).collect::<String>())
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>5}/{len:5} {msg}")
            .unwrap()
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    /// Reporter that draws nothing
    pub fn hidden() -> Self {
        Self::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden()))
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Classify but do not write
    pub dry_run: bool,
    /// Leave rows that already carry fiction/non-fiction alone
    pub skip_labeled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    PartialFailure,
}

/// A title that could not be classified and was written as unknown
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row: u32,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ReportRow {
    pub record: TitleRecord,
    pub classification: Classification,
}

#[derive(Debug)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub range: String,
    pub dry_run: bool,
    pub titles_read: usize,
    pub skipped_labeled: usize,
    pub rows: Vec<ReportRow>,
    pub classification_failures: Vec<RowFailure>,
    /// `None` in dry-run mode or when there was nothing to write
    pub write: Option<WriteSummary>,
}

impl RunReport {
    pub fn outcome(&self) -> RunOutcome {
        match &self.write {
            Some(summary) if !summary.is_complete() => RunOutcome::PartialFailure,
            _ => RunOutcome::Success,
        }
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.completed_at - self.started_at).num_seconds()
    }

    pub fn failed_rows(&self) -> &[u32] {
        self.write
            .as_ref()
            .map(|w| w.rows_failed.as_slice())
            .unwrap_or(&[])
    }

    pub fn rows_written(&self) -> usize {
        self.write.as_ref().map_or(0, |w| w.rows_written.len())
    }

    /// Count of results per label, always listing all three
    pub fn genre_counts(&self) -> BTreeMap<Genre, usize> {
        let mut counts: BTreeMap<Genre, usize> =
            [Genre::Fiction, Genre::NonFiction, Genre::Unknown]
                .into_iter()
                .map(|g| (g, 0))
                .collect();
        for row in &self.rows {
            *counts.entry(row.classification.genre).or_insert(0) += 1;
        }
        counts
    }

    pub fn keyword_matches(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.classification.source == ClassificationSource::KeywordRule)
            .count()
    }

    /// Short console summary
    pub fn summary_lines(&self) -> Vec<String> {
        let counts = self.genre_counts();
        let mut lines = vec![
            format!("Run ID: {}", self.run_id),
            format!("Range: {}", self.range),
            format!("Duration: {} seconds", self.duration_seconds()),
            format!("Titles read: {}", self.titles_read),
        ];
        if self.skipped_labeled > 0 {
            lines.push(format!("Already labelled (skipped): {}", self.skipped_labeled));
        }
        for (genre, count) in &counts {
            lines.push(format!("  {}: {}", genre, count));
        }
        if !self.classification_failures.is_empty() {
            lines.push(format!(
                "Classification failures (written as unknown): {}",
                self.classification_failures.len()
            ));
        }
        if self.dry_run {
            lines.push("Dry run: nothing was written".to_string());
        } else {
            lines.push(format!("Rows written: {}", self.rows_written()));
            if !self.failed_rows().is_empty() {
                lines.push(format!("Rows failed: {}", format_rows(self.failed_rows())));
            }
        }
        lines
    }

    /// Generate Markdown report
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        if self.dry_run {
            md.push_str("# Book Genre Report (DRY RUN)\n\n");
            md.push_str("> No cells were written. This report shows the labels that WOULD be written.\n\n");
        } else {
            md.push_str("# Book Genre Report\n\n");
        }
        md.push_str(&format!(
            "Generated: {}\n\n",
            self.completed_at.format("%Y-%m-%d %H:%M:%S")
        ));

        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Run ID:** {}\n", self.run_id));
        md.push_str(&format!("- **Range:** `{}`\n", self.range));
        md.push_str(&format!("- **Titles read:** {}\n", self.titles_read));
        if self.skipped_labeled > 0 {
            md.push_str(&format!("- **Skipped (already labelled):** {}\n", self.skipped_labeled));
        }
        let total = self.rows.len().max(1) as f32;
        for (genre, count) in self.genre_counts() {
            md.push_str(&format!(
                "- **{}:** {} ({:.1}%)\n",
                genre,
                count,
                count as f32 * 100.0 / total
            ));
        }
        if self.keyword_matches() > 0 {
            md.push_str(&format!("- **Decided by keyword rules:** {}\n", self.keyword_matches()));
        }
        if !self.dry_run {
            md.push_str(&format!("- **Rows written:** {}\n", self.rows_written()));
        }
        md.push('\n');

        if !self.rows.is_empty() {
            md.push_str("## Classifications\n\n");
            md.push_str("| Row | Title | Label | Confidence |\n");
            md.push_str("|-----|-------|-------|------------|\n");
            for row in &self.rows {
                let title = truncate_string(&row.record.title, 60).replace('|', "\\|");
                md.push_str(&format!(
                    "| {} | {} | {} | {:.2} |\n",
                    row.record.row, title, row.classification.genre, row.classification.confidence
                ));
            }
            md.push('\n');
        }

        if !self.classification_failures.is_empty() {
            md.push_str("## Classification Failures\n\n");
            for failure in &self.classification_failures {
                md.push_str(&format!(
                    "- Row {} (`{}`): {}\n",
                    failure.row,
                    truncate_string(&failure.title, 60),
                    failure.message
                ));
            }
            md.push('\n');
        }

        if !self.failed_rows().is_empty() {
            md.push_str("## Write Failures\n\n");
            md.push_str(&format!(
                "The following rows were not written and need a re-run: {}\n\n",
                format_rows(self.failed_rows())
            ));
        }

        if self.dry_run {
            md.push_str("---\n\n");
            md.push_str("_To write these labels, run the command again without the `--dry-run` flag._\n");
        }

        md
    }

    /// Save report to file
    pub async fn save(&self, path: &std::path::Path) -> std::io::Result<()> {
        tokio::fs::write(path, self.to_markdown()).await
    }
}

/// Classify every record in order. Failures are logged, recorded and
/// degraded to `unknown` with confidence 0.
pub async fn classify_all(
    records: &[TitleRecord],
    classifier: &GenreClassifier,
    progress: &ProgressBar,
) -> (Vec<Classification>, Vec<RowFailure>) {
    let mut results = Vec::with_capacity(records.len());
    let mut failures = Vec::new();

    for record in records {
        progress.set_message(truncate_string(&record.title, 40));
        match classifier.classify(record.row, &record.title).await {
            Ok(classification) => results.push(classification),
            Err(e) => {
                warn!("Row {} ('{}') marked unknown: {}", record.row, record.title, e);
                failures.push(RowFailure {
                    row: record.row,
                    title: record.title.clone(),
                    message: e.to_string(),
                });
                results.push(Classification::failed(record.row));
            }
        }
        progress.inc(1);
    }

    (results, failures)
}

/// Run the batch job against an already-authenticated client
///
/// Steps:
/// 1. Read titles from the configured range (blank rows dropped)
/// 2. Optionally drop rows that already carry a label
/// 3. Classify each title in sheet order
/// 4. Write all labels in one batch (unless dry run)
///
/// # Returns
/// * `Ok(RunReport)` - Success or partial failure, see [`RunReport::outcome`]
/// * `Err(GenreError)` - Fatal error; nothing was written
pub async fn run_pipeline(
    client: &dyn SheetsClient,
    range: &SheetRange,
    classifier: &GenreClassifier,
    options: &RunOptions,
    reporter: &ProgressReporter,
) -> Result<RunReport> {
    let started_at = Utc::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    info!("Starting run {} on {}", run_id, range);

    let reader = TitleReader::new(client, range);

    let read_spinner = reporter.add_spinner(&format!("Reading titles from {}...", range));
    let mut records = reader.read_titles().await?;
    let titles_read = records.len();
    reporter.finish_spinner(&read_spinner, &format!("Read {} titles", titles_read));

    let mut skipped_labeled = 0;
    if options.skip_labeled && !records.is_empty() {
        let existing = reader.read_existing_labels().await?;
        let (kept, skipped) = TitleReader::without_labeled(records, &existing);
        records = kept;
        skipped_labeled = skipped;
        info!("Skipping {} rows that already have a label", skipped);
    }

    let classify_bar = reporter.add_progress_bar(records.len() as u64, "Classifying...");
    let (results, classification_failures) = classify_all(&records, classifier, &classify_bar).await;
    classify_bar.finish_and_clear();
    info!(
        "Classified {} titles ({} failures)",
        results.len(),
        classification_failures.len()
    );

    let write = if options.dry_run {
        info!("Dry run: skipping write of {} labels", results.len());
        None
    } else if results.is_empty() {
        None
    } else {
        let write_spinner = reporter.add_spinner(&format!(
            "Writing {} labels to column {}...",
            results.len(),
            range.output_column()
        ));
        let summary = GenreWriter::new(client, range).write(&results).await;
        write_spinner.finish_and_clear();
        Some(summary?)
    };

    let rows = records
        .into_iter()
        .zip(results)
        .map(|(record, classification)| ReportRow {
            record,
            classification,
        })
        .collect();

    Ok(RunReport {
        run_id,
        started_at,
        completed_at: Utc::now(),
        range: range.to_string(),
        dry_run: options.dry_run,
        titles_read,
        skipped_labeled,
        rows,
        classification_failures,
        write,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(write: Option<WriteSummary>) -> RunReport {
        let now = Utc::now();
        RunReport {
            run_id: "run-1".to_string(),
            started_at: now,
            completed_at: now,
            range: "Sheet1!A2:A".to_string(),
            dry_run: write.is_none(),
            titles_read: 2,
            skipped_labeled: 0,
            rows: vec![
                ReportRow {
                    record: TitleRecord::new(2, "Dune | Part One"),
                    classification: Classification {
                        row: 2,
                        genre: Genre::Fiction,
                        confidence: 0.91,
                        source: ClassificationSource::Model,
                    },
                },
                ReportRow {
                    record: TitleRecord::new(3, "Mystery Title"),
                    classification: Classification::failed(3),
                },
            ],
            classification_failures: vec![RowFailure {
                row: 3,
                title: "Mystery Title".to_string(),
                message: "model timed out".to_string(),
            }],
            write,
        }
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("a very long title indeed", 10), "a very ...");
    }

    #[test]
    fn test_outcome() {
        let complete = WriteSummary {
            rows_written: vec![2, 3],
            rows_failed: vec![],
        };
        assert_eq!(report_with(Some(complete)).outcome(), RunOutcome::Success);

        let partial = WriteSummary {
            rows_written: vec![2],
            rows_failed: vec![3],
        };
        let report = report_with(Some(partial));
        assert_eq!(report.outcome(), RunOutcome::PartialFailure);
        assert_eq!(report.failed_rows(), &[3]);

        assert_eq!(report_with(None).outcome(), RunOutcome::Success);
    }

    #[test]
    fn test_genre_counts_lists_every_label() {
        let counts = report_with(None).genre_counts();
        assert_eq!(counts.len(), 3);
        assert_eq!(counts[&Genre::Fiction], 1);
        assert_eq!(counts[&Genre::NonFiction], 0);
        assert_eq!(counts[&Genre::Unknown], 1);
    }

    #[test]
    fn test_markdown_report() {
        let partial = WriteSummary {
            rows_written: vec![2],
            rows_failed: vec![3],
        };
        let md = report_with(Some(partial)).to_markdown();
        assert!(md.starts_with("# Book Genre Report\n"));
        assert!(md.contains("| 2 | Dune \\| Part One | fiction | 0.91 |"));
        assert!(md.contains("## Classification Failures"));
        assert!(md.contains("model timed out"));
        assert!(md.contains("need a re-run: 3"));

        let dry = report_with(None).to_markdown();
        assert!(dry.contains("(DRY RUN)"));
        assert!(!dry.contains("Rows written"));
    }

    #[test]
    fn test_summary_lines() {
        let partial = WriteSummary {
            rows_written: vec![2],
            rows_failed: vec![3],
        };
        let lines = report_with(Some(partial)).summary_lines();
        assert!(lines.iter().any(|l| l == "Rows written: 1"));
        assert!(lines.iter().any(|l| l == "Rows failed: 3"));
        assert!(lines.iter().any(|l| l.contains("written as unknown): 1")));
    }

    #[tokio::test]
    async fn test_save_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        report_with(None).save(&path).await.unwrap();
        let content = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(content.contains("run-1"));
    }
}
