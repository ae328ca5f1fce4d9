//! Common test utilities and fixtures

#![allow(dead_code)]

use async_trait::async_trait;
use book_genre_classifier::classifier::{GenreClassifier, ZeroShotModel};
use book_genre_classifier::client::{BatchWriteResponse, RangeUpdate, SheetsClient};
use book_genre_classifier::error::{GenreError, Result};
use book_genre_classifier::models::{CellUpdate, LabelScore};
use mockall::mock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

mock! {
    pub SheetsClient {}

    #[async_trait]
    impl SheetsClient for SheetsClient {
        async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>>;
        async fn batch_write(&self, updates: &[CellUpdate]) -> Result<BatchWriteResponse>;
    }
}

/// One API row holding a single cell; `""` stands for a blank row
pub fn column(cells: &[&str]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|cell| {
            if cell.is_empty() {
                Vec::new()
            } else {
                vec![cell.to_string()]
            }
        })
        .collect()
}

/// In-memory sheet: a title column and the label column next to it
pub struct FakeSheet {
    title_range: String,
    titles: Vec<Vec<String>>,
    label_range: String,
    labels: Vec<Vec<String>>,
    /// Rows whose updates the fake API reports as not applied
    unconfirmed_rows: Vec<u32>,
    batches: Mutex<Vec<Vec<CellUpdate>>>,
}

impl FakeSheet {
    pub fn new(title_range: &str, titles: &[&str]) -> Self {
        let label_range = title_range
            .parse::<book_genre_classifier::SheetRange>()
            .map(|r| r.output_range().to_string())
            .unwrap_or_default();
        Self {
            title_range: title_range.to_string(),
            titles: column(titles),
            label_range,
            labels: Vec::new(),
            unconfirmed_rows: Vec::new(),
            batches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_labels(mut self, labels: &[&str]) -> Self {
        self.labels = column(labels);
        self
    }

    pub fn with_unconfirmed_rows(mut self, rows: &[u32]) -> Self {
        self.unconfirmed_rows = rows.to_vec();
        self
    }

    /// Every batch_write call, in order
    pub fn batches(&self) -> Vec<Vec<CellUpdate>> {
        self.batches.lock().unwrap().clone()
    }

    /// Final cell contents keyed by A1 cell
    pub fn written_cells(&self) -> HashMap<String, String> {
        self.batches()
            .into_iter()
            .flatten()
            .filter(|u| !self.unconfirmed_rows.contains(&u.row))
            .map(|u| (u.range, u.value))
            .collect()
    }
}

#[async_trait]
impl SheetsClient for FakeSheet {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        if range == self.title_range {
            Ok(self.titles.clone())
        } else if range == self.label_range {
            Ok(self.labels.clone())
        } else {
            Err(GenreError::ApiError(format!("Unable to parse range: {}", range)))
        }
    }

    async fn batch_write(&self, updates: &[CellUpdate]) -> Result<BatchWriteResponse> {
        self.batches.lock().unwrap().push(updates.to_vec());
        let responses: Vec<RangeUpdate> = updates
            .iter()
            .map(|u| RangeUpdate {
                range: u.range.clone(),
                updated_cells: if self.unconfirmed_rows.contains(&u.row) { 0 } else { 1 },
            })
            .collect();
        let total = responses.iter().map(|r| r.updated_cells).sum();
        Ok(BatchWriteResponse {
            responses,
            total_updated_cells: Some(total),
        })
    }
}

/// Deterministic stand-in for the inference API.
///
/// Titles containing a fiction cue score high for fiction, titles with a
/// non-fiction cue score high for non-fiction, anything else is a coin toss.
/// Titles containing "ERROR" fail.
pub struct CueModel {
    calls: AtomicUsize,
}

impl CueModel {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

const FICTION_CUES: &[&str] = &["dragon", "murder", "novel", "tale"];
const NON_FICTION_CUES: &[&str] = &["history", "guide", "biology", "memoir"];

#[async_trait]
impl ZeroShotModel for CueModel {
    async fn score(&self, text: &str, candidate_labels: &[&str]) -> Result<Vec<LabelScore>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("ERROR") {
            return Err(GenreError::NetworkError("connection reset".to_string()));
        }

        let lower = text.to_lowercase();
        let (fiction, non_fiction) = if FICTION_CUES.iter().any(|c| lower.contains(c)) {
            (0.92, 0.08)
        } else if NON_FICTION_CUES.iter().any(|c| lower.contains(c)) {
            (0.11, 0.89)
        } else {
            (0.52, 0.48)
        };

        Ok(candidate_labels
            .iter()
            .map(|label| match *label {
                "fiction" => LabelScore::new(*label, fiction),
                _ => LabelScore::new(*label, non_fiction),
            })
            .collect())
    }
}

/// Classifier over [`CueModel`] at the default threshold
pub fn cue_classifier() -> GenreClassifier {
    GenreClassifier::new(Box::new(CueModel::new()), 0.6)
}
