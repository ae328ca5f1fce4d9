//! Writes genre labels into the column next to the titles
use crate::client::{BatchWriteResponse, SheetsClient};
use crate::error::Result;
use crate::models::{CellUpdate, Classification};
use crate::range::SheetRange;
use tracing::{info, warn};

/// What happened to one batched write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows_written: Vec<u32>,
    pub rows_failed: Vec<u32>,
}

impl WriteSummary {
    pub fn is_complete(&self) -> bool {
        self.rows_failed.is_empty()
    }
}

pub struct GenreWriter<'a> {
    client: &'a dyn SheetsClient,
    range: &'a SheetRange,
}

impl<'a> GenreWriter<'a> {
    pub fn new(client: &'a dyn SheetsClient, range: &'a SheetRange) -> Self {
        Self { client, range }
    }

    /// One cell update per result, in result order
    pub fn plan(&self, results: &[Classification]) -> Vec<CellUpdate> {
        results
            .iter()
            .map(|result| CellUpdate {
                row: result.row,
                range: self.range.output_cell(result.row),
                value: result.genre.to_string(),
            })
            .collect()
    }

    /// Write every label in a single batch call.
    ///
    /// A rejected batch comes back as `WriteError` naming every row (or
    /// `AuthError`); rows the API did not confirm are listed in
    /// `rows_failed`.
    pub async fn write(&self, results: &[Classification]) -> Result<WriteSummary> {
        if results.is_empty() {
            info!("Nothing to write");
            return Ok(WriteSummary::default());
        }

        let updates = self.plan(results);
        let response = self
            .client
            .batch_write(&updates)
            .await
            .map_err(|e| e.into_write_error(updates.iter().map(|u| u.row).collect()))?;

        let summary = reconcile(&updates, &response);
        if summary.is_complete() {
            info!(
                "Wrote {} labels to column {}",
                summary.rows_written.len(),
                self.range.output_column()
            );
        } else {
            warn!(
                "Wrote {} labels, {} rows were not confirmed by the API",
                summary.rows_written.len(),
                summary.rows_failed.len()
            );
        }
        Ok(summary)
    }
}

/// Match API-reported results back to rows
fn reconcile(updates: &[CellUpdate], response: &BatchWriteResponse) -> WriteSummary {
    let mut summary = WriteSummary::default();

    if response.responses.is_empty() {
        // No per-range detail: trust the total, all or nothing
        let confirmed = response
            .total_updated_cells
            .map_or(false, |total| total as usize >= updates.len());
        for update in updates {
            if confirmed {
                summary.rows_written.push(update.row);
            } else {
                summary.rows_failed.push(update.row);
            }
        }
        return summary;
    }

    for (i, update) in updates.iter().enumerate() {
        match response.responses.get(i) {
            Some(r) if r.updated_cells > 0 => summary.rows_written.push(update.row),
            _ => summary.rows_failed.push(update.row),
        }
    }
    summary
}
