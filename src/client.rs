//! Google Sheets API client behind a narrow trait

use async_trait::async_trait;
use google_sheets4::api::{BatchUpdateValuesRequest, BatchUpdateValuesResponse, ValueRange};
use tracing::debug;

use crate::auth::{SheetsHub, SHEETS_SCOPE};
use crate::error::Result;
use crate::models::CellUpdate;

/// Outcome reported by the API for one range of a batch write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeUpdate {
    pub range: String,
    pub updated_cells: u32,
}

/// What the API says a batch write changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchWriteResponse {
    /// Per-range results, in request order, when the API returns them
    pub responses: Vec<RangeUpdate>,
    pub total_updated_cells: Option<u32>,
}

/// Trait defining spreadsheet operations for easier testing
#[async_trait]
pub trait SheetsClient: Send + Sync {
    /// Read cell values for a range, one inner vec per row.
    /// Blank rows may come back as empty vecs; trailing blank rows are omitted.
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Write every update in a single API call
    async fn batch_write(&self, updates: &[CellUpdate]) -> Result<BatchWriteResponse>;
}

/// Sheets client bound to one spreadsheet
pub struct ProductionSheetsClient {
    hub: SheetsHub,
    spreadsheet_id: String,
}

impl ProductionSheetsClient {
    pub fn new(hub: SheetsHub, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            hub,
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }
}

#[async_trait]
impl SheetsClient for ProductionSheetsClient {
    async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>> {
        debug!("Reading range {} from spreadsheet {}", range, self.spreadsheet_id);

        let (_, value_range) = self
            .hub
            .spreadsheets()
            .values_get(&self.spreadsheet_id, range)
            .major_dimension("ROWS")
            .value_render_option("FORMATTED_VALUE")
            .add_scope(SHEETS_SCOPE)
            .doit()
            .await?;

        Ok(value_rows(value_range))
    }

    async fn batch_write(&self, updates: &[CellUpdate]) -> Result<BatchWriteResponse> {
        debug!(
            "Writing {} cells to spreadsheet {} in one batch",
            updates.len(),
            self.spreadsheet_id
        );

        let request = build_batch_request(updates);
        let (_, response) = self
            .hub
            .spreadsheets()
            .values_batch_update(request, &self.spreadsheet_id)
            .add_scope(SHEETS_SCOPE)
            .doit()
            .await?;

        Ok(parse_batch_response(response))
    }
}

fn build_batch_request(updates: &[CellUpdate]) -> BatchUpdateValuesRequest {
    let data = updates
        .iter()
        .map(|update| ValueRange {
            range: Some(update.range.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: Some(vec![vec![serde_json::Value::String(update.value.clone())]]),
            ..Default::default()
        })
        .collect();

    BatchUpdateValuesRequest {
        data: Some(data),
        value_input_option: Some("RAW".to_string()),
        ..Default::default()
    }
}

fn parse_batch_response(response: BatchUpdateValuesResponse) -> BatchWriteResponse {
    let responses = response
        .responses
        .unwrap_or_default()
        .into_iter()
        .map(|r| RangeUpdate {
            range: r.updated_range.unwrap_or_default(),
            updated_cells: r.updated_cells.unwrap_or(0).max(0) as u32,
        })
        .collect();

    BatchWriteResponse {
        responses,
        total_updated_cells: response.total_updated_cells.map(|n| n.max(0) as u32),
    }
}

fn value_rows(value_range: ValueRange) -> Vec<Vec<String>> {
    value_range
        .values
        .unwrap_or_default()
        .into_iter()
        .map(|row| row.into_iter().map(cell_text).collect())
        .collect()
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
