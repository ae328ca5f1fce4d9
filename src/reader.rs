//! Reads book titles (and any labels already written) from the sheet
use crate::client::SheetsClient;
use crate::error::{GenreError, Result};
use crate::models::{Genre, TitleRecord};
use crate::range::SheetRange;
use std::collections::HashMap;
use tracing::{debug, info};

pub struct TitleReader<'a> {
    client: &'a dyn SheetsClient,
    range: &'a SheetRange,
}

impl<'a> TitleReader<'a> {
    pub fn new(client: &'a dyn SheetsClient, range: &'a SheetRange) -> Self {
        Self { client, range }
    }

    /// Fetch the title column, dropping blank cells.
    ///
    /// Row numbers follow the sheet: the i-th row returned by the API is
    /// `start_row + i`, whether or not earlier rows were blank.
    pub async fn read_titles(&self) -> Result<Vec<TitleRecord>> {
        let rows = self.fetch(&self.range.to_string()).await?;
        let total = rows.len();

        let records: Vec<TitleRecord> = rows
            .into_iter()
            .enumerate()
            .filter_map(|(offset, cells)| {
                let row = self.range.row_at(offset);
                match first_cell(&cells) {
                    Some(title) => Some(TitleRecord::new(row, title)),
                    None => {
                        debug!("Skipping blank row {}", row);
                        None
                    }
                }
            })
            .collect();

        info!(
            "Read {} titles from {} ({} blank rows skipped)",
            records.len(),
            self.range,
            total - records.len()
        );
        Ok(records)
    }

    /// Labels already present in the adjacent column, keyed by row
    pub async fn read_existing_labels(&self) -> Result<HashMap<u32, String>> {
        let output = self.range.output_range();
        let rows = self.fetch(&output.to_string()).await?;

        Ok(rows
            .into_iter()
            .enumerate()
            .filter_map(|(offset, cells)| {
                first_cell(&cells).map(|label| (output.row_at(offset), label))
            })
            .collect())
    }

    /// Drop records whose adjacent cell already carries a definite genre.
    /// Rows labelled `unknown` are kept so they get another chance.
    pub fn without_labeled(
        records: Vec<TitleRecord>,
        existing: &HashMap<u32, String>,
    ) -> (Vec<TitleRecord>, usize) {
        let before = records.len();
        let kept: Vec<TitleRecord> = records
            .into_iter()
            .filter(|record| match existing.get(&record.row) {
                Some(label) => {
                    let relabel = matches!(label.parse::<Genre>(), Ok(Genre::Unknown));
                    if !relabel {
                        debug!("Row {} already labelled '{}', skipping", record.row, label);
                    }
                    relabel
                }
                None => true,
            })
            .collect();
        let skipped = before - kept.len();
        (kept, skipped)
    }

    async fn fetch(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.client.read_range(range).await.map_err(|e| match e {
            GenreError::ApiError(ref msg) if msg.to_lowercase().contains("unable to parse range") => {
                GenreError::NotFound(format!("Range {} does not resolve: {}", range, msg))
            }
            other => other,
        })
    }
}

fn first_cell(cells: &[String]) -> Option<String> {
    cells
        .first()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::BatchWriteResponse;
    use crate::models::CellUpdate;
    use async_trait::async_trait;
    use mockall::predicate::*;

    mockall::mock! {
        pub TestSheetsClient {}

        #[async_trait]
        impl SheetsClient for TestSheetsClient {
            async fn read_range(&self, range: &str) -> Result<Vec<Vec<String>>>;
            async fn batch_write(&self, updates: &[CellUpdate]) -> Result<BatchWriteResponse>;
        }
    }

    fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
        values
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[tokio::test]
    async fn test_read_titles_skips_blank_rows_and_keeps_alignment() {
        let mut client = MockTestSheetsClient::new();
        client
            .expect_read_range()
            .with(eq("Sheet1!E2:E"))
            .times(1)
            .returning(|_| {
                Ok(rows(&[
                    &["The Lord of the Rings"],
                    &[],
                    &["   "],
                    &["  A Brief History of Time  "],
                    &[""],
                    &["Dune"],
                ]))
            });

        let range = SheetRange::parse("Sheet1!E2:E").unwrap();
        let reader = TitleReader::new(&client, &range);
        let records = reader.read_titles().await.unwrap();

        assert_eq!(
            records,
            vec![
                TitleRecord::new(2, "The Lord of the Rings"),
                TitleRecord::new(5, "A Brief History of Time"),
                TitleRecord::new(7, "Dune"),
            ]
        );
    }

    #[tokio::test]
    async fn test_read_titles_empty_sheet() {
        let mut client = MockTestSheetsClient::new();
        client.expect_read_range().returning(|_| Ok(vec![]));

        let range = SheetRange::parse("Sheet1!A2:A").unwrap();
        let records = TitleReader::new(&client, &range).read_titles().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unparseable_range_is_not_found() {
        let mut client = MockTestSheetsClient::new();
        client.expect_read_range().returning(|_| {
            Err(GenreError::ApiError("Unable to parse range: Missing!A2:A".to_string()))
        });

        let range = SheetRange::parse("Missing!A2:A").unwrap();
        let err = TitleReader::new(&client, &range).read_titles().await.unwrap_err();
        assert!(matches!(err, GenreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_auth_error_propagates() {
        let mut client = MockTestSheetsClient::new();
        client
            .expect_read_range()
            .returning(|_| Err(GenreError::AuthError("permission denied".to_string())));

        let range = SheetRange::parse("Sheet1!A2:A").unwrap();
        let err = TitleReader::new(&client, &range).read_titles().await.unwrap_err();
        assert!(matches!(err, GenreError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_read_existing_labels_uses_adjacent_column() {
        let mut client = MockTestSheetsClient::new();
        client
            .expect_read_range()
            .with(eq("Sheet1!F2:F"))
            .times(1)
            .returning(|_| Ok(rows(&[&["fiction"], &[], &["unknown"]])));

        let range = SheetRange::parse("Sheet1!E2:E").unwrap();
        let existing = TitleReader::new(&client, &range)
            .read_existing_labels()
            .await
            .unwrap();

        assert_eq!(existing.len(), 2);
        assert_eq!(existing.get(&2).map(String::as_str), Some("fiction"));
        assert_eq!(existing.get(&4).map(String::as_str), Some("unknown"));
    }

    #[test]
    fn test_without_labeled() {
        let records = vec![
            TitleRecord::new(2, "Dune"),
            TitleRecord::new(3, "Cosmos"),
            TitleRecord::new(4, "Emma"),
        ];
        let mut existing = HashMap::new();
        existing.insert(2, "fiction".to_string());
        existing.insert(3, "Unknown".to_string());

        let (kept, skipped) = TitleReader::without_labeled(records, &existing);
        assert_eq!(skipped, 1);
        assert_eq!(kept.iter().map(|r| r.row).collect::<Vec<_>>(), vec![3, 4]);
    }
}
