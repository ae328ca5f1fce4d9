//! A1 notation for the single title column, e.g. `Sheet1!E2:E`

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

use crate::error::{GenreError, Result};

static RANGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:'(?P<quoted>(?:[^']|'')+)'|(?P<plain>[^'!]+))!(?P<col>[A-Za-z]{1,3})(?P<row>[0-9]+):(?P<end_col>[A-Za-z]{1,3})(?P<end_row>[0-9]+)?$")
        .unwrap()
});

/// Largest row a Google Sheet can hold
pub const MAX_ROW: u32 = 10_000_000;

/// A single-column range with a known starting row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    sheet: String,
    column: String,
    start_row: u32,
    end_row: Option<u32>,
}

impl SheetRange {
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| GenreError::InvalidRange {
            range: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        if !trimmed.contains('!') {
            return Err(invalid("expected <Sheet>!<Col><Row>:<Col>, missing '!'"));
        }

        let caps = RANGE_PATTERN
            .captures(trimmed)
            .ok_or_else(|| invalid("expected <Sheet>!<Col><Row>:<Col>"))?;

        let sheet = match (caps.name("quoted"), caps.name("plain")) {
            (Some(quoted), _) => quoted.as_str().replace("''", "'"),
            (None, Some(plain)) => plain.as_str().trim().to_string(),
            (None, None) => return Err(invalid("missing sheet name")),
        };
        if sheet.is_empty() {
            return Err(invalid("missing sheet name"));
        }

        let column = caps["col"].to_ascii_uppercase();
        let end_column = caps["end_col"].to_ascii_uppercase();
        if column != end_column {
            return Err(invalid("range must address a single column"));
        }

        let start_row: u32 = caps["row"]
            .parse()
            .map_err(|_| invalid("start row out of range"))?;
        if start_row == 0 {
            return Err(invalid("rows are numbered from 1"));
        }
        if start_row > MAX_ROW {
            return Err(invalid("start row is past the last row a sheet can hold"));
        }

        let end_row = match caps.name("end_row") {
            Some(m) => {
                let end: u32 = m.as_str().parse().map_err(|_| invalid("end row out of range"))?;
                if end < start_row {
                    return Err(invalid("end row is before start row"));
                }
                if end > MAX_ROW {
                    return Err(invalid("end row is past the last row a sheet can hold"));
                }
                Some(end)
            }
            None => None,
        };

        Ok(Self {
            sheet,
            column,
            start_row,
            end_row,
        })
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    pub fn end_row(&self) -> Option<u32> {
        self.end_row
    }

    /// Row number of the i-th value returned for this range
    pub fn row_at(&self, offset: usize) -> u32 {
        let offset = u32::try_from(offset).unwrap_or(u32::MAX);
        self.start_row.saturating_add(offset)
    }

    /// The column immediately to the right of the title column
    pub fn output_column(&self) -> String {
        column_name(column_number(&self.column) + 1)
    }

    /// Cell that receives the label for `row`, e.g. `Sheet1!F7`
    pub fn output_cell(&self, row: u32) -> String {
        format!("{}!{}{}", self.quoted_sheet(), self.output_column(), row)
    }

    /// The adjacent column over the same rows as this range
    pub fn output_range(&self) -> SheetRange {
        SheetRange {
            sheet: self.sheet.clone(),
            column: self.output_column(),
            start_row: self.start_row,
            end_row: self.end_row,
        }
    }

    fn quoted_sheet(&self) -> String {
        if self.sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            self.sheet.clone()
        } else {
            format!("'{}'", self.sheet.replace('\'', "''"))
        }
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}{}:{}", self.quoted_sheet(), self.column, self.start_row, self.column)?;
        if let Some(end) = self.end_row {
            write!(f, "{}", end)?;
        }
        Ok(())
    }
}

impl FromStr for SheetRange {
    type Err = GenreError;

    fn from_str(s: &str) -> Result<Self> {
        SheetRange::parse(s)
    }
}

/// `A` -> 1, `Z` -> 26, `AA` -> 27
fn column_number(letters: &str) -> u32 {
    letters
        .bytes()
        .fold(0, |acc, b| acc * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1))
}

fn column_name(mut number: u32) -> String {
    let mut letters = Vec::new();
    while number > 0 {
        let rem = (number - 1) % 26;
        letters.push(b'A' + rem as u8);
        number = (number - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}
