use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A non-empty title read from the sheet, keyed by its 1-based row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleRecord {
    pub row: u32,
    pub title: String,
}

impl TitleRecord {
    pub fn new(row: u32, title: impl Into<String>) -> Self {
        Self {
            row,
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Genre {
    Fiction,
    NonFiction,
    Unknown,
}

impl Genre {
    /// Labels the model is asked to score against
    pub const CANDIDATES: [Genre; 2] = [Genre::Fiction, Genre::NonFiction];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fiction => "fiction",
            Genre::NonFiction => "non-fiction",
            Genre::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fiction" => Ok(Genre::Fiction),
            "non-fiction" | "nonfiction" | "non fiction" => Ok(Genre::NonFiction),
            "unknown" => Ok(Genre::Unknown),
            other => Err(format!("unrecognised genre label '{}'", other)),
        }
    }
}

/// Where a classification came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    Model,
    KeywordRule,
    /// Classification failed and the row was degraded to unknown
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Classification {
    pub row: u32,
    pub genre: Genre,
    pub confidence: f32,
    pub source: ClassificationSource,
}

impl Classification {
    /// Row marked unknown after a per-title failure
    pub fn failed(row: u32) -> Self {
        Self {
            row,
            genre: Genre::Unknown,
            confidence: 0.0,
            source: ClassificationSource::Error,
        }
    }
}

/// One entry of the ranked list returned by a zero-shot model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// A single label destined for one cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: u32,
    pub range: String,
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_genre_labels() {
        assert_eq!(Genre::Fiction.to_string(), "fiction");
        assert_eq!(Genre::NonFiction.to_string(), "non-fiction");
        assert_eq!(Genre::Unknown.to_string(), "unknown");
        assert_eq!("Non-Fiction".parse::<Genre>().unwrap(), Genre::NonFiction);
        assert!("poetry".parse::<Genre>().is_err());
    }

    #[test]
    fn test_genre_serialization() {
        let json = serde_json::to_string(&Genre::NonFiction).unwrap();
        assert_eq!(json, "\"non-fiction\"");
    }

    #[test]
    fn test_failed_classification() {
        let failed = Classification::failed(9);
        assert_eq!(failed.row, 9);
        assert_eq!(failed.genre, Genre::Unknown);
        assert_eq!(failed.confidence, 0.0);
        assert_eq!(failed.source, ClassificationSource::Error);
    }
}
