//! Zero-shot genre classification with a confidence threshold

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::error::{GenreError, Result};
use crate::models::{Classification, ClassificationSource, Genre, LabelScore};

/// Confidence reported for a keyword-rule match
pub const RULE_CONFIDENCE: f32 = 0.95;

/// A zero-shot text classification backend
///
/// Given a text and candidate labels, returns (label, score) pairs. Callers
/// must not rely on the order of the returned list.
#[async_trait]
pub trait ZeroShotModel: Send + Sync {
    async fn score(&self, text: &str, candidate_labels: &[&str]) -> Result<Vec<LabelScore>>;
}

/// Pick the best candidate and apply the threshold.
///
/// Fails when the model answer is empty, names a label outside the candidate
/// set, or carries a score outside [0, 1].
pub fn decide(scores: &[LabelScore], threshold: f32) -> Result<(Genre, f32)> {
    let mut best: Option<(Genre, f32)> = None;
    for entry in scores {
        if !(0.0..=1.0).contains(&entry.score) {
            return Err(GenreError::ClassificationError(format!(
                "score {} for '{}' is outside [0, 1]",
                entry.score, entry.label
            )));
        }
        let genre = entry
            .label
            .parse::<Genre>()
            .ok()
            .filter(|g| Genre::CANDIDATES.contains(g))
            .ok_or_else(|| {
                GenreError::ClassificationError(format!(
                    "model returned unexpected label '{}'",
                    entry.label
                ))
            })?;
        if best.map_or(true, |(_, score)| entry.score > score) {
            best = Some((genre, entry.score));
        }
    }

    let (genre, score) = best.ok_or_else(|| {
        GenreError::ClassificationError("model returned no scores".to_string())
    })?;

    if score >= threshold {
        Ok((genre, score))
    } else {
        Ok((Genre::Unknown, score))
    }
}

/// Keyword shortcuts for titles whose genre is obvious from wording
pub struct KeywordRules {
    non_fiction: Vec<Regex>,
    fiction: Vec<Regex>,
}

const FORMAT_NON_FICTION: &[&str] = &[
    "guide", "manual", "handbook", "textbook", "cookbook", "workbook", "encyclopedia",
    "dictionary", "reference", "companion",
];

const FORMAT_FICTION: &[&str] = &["novel", "fiction", "stories", "tales"];

const NON_FICTION_SUBJECTS: &[&str] = &[
    "history", "biography", "science", "math", "physics", "chemistry", "geography",
    "psychology", "philosophy", "economics", "business", "self-help", "self help", "fitness",
    "health", "diet", "nutrition", "exercise", "workout", "meditation", "mindfulness",
    "spirituality", "religion", "politics", "sociology", "anthropology", "archaeology",
    "medicine", "engineering", "technology", "programming", "computer", "investing", "finance",
    "money", "career", "leadership", "management", "marketing", "sales", "entrepreneurship",
    "kettlebell", "yoga", "pilates",
];

const INSTRUCTIONAL_PHRASES: &[&str] = &[
    "how to", "learn to", "guide to", "introduction to", "basics of", "principles of",
    "fundamentals of", "essentials of", "understanding", "mastering", "complete",
    "comprehensive", "step by step", "strategies", "techniques", "methods", "practices",
    "lessons", "skills", "succeed in", "success in", "master", "improve your", "boost your",
    "enhance your", "transform your", "optimize your", "maximize your", "for beginners",
    "for dummies", "made easy", "101", "basics", "essentials",
];

const FICTION_THEMES: &[&str] = &[
    "dragon", "sword", "magic", "wizard", "witch", "fairy", "elf", "fantasy", "adventure",
    "mystery", "thriller", "romance", "horror", "quest", "journey", "chronicles", "saga",
    "legend", "myth", "tale", "story", "enchanted", "magical", "supernatural", "dystopian",
    "kingdom", "prince", "princess", "warrior", "hero", "heroine",
];

static KEYWORD_RULES: Lazy<KeywordRules> = Lazy::new(KeywordRules::build);

impl KeywordRules {
    fn build() -> Self {
        // Checked in order: format words beat subjects beat themes
        let non_fiction = FORMAT_NON_FICTION
            .iter()
            .chain(NON_FICTION_SUBJECTS)
            .chain(INSTRUCTIONAL_PHRASES)
            .map(|w| word_pattern(w))
            .collect();
        let fiction = FORMAT_FICTION
            .iter()
            .chain(FICTION_THEMES)
            .map(|w| word_pattern(w))
            .collect();
        Self {
            non_fiction,
            fiction,
        }
    }

    pub fn shared() -> &'static KeywordRules {
        &KEYWORD_RULES
    }

    pub fn match_title(&self, title: &str) -> Option<Genre> {
        // Format words decide first in either direction
        let format_nf = FORMAT_NON_FICTION.len();
        let format_f = FORMAT_FICTION.len();
        if self.non_fiction[..format_nf].iter().any(|re| re.is_match(title)) {
            return Some(Genre::NonFiction);
        }
        if self.fiction[..format_f].iter().any(|re| re.is_match(title)) {
            return Some(Genre::Fiction);
        }
        if self.non_fiction[format_nf..].iter().any(|re| re.is_match(title)) {
            return Some(Genre::NonFiction);
        }
        if self.fiction[format_f..].iter().any(|re| re.is_match(title)) {
            return Some(Genre::Fiction);
        }
        None
    }
}

fn word_pattern(word: &str) -> Regex {
    let escaped = regex::escape(word).replace(' ', r"\s+");
    Regex::new(&format!(r"(?i)\b{}s?\b", escaped)).unwrap()
}

/// Classifies titles against {fiction, non-fiction}
pub struct GenreClassifier {
    model: Box<dyn ZeroShotModel>,
    threshold: f32,
    keyword_rules: bool,
}

impl GenreClassifier {
    pub fn new(model: Box<dyn ZeroShotModel>, threshold: f32) -> Self {
        Self {
            model,
            threshold,
            keyword_rules: false,
        }
    }

    pub fn with_keyword_rules(mut self, enabled: bool) -> Self {
        self.keyword_rules = enabled;
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Classify one title; `row` is carried through to the result
    pub async fn classify(&self, row: u32, title: &str) -> Result<Classification> {
        let title = title.trim();
        if title.is_empty() {
            return Err(GenreError::ClassificationError(format!(
                "row {} has an empty title",
                row
            )));
        }

        if self.keyword_rules {
            if let Some(genre) = KeywordRules::shared().match_title(title) {
                debug!("Row {}: keyword rule matched '{}' -> {}", row, title, genre);
                return Ok(Classification {
                    row,
                    genre,
                    confidence: RULE_CONFIDENCE,
                    source: ClassificationSource::KeywordRule,
                });
            }
        }

        let candidates: Vec<&str> = Genre::CANDIDATES.iter().map(Genre::as_str).collect();
        let scores = self.model.score(title, &candidates).await.map_err(|e| match e {
            GenreError::ClassificationError(_) => e,
            other => GenreError::ClassificationError(other.to_string()),
        })?;
        let (genre, confidence) = decide(&scores, self.threshold)?;

        debug!(
            "Row {}: '{}' -> {} (confidence {:.2})",
            row, title, genre, confidence
        );
        Ok(Classification {
            row,
            genre,
            confidence,
            source: ClassificationSource::Model,
        })
    }
}

/// Hugging Face inference API backend for zero-shot classification
pub struct HuggingFaceModel {
    client: reqwest::Client,
    endpoint: String,
    api_token: Option<String>,
    hypothesis_template: String,
}

#[derive(Debug, Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Debug, Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
    hypothesis_template: &'a str,
    multi_label: bool,
}

/// The inference API answers in one of two shapes depending on deployment
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ZeroShotResponse {
    Ranked(Vec<LabelScore>),
    Columns { labels: Vec<String>, scores: Vec<f32> },
}

impl ZeroShotResponse {
    fn into_scores(self) -> Result<Vec<LabelScore>> {
        match self {
            ZeroShotResponse::Ranked(scores) => Ok(scores),
            ZeroShotResponse::Columns { labels, scores } => {
                if labels.len() != scores.len() {
                    return Err(GenreError::ClassificationError(format!(
                        "model returned {} labels but {} scores",
                        labels.len(),
                        scores.len()
                    )));
                }
                Ok(labels
                    .into_iter()
                    .zip(scores)
                    .map(|(label, score)| LabelScore { label, score })
                    .collect())
            }
        }
    }
}

impl HuggingFaceModel {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenreError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            hypothesis_template: config.hypothesis_template.clone(),
        })
    }
}

#[async_trait]
impl ZeroShotModel for HuggingFaceModel {
    async fn score(&self, text: &str, candidate_labels: &[&str]) -> Result<Vec<LabelScore>> {
        let body = ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters {
                candidate_labels,
                hypothesis_template: &self.hypothesis_template,
                multi_label: false,
            },
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            GenreError::ClassificationError(format!("inference request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Inference endpoint returned {}: {}", status, error_text);
            return Err(GenreError::ClassificationError(format!(
                "inference endpoint returned {}: {}",
                status, error_text
            )));
        }

        let parsed: ZeroShotResponse = response.json().await.map_err(|e| {
            GenreError::ClassificationError(format!("unreadable inference response: {}", e))
        })?;
        parsed.into_scores()
    }
}
