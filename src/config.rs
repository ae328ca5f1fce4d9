use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{GenreError, Result};
use crate::range::SheetRange;

pub const ENV_CREDENTIALS_PATH: &str = "GOOGLE_CREDENTIALS_PATH";
pub const ENV_SPREADSHEET_ID: &str = "SPREADSHEET_ID";
pub const ENV_SHEET_RANGE: &str = "SHEET_RANGE";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "CONFIDENCE_THRESHOLD";
pub const ENV_HF_API_TOKEN: &str = "HF_API_TOKEN";
pub const ENV_CLASSIFIER_ENDPOINT: &str = "CLASSIFIER_ENDPOINT";

pub const DEFAULT_SHEET_RANGE: &str = "Sheet1!A2:A";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Everything the run needs, resolved once at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
    pub sheet_range: SheetRange,
    pub confidence_threshold: f32,
    pub classifier: ClassifierConfig,
}

/// Optional TOML file holding classifier tuning
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_hypothesis_template")]
    pub hypothesis_template: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub keyword_rules: bool,
    /// Only ever read from the environment
    #[serde(skip)]
    pub api_token: Option<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            hypothesis_template: default_hypothesis_template(),
            timeout_secs: default_timeout_secs(),
            keyword_rules: false,
            api_token: None,
        }
    }
}

fn default_endpoint() -> String {
    "https://router.huggingface.co/hf-inference/models/facebook/bart-large-mnli".to_string()
}

fn default_hypothesis_template() -> String {
    "This book is {}.".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl ClassifierConfig {
    /// Apply `HF_API_TOKEN` and `CLASSIFIER_ENDPOINT` on top of the file values
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(token) = non_blank(lookup(ENV_HF_API_TOKEN)) {
            self.api_token = Some(token);
        }
        if let Some(endpoint) = non_blank(lookup(ENV_CLASSIFIER_ENDPOINT)) {
            self.endpoint = endpoint;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(GenreError::ConfigError(format!(
                "classifier.endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if !self.hypothesis_template.contains("{}") {
            return Err(GenreError::ConfigError(
                "classifier.hypothesis_template must contain '{}'".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(GenreError::ConfigError(
                "classifier.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl FileConfig {
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GenreError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| GenreError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.classifier.validate()?;

        tracing::info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    GenreError::ConfigError(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GenreError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        tokio::fs::write(path, content)
            .await
            .map_err(|e| GenreError::ConfigError(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Create an example configuration file
    pub async fn create_example(path: &Path) -> Result<()> {
        Self::default().save(path).await
    }
}

impl Config {
    /// Load `.env`, the optional TOML file, then the process environment
    pub async fn load(path: &Path) -> Result<Self> {
        load_dotenv();
        let file = FileConfig::load(path).await?;
        Self::from_env(file.classifier)
    }

    pub fn from_env(classifier: ClassifierConfig) -> Result<Self> {
        Self::from_lookup(classifier, |key| env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(mut classifier: ClassifierConfig, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials_path = non_blank(lookup(ENV_CREDENTIALS_PATH))
            .map(PathBuf::from)
            .ok_or_else(|| missing(ENV_CREDENTIALS_PATH))?;

        let spreadsheet_id =
            non_blank(lookup(ENV_SPREADSHEET_ID)).ok_or_else(|| missing(ENV_SPREADSHEET_ID))?;

        let raw_range =
            non_blank(lookup(ENV_SHEET_RANGE)).unwrap_or_else(|| DEFAULT_SHEET_RANGE.to_string());
        let sheet_range = SheetRange::parse(&raw_range).map_err(|e| {
            GenreError::ConfigError(format!("{} is malformed: {}", ENV_SHEET_RANGE, e))
        })?;

        let confidence_threshold = threshold_from_lookup(&lookup)?;

        classifier.apply_env(&lookup);
        classifier.validate()?;

        tracing::debug!(
            spreadsheet_id = %spreadsheet_id,
            range = %sheet_range,
            threshold = confidence_threshold,
            "Configuration resolved"
        );

        Ok(Self {
            credentials_path,
            spreadsheet_id,
            sheet_range,
            confidence_threshold,
            classifier,
        })
    }
}

/// Read `CONFIDENCE_THRESHOLD`, defaulting to 0.6
pub fn threshold_from_lookup<F>(lookup: F) -> Result<f32>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = non_blank(lookup(ENV_CONFIDENCE_THRESHOLD)) else {
        return Ok(DEFAULT_CONFIDENCE_THRESHOLD);
    };

    let value: f32 = raw.trim().parse().map_err(|_| {
        GenreError::ConfigError(format!(
            "{} must be a number between 0 and 1, got '{}'",
            ENV_CONFIDENCE_THRESHOLD, raw
        ))
    })?;

    if !(0.0..=1.0).contains(&value) {
        return Err(GenreError::ConfigError(format!(
            "{} must be between 0 and 1, got {}",
            ENV_CONFIDENCE_THRESHOLD, value
        )));
    }
    Ok(value)
}

/// Load a `.env` file from the working directory if one exists
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn missing(key: &str) -> GenreError {
    GenreError::ConfigError(format!("Missing required environment variable: {}", key))
}
