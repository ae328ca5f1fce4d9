//! Service-account authentication for the Google Sheets API

use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GenreError, Result};

/// Read/write access to spreadsheet cell values
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

pub const REQUIRED_SCOPES: &[&str] = &[SHEETS_SCOPE];

/// Type alias for Sheets Hub to simplify type signatures
pub type SheetsHub = Sheets<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize the Sheets API hub from a service-account key file
///
/// The token is fetched once up front so that invalid or revoked credentials
/// surface as an [`GenreError::AuthError`] before any spreadsheet call.
///
/// # Arguments
/// * `credentials_path` - Path to the service-account JSON key
pub async fn initialize_sheets_hub(credentials_path: &Path) -> Result<SheetsHub> {
    let key = yup_oauth2::read_service_account_key(credentials_path)
        .await
        .map_err(|e| {
            GenreError::AuthError(format!(
                "Failed to read service account key {:?}: {}",
                credentials_path, e
            ))
        })?;

    tracing::debug!(
        client_email = %key.client_email,
        "Building service account authenticator"
    );

    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|e| GenreError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    let _token = auth
        .token(REQUIRED_SCOPES)
        .await
        .map_err(|e| GenreError::AuthError(format!("Failed to obtain token: {}", e)))?;

    // HTTP/1 matches what the generated client expects
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| {
                    GenreError::AuthError(format!("Failed to load TLS roots: {}", e))
                })?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Sheets::new(client, auth))
}

/// Fields of a service-account key that are checked before authenticating
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceAccountInfo {
    #[serde(rename = "type")]
    pub key_type: String,
    pub client_email: String,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Read the key file and make sure it is a service-account key
///
/// OAuth client secrets (`{"installed": ...}`) are a common mix-up and are
/// rejected with a message naming the expected key type.
pub async fn inspect_credentials(path: &Path) -> Result<ServiceAccountInfo> {
    let content = tokio::fs::read_to_string(path).await.map_err(|e| {
        GenreError::ConfigError(format!("Cannot read credentials file {:?}: {}", path, e))
    })?;
    let info: ServiceAccountInfo = serde_json::from_str(&content).map_err(|e| {
        GenreError::AuthError(format!(
            "{:?} is not a service account key (expected \"type\": \"service_account\"): {}",
            path, e
        ))
    })?;
    if info.key_type != "service_account" {
        return Err(GenreError::AuthError(format!(
            "{:?} has key type '{}', expected 'service_account'",
            path, info.key_type
        )));
    }
    Ok(info)
}
