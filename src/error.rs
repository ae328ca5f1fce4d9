use thiserror::Error;

/// Type alias for Result with GenreError
pub type Result<T> = std::result::Result<T, GenreError>;

/// Error taxonomy for the genre classification run
#[derive(Error, Debug)]
pub enum GenreError {
    /// Missing or invalid configuration (fatal, raised before any network call)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Sheet range does not match `Sheet!A2:A`
    #[error("Invalid sheet range '{range}': {reason}")]
    InvalidRange { range: String, reason: String },

    /// Credentials invalid or the service account lacks access
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Spreadsheet id or range does not resolve
    #[error("Not found: {0}")]
    NotFound(String),

    /// A single title could not be classified
    #[error("Classification error: {0}")]
    ClassificationError(String),

    /// The batched write failed for the listed rows
    #[error("Write failed for rows {}: {message}", format_rows(.rows))]
    WriteError { rows: Vec<u32>, message: String },

    /// Sheets API quota exhausted (429)
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Sheets API returned some other error
    #[error("Sheets API error: {0}")]
    ApiError(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl GenreError {
    /// Rewrite a generic API failure as a write failure for the given rows.
    /// Authentication errors pass through unchanged.
    pub fn into_write_error(self, rows: Vec<u32>) -> GenreError {
        match self {
            GenreError::AuthError(_) | GenreError::WriteError { .. } => self,
            other => GenreError::WriteError {
                rows,
                message: other.to_string(),
            },
        }
    }
}

/// Render row indices as `2, 3, 7`
pub fn format_rows(rows: &[u32]) -> String {
    rows.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map an HTTP status code (and server message) onto the error taxonomy
fn from_status(status_code: u16, message: String) -> GenreError {
    match status_code {
        401 | 403 => GenreError::AuthError(message),
        404 => GenreError::NotFound(message),
        429 => GenreError::QuotaExceeded(message),
        _ => GenreError::ApiError(message),
    }
}

/// Map a non-success response without a JSON body.
///
/// A `Retry-After` header on a 429 is carried into the quota message.
fn from_response<B>(response: &hyper::Response<B>) -> GenreError {
    let status = response.status();
    let mut message = format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    );
    if status == hyper::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(hyper::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        if let Some(seconds) = retry_after {
            message.push_str(&format!(" (retry after {} seconds)", seconds));
        }
    }
    from_status(status.as_u16(), message)
}

impl From<google_sheets4::Error> for GenreError {
    fn from(error: google_sheets4::Error) -> Self {
        match error {
            // Non-success response whose body was not JSON
            google_sheets4::Error::Failure(ref response) => from_response(response),
            // Non-success response with a Google error document
            google_sheets4::Error::BadRequest(ref value) => {
                let code = value["error"]["code"].as_u64().unwrap_or(400) as u16;
                let message = value["error"]["message"]
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| value.to_string());
                from_status(code, message)
            }
            google_sheets4::Error::MissingToken(ref err) => {
                GenreError::AuthError(format!("Failed to obtain token: {}", err))
            }
            google_sheets4::Error::HttpError(ref err) => {
                GenreError::NetworkError(format!("Connection error: {}", err))
            }
            google_sheets4::Error::Io(err) => GenreError::NetworkError(err.to_string()),
            _ => GenreError::ApiError(error.to_string()),
        }
    }
}
