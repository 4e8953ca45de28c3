use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdapterError {
    /// The backend rejected the procedure call (bad credentials, locked account, ...).
    #[error("{0}")]
    Rejected(String),

    #[error("Unauthorized for realm {0}")]
    Unauthorized(String),

    #[error("Adapter procedure not found: {0}")]
    NotFound(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl AdapterError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => AdapterError::Unauthorized(truncated),
            404 => AdapterError::NotFound(truncated),
            500..=599 => AdapterError::ServerError(truncated),
            _ => AdapterError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}
