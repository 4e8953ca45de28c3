use thiserror::Error;

use crate::api::AdapterError;

/// Failure of one handshake attempt. Recoverable by submitting again.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The backend refused the credentials; the text is the backend's reason.
    #[error("{0}")]
    Rejected(String),

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("challenge could not be answered: {0}")]
    Challenge(String),

    /// A newer submission (or a logout) replaced this one before it settled.
    #[error("superseded by a newer submission")]
    Superseded,
}

impl From<AdapterError> for AuthError {
    fn from(err: AdapterError) -> Self {
        match err {
            AdapterError::Rejected(reason) => AuthError::Rejected(reason),
            other => AuthError::Transport(other.to_string()),
        }
    }
}
