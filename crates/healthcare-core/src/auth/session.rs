use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Generation;

/// Process-wide authentication status.
///
/// `LoggedOut` and `Failed` only change on a new submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    PendingChallenge,
    Authenticated,
    LoggedOut,
    Failed(String),
}

impl SessionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, SessionStatus::PendingChallenge)
    }

    /// True for the states a handshake settles into.
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionStatus::Authenticated | SessionStatus::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Unauthenticated => "unauthenticated",
            SessionStatus::PendingChallenge => "pending_challenge",
            SessionStatus::Authenticated => "authenticated",
            SessionStatus::LoggedOut => "logged_out",
            SessionStatus::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}

/// Opaque token issued by the backend after a successful handshake.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken(<{} bytes>)", self.0.len())
    }
}

/// The authenticated session held after a successful handshake.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub token: SessionToken,
    pub username: String,
    pub locale: String,
    pub generation: Generation,
    pub authenticated_at: DateTime<Utc>,
}

impl SessionData {
    pub fn age(&self) -> Duration {
        Utc::now() - self.authenticated_at
    }
}
