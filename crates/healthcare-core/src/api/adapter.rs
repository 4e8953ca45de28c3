//! Remote adapter seam.
//!
//! The coordinator only sees this trait; the HTTP implementation lives in
//! [`super::client`] and tests plug in scripted fakes.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use super::AdapterError;
use crate::auth::SessionToken;

/// One adapter procedure call with positional string parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct Invocation {
    pub adapter_name: String,
    pub procedure_name: String,
    pub parameters: Vec<String>,
}

impl Invocation {
    pub fn new(
        adapter_name: impl Into<String>,
        procedure_name: impl Into<String>,
        parameters: Vec<String>,
    ) -> Self {
        Self {
            adapter_name: adapter_name.into(),
            procedure_name: procedure_name.into(),
            parameters,
        }
    }
}

// Parameters carry the password, so only their count is printed.
impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("adapter_name", &self.adapter_name)
            .field("procedure_name", &self.procedure_name)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

/// A demand for additional proof before a token is issued.
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    pub realm: Option<String>,
    pub data: Value,
}

/// Payload sent back in reply to a [`Challenge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeAnswer(pub Value);

/// Non-error outcome of one exchange with the adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterReply {
    Success(SessionToken),
    Challenge(Challenge),
}

#[async_trait]
pub trait RemoteAdapter: Send + Sync {
    /// Issue the procedure call. A rejection comes back as `Err(AdapterError::Rejected)`.
    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterReply, AdapterError>;

    /// Continue a handshake after a challenge.
    async fn answer_challenge(
        &self,
        invocation: &Invocation,
        answer: &ChallengeAnswer,
    ) -> Result<AdapterReply, AdapterError>;

    async fn logout(&self, realm: &str) -> Result<(), AdapterError>;
}
