use serde_json::json;

use super::{AuthError, Credentials};
use crate::api::{Challenge, ChallengeAnswer};

/// Produces the secondary proof the backend asks for mid-handshake.
pub trait ChallengeHandler: Send + Sync {
    fn answer(
        &self,
        challenge: &Challenge,
        credentials: &Credentials,
    ) -> Result<ChallengeAnswer, AuthError>;
}

/// Answers adapter-based authentication challenges by replaying the
/// submitted credentials into the challenged realm.
#[derive(Debug, Clone)]
pub struct AdapterChallengeHandler {
    default_realm: String,
}

impl AdapterChallengeHandler {
    pub fn new(default_realm: impl Into<String>) -> Self {
        Self {
            default_realm: default_realm.into(),
        }
    }
}

impl ChallengeHandler for AdapterChallengeHandler {
    fn answer(
        &self,
        challenge: &Challenge,
        credentials: &Credentials,
    ) -> Result<ChallengeAnswer, AuthError> {
        if let Some(error) = challenge.data.get("error").filter(|e| !e.is_null()) {
            let reason = error
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(AuthError::Rejected(reason));
        }

        let realm = challenge.realm.as_deref().unwrap_or(&self.default_realm);
        Ok(ChallengeAnswer(json!({
            "realm": realm,
            "parameters": credentials.as_parameters(),
            "challenge": challenge.data,
        })))
    }
}
