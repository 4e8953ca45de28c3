//! HTTP implementation of the remote adapter.
//!
//! Procedure calls are posted to `{server}/adapters/{adapter}/{procedure}`
//! with the positional parameters encoded as a JSON array in the `params`
//! form field. Every response uses the same JSON envelope, decoded by
//! [`AdapterResponse::into_reply`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::adapter::{AdapterReply, Challenge, ChallengeAnswer, Invocation, RemoteAdapter};
use super::AdapterError;
use crate::auth::SessionToken;
use crate::config::Config;

/// `authStatus` value the backend uses while it still wants proof.
const AUTH_STATUS_REQUIRED: &str = "required";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AdapterResponse {
    #[serde(default)]
    is_successful: bool,
    auth_status: Option<String>,
    realm: Option<String>,
    challenge: Option<Value>,
    token: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

impl AdapterResponse {
    fn into_reply(self) -> Result<AdapterReply, AdapterError> {
        let wants_proof = self.auth_status.as_deref() == Some(AUTH_STATUS_REQUIRED);
        if self.challenge.is_some() || wants_proof {
            return Ok(AdapterReply::Challenge(Challenge {
                realm: self.realm,
                data: self.challenge.unwrap_or(Value::Null),
            }));
        }

        if !self.is_successful {
            let reason = if self.errors.is_empty() {
                "unknown-error".to_string()
            } else {
                self.errors.join("; ")
            };
            return Err(AdapterError::Rejected(reason));
        }

        match self.token {
            Some(token) if !token.is_empty() => Ok(AdapterReply::Success(SessionToken::new(token))),
            _ => Err(AdapterError::InvalidResponse(
                "successful response carried no token".to_string(),
            )),
        }
    }
}

/// Adapter client over HTTP.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpAdapterClient {
    client: Client,
    base_url: String,
}

impl HttpAdapterClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdapterError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, AdapterError> {
        Self::new(config.server_url.clone(), config.request_timeout())
    }

    fn procedure_url(&self, invocation: &Invocation) -> String {
        format!(
            "{}/adapters/{}/{}",
            self.base_url, invocation.adapter_name, invocation.procedure_name
        )
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, AdapterError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(AdapterError::from_status(status, &body))
        }
    }

    async fn decode(response: reqwest::Response) -> Result<AdapterReply, AdapterError> {
        let response = Self::check_response(response).await?;
        let text = response.text().await?;
        let envelope: AdapterResponse = serde_json::from_str(&text)
            .map_err(|e| AdapterError::InvalidResponse(format!("Failed to parse adapter response: {}", e)))?;
        envelope.into_reply()
    }
}

#[async_trait]
impl RemoteAdapter for HttpAdapterClient {
    async fn invoke(&self, invocation: &Invocation) -> Result<AdapterReply, AdapterError> {
        let url = self.procedure_url(invocation);
        let params = serde_json::to_string(&invocation.parameters)
            .map_err(|e| AdapterError::InvalidResponse(e.to_string()))?;
        debug!(url = %url, params = invocation.parameters.len(), "Invoking adapter procedure");

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .form(&[("params", params.as_str())])
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn answer_challenge(
        &self,
        invocation: &Invocation,
        answer: &ChallengeAnswer,
    ) -> Result<AdapterReply, AdapterError> {
        let url = format!("{}/challenge", self.procedure_url(invocation));
        debug!(url = %url, "Answering authentication challenge");

        let response = self.client.post(&url).json(&answer.0).send().await?;
        Self::decode(response).await
    }

    async fn logout(&self, realm: &str) -> Result<(), AdapterError> {
        let url = format!("{}/logout", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("realm", realm)])
            .send()
            .await?;
        Self::check_response(response).await?;
        Ok(())
    }
}
