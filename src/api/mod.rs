//! Authenticated transport to the tracker's GraphQL endpoint.
//!
//! One POST per call: body `{query, variables}`, raw API key in the
//! `Authorization` header (no bearer prefix). No retries, no caching.

pub mod comments;
pub mod fetch;
pub mod queries;
pub mod types;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::errors::ApiError;

/// Production GraphQL endpoint of the tracker.
pub const DEFAULT_ENDPOINT: &str = "https://api.linear.app/graphql";

#[derive(Debug, Clone)]
pub struct TrackerClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlEnvelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
    #[serde(default)]
    #[allow(dead_code)] // part of the wire contract, unused beyond capture
    extensions: Option<Value>,
}

impl TrackerClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Issues a single GraphQL request and deserializes the `data` payload.
    ///
    /// Failure precedence: a non-2xx status is reported as
    /// [`ApiError::Transport`] before the body is looked at; reported
    /// GraphQL errors ([`ApiError::Protocol`], messages `;`-joined in
    /// response order) are checked before the missing-data case
    /// ([`ApiError::EmptyResult`]), so a malformed-but-200 response is never
    /// misreported as a transport failure.
    pub async fn request<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Transport {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let envelope: GraphQlEnvelope = response.json().await?;

        if let Some(errors) = envelope.errors
            && !errors.is_empty()
        {
            let joined = errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::Protocol(joined));
        }

        let data = envelope.data.ok_or(ApiError::EmptyResult)?;
        Ok(serde_json::from_value(data)?)
    }
}
