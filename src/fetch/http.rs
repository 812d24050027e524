//! HTTP Fetcher
//!
//! A [`LiveFetch`] that GETs a resource's URL and decodes the body as JSON.

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;
use crate::fetch::{restore, ApplyMode, LiveFetch, Resource};

// == HTTP Fetcher ==
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (timeouts, headers, proxies).
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LiveFetch for HttpFetcher {
    async fn perform(
        &self,
        url: Option<&str>,
        resource: &mut dyn Resource,
        mode: ApplyMode,
    ) -> Result<Value, FetchError> {
        let url = url.ok_or(FetchError::MissingIdentity)?;

        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        restore(resource, &payload, mode)?;
        Ok(payload)
    }
}
