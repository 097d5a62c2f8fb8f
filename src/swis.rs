//! Node metrics from the SolarWinds Information Service (SWIS) JSON query API
//!
//! One `GET {base_url}?query=...` per request, authenticated with basic auth.
//! Failures are logged and reported as "no data", the caller decides what to
//! tell the user.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, instrument, trace, warn};

use crate::NodeRecord;
use crate::config::{Credentials, SwisConfig};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to send request: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected status: {0}")]
    Status(StatusCode),

    #[error("failed to parse query response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can produce the current set of nodes.
#[async_trait]
pub trait NodeSource: Send + Sync {
    /// Current node records, `None` if the backend could not be queried.
    async fn fetch_nodes(&self) -> Option<Vec<NodeRecord>>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<NodeRecord>,
}

#[derive(Debug, Clone)]
pub struct SwisClient {
    client: Client,
    base_url: String,
    query: String,
    credentials: Credentials,
}

impl SwisClient {
    pub fn new(config: &SwisConfig, credentials: Credentials) -> Result<Self, FetchError> {
        let mut builder = Client::builder();

        if config.accept_invalid_certs {
            warn!("TLS certificate validation is disabled for {}", config.base_url);
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.clone(),
            query: config.query.clone(),
            credentials,
        })
    }

    /// Run the configured query once.
    #[instrument(skip(self), fields(url = %self.base_url))]
    pub async fn query_nodes(&self) -> Result<Vec<NodeRecord>, FetchError> {
        trace!("running node query");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("query", self.query.as_str())])
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let QueryResponse { results } = serde_json::from_str(&body)?;

        debug!("received {} nodes", results.len());

        Ok(results)
    }
}

#[async_trait]
impl NodeSource for SwisClient {
    async fn fetch_nodes(&self) -> Option<Vec<NodeRecord>> {
        match self.query_nodes().await {
            Ok(nodes) => Some(nodes),
            Err(e) => {
                error!("{}: node query failed: {e}", self.base_url);
                None
            }
        }
    }
}
