use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::infra::config::ProviderConfig;
use crate::majors::MajorEntry;
use crate::normalize::RawAdmissionRecord;
use crate::services::provider_api::AdmissionProvider;

/// `{"status": "ok"|"error", "data": ..., "message": ...}`
#[derive(Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: Option<String>,
    data: Option<Vec<T>>,
}

/// Decodes a provider response body.
///
/// An `error` status becomes an error carrying the provider's message. An
/// `ok` status without data is an empty collection.
pub fn decode_envelope<T: DeserializeOwned>(bytes: &[u8]) -> Result<Vec<T>> {
    let envelope: Envelope<T> =
        serde_json::from_slice(bytes).context("failed to parse provider response")?;

    if envelope.status != "ok" {
        let message = envelope.message.unwrap_or_else(|| "no message".to_string());
        return Err(anyhow::anyhow!(
            "provider returned status '{}': {}",
            envelope.status,
            message
        ));
    }

    match envelope.data {
        Some(data) => Ok(data),
        None => {
            warn!(message = ?envelope.message, "Provider response has no data");
            Ok(Vec::new())
        }
    }
}

/// [`AdmissionProvider`] over the provider's JSON HTTP API.
pub struct HttpProvider<C = BasicClient> {
    base_url: String,
    client: C,
}

impl HttpProvider<BasicClient> {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let client = BasicClient::with_timeouts(config.timeout(), config.connect_timeout())?;
        Ok(Self::with_client(&config.base_url, client))
    }
}

impl<C: HttpClient> HttpProvider<C> {
    pub fn with_client(base_url: &str, client: C) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_collection<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let url = self.url(path);
        let bytes = fetch_bytes(&self.client, &url).await?;
        debug!(url = %url, bytes = bytes.len(), "Provider response received");
        decode_envelope(&bytes).with_context(|| format!("GET {url}"))
    }

    /// Checks that the provider and its database answer.
    pub async fn ping(&self) -> Result<()> {
        let url = self.url("/api/ping");
        let bytes = fetch_bytes(&self.client, &url).await?;
        decode_envelope::<serde_json::Value>(&bytes).with_context(|| format!("GET {url}"))?;
        Ok(())
    }
}

#[async_trait]
impl<C: HttpClient> AdmissionProvider for HttpProvider<C> {
    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list_majors(&self) -> Result<Vec<MajorEntry>> {
        self.get_collection("/api/majors").await
    }

    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn average_cutoffs(&self) -> Result<Vec<RawAdmissionRecord>> {
        self.get_collection("/api/average-cutoffs").await
    }

    #[tracing::instrument(skip(self), fields(base_url = %self.base_url))]
    async fn admission_records(&self, identifier: i64) -> Result<Vec<RawAdmissionRecord>> {
        self.get_collection(&format!("/api/admission/{identifier}"))
            .await
    }
}
