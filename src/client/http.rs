//! Dashboard backend client

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use super::{FetchError, FetchResult, ResourceClient};
use crate::models::{
    ClaimExtended, CompositeResourceExtended, ExtendedResource, ItemList, ManagedResourceExtended,
    Resource,
};

/// Client for the dashboard backend's REST API
#[derive(Debug, Clone)]
pub struct HttpResourceClient {
    client: reqwest::Client,
    base: Url,
}

impl HttpResourceClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base =
            Url::parse(base_url).with_context(|| format!("Invalid backend URL: {}", base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("Backend URL cannot be used as a base: {}", base_url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        tracing::debug!("Created backend client for: {}", base);

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Build `{base}/api/{segments...}`, optionally asking for the full payload
    fn endpoint(&self, segments: &[&str], full: bool) -> FetchResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::Network(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        if full {
            url.query_pairs_mut().append_pair("full", "1");
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> FetchResult<T> {
        tracing::debug!("Fetching: {}", url);

        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{}: {}", url, e)))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                url: url.to_string(),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| FetchError::Decode(format!("{}: {}", url, e)))
    }

    /// Composite resource with claim, parent, composition and composed resources
    pub async fn get_composite(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<CompositeResourceExtended> {
        let url = self.endpoint(&["composite", group, version, kind, name], true)?;
        self.get_json(url).await
    }

    /// Claim with its bound composite
    pub async fn get_claim(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> FetchResult<ClaimExtended> {
        let url = self.endpoint(&["claims", group, version, kind, namespace, name], true)?;
        self.get_json(url).await
    }

    /// Managed resource with its owning composite and provider config
    pub async fn get_managed(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<ManagedResourceExtended> {
        let url = self.endpoint(&["managed", group, version, kind, name], true)?;
        self.get_json(url).await
    }
}

#[async_trait]
impl ResourceClient for HttpResourceClient {
    async fn get_resource(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<ExtendedResource> {
        let url = self.endpoint(&["composite", group, version, kind, name], true)?;
        let value: serde_json::Value = self.get_json(url.clone()).await?;
        ExtendedResource::from_value(value)
            .map_err(|e| FetchError::Decode(format!("{}: {}", url, e)))
    }

    async fn list_resources_of_kind(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> FetchResult<ItemList<Resource>> {
        let url = self.endpoint(&["crs", group, version, plural], false)?;
        self.get_json(url).await
    }
}
