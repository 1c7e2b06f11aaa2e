//! Resource access
//!
//! The relation engine reads resources through `ResourceClient` only. Two
//! implementations ship with the crate:
//! - `HttpResourceClient` - the dashboard backend's REST endpoints
//! - `crate::kube::KubeResourceClient` - the cluster API directly
//!
//! Clients never retry. A failed fetch is retried by the next refresh tick.

mod http;

pub use http::HttpResourceClient;

use async_trait::async_trait;

use crate::models::{ExtendedResource, ItemList, Resource};

/// Fetch errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Network(String),

    #[error("Request to {url} failed with status {code}")]
    Status { code: u16, url: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Invalid apiVersion: {0}")]
    InvalidApiVersion(String),
}

impl FetchError {
    /// The API answered that the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound(_))
    }
}

/// Result type for fetch operations
pub type FetchResult<T> = Result<T, FetchError>;

/// Source of resources for the relation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one resource with its related objects resolved where the source
    /// supports it
    async fn get_resource(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<ExtendedResource>;

    /// List every resource of a kind
    async fn list_resources_of_kind(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> FetchResult<ItemList<Resource>>;
}
