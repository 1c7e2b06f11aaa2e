//! Kubernetes client module
//!
//! Connects straight to the cluster API as an alternative to the dashboard
//! backend. Useful when the backend is not deployed.
//!
//! Proxies are picked up from the standard `HTTP_PROXY`/`HTTPS_PROXY`/`NO_PROXY`
//! environment variables by the kube client itself.

mod fetch;

pub use fetch::KubeResourceClient;

use anyhow::{Context, Result};
use kube::config::KubeConfigOptions;
use kube::{Client, Config};

/// Initialize and return a Kubernetes client
///
/// Without a context this uses the default loading strategy:
/// 1. In-cluster config (if running in a pod)
/// 2. KUBECONFIG environment variable
/// 3. ~/.kube/config
pub async fn create_client(context: Option<&str>) -> Result<Client> {
    let config = match context {
        Some(context) => {
            let options = KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            };
            Config::from_kubeconfig(&options)
                .await
                .with_context(|| format!("Failed to load kubeconfig context {}", context))?
        }
        None => Config::infer()
            .await
            .context("Failed to infer Kubernetes config")?,
    };

    tracing::debug!("Connecting to cluster at {}", config.cluster_url);

    Client::try_from(config).context("Failed to create Kubernetes client")
}

/// Whether a kube error means the object (or its kind) does not exist
pub(crate) fn is_not_found(error: &kube::Error) -> bool {
    match error {
        kube::Error::Api(response) => response.code == 404,
        kube::Error::Discovery(_) => true,
        _ => false,
    }
}
