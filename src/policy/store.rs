//! ImageSecurityPolicy retrieval.

use async_trait::async_trait;
use kube::api::ListParams;
use kube::{Api, Client};
use thiserror::Error;
use tracing::debug;

use crate::crd::ImageSecurityPolicy;

/// Errors raised while fetching policies
#[derive(Error, Debug)]
pub enum PolicyStoreError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Any other failure reported by a store implementation
    #[error("Policy store unavailable: {0}")]
    Unavailable(String),
}

/// Source of the ImageSecurityPolicies that apply to a namespace.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Fetch the policies for `namespace`, in a stable order.
    async fn fetch(&self, namespace: &str) -> Result<Vec<ImageSecurityPolicy>, PolicyStoreError>;
}

/// Lists ImageSecurityPolicy custom resources from the API server.
///
/// Policies are read fresh on every call; nothing is cached.
pub struct KubePolicyStore {
    client: Client,
}

impl KubePolicyStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PolicyStore for KubePolicyStore {
    async fn fetch(&self, namespace: &str) -> Result<Vec<ImageSecurityPolicy>, PolicyStoreError> {
        let api: Api<ImageSecurityPolicy> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        debug!(
            namespace = %namespace,
            count = list.items.len(),
            "Fetched image security policies"
        );
        Ok(list.items)
    }
}
