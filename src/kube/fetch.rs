//! Resource fetching from the cluster API
//!
//! Every kind the relation engine follows is a custom resource, so objects are
//! fetched as `DynamicObject` and converted to the engine's loose `Resource`.

use async_trait::async_trait;
use kube::api::ListParams;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use kube::core::{ApiResource, DynamicObject, GroupVersionKind};
use kube::{Api, Client};

use crate::client::{FetchError, FetchResult, ResourceClient};
use crate::models::{ExtendedResource, ItemList, Resource};

/// `ResourceClient` backed by the cluster API.
///
/// The cluster has no notion of extended payloads, so fetched resources carry
/// no nested relations.
#[derive(Clone)]
pub struct KubeResourceClient {
    client: Client,
    /// Discovered API resources by `group/version/kind`
    kinds: Arc<Mutex<HashMap<String, ApiResource>>>,
}

impl KubeResourceClient {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            kinds: Arc::default(),
        }
    }

    /// The API resource for a kind, running discovery only on first use
    async fn api_resource(&self, gvk: &GroupVersionKind) -> kube::Result<ApiResource> {
        let slot = format!("{}/{}/{}", gvk.group, gvk.version, gvk.kind);
        let known = self
            .kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned();
        if let Some(known) = known {
            return Ok(known);
        }

        let (api_resource, _caps) = kube::discovery::pinned_kind(&self.client, gvk).await?;
        tracing::debug!("Discovered {} as {}", slot, api_resource.plural);
        self.kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slot, api_resource.clone());
        Ok(api_resource)
    }

    fn map_error(error: kube::Error, what: &str) -> FetchError {
        if super::is_not_found(&error) {
            FetchError::NotFound(what.to_string())
        } else {
            FetchError::Network(format!("{}: {}", what, error))
        }
    }
}

/// Convert a dynamic object, filling in the type when the API left it out
fn to_resource(obj: DynamicObject, api_version: &str, kind: &str) -> FetchResult<Resource> {
    let value = serde_json::to_value(&obj).map_err(|e| FetchError::Decode(e.to_string()))?;
    let mut resource: Resource =
        serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))?;
    if resource.api_version.is_empty() {
        resource.api_version = api_version.to_string();
    }
    if resource.kind.is_empty() {
        resource.kind = kind.to_string();
    }
    Ok(resource)
}

#[async_trait]
impl ResourceClient for KubeResourceClient {
    async fn get_resource(
        &self,
        group: &str,
        version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<ExtendedResource> {
        let what = format!("{}/{}/{}/{}", group, version, kind, name);
        let gvk = GroupVersionKind::gvk(group, version, kind);

        let api_resource = self
            .api_resource(&gvk)
            .await
            .map_err(|e| Self::map_error(e, &what))?;

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &api_resource);
        let obj = api.get(name).await.map_err(|e| Self::map_error(e, &what))?;

        let resource = to_resource(obj, &api_resource.api_version, &api_resource.kind)?;
        Ok(ExtendedResource::from(resource))
    }

    async fn list_resources_of_kind(
        &self,
        group: &str,
        version: &str,
        plural: &str,
    ) -> FetchResult<ItemList<Resource>> {
        let what = format!("{}/{}/{}", group, version, plural);
        let api_resource = ApiResource {
            group: group.to_string(),
            version: version.to_string(),
            api_version: format!("{}/{}", group, version),
            kind: String::new(),
            plural: plural.to_string(),
        };

        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &api_resource);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Self::map_error(e, &what))?;

        let items = list
            .items
            .into_iter()
            .map(|obj| to_resource(obj, &api_resource.api_version, ""))
            .collect::<FetchResult<Vec<_>>>()?;

        tracing::debug!("Listed {} {}", items.len(), what);

        Ok(ItemList { items })
    }
}
