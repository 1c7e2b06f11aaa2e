//! Scripted in-memory resource client shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use xrtree::models::{ExtendedResource, ItemList, Reference, Resource};
use xrtree::{FetchError, FetchResult, ResourceClient};

/// Serves resources keyed by kind and name, and root listings keyed by plural
#[derive(Default)]
pub struct FakeClient {
    resources: Mutex<HashMap<String, FetchResult<Resource>>>,
    listings: Mutex<HashMap<String, FetchResult<Vec<Resource>>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    slow: Mutex<HashMap<String, Duration>>,
    pub get_calls: AtomicUsize,
    pub list_calls: AtomicUsize,
}

fn slot(kind: &str, name: &str) -> String {
    format!("{}/{}", kind, name)
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps this long before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fetches of one resource sleep this long, overriding `with_delay`
    pub fn slow(&self, kind: &str, name: &str, delay: Duration) {
        self.slow.lock().unwrap().insert(slot(kind, name), delay);
    }

    /// Serve (or replace) a resource
    pub fn set(&self, resource: Resource) {
        self.resources.lock().unwrap().insert(
            slot(&resource.kind, resource.name()),
            Ok(resource),
        );
    }

    /// Make fetches of a resource fail
    pub fn fail(&self, kind: &str, name: &str, error: FetchError) {
        self.resources
            .lock()
            .unwrap()
            .insert(slot(kind, name), Err(error));
    }

    /// Serve a root listing for a plural
    pub fn set_roots(&self, plural: &str, roots: Vec<Resource>) {
        self.listings
            .lock()
            .unwrap()
            .insert(plural.to_string(), Ok(roots));
    }

    pub fn fail_roots(&self, plural: &str, error: FetchError) {
        self.listings
            .lock()
            .unwrap()
            .insert(plural.to_string(), Err(error));
    }

    /// Number of fetches issued for one resource
    pub fn calls_for(&self, kind: &str, name: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&slot(kind, name))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_gets(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceClient for FakeClient {
    async fn get_resource(
        &self,
        _group: &str,
        _version: &str,
        kind: &str,
        name: &str,
    ) -> FetchResult<ExtendedResource> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        *self
            .calls
            .lock()
            .unwrap()
            .entry(slot(kind, name))
            .or_insert(0) += 1;

        let slow = self.slow.lock().unwrap().get(&slot(kind, name)).copied();
        if let Some(delay) = slow.or(self.delay) {
            tokio::time::sleep(delay).await;
        }

        let answer = self.resources.lock().unwrap().get(&slot(kind, name)).cloned();
        match answer {
            Some(Ok(resource)) => Ok(ExtendedResource::from(resource)),
            Some(Err(e)) => Err(e),
            None => Err(FetchError::NotFound(slot(kind, name))),
        }
    }

    async fn list_resources_of_kind(
        &self,
        _group: &str,
        _version: &str,
        plural: &str,
    ) -> FetchResult<ItemList<Resource>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.listings.lock().unwrap().get(plural).cloned();
        match answer {
            Some(Ok(items)) => Ok(ItemList { items }),
            Some(Err(e)) => Err(e),
            None => Ok(ItemList::default()),
        }
    }
}

pub const XR_API: &str = "skycluster.io/v1alpha1";
pub const S3_API: &str = "s3.aws/v1";

pub fn bucket_ref(name: &str) -> Reference {
    Reference::new("Bucket", S3_API, name)
}

pub fn bucket(name: &str) -> Resource {
    Resource::new("Bucket", S3_API, name)
}

pub fn xinstance(name: &str) -> Resource {
    Resource::new("XInstance", XR_API, name)
}

pub fn xinstance_ref(name: &str) -> Reference {
    Reference::new("XInstance", XR_API, name)
}
