//! Tree construction, lazy expansion and refresh
//!
//! Work is split in two phases. The async phase (`resolve`) walks references
//! and fills the `TreeStore` cache, fetching concurrently among siblings. The
//! sync phase (`materialize`) lays cached resources out into a `Forest`,
//! breaking cycles against the ancestor keys of each position. Nothing in the
//! async phase touches the forest, so fetches can run on background tasks
//! while the forest stays owned by one place.

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

use crate::client::{FetchError, ResourceClient};
use crate::models::{Reference, Resource};
use crate::relations::NodeKey;
use crate::relations::store::{InFlightGuard, TreeStore};
use crate::relations::tree::{Forest, NodeId};

/// Condition attached to placeholders for references the API reported missing
const FOUND_CONDITION_TYPE: &str = "Found";

/// A kind whose objects are listed as tree roots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootKind {
    pub group: String,
    pub version: String,
    /// Plural resource name
    pub resource: String,
}

impl RootKind {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }
}

impl std::fmt::Display for RootKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}/{}", self.resource, self.group, self.version)
    }
}

/// The four composite kinds the dashboard roots its trees at
pub fn default_root_kinds() -> Vec<RootKind> {
    ["xinstances", "xproviders", "xkubes", "xkubemeshes"]
        .iter()
        .map(|plural| RootKind::new("skycluster.io", "v1alpha1", plural))
        .collect()
}

/// Kinds shown inline elsewhere rather than as tree nodes
pub fn default_excluded_kinds() -> Vec<String> {
    vec!["providerconfig".to_string(), "composition".to_string()]
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeOptions {
    pub root_kinds: Vec<RootKind>,
    /// Compared ignoring case
    pub excluded_kinds: Vec<String>,
    /// Levels below each root fetched by a build
    pub initial_depth: usize,
    /// Refreshes a child may be missing from before it is dropped, 0 = never
    pub stale_refresh_limit: u32,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            root_kinds: default_root_kinds(),
            excluded_kinds: default_excluded_kinds(),
            initial_depth: 1,
            stale_refresh_limit: 3,
        }
    }
}

impl TreeOptions {
    pub fn is_excluded(&self, kind: &str) -> bool {
        self.excluded_kinds
            .iter()
            .any(|k| k.eq_ignore_ascii_case(kind))
    }
}

/// Whether a resolve may answer from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    CacheFirst,
    Refetch,
}

/// An expand action waiting for its references to resolve
#[derive(Debug, Clone)]
pub struct ExpansionRequest {
    pub id: NodeId,
    pub key: NodeKey,
    pub reference: Reference,
}

/// Resolved content for an expand action
#[derive(Debug, Clone)]
pub struct Expansion {
    pub id: NodeId,
    pub key: NodeKey,
    pub resource: Resource,
}

/// A freshly fetched node, ready to be merged into a forest
#[derive(Debug, Clone)]
pub struct NodeRefresh {
    pub key: NodeKey,
    pub resource: Resource,
}

/// Builds and refreshes resource forests.
///
/// Cloning is cheap and clones share the same cache and in-flight set.
#[derive(Clone)]
pub struct TreeBuilder {
    client: Arc<dyn ResourceClient>,
    store: Arc<TreeStore>,
    options: Arc<TreeOptions>,
}

impl TreeBuilder {
    pub fn new(client: Arc<dyn ResourceClient>, options: TreeOptions) -> Self {
        Self {
            client,
            store: TreeStore::new(),
            options: Arc::new(options),
        }
    }

    pub fn store(&self) -> &Arc<TreeStore> {
        &self.store
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// References of `resource` that become tree children
    fn child_refs(&self, resource: &Resource) -> Vec<Reference> {
        resource
            .references()
            .into_iter()
            .filter(|r| !self.options.is_excluded(&r.kind))
            .collect()
    }

    async fn fetch(&self, reference: &Reference) -> Result<Resource, FetchError> {
        let (group, version) = reference
            .group_version()
            .ok_or_else(|| FetchError::InvalidApiVersion(reference.api_version.clone()))?;
        let resource = self
            .client
            .get_resource(group, version, &reference.kind, &reference.name)
            .await?;
        Ok(resource.into_resource())
    }

    /// Fetch a reference and cache it under `key`, degrading failures to a
    /// cached placeholder. Callers hold the in-flight guard for `key`.
    async fn fetch_into_cache(&self, key: NodeKey, reference: &Reference) -> Resource {
        let resource = match self.fetch(reference).await {
            Ok(resource) => resource,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", key, e);
                let placeholder = Resource::placeholder(reference, &e.to_string());
                if e.is_not_found() {
                    placeholder.with_condition(FOUND_CONDITION_TYPE, "False", "NotFound")
                } else {
                    placeholder
                }
            }
        };
        self.store.insert(key, resource.clone());
        resource
    }

    /// Content for one reference, fetching at most once per key at a time
    async fn resolve_reference(&self, reference: &Reference, mode: FetchMode) -> Resource {
        let key = reference.key();
        loop {
            if mode == FetchMode::CacheFirst {
                if let Some(cached) = self.store.get(&key) {
                    return cached;
                }
            }

            if let Some(guard) = self.store.try_begin(&key) {
                let resource = self.fetch_into_cache(key.clone(), reference).await;
                drop(guard);
                return resource;
            }

            tracing::debug!("{} already being fetched, waiting", key);
            self.store.wait_until_idle(&key).await;
            if let Some(cached) = self.store.get(&key) {
                return cached;
            }
        }
    }

    /// Fetch `refs` and their descendants down to `depth` levels into the cache
    fn resolve<'a>(
        &'a self,
        refs: Vec<Reference>,
        ancestors: HashSet<NodeKey>,
        depth: usize,
        mode: FetchMode,
    ) -> BoxFuture<'a, ()> {
        async move {
            if depth == 0 {
                return;
            }

            let targets: Vec<Reference> = refs
                .into_iter()
                .filter(|r| {
                    !self.options.is_excluded(&r.kind)
                        && r.is_fetchable()
                        && !ancestors.contains(&r.key())
                })
                .collect();

            let ancestors = &ancestors;
            join_all(targets.into_iter().map(|reference| async move {
                let resource = self.resolve_reference(&reference, mode).await;
                if depth > 1 {
                    let mut path = ancestors.clone();
                    path.insert(reference.key());
                    self.resolve(resource.references(), path, depth - 1, FetchMode::CacheFirst)
                        .await;
                }
            }))
            .await;
        }
        .boxed()
    }

    /// Lay out `resource` at a new position under `parent`
    fn materialize(
        &self,
        forest: &mut Forest,
        parent: Option<NodeId>,
        key: NodeKey,
        resource: Resource,
        ancestors: &HashSet<NodeKey>,
        depth: usize,
    ) -> NodeId {
        let id = forest.insert(parent, key.clone());
        let mut path = ancestors.clone();
        path.insert(key.clone());
        forest.set_resource(key, resource.clone());
        self.populate(forest, id, &resource, &path, depth);
        id
    }

    /// Build the children of position `id` from cached content
    fn populate(
        &self,
        forest: &mut Forest,
        id: NodeId,
        resource: &Resource,
        path: &HashSet<NodeKey>,
        depth: usize,
    ) {
        let refs = self.child_refs(resource);
        if depth == 0 {
            if let Some(entry) = forest.entry_mut(id) {
                entry.loaded = refs.is_empty();
                entry.pending = refs.len();
            }
            return;
        }

        let children = refs
            .iter()
            .map(|r| self.child(forest, id, r, path, depth - 1))
            .collect();
        forest.set_children(id, children);
        if let Some(entry) = forest.entry_mut(id) {
            entry.loaded = true;
            entry.pending = 0;
        }
    }

    /// One child position for `reference`
    fn child(
        &self,
        forest: &mut Forest,
        parent: NodeId,
        reference: &Reference,
        ancestors: &HashSet<NodeKey>,
        depth: usize,
    ) -> NodeId {
        let key = reference.key();

        if ancestors.contains(&key) {
            let id = forest.insert(Some(parent), key.clone());
            let content = self
                .store
                .get(&key)
                .unwrap_or_else(|| Resource::from_reference(reference));
            forest.offer_resource(key, content);
            if let Some(entry) = forest.entry_mut(id) {
                entry.cycle = true;
                entry.loaded = true;
            }
            return id;
        }

        if let Some(cached) = self.store.get(&key) {
            return self.materialize(forest, Some(parent), key, cached, ancestors, depth);
        }

        // Unfetchable references render as leaves built from the reference
        // itself; fetchable ones not resolved yet wait for an expand.
        let id = forest.insert(Some(parent), key.clone());
        forest.offer_resource(key, Resource::from_reference(reference));
        if let Some(entry) = forest.entry_mut(id) {
            entry.loaded = !reference.is_fetchable();
        }
        id
    }

    /// List every root kind, skipping kinds whose listing fails
    pub async fn discover_roots(&self) -> Vec<Resource> {
        let listings = join_all(self.options.root_kinds.iter().map(|kind| async move {
            match self
                .client
                .list_resources_of_kind(&kind.group, &kind.version, &kind.resource)
                .await
            {
                Ok(list) => list.items,
                Err(e) => {
                    tracing::warn!("Failed to list {}: {}", kind, e);
                    Vec::new()
                }
            }
        }))
        .await;

        let roots: Vec<Resource> = listings
            .into_iter()
            .flatten()
            .filter(|r| !self.options.is_excluded(&r.kind))
            .collect();
        for root in &roots {
            self.store.insert(root.key(), root.clone());
        }

        tracing::debug!("Discovered {} roots", roots.len());
        roots
    }

    /// Build the tree for one root into `forest` and return its position
    pub async fn build_root(&self, forest: &mut Forest, root: Resource) -> NodeId {
        let key = root.key();
        let depth = self.options.initial_depth;
        self.resolve(
            root.references(),
            HashSet::from([key.clone()]),
            depth,
            FetchMode::CacheFirst,
        )
        .await;
        self.store.insert(key.clone(), root.clone());

        let id = self.materialize(forest, None, key, root, &HashSet::new(), depth);
        forest.push_root(id);
        id
    }

    /// Rebuild the whole forest from a fresh root discovery.
    ///
    /// The first level below each root is refetched; deeper levels reuse the
    /// cache.
    pub async fn build_forest(&self) -> Forest {
        let roots = self.discover_roots().await;
        let depth = self.options.initial_depth;

        join_all(roots.iter().map(|root| {
            self.resolve(
                root.references(),
                HashSet::from([root.key()]),
                depth,
                FetchMode::Refetch,
            )
        }))
        .await;

        let mut forest = Forest::new();
        for root in roots {
            let key = root.key();
            let id = self.materialize(&mut forest, None, key, root, &HashSet::new(), depth);
            forest.push_root(id);
        }
        forest.last_updated = Some(Utc::now());
        forest
    }

    /// What an expand of `id` has to fetch, or `None` when its children are
    /// already resolved
    pub fn expansion_request(&self, forest: &Forest, id: NodeId) -> Option<ExpansionRequest> {
        let entry = forest.entry(id)?;
        if entry.loaded || entry.cycle {
            return None;
        }
        let resource = forest.resource(&entry.key)?;
        Some(ExpansionRequest {
            id,
            key: entry.key.clone(),
            reference: resource.reference(),
        })
    }

    /// Fetch the node (when only a stub is known) and its own references
    pub async fn resolve_expansion(&self, request: ExpansionRequest) -> Expansion {
        let resource = match self.store.get(&request.key) {
            Some(cached) => cached,
            None => {
                self.resolve_reference(&request.reference, FetchMode::CacheFirst)
                    .await
            }
        };
        self.resolve(
            resource.references(),
            HashSet::from([request.key.clone()]),
            1,
            FetchMode::CacheFirst,
        )
        .await;
        Expansion {
            id: request.id,
            key: request.key,
            resource,
        }
    }

    /// Splice resolved children into every unresolved position of the
    /// expanded key and open the requested position
    pub fn apply_expansion(&self, forest: &mut Forest, expansion: Expansion) {
        forest.set_resource(expansion.key.clone(), expansion.resource.clone());

        for id in forest.positions(&expansion.key) {
            let unresolved = forest
                .entry(id)
                .is_some_and(|e| !e.loaded && !e.cycle);
            if unresolved {
                let path = forest.path_keys(id);
                self.populate(forest, id, &expansion.resource, &path, 1);
            }
        }
        if forest.shows(expansion.id, &expansion.key) {
            forest.set_expanded(expansion.id, true);
        } else {
            tracing::debug!(
                "Position {} of {} is gone, not opening it",
                expansion.id,
                expansion.key
            );
        }
    }

    /// Expand `id`, resolving its children first when needed
    pub async fn expand(&self, forest: &mut Forest, id: NodeId) {
        match self.expansion_request(forest, id) {
            Some(request) => {
                let expansion = self.resolve_expansion(request).await;
                self.apply_expansion(forest, expansion);
            }
            None => {
                forest.set_expanded(id, true);
            }
        }
    }

    /// Fetchable resources in `forest` whose Ready condition is not true, one
    /// per key
    pub fn refresh_candidates(&self, forest: &Forest) -> Vec<(NodeKey, Resource)> {
        let mut seen = HashSet::new();
        let mut ids: Vec<NodeId> = forest.roots().to_vec();
        let mut candidates = Vec::new();

        while let Some(id) = ids.pop() {
            let Some(entry) = forest.entry(id) else {
                continue;
            };
            ids.extend(entry.children.iter().rev());
            if entry.cycle || !seen.insert(entry.key.clone()) {
                continue;
            }
            if let Some(resource) = forest.resource(&entry.key) {
                if resource.is_fetchable() && !resource.is_ready() {
                    candidates.push((entry.key.clone(), resource.clone()));
                }
            }
        }
        candidates
    }

    /// Claim `key` for a refresh; `None` when a fetch is already running
    pub fn begin_refresh(&self, key: &NodeKey) -> Option<InFlightGuard> {
        self.store.try_begin(key)
    }

    /// Refetch a claimed node and resolve its references
    pub async fn refresh_node(&self, guard: InFlightGuard, resource: Resource) -> NodeRefresh {
        let key = guard.key().clone();
        let fresh = self
            .fetch_into_cache(key.clone(), &resource.reference())
            .await;
        drop(guard);

        self.resolve(
            fresh.references(),
            HashSet::from([key.clone()]),
            1,
            FetchMode::CacheFirst,
        )
        .await;
        NodeRefresh {
            key,
            resource: fresh,
        }
    }

    /// Refresh one node unless a fetch for it is already running
    pub async fn refresh(&self, resource: Resource) -> Option<NodeRefresh> {
        let key = resource.key();
        let Some(guard) = self.begin_refresh(&key) else {
            tracing::debug!("Skipping refresh of {}: already in flight", key);
            return None;
        };
        Some(self.refresh_node(guard, resource).await)
    }

    /// Update every position of the refreshed key in place.
    ///
    /// Resolved positions get fresh children merged into their existing ones;
    /// sibling subtrees and expanded flags elsewhere are left alone. A failed
    /// refetch only replaces the content: the placeholder knows no references,
    /// so the existing children stay as they are.
    pub fn apply_refresh(&self, forest: &mut Forest, refresh: NodeRefresh) {
        let NodeRefresh { key, resource } = refresh;
        forest.set_resource(key.clone(), resource.clone());
        if resource.is_placeholder() {
            tracing::debug!("Refetch of {} failed, keeping its children", key);
            return;
        }

        let refs = self.child_refs(&resource);
        for id in forest.positions(&key) {
            let Some(entry) = forest.entry(id) else {
                continue;
            };
            if entry.cycle {
                continue;
            }

            if !entry.loaded {
                if let Some(entry) = forest.entry_mut(id) {
                    entry.pending = refs.len();
                    entry.loaded = refs.is_empty();
                }
                continue;
            }

            let path = forest.path_keys(id);
            let fresh = refs
                .iter()
                .map(|r| self.child(forest, id, r, &path, 0))
                .collect();
            forest.merge_children(id, fresh, self.options.stale_refresh_limit);
        }
    }
}
