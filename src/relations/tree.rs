//! Resource forest
//!
//! Tree positions live in one flat arena keyed by `NodeId` and link to each
//! other by id. Resource content is stored once per `NodeKey`, so every
//! position showing the same resource sees the same data and a refresh updates
//! all of them at once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::Resource;
use crate::relations::NodeKey;
use crate::relations::status::{NodeStatus, resolve_status};

/// Identifier of one position in the forest.
///
/// Ids are unique for the whole process, so an id taken from one forest never
/// names a position in a rebuilt one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One tree position
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub key: NodeKey,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Children have been resolved at least once
    pub loaded: bool,
    pub expanded: bool,
    /// Reference back to an ancestor, rendered as a childless leaf
    pub cycle: bool,
    /// References not yet resolved into children
    pub pending: usize,
    /// Consecutive refreshes of the parent this child was missing from
    pub stale_count: u32,
}

/// The forest of trees rooted at the discovered root resources
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: HashMap<NodeId, TreeEntry>,
    resources: HashMap<NodeKey, Resource>,
    roots: Vec<NodeId>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Forest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn entry(&self, id: NodeId) -> Option<&TreeEntry> {
        self.nodes.get(&id)
    }

    pub fn entry_mut(&mut self, id: NodeId) -> Option<&mut TreeEntry> {
        self.nodes.get_mut(&id)
    }

    pub fn resource(&self, key: &NodeKey) -> Option<&Resource> {
        self.resources.get(key)
    }

    pub fn resource_of(&self, id: NodeId) -> Option<&Resource> {
        self.entry(id).and_then(|e| self.resources.get(&e.key))
    }

    /// Replace the content shown for `key` at every position
    pub fn set_resource(&mut self, key: NodeKey, resource: Resource) {
        self.resources.insert(key, resource);
    }

    /// Record content for `key` unless fetched content is already present
    pub fn offer_resource(&mut self, key: NodeKey, resource: Resource) {
        self.resources.entry(key).or_insert(resource);
    }

    /// Add a position for `key` under `parent` (or as a root when `None`).
    ///
    /// The position is not linked into the parent's child list; callers do
    /// that with `set_children`/`merge_children`.
    pub fn insert(&mut self, parent: Option<NodeId>, key: NodeKey) -> NodeId {
        let id = NodeId::next();
        self.nodes.insert(
            id,
            TreeEntry {
                key,
                parent,
                children: Vec::new(),
                loaded: false,
                expanded: false,
                cycle: false,
                pending: 0,
                stale_count: 0,
            },
        );
        id
    }

    pub fn push_root(&mut self, id: NodeId) {
        self.roots.push(id);
    }

    /// Every position showing `key`
    pub fn positions(&self, key: &NodeKey) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, e)| &e.key == key)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Keys from `id` up to its root, `id` included
    pub fn path_keys(&self, id: NodeId) -> HashSet<NodeKey> {
        let mut keys = HashSet::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(&id)) {
            keys.insert(node.key.clone());
            current = node.parent;
        }
        keys
    }

    /// Keys from the root down to `id`
    fn path(&self, id: NodeId) -> Vec<NodeKey> {
        let mut keys = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current.and_then(|id| self.nodes.get(&id)) {
            keys.push(node.key.clone());
            current = node.parent;
        }
        keys.reverse();
        keys
    }

    /// Drop a position and everything below it
    pub fn remove_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(entry) = self.nodes.remove(&id) {
                stack.extend(entry.children);
            }
        }
    }

    /// Replace the children of `id` outright, dropping the previous ones
    pub fn set_children(&mut self, id: NodeId, children: Vec<NodeId>) {
        let previous = match self.nodes.get_mut(&id) {
            Some(entry) => std::mem::replace(&mut entry.children, children),
            None => return,
        };
        for child in previous {
            self.remove_subtree(child);
        }
    }

    /// Merge freshly built children of `id` into its existing ones.
    ///
    /// Fresh children come first, in fetch order. A fresh child keeps the
    /// expanded flag of the stale child it replaces and, when it has not been
    /// resolved yet, takes over that child's subtree. Stale children whose key
    /// is missing from the fresh list follow, in their previous order; each one
    /// is dropped once it has been missing `stale_limit` times in a row
    /// (`0` keeps it forever).
    pub fn merge_children(&mut self, id: NodeId, fresh: Vec<NodeId>, stale_limit: u32) {
        let Some(stale) = self.nodes.get(&id).map(|e| e.children.clone()) else {
            return;
        };

        let fresh_keys: HashMap<NodeKey, NodeId> = fresh
            .iter()
            .filter_map(|f| self.nodes.get(f).map(|e| (e.key.clone(), *f)))
            .collect();

        let mut leftovers = Vec::new();
        for old in stale {
            let Some(old_key) = self.nodes.get(&old).map(|e| e.key.clone()) else {
                continue;
            };

            match fresh_keys.get(&old_key) {
                Some(&replacement) => {
                    self.inherit(old, replacement);
                    self.remove_subtree(old);
                }
                None => {
                    let Some(entry) = self.nodes.get_mut(&old) else {
                        continue;
                    };
                    entry.stale_count += 1;
                    if stale_limit > 0 && entry.stale_count >= stale_limit {
                        tracing::debug!(
                            "Dropping {} after {} refreshes without it",
                            old_key,
                            entry.stale_count
                        );
                        self.remove_subtree(old);
                    } else {
                        leftovers.push(old);
                    }
                }
            }
        }

        if let Some(entry) = self.nodes.get_mut(&id) {
            entry.children = fresh.into_iter().chain(leftovers).collect();
        }
    }

    /// Carry UI state and resolved children from `old` over to `new`
    fn inherit(&mut self, old: NodeId, new: NodeId) {
        let Some(previous) = self.nodes.get_mut(&old) else {
            return;
        };
        let expanded = previous.expanded;
        let adopt = previous.loaded && !previous.cycle;
        let grandchildren = std::mem::take(&mut previous.children);

        let Some(fresh) = self.nodes.get_mut(&new) else {
            return;
        };
        fresh.expanded = expanded;
        if adopt && !fresh.loaded && !fresh.cycle && fresh.children.is_empty() {
            fresh.loaded = true;
            fresh.pending = 0;
            fresh.children = grandchildren.clone();
            for child in grandchildren {
                if let Some(entry) = self.nodes.get_mut(&child) {
                    entry.parent = Some(new);
                }
            }
        } else if let Some(previous) = self.nodes.get_mut(&old) {
            previous.children = grandchildren;
        }
    }

    /// Whether `id` is a live position showing `key`
    pub fn shows(&self, id: NodeId, key: &NodeKey) -> bool {
        self.nodes.get(&id).is_some_and(|e| &e.key == key)
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        match self.nodes.get_mut(&id) {
            Some(entry) => {
                entry.expanded = expanded;
                true
            }
            None => false,
        }
    }

    /// Copy expanded flags from `previous` onto positions reached by the same
    /// key path. Returns positions that were expanded before but have not been
    /// resolved in this forest yet.
    pub fn restore_expansion(&mut self, previous: &Forest) -> Vec<NodeId> {
        let expanded: HashSet<Vec<NodeKey>> = previous
            .nodes
            .iter()
            .filter(|(_, e)| e.expanded)
            .map(|(id, _)| previous.path(*id))
            .collect();
        if expanded.is_empty() {
            return Vec::new();
        }

        let mut ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.sort();
        let mut unresolved = Vec::new();
        for id in ids {
            if !expanded.contains(&self.path(id)) {
                continue;
            }
            if let Some(entry) = self.nodes.get_mut(&id) {
                entry.expanded = true;
                if !entry.loaded {
                    unresolved.push(id);
                }
            }
        }
        unresolved
    }

    /// Owned view of the subtree at `id`
    pub fn to_tree(&self, id: NodeId) -> Option<TreeNode> {
        let entry = self.nodes.get(&id)?;
        let resource = self.resources.get(&entry.key).cloned()?;
        Some(TreeNode {
            id,
            key: entry.key.clone(),
            resource,
            children: entry
                .children
                .iter()
                .filter_map(|child| self.to_tree(*child))
                .collect(),
            loaded: entry.loaded,
            expanded: entry.expanded,
            cycle: entry.cycle,
            pending: entry.pending,
        })
    }

    /// Owned views of every root
    pub fn trees(&self) -> Vec<TreeNode> {
        self.roots.iter().filter_map(|id| self.to_tree(*id)).collect()
    }

    /// Roots whose title contains `query`, ignoring case. An empty query keeps
    /// every root.
    pub fn filter_roots(&self, query: &str) -> Vec<TreeNode> {
        let query = query.trim().to_lowercase();
        self.trees()
            .into_iter()
            .filter(|t| query.is_empty() || t.title().to_lowercase().contains(&query))
            .collect()
    }
}

/// Owned snapshot of one subtree, for rendering
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    #[serde(skip)]
    pub key: NodeKey,
    pub resource: Resource,
    pub children: Vec<TreeNode>,
    pub loaded: bool,
    pub expanded: bool,
    pub cycle: bool,
    pub pending: usize,
}

impl TreeNode {
    /// "{kind} ({apiVersion})"
    pub fn display_kind(&self) -> String {
        if self.resource.api_version.is_empty() {
            self.resource.kind.clone()
        } else {
            format!("{} ({})", self.resource.kind, self.resource.api_version)
        }
    }

    pub fn title(&self) -> &str {
        match self.resource.name() {
            "" => "<unnamed>",
            name => name,
        }
    }

    pub fn ready(&self) -> bool {
        self.resource.is_ready()
    }

    pub fn synced(&self) -> bool {
        self.resource.is_synced()
    }

    pub fn status(&self) -> (NodeStatus, String) {
        resolve_status(Some(&self.resource))
    }

    /// First node in this subtree showing `key`, depth first
    pub fn find(&self, key: &NodeKey) -> Option<&TreeNode> {
        if &self.key == key {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(key))
    }

    /// Number of nodes in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}
