//! Base resource model
//!
//! Loosely-typed view of a control plane object. Only the fields the relation
//! engine reads are modeled; everything is defaulted so partial payloads from
//! the backend (or reference-only stubs) still deserialize.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::relations::NodeKey;

/// Kind used for a `compositionRef` that does not name its own kind
pub const COMPOSITION_KIND: &str = "Composition";

/// API version used for a `compositionRef` that does not name its own version
pub const COMPOSITION_API_VERSION: &str = "apiextensions.crossplane.io/v1";

/// Condition type/status/reason attached to placeholders for failed fetches
pub const ERROR_CONDITION_TYPE: &str = "Error";
pub const FETCH_FAILED_REASON: &str = "FetchFailed";

/// A list response (`{"items": [...]}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemList<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Default for ItemList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

/// Object metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// A status condition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl Condition {
    /// Whether the condition status is "True" (case-insensitive)
    pub fn is_true(&self) -> bool {
        self.status.eq_ignore_ascii_case("true")
    }
}

/// Status block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// A pointer to another resource. Never implies ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl Reference {
    pub fn new(kind: &str, api_version: &str, name: &str) -> Self {
        Self {
            kind: kind.to_string(),
            api_version: api_version.to_string(),
            name: name.to_string(),
            namespace: None,
        }
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.kind, &self.name, &self.api_version)
    }

    /// Group and version, if the apiVersion carries both
    pub fn group_version(&self) -> Option<(&str, &str)> {
        split_api_version(&self.api_version)
    }

    /// A reference can be fetched when it names a group, a version and a name
    pub fn is_fetchable(&self) -> bool {
        !self.kind.is_empty() && !self.name.is_empty() && self.group_version().is_some()
    }
}

/// Spec fields that link a resource to other resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resource_refs: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_ref: Option<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<Reference>,
}

/// A control plane object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: ResourceSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl Resource {
    pub fn new(kind: &str, api_version: &str, name: &str) -> Self {
        Self {
            api_version: api_version.to_string(),
            kind: kind.to_string(),
            metadata: Metadata {
                name: name.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Builder-style helper for attaching a condition
    pub fn with_condition(mut self, type_: &str, status: &str, reason: &str) -> Self {
        self.status
            .get_or_insert_with(Status::default)
            .conditions
            .push(Condition {
                type_: type_.to_string(),
                status: status.to_string(),
                reason: reason.to_string(),
                ..Default::default()
            });
        self
    }

    /// Builder-style helper for attaching a `resourceRefs` entry
    pub fn with_resource_ref(mut self, reference: Reference) -> Self {
        self.spec.resource_refs.push(reference);
        self
    }

    /// A resource that only knows what a reference told us about it
    pub fn from_reference(reference: &Reference) -> Self {
        let mut resource = Self::new(&reference.kind, &reference.api_version, &reference.name);
        resource.metadata.namespace = reference.namespace.clone();
        resource
    }

    /// Stand-in for a reference whose fetch failed, so the branch stays visible
    pub fn placeholder(reference: &Reference, error: &str) -> Self {
        let api_version = if reference.api_version.is_empty() {
            "unknown/unknown"
        } else {
            reference.api_version.as_str()
        };
        let mut resource = Self::new(&reference.kind, api_version, &reference.name);
        resource.metadata.namespace = reference.namespace.clone();
        resource.status = Some(Status {
            conditions: vec![Condition {
                type_: ERROR_CONDITION_TYPE.to_string(),
                status: "True".to_string(),
                reason: FETCH_FAILED_REASON.to_string(),
                message: Some(error.to_string()),
                last_transition_time: None,
            }],
        });
        resource
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn key(&self) -> NodeKey {
        NodeKey::new(&self.kind, &self.metadata.name, &self.api_version)
    }

    /// This resource as a reference
    pub fn reference(&self) -> Reference {
        Reference {
            kind: self.kind.clone(),
            api_version: self.api_version.clone(),
            name: self.metadata.name.clone(),
            namespace: self.metadata.namespace.clone(),
        }
    }

    pub fn group_version(&self) -> Option<(&str, &str)> {
        split_api_version(&self.api_version)
    }

    pub fn is_fetchable(&self) -> bool {
        !self.kind.is_empty() && !self.metadata.name.is_empty() && self.group_version().is_some()
    }

    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or(&[])
    }

    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.type_ == type_)
    }

    /// Whether a condition of the given type exists with status "True"
    pub fn is_condition_true(&self, type_: &str) -> bool {
        self.condition(type_).is_some_and(Condition::is_true)
    }

    pub fn is_ready(&self) -> bool {
        self.is_condition_true("Ready")
    }

    pub fn is_synced(&self) -> bool {
        self.is_condition_true("Synced")
    }

    /// Whether this is a placeholder produced by a failed fetch
    pub fn is_placeholder(&self) -> bool {
        self.condition(ERROR_CONDITION_TYPE)
            .is_some_and(|c| c.reason == FETCH_FAILED_REASON)
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.metadata.labels.get(key).map(String::as_str)
    }

    /// Outgoing references in tree order: `compositionRef` first, then `resourceRefs`
    pub fn references(&self) -> Vec<Reference> {
        let mut refs = Vec::with_capacity(self.spec.resource_refs.len() + 1);
        if let Some(composition) = &self.spec.composition_ref {
            let mut composition = composition.clone();
            if composition.kind.is_empty() {
                composition.kind = COMPOSITION_KIND.to_string();
            }
            if composition.api_version.is_empty() {
                composition.api_version = COMPOSITION_API_VERSION.to_string();
            }
            refs.push(composition);
        }
        refs.extend(
            self.spec
                .resource_refs
                .iter()
                .filter(|r| !r.kind.is_empty() && !r.name.is_empty())
                .cloned(),
        );
        refs
    }
}

/// Split an apiVersion into (group, version). Core-group versions such as "v1"
/// carry no group and are not fetchable through the group/version endpoints.
pub fn split_api_version(api_version: &str) -> Option<(&str, &str)> {
    let (group, version) = api_version.split_once('/')?;
    if group.is_empty() || version.is_empty() {
        return None;
    }
    Some((group, version))
}
