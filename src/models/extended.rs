//! Extended resources
//!
//! "Full" fetches from the dashboard backend return a resource together with
//! its related objects already resolved. The nested fields differ per resource
//! class, so the payload is classified once and decoded into a tagged union
//! instead of being inspected field by field at every use site.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::resource::{Reference, Resource};

/// Resource class of an extended payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    Composite,
    Claim,
    Managed,
}

/// Composite resource with its related objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeResourceExtended {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_resources: Vec<ManagedResourceExtended>,
    /// References to managed resources that are themselves composites
    #[serde(
        rename = "managedResourcesXRs",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub managed_resources_xrs: Vec<Reference>,
    /// References to managed resources that are claims
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_resources_claims: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Resource>,
    #[serde(rename = "parentXR", default, skip_serializing_if = "Option::is_none")]
    pub parent_xr: Option<Resource>,
}

/// Claim with its bound composite
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimExtended {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite_resource: Option<CompositeResourceExtended>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition: Option<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_resources: Vec<ManagedResourceExtended>,
}

/// Managed resource, possibly with nested composed resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedResourceExtended {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub managed_resources: Vec<ManagedResourceExtended>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<Resource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prov_config: Option<Resource>,
}

/// A fetched resource, classified by shape
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendedResource {
    Composite(CompositeResourceExtended),
    Claim(ClaimExtended),
    Managed(ManagedResourceExtended),
}

/// Classify a raw payload.
///
/// Claims carry `compositeResource` (or the `spec.resourceRef` binding);
/// composites carry any of their side-channel lists, a claim/parent link, or
/// `spec.resourceRefs`/`spec.claimRef`. Anything else is a managed resource.
pub fn classify(value: &Value) -> ResourceClass {
    let has = |field: &str| value.get(field).is_some_and(|v| !v.is_null());
    let spec_has = |field: &str| {
        value
            .get("spec")
            .and_then(|s| s.get(field))
            .is_some_and(|v| !v.is_null())
    };

    if has("compositeResource") || spec_has("resourceRef") {
        ResourceClass::Claim
    } else if has("managedResourcesXRs")
        || has("managedResourcesClaims")
        || has("parentXR")
        || has("claim")
        || spec_has("resourceRefs")
        || spec_has("claimRef")
    {
        ResourceClass::Composite
    } else {
        ResourceClass::Managed
    }
}

impl ExtendedResource {
    /// Classify and decode a raw payload
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(match classify(&value) {
            ResourceClass::Composite => Self::Composite(serde_json::from_value(value)?),
            ResourceClass::Claim => Self::Claim(serde_json::from_value(value)?),
            ResourceClass::Managed => Self::Managed(serde_json::from_value(value)?),
        })
    }

    pub fn class(&self) -> ResourceClass {
        match self {
            Self::Composite(_) => ResourceClass::Composite,
            Self::Claim(_) => ResourceClass::Claim,
            Self::Managed(_) => ResourceClass::Managed,
        }
    }

    pub fn resource(&self) -> &Resource {
        match self {
            Self::Composite(xr) => &xr.resource,
            Self::Claim(claim) => &claim.resource,
            Self::Managed(mr) => &mr.resource,
        }
    }

    /// Drop the nested relations and keep the base resource
    pub fn into_resource(self) -> Resource {
        match self {
            Self::Composite(xr) => xr.resource,
            Self::Claim(claim) => claim.resource,
            Self::Managed(mr) => mr.resource,
        }
    }
}

impl From<Resource> for ExtendedResource {
    /// Wrap a plain resource, classifying it by its spec links
    fn from(resource: Resource) -> Self {
        if resource.spec.resource_ref.is_some() {
            Self::Claim(ClaimExtended {
                resource,
                ..Default::default()
            })
        } else if !resource.spec.resource_refs.is_empty() || resource.spec.claim_ref.is_some() {
            Self::Composite(CompositeResourceExtended {
                resource,
                ..Default::default()
            })
        } else {
            Self::Managed(ManagedResourceExtended {
                resource,
                ..Default::default()
            })
        }
    }
}
