//! Relation graph construction
//!
//! Adapters that turn one extended resource and its already-resolved relations
//! into a `RelationGraph`. Nothing here fetches; the extended payload carries
//! everything the graph needs.

use crate::models::{
    ClaimExtended, CompositeResourceExtended, ExtendedResource, ManagedResourceExtended, NodeType,
    Reference, Resource,
};
use crate::relations::graph::RelationGraph;

/// Annotation present on resources that map to an external entity
pub const EXTERNAL_NAME_ANNOTATION: &str = "crossplane.io/external-name";

/// Build the graph for any extended resource
pub fn graph_from_extended(resource: &ExtendedResource) -> RelationGraph {
    match resource {
        ExtendedResource::Composite(xr) => graph_from_composite(xr),
        ExtendedResource::Claim(claim) => graph_from_claim(claim),
        ExtendedResource::Managed(mr) => graph_from_managed(mr),
    }
}

/// Composite resource view: claim, parent, composition and composed resources
pub fn graph_from_composite(xr: &CompositeResourceExtended) -> RelationGraph {
    let mut graph = RelationGraph::new();
    let main = graph.add_node(NodeType::CompositeResource, Some(&xr.resource), true);

    if let Some(claim) = &xr.claim {
        let claim_id = graph.add_node(NodeType::Claim, Some(claim), false);
        graph.add_edge(&main, &claim_id);
    }

    if let Some(parent) = &xr.parent_xr {
        let parent_id = graph.add_node(NodeType::CompositeResource, Some(parent), false);
        graph.add_edge(&main, &parent_id);
    }

    // Always drawn; a missing composition shows up as a NotFound node
    let composition = graph.add_node(NodeType::Composition, xr.composition.as_ref(), false);
    graph.add_edge(&composition, &main);

    for managed in &xr.managed_resources {
        let node_type = classify_composed(xr, &managed.resource);
        let id = graph.add_node(node_type, Some(&managed.resource), false);
        graph.add_edge(&id, &main);
    }

    graph
}

/// Claim view: the claim, its composite and everything composed below it
pub fn graph_from_claim(claim: &ClaimExtended) -> RelationGraph {
    let mut graph = RelationGraph::new();
    let claim_id = graph.add_node(NodeType::Claim, Some(&claim.resource), true);

    let xr = claim.composite_resource.as_ref();
    let xr_id = graph.add_node(
        NodeType::CompositeResource,
        xr.map(|xr| &xr.resource),
        false,
    );
    graph.add_edge(&claim_id, &xr_id);

    if let Some(xr) = xr {
        for managed in &xr.managed_resources {
            let node_type = if has_external_name(&managed.resource) {
                NodeType::ManagedResource
            } else {
                NodeType::CompositeResource
            };
            let id = graph.add_node(node_type, Some(&managed.resource), false);
            graph.add_edge(&id, &xr_id);
            add_nested_managed(&mut graph, managed, &id);
        }
    }

    graph
}

/// Walk nested composed resources, linking each one to its immediate parent
fn add_nested_managed(graph: &mut RelationGraph, parent: &ManagedResourceExtended, parent_id: &str) {
    for child in &parent.managed_resources {
        let node_type = if has_external_name(&child.resource) {
            NodeType::ManagedResource
        } else {
            NodeType::CompositeResource
        };
        let id = graph.add_node(node_type, Some(&child.resource), false);
        graph.add_edge(&id, parent_id);
        add_nested_managed(graph, child, &id);
    }
}

/// Managed resource view: owning composite and provider config
pub fn graph_from_managed(mr: &ManagedResourceExtended) -> RelationGraph {
    let mut graph = RelationGraph::new();
    let main = graph.add_node(NodeType::ManagedResource, Some(&mr.resource), true);

    if let Some(composite) = &mr.composite {
        let composite_id = graph.add_node(NodeType::CompositeResource, Some(composite), false);
        graph.add_edge(&main, &composite_id);
    }

    if let Some(config) = &mr.prov_config {
        let config_id = graph.add_node(NodeType::ProviderConfig, Some(config), false);
        graph.add_edge(&config_id, &main);
    }

    graph
}

/// Classify a composed resource by exact match against the composite's
/// side-channel reference lists.
///
/// This relies on the backend populating both lists completely; a partially
/// populated list silently downgrades composites and claims to managed nodes.
fn classify_composed(xr: &CompositeResourceExtended, resource: &Resource) -> NodeType {
    if xr
        .managed_resources_xrs
        .iter()
        .any(|r| reference_matches(r, resource))
    {
        NodeType::CompositeResource
    } else if xr
        .managed_resources_claims
        .iter()
        .any(|r| reference_matches(r, resource) && r.namespace == resource.metadata.namespace)
    {
        NodeType::Claim
    } else {
        NodeType::ManagedResource
    }
}

fn reference_matches(reference: &Reference, resource: &Resource) -> bool {
    reference.kind == resource.kind
        && reference.api_version == resource.api_version
        && reference.name == resource.metadata.name
}

fn has_external_name(resource: &Resource) -> bool {
    resource
        .annotation(EXTERNAL_NAME_ANNOTATION)
        .is_some_and(|v| !v.is_empty())
}
