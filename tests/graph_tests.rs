//! Relation graph tests
//!
//! Tests for the composite, claim and managed graph recipes and edge styling

use xrtree::NodeStatus;
use xrtree::models::{
    ClaimExtended, CompositeResourceExtended, ExtendedResource, ManagedResourceExtended, NodeType,
    Reference, Resource,
};
use xrtree::relations::graph_builder::EXTERNAL_NAME_ANNOTATION;
use xrtree::relations::{
    EdgeStyle, RelationGraph, graph_from_claim, graph_from_composite, graph_from_extended,
    graph_from_managed,
};

const XR_API: &str = "skycluster.io/v1alpha1";

fn managed(resource: Resource) -> ManagedResourceExtended {
    ManagedResourceExtended {
        resource,
        ..Default::default()
    }
}

fn with_external_name(mut resource: Resource, name: &str) -> Resource {
    resource
        .metadata
        .annotations
        .insert(EXTERNAL_NAME_ANNOTATION.to_string(), name.to_string());
    resource
}

/// (source label, target label) pairs, using "-" for absent nodes
fn edge_labels(graph: &RelationGraph) -> Vec<(String, String)> {
    let label = |id: &str| {
        graph
            .node(id)
            .and_then(|n| n.label.clone())
            .unwrap_or_else(|| "-".to_string())
    };
    graph
        .edges
        .iter()
        .map(|e| (label(&e.source), label(&e.target)))
        .collect()
}

fn node_type_of(graph: &RelationGraph, label: &str) -> NodeType {
    graph
        .nodes
        .iter()
        .find(|n| n.label.as_deref() == Some(label))
        .map(|n| n.node_type)
        .unwrap()
}

fn pair(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

#[test]
fn test_composite_recipe() {
    let mut claim = Resource::new("XInstanceClaim", XR_API, "my-claim");
    claim.metadata.namespace = Some("team-a".to_string());

    let nested_xr = Resource::new("XKube", XR_API, "nested-kube");
    let mut nested_claim = Resource::new("XProviderClaim", XR_API, "nested-claim");
    nested_claim.metadata.namespace = Some("team-a".to_string());
    let mut nested_claim_ref = Reference::new("XProviderClaim", XR_API, "nested-claim");
    nested_claim_ref.namespace = Some("team-a".to_string());

    let xr = CompositeResourceExtended {
        resource: Resource::new("XInstance", XR_API, "foo"),
        managed_resources: vec![
            managed(Resource::new("Bucket", "s3.aws/v1", "b1")),
            managed(nested_xr),
            managed(nested_claim),
        ],
        managed_resources_xrs: vec![Reference::new("XKube", XR_API, "nested-kube")],
        managed_resources_claims: vec![nested_claim_ref],
        composition: Some(Resource::new(
            "Composition",
            "apiextensions.crossplane.io/v1",
            "xinstance-aws",
        )),
        claim: Some(claim),
        parent_xr: Some(Resource::new("XKubeMesh", XR_API, "mesh")),
    };

    let graph = graph_from_composite(&xr);

    assert_eq!(graph.nodes.len(), 7);
    assert_eq!(graph.main_node().unwrap().label.as_deref(), Some("foo"));
    assert_eq!(
        edge_labels(&graph),
        vec![
            pair("foo", "my-claim"),
            pair("foo", "mesh"),
            pair("xinstance-aws", "foo"),
            pair("b1", "foo"),
            pair("nested-kube", "foo"),
            pair("nested-claim", "foo"),
        ]
    );
    assert_eq!(node_type_of(&graph, "b1"), NodeType::ManagedResource);
    assert_eq!(node_type_of(&graph, "nested-kube"), NodeType::CompositeResource);
    assert_eq!(node_type_of(&graph, "nested-claim"), NodeType::Claim);
    assert_eq!(node_type_of(&graph, "xinstance-aws"), NodeType::Composition);
}

#[test]
fn test_composite_without_composition_draws_not_found_node() {
    let xr = CompositeResourceExtended {
        resource: Resource::new("XInstance", XR_API, "foo"),
        ..Default::default()
    };

    let graph = graph_from_composite(&xr);

    assert_eq!(graph.nodes.len(), 2);
    let composition = graph
        .nodes
        .iter()
        .find(|n| n.node_type == NodeType::Composition)
        .unwrap();
    assert_eq!(composition.status, NodeStatus::NotFound);
    assert_eq!(composition.status_message, "Not Specified");
    assert!(composition.target.is_none());

    // The edge leaves the absent composition, so it is error styled
    assert_eq!(graph.edges[0].style, EdgeStyle::Error);
    assert_eq!(graph.edges[0].style.color(), Some("red"));
}

#[test]
fn test_claim_recipe_walks_nested_resources() {
    let inner_xr = with_external_name(Resource::new("Instance", "ec2.aws/v1", "vm"), "");
    let leaf = with_external_name(Resource::new("Bucket", "s3.aws/v1", "b1"), "bucket-abc");

    let nested = ManagedResourceExtended {
        resource: inner_xr,
        managed_resources: vec![managed(leaf)],
        ..Default::default()
    };

    let claim = ClaimExtended {
        resource: Resource::new("XInstanceClaim", XR_API, "my-claim"),
        composite_resource: Some(CompositeResourceExtended {
            resource: Resource::new("XInstance", XR_API, "foo"),
            managed_resources: vec![nested],
            ..Default::default()
        }),
        ..Default::default()
    };

    let graph = graph_from_claim(&claim);

    assert_eq!(graph.nodes.len(), 4);
    assert_eq!(
        edge_labels(&graph),
        vec![pair("my-claim", "foo"), pair("vm", "foo"), pair("b1", "vm")]
    );
    // Empty external-name means "not external", so it is drawn as a composite
    assert_eq!(node_type_of(&graph, "vm"), NodeType::CompositeResource);
    assert_eq!(node_type_of(&graph, "b1"), NodeType::ManagedResource);
}

#[test]
fn test_claim_without_composite() {
    let claim = ClaimExtended {
        resource: Resource::new("XInstanceClaim", XR_API, "pending"),
        ..Default::default()
    };

    let graph = graph_from_claim(&claim);

    assert_eq!(graph.nodes.len(), 2);
    assert_eq!(graph.edges.len(), 1);
    let xr = graph.node(&graph.edges[0].target).unwrap();
    assert_eq!(xr.status, NodeStatus::NotFound);
}

#[test]
fn test_managed_recipe() {
    let mr = ManagedResourceExtended {
        resource: Resource::new("Bucket", "s3.aws/v1", "b1"),
        composite: Some(Resource::new("XInstance", XR_API, "foo")),
        prov_config: Some(Resource::new(
            "ProviderConfig",
            "aws.upbound.io/v1beta1",
            "default",
        )),
        ..Default::default()
    };

    let graph = graph_from_managed(&mr);

    assert_eq!(
        edge_labels(&graph),
        vec![pair("b1", "foo"), pair("default", "b1")]
    );
    let config = graph
        .nodes
        .iter()
        .find(|n| n.node_type == NodeType::ProviderConfig)
        .unwrap();
    assert!(config.target.is_none());
    assert_eq!(
        graph
            .nodes
            .iter()
            .find(|n| n.label.as_deref() == Some("foo"))
            .unwrap()
            .target
            .as_deref(),
        Some("/composite/skycluster.io/v1alpha1/XInstance/foo")
    );
}

#[test]
fn test_edge_coloring_follows_source_status() {
    let not_synced = Resource::new("Bucket", "s3.aws/v1", "not-synced")
        .with_condition("Synced", "False", "ReconcileError");
    let unhealthy = Resource::new("Bucket", "s3.aws/v1", "unhealthy")
        .with_condition("Healthy", "False", "Degraded");
    let not_ready =
        Resource::new("Bucket", "s3.aws/v1", "not-ready").with_condition("Ready", "False", "");
    let ok = Resource::new("Bucket", "s3.aws/v1", "ok").with_condition("Ready", "True", "");

    let xr = CompositeResourceExtended {
        resource: Resource::new("XInstance", XR_API, "foo"),
        managed_resources: vec![
            managed(not_synced),
            managed(unhealthy),
            managed(not_ready),
            managed(ok),
        ],
        composition: Some(Resource::new(
            "Composition",
            "apiextensions.crossplane.io/v1",
            "c",
        )),
        ..Default::default()
    };

    let graph = graph_from_composite(&xr);
    let style_from = |label: &str| {
        let id = &graph
            .nodes
            .iter()
            .find(|n| n.label.as_deref() == Some(label))
            .unwrap()
            .id;
        graph.edges_from(id).next().unwrap().style
    };

    assert_eq!(style_from("not-synced"), EdgeStyle::Warning);
    assert_eq!(style_from("unhealthy"), EdgeStyle::Error);
    assert_eq!(style_from("not-ready"), EdgeStyle::Neutral);
    assert_eq!(style_from("ok"), EdgeStyle::Neutral);
    assert!(graph.edges.iter().all(|e| e.animated));
}

#[test]
fn test_graph_from_extended_dispatches_on_class() {
    let value = serde_json::json!({
        "apiVersion": XR_API,
        "kind": "XInstanceClaim",
        "metadata": {"name": "c1", "namespace": "team-a"},
        "compositeResource": {
            "apiVersion": XR_API,
            "kind": "XInstance",
            "metadata": {"name": "foo"}
        }
    });
    let resource = ExtendedResource::from_value(value).unwrap();

    let graph = graph_from_extended(&resource);
    let main = graph.main_node().unwrap();
    assert_eq!(main.node_type, NodeType::Claim);
    assert!(main.target.is_none());
    assert_eq!(graph.nodes.len(), 2);
}

#[test]
fn test_graph_serializes_for_the_view_layer() {
    let xr = CompositeResourceExtended {
        resource: Resource::new("XInstance", XR_API, "foo"),
        ..Default::default()
    };
    let json = serde_json::to_value(graph_from_composite(&xr)).unwrap();

    assert_eq!(json["nodes"][0]["nodeType"], "composed");
    assert_eq!(json["nodes"][0]["main"], true);
    assert_eq!(json["edges"][0]["style"], "Error");
    assert!(json.get("nodeIndex").is_none());
}
