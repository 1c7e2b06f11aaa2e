//! Graph data structures for visualizing resource relationships
//!
//! A `RelationGraph` is ephemeral: it is rebuilt on every construction call and
//! holds unpositioned nodes and edges. Positioning belongs to the layout layer.

use serde::Serialize;
use std::collections::HashMap;

use crate::models::{NodeType, Resource};
use crate::relations::status::{NodeStatus, resolve_status};

/// Annotation naming the composition template entry a resource came from
pub const COMPOSITION_RESOURCE_NAME_ANNOTATION: &str = "crossplane.io/composition-resource-name";
/// Label carrying the provider display hint
pub const PROVIDER_NAME_LABEL: &str = "skycluster.io/provider-name";
/// Label carrying the region display hint
pub const PROVIDER_REGION_LABEL: &str = "skycluster.io/provider-region";

/// Palette used for provider/region chips
const CHIP_COLORS: [&str; 19] = [
    "purple",
    "lime",
    "blue-gray",
    "gray",
    "light-blue",
    "brown",
    "deep-orange",
    "orange",
    "amber",
    "yellow",
    "light-green",
    "green",
    "teal",
    "cyan",
    "blue",
    "indigo",
    "deep-purple",
    "pink",
    "red",
];

/// A node in the relation graph
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    /// Sequential identifier, unique within one graph
    pub id: String,
    pub node_type: NodeType,
    /// Resource name; `None` when the resource is absent
    pub label: Option<String>,
    pub api_version: Option<String>,
    pub kind: Option<String>,
    /// Template entry name, shown in place of the label when present
    pub composition_name: Option<String>,
    pub status: NodeStatus,
    pub status_message: String,
    pub provider: Option<String>,
    pub region: Option<String>,
    /// Palette color derived from provider and region
    pub color_hint: Option<&'static str>,
    /// The resource the graph was built for
    pub main: bool,
    /// Where clicking the node navigates; `None` means clicking does nothing
    pub target: Option<String>,
}

impl GraphNode {
    /// Text the node is rendered with
    pub fn display_label(&self) -> &str {
        self.composition_name
            .as_deref()
            .or(self.label.as_deref())
            .unwrap_or("")
    }
}

/// Edge styling, keyed off the source node's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EdgeStyle {
    Error,
    Warning,
    Neutral,
}

impl EdgeStyle {
    pub fn for_status(status: NodeStatus) -> Self {
        match status {
            NodeStatus::NotFound | NodeStatus::Unhealthy => EdgeStyle::Error,
            NodeStatus::NotSynced => EdgeStyle::Warning,
            NodeStatus::Ok | NodeStatus::NotReady => EdgeStyle::Neutral,
        }
    }

    /// Stroke and arrow color; `None` keeps the renderer default
    pub fn color(&self) -> Option<&'static str> {
        match self {
            EdgeStyle::Error => Some("red"),
            EdgeStyle::Warning => Some("orange"),
            EdgeStyle::Neutral => None,
        }
    }
}

/// A directed edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub style: EdgeStyle,
    pub animated: bool,
}

/// Nodes and edges for one relation view
#[derive(Debug, Clone, Default, Serialize)]
pub struct RelationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    /// Map from node ID to index in nodes vector
    #[serde(skip)]
    pub node_index: HashMap<String, usize>,
    #[serde(skip)]
    next_id: u64,
}

impl RelationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    /// Add a node for `resource` (which may be absent) and return its id
    pub fn add_node(
        &mut self,
        node_type: NodeType,
        resource: Option<&Resource>,
        is_main: bool,
    ) -> String {
        let (status, status_message) = resolve_status(resource);
        let target = if is_main || status == NodeStatus::NotFound {
            None
        } else {
            resource.and_then(|res| navigation_target(node_type, res))
        };

        let provider = resource.and_then(|r| r.label(PROVIDER_NAME_LABEL).map(str::to_string));
        let region = resource.and_then(|r| r.label(PROVIDER_REGION_LABEL).map(str::to_string));
        let color_hint = provider
            .as_deref()
            .and_then(|p| color_from_label(p, region.as_deref()));

        let id = self.allocate_id();
        let node = GraphNode {
            id: id.clone(),
            node_type,
            label: resource.map(|r| r.metadata.name.clone()),
            api_version: resource.map(|r| r.api_version.clone()),
            kind: resource.map(|r| r.kind.clone()),
            composition_name: resource.and_then(|r| {
                r.annotation(COMPOSITION_RESOURCE_NAME_ANNOTATION)
                    .map(str::to_string)
            }),
            status,
            status_message,
            provider,
            region,
            color_hint,
            main: is_main,
            target,
        };

        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Add a directed edge styled by the source node's status
    pub fn add_edge(&mut self, source: &str, target: &str) {
        let style = self
            .node(source)
            .map(|n| EdgeStyle::for_status(n.status))
            .unwrap_or(EdgeStyle::Neutral);

        let id = self.allocate_id();
        self.edges.push(GraphEdge {
            id,
            source: source.to_string(),
            target: target.to_string(),
            style,
            animated: true,
        });
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.node_index.get(id).and_then(|&i| self.nodes.get(i))
    }

    /// The main node, if one was added
    pub fn main_node(&self) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.main)
    }

    /// Edges leaving the given node
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges.iter().filter(move |e| e.source == id)
    }
}

/// Path a click on the node should navigate to
pub fn navigation_target(node_type: NodeType, resource: &Resource) -> Option<String> {
    let name = &resource.metadata.name;
    match node_type {
        NodeType::Claim => Some(format!(
            "/claims/{}/{}/{}/{}",
            resource.api_version,
            resource.kind,
            resource.metadata.namespace.as_deref().unwrap_or(""),
            name
        )),
        NodeType::Composition => Some(format!("/compositions/{}", name)),
        NodeType::CompositeResource => Some(format!(
            "/composite/{}/{}/{}",
            resource.api_version, resource.kind, name
        )),
        NodeType::ManagedResource => Some(format!(
            "/managed/{}/{}/{}",
            resource.api_version, resource.kind, name
        )),
        other => {
            tracing::warn!("Unhandled node type {} for {}", other, resource.key());
            None
        }
    }
}

/// Stable palette color for a provider (and optional region) label.
///
/// The first three characters of the provider, joined with the region when
/// given, are summed by character code and mapped onto the palette.
pub fn color_from_label(first: &str, second: Option<&str>) -> Option<&'static str> {
    if first.is_empty() {
        return None;
    }
    let prefix: String = first.chars().take(3).collect();
    let label = match second {
        Some(second) if !second.is_empty() => format!("{}{}", prefix, second),
        _ => prefix,
    };
    let hash: u64 = label.to_lowercase().chars().map(|c| c as u64).sum();
    Some(CHIP_COLORS[(hash % CHIP_COLORS.len() as u64) as usize])
}
