//! Relation engine
//!
//! Derives relation graphs and incremental trees from control plane resources.
//!
//! Structure:
//! - `key.rs` - Canonical node identity
//! - `status.rs` - Condition list to coarse status
//! - `graph.rs` / `graph_builder.rs` - Relation graphs for one resource
//! - `store.rs` - Shared cache and in-flight fetch tracking
//! - `tree.rs` - Forest arena and owned tree views
//! - `tree_builder.rs` - Tree construction, expansion and refresh
//! - `render.rs` - Plain-text forest output

pub mod graph;
pub mod graph_builder;
pub mod key;
pub mod render;
pub mod status;
pub mod store;
pub mod tree;
pub mod tree_builder;

pub use graph::{EdgeStyle, GraphEdge, GraphNode, RelationGraph, color_from_label};
pub use graph_builder::{
    graph_from_claim, graph_from_composite, graph_from_extended, graph_from_managed,
};
pub use key::NodeKey;
pub use render::render_trees;
pub use status::{NOT_SPECIFIED, NodeStatus, resolve_status};
pub use store::{InFlightGuard, TreeStore};
pub use tree::{Forest, NodeId, TreeEntry, TreeNode};
pub use tree_builder::{
    Expansion, ExpansionRequest, FetchMode, NodeRefresh, RootKind, TreeBuilder, TreeOptions,
    default_excluded_kinds, default_root_kinds,
};
