//! Model layer
//!
//! Rust types for the control plane objects the relation engine reads.
//!
//! Structure:
//! - `resource.rs` - Base resource, references and conditions
//! - `extended.rs` - Extended ("full") payloads and their classifier
//! - `node_type.rs` - Graph node types

pub mod extended;
pub mod node_type;
pub mod resource;

pub use extended::{
    ClaimExtended, CompositeResourceExtended, ExtendedResource, ManagedResourceExtended,
    ResourceClass, classify,
};
pub use node_type::NodeType;
pub use resource::{
    Condition, ItemList, Metadata, Reference, Resource, ResourceSpec, Status, split_api_version,
};
