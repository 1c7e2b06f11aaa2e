//! xrtree library
//!
//! Relation graph and incremental tree engine for a composite-resource control
//! plane dashboard. The binary is a thin CLI over this crate; the library is
//! also what the integration tests drive.

pub mod cli;
pub mod client;
pub mod config;
pub mod kube;
pub mod models;
pub mod relations;
pub mod scheduler;

// Re-export commonly used types for convenience
pub use client::{FetchError, FetchResult, HttpResourceClient, ResourceClient};
pub use models::{ExtendedResource, Reference, Resource};
pub use relations::{
    Forest, NodeId, NodeKey, NodeStatus, RelationGraph, TreeBuilder, TreeNode, TreeOptions,
    resolve_status,
};
pub use scheduler::{Command, RefreshIntervals, RefreshScheduler, SchedulerHandle, TreeView};
