//! Node type definitions
//!
//! Centralized enum for the kinds of nodes a relation graph can show. Keeps
//! the type strings used by the visualization layer in one place.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Type of a node in a relation graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Claim,
    Composition,
    CompositeResource,
    ManagedResource,
    ProviderConfig,
}

impl NodeType {
    /// Identifier used by the visualization layer to pick a node renderer
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Claim => "claim",
            NodeType::Composition => "composition",
            NodeType::CompositeResource => "composed",
            NodeType::ManagedResource => "managed",
            NodeType::ProviderConfig => "provConfig",
        }
    }

    /// Human readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            NodeType::Claim => "Claim",
            NodeType::Composition => "Composition",
            NodeType::CompositeResource => "Composite Resource",
            NodeType::ManagedResource => "Managed Resource",
            NodeType::ProviderConfig => "Provider Config",
        }
    }

    /// Try to parse a string into a NodeType, returning None if invalid
    pub fn parse_optional(s: &str) -> Option<Self> {
        s.parse().ok()
    }

    pub fn all() -> &'static [Self] {
        &[
            NodeType::Claim,
            NodeType::Composition,
            NodeType::CompositeResource,
            NodeType::ManagedResource,
            NodeType::ProviderConfig,
        ]
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for NodeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeType::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown node type: {}", s))
    }
}
