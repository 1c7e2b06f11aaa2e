//! Coarse status resolution
//!
//! Maps a resource's condition list to a single status. The problem scan is
//! order-sensitive: the first problem category in `PROBLEM_ORDER` wins, not the
//! most severe one.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

use crate::models::Resource;

/// Coarse node status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeStatus {
    Ok,
    NotSynced,
    NotReady,
    Unhealthy,
    NotFound,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Ok => "Ok",
            NodeStatus::NotSynced => "Not Synced",
            NodeStatus::NotReady => "Not Ready",
            NodeStatus::Unhealthy => "Unhealthy",
            NodeStatus::NotFound => "Not Found",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, NodeStatus::Ok)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message reported for an absent resource
pub const NOT_SPECIFIED: &str = "Not Specified";

/// Condition types checked for problems, in priority order
const PROBLEM_ORDER: [(&str, NodeStatus); 4] = [
    ("Found", NodeStatus::NotFound),
    ("Healthy", NodeStatus::Unhealthy),
    ("Synced", NodeStatus::NotSynced),
    ("Ready", NodeStatus::NotReady),
];

/// Resolve a resource (or its absence) to `(status, message)`
pub fn resolve_status(resource: Option<&Resource>) -> (NodeStatus, String) {
    let Some(resource) = resource else {
        return (NodeStatus::NotFound, NOT_SPECIFIED.to_string());
    };

    // Later conditions of the same type overwrite earlier ones
    let problems: HashMap<&str, &str> = resource
        .conditions()
        .iter()
        .filter(|c| !c.is_true())
        .map(|c| (c.type_.as_str(), c.reason.as_str()))
        .collect();

    PROBLEM_ORDER
        .iter()
        .find_map(|(type_, status)| problems.get(type_).map(|reason| (*status, reason.to_string())))
        .unwrap_or((NodeStatus::Ok, String::new()))
}
