//! Plain-text forest rendering

use std::fmt::Write;

use crate::relations::status::NodeStatus;
use crate::relations::tree::TreeNode;

/// Render trees as indented text, one node per line.
///
/// With `follow_expanded` set, children of collapsed nodes are left out the
/// way an interactive view would hide them.
pub fn render_trees(trees: &[TreeNode], follow_expanded: bool) -> String {
    let mut out = String::new();
    if trees.is_empty() {
        out.push_str("No resources found\n");
        return out;
    }
    for tree in trees {
        render_node(&mut out, tree, "", "", follow_expanded);
    }
    out
}

fn render_node(out: &mut String, node: &TreeNode, lead: &str, rest: &str, follow_expanded: bool) {
    let _ = writeln!(out, "{}{}", lead, node_line(node));

    let open = !follow_expanded || node.expanded;
    if !open {
        return;
    }

    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let (branch, indent) = if last {
            ("└─ ", "   ")
        } else {
            ("├─ ", "│  ")
        };
        render_node(
            out,
            child,
            &format!("{}{}", rest, branch),
            &format!("{}{}", rest, indent),
            follow_expanded,
        );
    }
}

fn node_line(node: &TreeNode) -> String {
    let mut line = format!("{} {}", node.display_kind(), node.title());

    if node.resource.is_placeholder() {
        let message = node
            .resource
            .condition(crate::models::resource::ERROR_CONDITION_TYPE)
            .and_then(|c| c.message.as_deref())
            .unwrap_or("");
        let _ = write!(line, " [FetchFailed: {}]", message);
    } else {
        let (status, message) = node.status();
        let _ = write!(
            line,
            " [ready={} synced={}]",
            yes_no(node.ready()),
            yes_no(node.synced())
        );
        if status != NodeStatus::Ok {
            if message.is_empty() {
                let _ = write!(line, " {}", status);
            } else {
                let _ = write!(line, " {}: {}", status, message);
            }
        }
    }

    if node.cycle {
        line.push_str(" (cycle)");
    } else if node.pending > 0 {
        let _ = write!(
            line,
            " (expand to load {} child{})",
            node.pending,
            if node.pending == 1 { "" } else { "ren" }
        );
    }
    line
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
