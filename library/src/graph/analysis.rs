//! Structural queries over the execution tree.

use std::collections::HashSet;

use super::SceneGraph;
use crate::model::node::NodeId;

/// Validate a reparent before applying it.
///
/// Checks:
/// - Both nodes exist
/// - No self-connections
/// - The root never becomes a child
/// - No cycles
pub fn validate_reparent(graph: &SceneGraph, parent: NodeId, child: NodeId) -> Result<(), String> {
    if graph.node(parent).is_none() {
        return Err(format!("Parent node {} not found", parent));
    }
    if graph.node(child).is_none() {
        return Err(format!("Child node {} not found", child));
    }
    if parent == child {
        return Err("Cannot connect a node to itself".to_string());
    }
    if child == graph.root() {
        return Err("The root node cannot have a parent".to_string());
    }
    if is_ancestor(graph, child, parent) {
        return Err("Connection would create a cycle".to_string());
    }
    Ok(())
}

/// Whether `ancestor` lies on the parent chain of `node` (or is `node`).
pub fn is_ancestor(graph: &SceneGraph, ancestor: NodeId, node: NodeId) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(node);
    while let Some(id) = current {
        if id == ancestor {
            return true;
        }
        if !visited.insert(id) {
            break;
        }
        current = graph.node(id).and_then(|n| n.parent());
    }
    false
}

/// `start` and every node below it, parents before children, children in list order.
pub fn subtree(graph: &SceneGraph, start: NodeId) -> Vec<NodeId> {
    let mut order = Vec::new();
    let mut visited = HashSet::new();
    let mut stack = vec![start];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            continue;
        }
        let Some(node) = graph.node(id) else {
            continue;
        };
        order.push(id);
        stack.extend(node.children().iter().rev().copied());
    }
    order
}

/// Every node reachable from the root in execution order.
pub fn preorder(graph: &SceneGraph) -> Vec<NodeId> {
    subtree(graph, graph.root())
}
