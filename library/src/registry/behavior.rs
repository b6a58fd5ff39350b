//! The extension surface every node type implements.

use crate::error::Result;
use crate::graph::SceneGraph;
use crate::model::connection::ConnectionTarget;
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{TryGetValue, Value};
use crate::stage::{PrimSpec, ScenePath, Stage};

/// What a node sees while it is applied.
pub struct ApplyContext<'a> {
    pub graph: &'a SceneGraph,
    pub node: &'a Node,
    pub time: f64,
}

impl<'a> ApplyContext<'a> {
    pub fn new(graph: &'a SceneGraph, node: &'a Node, time: f64) -> Self {
        Self { graph, node, time }
    }

    /// Effective parameter value, following connections.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.graph.evaluate_parameter(self.node.id(), name, self.time)
    }

    pub fn get<T: TryGetValue<T>>(&self, name: &str) -> Option<T> {
        self.value(name)?.get_as::<T>()
    }

    pub fn string(&self, name: &str) -> String {
        self.get::<String>(name).unwrap_or_default()
    }

    pub fn strings(&self, name: &str) -> Vec<String> {
        self.get::<Vec<String>>(name).unwrap_or_default()
    }

    /// Document connection source (`/path.attribute`) for a parameter connection.
    pub fn connection_source(&self, target: &ConnectionTarget) -> Option<String> {
        let node = self.graph.node_by_name(&target.node)?;
        node.param(&target.parameter)?;
        let path = node.paths().first()?.strip_variant_selections();
        Some(format!("{}.{}", path, target.parameter))
    }
}

/// Behavior of one node type.
///
/// Nodes are plain data; the graph looks the behavior up by type name
/// whenever a node is created, imported or applied.
pub trait NodeBehavior: Send + Sync {
    /// Parameters every new instance starts with, besides the built-ins.
    fn parameters(&self) -> Vec<Parameter> {
        Vec::new()
    }

    /// Captures the values found on an existing prim into a new node.
    fn import_prim(&self, _node: &mut Node, _prim: &PrimSpec) {}

    /// Writes the node's effect and returns the path its children build on.
    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath>;

    /// `(set, variant)` when the node re-enters a variant edit context.
    fn variant_switch(&self, _ctx: &ApplyContext<'_>) -> Option<(String, String)> {
        None
    }
}

/// Generic node: passes the context through untouched.
pub struct PassThrough;

impl NodeBehavior for PassThrough {
    fn apply(&self, _ctx: &ApplyContext<'_>, _stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        Ok(path.clone())
    }
}
