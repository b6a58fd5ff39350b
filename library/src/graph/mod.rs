//! The node graph: an arena of nodes arranged as a tree rooted at a single
//! Root node, plus the live and scratch documents it composes into.
//!
//! Every edit goes through `SceneGraph` so label refreshes, event dispatch,
//! path invalidation and live recomposition happen in one place.

pub mod analysis;
pub mod clipboard;
pub mod execute;
pub mod import;
pub mod naming;
pub mod resync;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::error::{LibraryError, Result};
use crate::events::{EventBus, GraphEvent};
use crate::model::connection::{ConnectionTarget, PinId, PortLink};
use crate::model::node::{NAME_PARAM, Node, NodeId, POSITION_PARAM};
use crate::model::parameter::Parameter;
use crate::model::time_samples::TimeSamples;
use crate::model::value::{Value, Vec2};
use crate::nodes::ROOT;
use crate::registry::NodeRegistry;
use crate::stage::{ScenePath, Stage};

pub struct SceneGraph {
    nodes: Vec<Option<Node>>,
    names: HashMap<String, NodeId>,
    path_index: BTreeMap<ScenePath, Vec<NodeId>>,
    paths_dirty: bool,
    root: NodeId,
    registry: Arc<NodeRegistry>,
    events: EventBus,
    /// The document being edited; replaced wholesale by `apply_changes`.
    document: Stage,
    /// Result of the latest recomposition.
    composition: Stage,
    live_update: bool,
    batch_depth: usize,
    recompose_pending: bool,
    recompose_count: usize,
    time: f64,
}

impl std::fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneGraph")
            .field("nodes", &self.len())
            .field("root", &self.root)
            .field("live_update", &self.live_update)
            .field("time", &self.time)
            .finish()
    }
}

impl SceneGraph {
    /// An empty graph holding only the Root node.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        let root = NodeId(0);
        let root_node = registry
            .instantiate(root, ROOT, ROOT)
            .unwrap_or_else(|| Node::new(root, ROOT, ROOT, ""));
        let mut names = HashMap::new();
        names.insert(root_node.name(), root);
        Self {
            nodes: vec![Some(root_node)],
            names,
            path_index: BTreeMap::new(),
            paths_dirty: true,
            root,
            registry,
            events: EventBus::new(),
            document: Stage::new(),
            composition: Stage::new(),
            live_update: false,
            batch_depth: 0,
            recompose_pending: false,
            recompose_count: 0,
            time: 0.0,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)?.as_ref()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0)?.as_mut()
    }

    pub fn node_by_name(&self, name: &str) -> Option<&Node> {
        self.node(*self.names.get(name)?)
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Live nodes in arena order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().flatten()
    }

    pub fn len(&self) -> usize {
        self.nodes().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    // --- Structure ---

    /// Creates a node of a registered type under `parent` (the root when `None`).
    ///
    /// The requested name (or the type name) is made unique. Unknown types and
    /// a second Root are refused with a warning.
    pub fn create_node(
        &mut self,
        type_name: &str,
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> Option<NodeId> {
        let id = self.attach_new(type_name, name, parent)?;
        let name = self.node(id).map(Node::name).unwrap_or_default();
        debug!("Created {} node {}", type_name, name);
        self.events.emit(&GraphEvent::NodeCreated { node: name });
        self.structure_changed();
        Some(id)
    }

    /// Instantiates and links a node without notifying anyone.
    pub(crate) fn attach_new(
        &mut self,
        type_name: &str,
        name: Option<&str>,
        parent: Option<NodeId>,
    ) -> Option<NodeId> {
        if type_name == ROOT {
            warn!("A graph has exactly one Root node");
            return None;
        }
        let parent = parent.unwrap_or(self.root);
        if self.node(parent).is_none() {
            warn!("Parent node {} not found", parent);
            return None;
        }
        let name = naming::unique_name(name.unwrap_or(type_name), |n| self.is_taken(n));
        let id = NodeId(self.nodes.len());
        let node = self.registry.instantiate(id, type_name, &name)?;
        self.insert(node, Some(parent));
        Some(id)
    }

    /// Stores a built node in the arena and links it under `parent`.
    pub(crate) fn insert(&mut self, mut node: Node, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        if node.id() != id {
            warn!("Node {} stored as {}", node.id(), id);
        }
        node.set_parent(parent);
        self.names.insert(node.name(), id);
        self.nodes.push(Some(node));
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children_mut().push(id);
        }
        self.paths_dirty = true;
        id
    }

    /// Removes one node; its children move to its parent in its place.
    pub fn delete_node(&mut self, id: NodeId) -> bool {
        if id == self.root {
            warn!("The root node cannot be deleted");
            return false;
        }
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        let children = node.children().to_vec();
        let parent = node.parent();
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            let siblings = parent.children_mut();
            let index = siblings.iter().position(|&c| c == id).unwrap_or(siblings.len());
            siblings.retain(|&c| c != id);
            let index = index.min(siblings.len());
            for (offset, &child) in children.iter().enumerate() {
                siblings.insert(index + offset, child);
            }
        }
        for &child in &children {
            if let Some(child) = self.node_mut(child) {
                child.set_parent(parent);
            }
        }
        self.forget(&node);
        self.structure_changed();
        true
    }

    /// Removes a node and everything below it. Returns how many nodes went.
    pub fn delete_subtree(&mut self, id: NodeId) -> usize {
        if id == self.root {
            warn!("The root node cannot be deleted");
            return 0;
        }
        let Some(parent) = self.node(id).map(Node::parent) else {
            return 0;
        };
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children_mut().retain(|&c| c != id);
        }
        let doomed = analysis::subtree(self, id);
        for &doomed_id in &doomed {
            if let Some(node) = self.nodes.get_mut(doomed_id.0).and_then(Option::take) {
                self.forget(&node);
            }
        }
        self.structure_changed();
        doomed.len()
    }

    /// Drops the name and severs every connection naming the removed node.
    fn forget(&mut self, node: &Node) {
        let name = node.name();
        self.names.remove(&name);
        for other in self.nodes.iter_mut().flatten() {
            let mut severed = false;
            for param in other.params_mut() {
                severed |= param.sever_connections_to(&name);
            }
            if severed {
                debug!("Severed connections from {} to {}", other.name(), name);
            }
        }
        self.events.emit(&GraphEvent::NodeDeleted { node: name });
    }

    /// Makes `child` the last child of `parent`. Invalid edits are ignored.
    pub fn connect(&mut self, parent: NodeId, child: NodeId) -> bool {
        if let Err(reason) = analysis::validate_reparent(self, parent, child) {
            debug!("Ignoring connection {} -> {}: {}", parent, child, reason);
            return false;
        }
        let old_parent = self.node(child).and_then(Node::parent);
        if let Some(old) = old_parent.and_then(|p| self.node_mut(p)) {
            old.children_mut().retain(|&c| c != child);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children_mut().push(child);
        }
        if let Some(node) = self.node_mut(child) {
            node.set_parent(Some(parent));
        }
        self.structure_changed();
        true
    }

    /// Moves `child` to `index` among its siblings.
    pub fn reorder_child(&mut self, parent: NodeId, child: NodeId, index: usize) -> bool {
        let Some(node) = self.node_mut(parent) else {
            return false;
        };
        let children = node.children_mut();
        let Some(current) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(current);
        let index = index.min(children.len());
        children.insert(index, child);
        self.structure_changed();
        true
    }

    /// Renames a node, uniquifying the name and rewriting connections to it.
    pub fn rename_node(&mut self, id: NodeId, requested: &str) -> Option<String> {
        let old = self.node(id)?.name();
        let new = naming::unique_name(requested, |n| {
            self.names.get(n).is_some_and(|&other| other != id)
        });
        if new == old {
            return Some(new);
        }
        self.names.remove(&old);
        self.names.insert(new.clone(), id);
        if let Some(node) = self.node_mut(id) {
            node.set_name(&new);
        }
        for node in self.nodes.iter_mut().flatten() {
            for param in node.params_mut() {
                param.rename_connection_node(&old, &new);
            }
            node.refresh_label();
        }
        info!("Renamed {} to {}", old, new);
        self.parameter_changed(id, NAME_PARAM);
        Some(new)
    }

    pub fn set_position(&mut self, id: NodeId, position: Vec2) -> bool {
        let Some(node) = self.node_mut(id) else {
            return false;
        };
        node.set_position(position);
        let name = node.name();
        self.events.emit(&GraphEvent::ParameterValueChanged {
            node: name,
            parameter: POSITION_PARAM.to_string(),
        });
        // Layer order follows position.
        self.request_recompose();
        true
    }

    // --- Parameters ---

    /// Writes an override value. `name` and `position` route to their
    /// dedicated edits.
    pub fn set_parameter_value(&mut self, id: NodeId, name: &str, value: Value) -> Result<()> {
        match name {
            NAME_PARAM => {
                let requested = value.get_as::<String>().unwrap_or_default();
                self.rename_node(id, &requested)
                    .map(|_| ())
                    .ok_or_else(|| LibraryError::node_not_found(id))
            }
            POSITION_PARAM => {
                let position = value.get_as::<Vec2>().ok_or_else(|| {
                    LibraryError::UnsupportedType(format!("position {}", value))
                })?;
                self.set_position(id, position);
                Ok(())
            }
            _ => {
                self.param_mut_checked(id, name)?.set_value(value)?;
                self.parameter_changed(id, name);
                Ok(())
            }
        }
    }

    pub fn set_parameter_time_samples(
        &mut self,
        id: NodeId,
        name: &str,
        samples: Option<TimeSamples>,
    ) -> Result<()> {
        self.param_mut_checked(id, name)?.set_time_samples(samples);
        self.parameter_changed(id, name);
        Ok(())
    }

    /// Connects a parameter to `<node>.<parameter>`, or clears it with `None`.
    pub fn set_parameter_connection(
        &mut self,
        id: NodeId,
        name: &str,
        target: Option<ConnectionTarget>,
    ) -> Result<()> {
        let own_name = self.node(id).ok_or_else(|| LibraryError::node_not_found(id))?.name();
        if let Some(target) = &target {
            if target.node == own_name {
                return Err(LibraryError::InvalidConnection(format!(
                    "{} cannot connect to itself",
                    target
                )));
            }
            let source = self
                .node_by_name(&target.node)
                .ok_or_else(|| LibraryError::node_not_found(&target.node))?;
            if source.param(&target.parameter).is_none() {
                return Err(LibraryError::parameter_not_found(&target.node, &target.parameter));
            }
        }
        self.param_mut_checked(id, name)?.set_connection(target);
        self.parameter_changed(id, name);
        Ok(())
    }

    pub fn revert_parameter(&mut self, id: NodeId, name: &str) -> Result<()> {
        self.param_mut_checked(id, name)?.revert();
        self.parameter_changed(id, name);
        Ok(())
    }

    pub fn add_dynamic_parameter(&mut self, id: NodeId, param: Parameter) -> bool {
        let name = param.name().to_string();
        let added = self.node_mut(id).is_some_and(|node| node.add_parameter(param));
        if added {
            self.parameter_changed(id, &name);
        }
        added
    }

    pub fn remove_dynamic_parameter(&mut self, id: NodeId, name: &str) -> Option<Parameter> {
        let removed = self.node_mut(id)?.remove_parameter(name)?;
        self.parameter_changed(id, name);
        Some(removed)
    }

    fn param_mut_checked(&mut self, id: NodeId, name: &str) -> Result<&mut Parameter> {
        let node = self.node_mut(id).ok_or_else(|| LibraryError::node_not_found(id))?;
        let node_name = node.name();
        node.param_mut(name)
            .ok_or_else(|| LibraryError::parameter_not_found(&node_name, name))
    }

    /// Label refresh, notification and invalidation after any parameter edit.
    fn parameter_changed(&mut self, id: NodeId, parameter: &str) {
        let Some(node) = self.node_mut(id) else {
            return;
        };
        node.refresh_label();
        let name = node.name();
        self.events.emit(&GraphEvent::ParameterValueChanged {
            node: name,
            parameter: parameter.to_string(),
        });
        self.structure_changed();
    }

    /// Effective value of a parameter at `time`, following connections.
    ///
    /// A connection whose target is gone, or that loops back on itself,
    /// yields `None`.
    pub fn evaluate_parameter(&self, id: NodeId, name: &str, time: f64) -> Option<Value> {
        let mut visited = HashSet::new();
        self.evaluate_from(id, name, time, &mut visited)
    }

    fn evaluate_from(
        &self,
        id: NodeId,
        name: &str,
        time: f64,
        visited: &mut HashSet<(NodeId, String)>,
    ) -> Option<Value> {
        let node = self.node(id)?;
        if node.is_live_property(name) {
            return Some(node.get_value(name, time));
        }
        let param = node.param(name)?;
        let Some(target) = param.connection() else {
            return Some(param.get_value(time));
        };
        if !visited.insert((id, name.to_string())) {
            warn!("Connection cycle at {}.{}", node.name(), name);
            return None;
        }
        let Some(source) = self.node_by_name(&target.node) else {
            warn!("{}.{}: connection target {} not found", node.name(), name, target);
            return None;
        };
        if source.param(&target.parameter).is_none() && !source.is_live_property(&target.parameter) {
            warn!("{}.{}: connection target {} not found", node.name(), name, target);
            return None;
        }
        self.evaluate_from(source.id(), &target.parameter, time, visited)
    }

    /// Port-to-port value connections, derived from parameter connections.
    pub fn port_links(&self) -> Vec<PortLink> {
        let mut links = Vec::new();
        for node in self.nodes() {
            for param in node.params() {
                let Some(target) = param.connection() else {
                    continue;
                };
                let Some(source) = self.node_id(&target.node) else {
                    continue;
                };
                links.push(PortLink {
                    from: PinId::new(source, &target.parameter),
                    to: PinId::new(node.id(), param.name()),
                });
            }
        }
        links
    }

    // --- Live Update ---

    pub fn live_update(&self) -> bool {
        self.live_update
    }

    pub fn set_live_update(&mut self, enabled: bool) {
        self.live_update = enabled;
    }

    /// Runs `edit` with recomposition deferred; at most one recomposition
    /// runs afterwards, and only if an edit asked for it.
    pub fn batch<R>(&mut self, edit: impl FnOnce(&mut SceneGraph) -> R) -> R {
        self.batch_depth += 1;
        let result = edit(self);
        self.batch_depth -= 1;
        if self.batch_depth == 0 && self.recompose_pending {
            self.recompose_pending = false;
            if self.live_update {
                self.recompose();
            }
        }
        result
    }

    fn structure_changed(&mut self) {
        self.paths_dirty = true;
        self.request_recompose();
    }

    fn request_recompose(&mut self) {
        if !self.live_update {
            return;
        }
        if self.batch_depth > 0 {
            self.recompose_pending = true;
        } else {
            self.recompose();
        }
    }

    /// Re-executes the whole graph into the scratch composition.
    pub fn recompose(&mut self) -> &Stage {
        self.composition = self.export_to_document();
        self.recompose_count += 1;
        let nodes = self.len();
        self.events.emit(&GraphEvent::GraphExecuted { nodes });
        &self.composition
    }

    /// How many recompositions have run so far.
    pub fn recompose_count(&self) -> usize {
        self.recompose_count
    }

    pub fn composition(&self) -> &Stage {
        &self.composition
    }

    pub fn document(&self) -> &Stage {
        &self.document
    }

    /// Recomposes and swaps the result in as the live document.
    pub fn apply_changes(&mut self) -> &Stage {
        let composed = self.export_to_document();
        self.composition = composed.clone();
        self.document = composed;
        info!("Applied layer changes ({} root prims)", self.document.prims().len());
        self.events.emit(&GraphEvent::LayerChangesApplied);
        &self.document
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn set_time(&mut self, time: f64) {
        self.time = time;
        self.events.emit(&GraphEvent::StageTimeChanged { time });
        self.request_recompose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::value::ValueType;
    use crate::nodes::prim::PRIM_NAME;
    use crate::nodes::{ATTRIBUTE_SET, PRIM_DEFINE};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn graph() -> SceneGraph {
        SceneGraph::new(Arc::new(NodeRegistry::with_builtins()))
    }

    #[test]
    fn test_new_graph_has_root() {
        let graph = graph();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.node(graph.root()).unwrap().type_name(), ROOT);
        assert!(graph.is_empty());
    }

    #[test]
    fn test_create_refuses_unknown_and_second_root() {
        let mut graph = graph();
        assert!(graph.create_node("Teapot", None, None).is_none());
        assert!(graph.create_node(ROOT, None, None).is_none());
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_delete_splices_children() {
        let mut graph = graph();
        let a = graph.create_node(PRIM_DEFINE, Some("A"), None).unwrap();
        let b = graph.create_node(PRIM_DEFINE, Some("B"), Some(a)).unwrap();
        let c = graph.create_node(PRIM_DEFINE, Some("C"), Some(a)).unwrap();
        let d = graph.create_node(PRIM_DEFINE, Some("D"), None).unwrap();

        assert!(graph.delete_node(a));
        let root = graph.node(graph.root()).unwrap();
        assert_eq!(root.children(), &[b, c, d]);
        assert_eq!(graph.node(b).unwrap().parent(), Some(graph.root()));
        assert!(graph.node_by_name("A").is_none());
        assert!(!graph.delete_node(graph.root()));
    }

    #[test]
    fn test_delete_subtree() {
        let mut graph = graph();
        let a = graph.create_node(PRIM_DEFINE, Some("A"), None).unwrap();
        graph.create_node(PRIM_DEFINE, Some("B"), Some(a)).unwrap();
        assert_eq!(graph.delete_subtree(a), 2);
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_delete_severs_connections() {
        let mut graph = graph();
        let a = graph.create_node(ATTRIBUTE_SET, Some("A"), None).unwrap();
        let b = graph.create_node(ATTRIBUTE_SET, Some("B"), None).unwrap();
        graph.add_dynamic_parameter(a, Parameter::new("size", ValueType::Double));
        graph.add_dynamic_parameter(b, Parameter::new("size", ValueType::Double));
        graph
            .set_parameter_connection(b, "size", Some(ConnectionTarget::new("A", "size")))
            .unwrap();
        assert_eq!(graph.port_links().len(), 1);

        graph.delete_node(a);
        assert!(graph.node(b).unwrap().param("size").unwrap().connection().is_none());
        assert!(graph.port_links().is_empty());
    }

    #[test]
    fn test_connect_rejects_invalid_edges() {
        let mut graph = graph();
        let a = graph.create_node(PRIM_DEFINE, Some("A"), None).unwrap();
        let b = graph.create_node(PRIM_DEFINE, Some("B"), Some(a)).unwrap();
        assert!(!graph.connect(a, a));
        assert!(!graph.connect(b, a));
        assert!(!graph.connect(a, graph.root()));
        assert!(graph.connect(graph.root(), b));
        assert_eq!(graph.node(b).unwrap().parent(), Some(graph.root()));
        assert!(graph.node(a).unwrap().children().is_empty());
    }

    #[test]
    fn test_reorder_child() {
        let mut graph = graph();
        let a = graph.create_node(PRIM_DEFINE, Some("A"), None).unwrap();
        let b = graph.create_node(PRIM_DEFINE, Some("B"), None).unwrap();
        assert!(graph.reorder_child(graph.root(), b, 0));
        assert_eq!(graph.node(graph.root()).unwrap().children(), &[b, a]);
    }

    #[test]
    fn test_rename_rewrites_connections() {
        let mut graph = graph();
        let tex = graph.create_node(ATTRIBUTE_SET, Some("Tex"), None).unwrap();
        let other = graph.create_node(ATTRIBUTE_SET, Some("Other"), None).unwrap();
        graph.add_dynamic_parameter(tex, Parameter::new("rgb", ValueType::Color3f));
        graph.add_dynamic_parameter(other, Parameter::new("rgb", ValueType::Color3f));
        graph
            .set_parameter_connection(other, "rgb", Some(ConnectionTarget::new("Tex", "rgb")))
            .unwrap();

        graph
            .set_parameter_value(tex, NAME_PARAM, Value::from("Other"))
            .unwrap();
        assert_eq!(graph.node(tex).unwrap().name(), "Other1");
        let connection = graph.node(other).unwrap().param("rgb").unwrap().connection().cloned();
        assert_eq!(connection, Some(ConnectionTarget::new("Other1", "rgb")));
        assert_eq!(graph.node_id("Other1"), Some(tex));
    }

    #[test]
    fn test_connection_validation() {
        let mut graph = graph();
        let a = graph.create_node(ATTRIBUTE_SET, Some("A"), None).unwrap();
        graph.add_dynamic_parameter(a, Parameter::new("size", ValueType::Double));
        assert!(
            graph
                .set_parameter_connection(a, "size", Some(ConnectionTarget::new("A", "size")))
                .is_err()
        );
        assert!(
            graph
                .set_parameter_connection(a, "size", Some(ConnectionTarget::new("Gone", "size")))
                .is_err()
        );
        assert!(graph.node(a).unwrap().param("size").unwrap().connection().is_none());
    }

    #[test]
    fn test_evaluate_follows_connections_and_stops_cycles() {
        let mut graph = graph();
        let a = graph.create_node(ATTRIBUTE_SET, Some("A"), None).unwrap();
        let b = graph.create_node(ATTRIBUTE_SET, Some("B"), None).unwrap();
        for id in [a, b] {
            graph.add_dynamic_parameter(id, Parameter::new("size", ValueType::Double));
        }
        graph.set_parameter_value(a, "size", Value::from(4.0)).unwrap();
        graph
            .set_parameter_connection(b, "size", Some(ConnectionTarget::new("A", "size")))
            .unwrap();
        assert_eq!(graph.evaluate_parameter(b, "size", 0.0), Some(Value::from(4.0)));

        graph
            .set_parameter_connection(a, "size", Some(ConnectionTarget::new("B", "size")))
            .unwrap();
        assert_eq!(graph.evaluate_parameter(b, "size", 0.0), None);
    }

    #[test]
    fn test_parameter_events_fire_synchronously() {
        let mut graph = graph();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        graph
            .events_mut()
            .subscribe(crate::events::PARAMETER_VALUE_CHANGED, move |event| {
                sink.borrow_mut().push(event.clone());
                Ok(())
            });
        let world = graph.create_node(PRIM_DEFINE, Some("World"), None).unwrap();
        graph
            .set_parameter_value(world, PRIM_NAME, Value::from("World"))
            .unwrap();

        assert_eq!(
            seen.borrow().as_slice(),
            &[GraphEvent::ParameterValueChanged {
                node: "World".to_string(),
                parameter: PRIM_NAME.to_string(),
            }]
        );
        assert_eq!(graph.node(world).unwrap().display_label(), "World");
    }

    #[test]
    fn test_live_update_batches_into_one_recompose() {
        let mut graph = graph();
        graph.set_live_update(true);
        let world = graph.create_node(PRIM_DEFINE, Some("World"), None).unwrap();
        let before = graph.recompose_count();

        graph.batch(|graph| {
            graph
                .set_parameter_value(world, PRIM_NAME, Value::from("World"))
                .unwrap();
            graph.create_node(PRIM_DEFINE, Some("Other"), None);
            assert_eq!(graph.recompose_count(), before);
        });
        assert_eq!(graph.recompose_count(), before + 1);
        assert!(graph.composition().has_prim(&"/World".parse().unwrap()));
    }

    #[test]
    fn test_no_recompose_when_live_update_is_off() {
        let mut graph = graph();
        graph.create_node(PRIM_DEFINE, Some("World"), None);
        graph.set_time(3.0);
        assert_eq!(graph.recompose_count(), 0);
        assert_eq!(graph.time(), 3.0);
    }
}
