//! Copy/paste payloads and whole-graph snapshots.
//!
//! Both are JSON. Nodes are stored parents first; a record's `parent` is
//! the index of an earlier record, or `None` when it hangs off the paste
//! target (or the root, in a snapshot).

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::SceneGraph;
use super::analysis;
use crate::error::{LibraryError, Result};
use crate::events::GraphEvent;
use crate::model::node::{NAME_PARAM, Node, NodeId};
use crate::model::parameter::Parameter;
use crate::model::value::Vec2;
use crate::nodes::ROOT;

#[derive(Serialize, Deserialize, Clone, Debug)]
struct NodeRecord {
    type_name: String,
    #[serde(default)]
    position: Vec2,
    params: Vec<Parameter>,
    #[serde(default)]
    parent: Option<usize>,
}

impl NodeRecord {
    fn capture(node: &Node, parent: Option<usize>) -> Self {
        Self {
            type_name: node.type_name().to_string(),
            position: node.position(),
            params: node.params().to_vec(),
            parent,
        }
    }

    fn name(&self) -> Option<String> {
        self.params
            .iter()
            .find(|p| p.name() == NAME_PARAM)
            .map(|p| p.get_value(0.0).get_as::<String>().unwrap_or_default())
    }
}

#[derive(Serialize, Deserialize, Debug)]
struct ClipboardPayload {
    nodes: Vec<NodeRecord>,
}

#[derive(Serialize, Deserialize, Debug)]
struct GraphSnapshot {
    #[serde(default)]
    time: f64,
    root: NodeRecord,
    nodes: Vec<NodeRecord>,
}

fn malformed(message: impl Into<String>) -> LibraryError {
    LibraryError::MalformedPayload(message.into())
}

impl SceneGraph {
    /// Serializes the given nodes and everything below them.
    ///
    /// The root is never copied, and a node already covered by a selected
    /// ancestor is not copied twice.
    pub fn copy_nodes(&self, ids: &[NodeId]) -> Result<String> {
        let selected: HashSet<NodeId> = ids.iter().copied().collect();
        let mut records = Vec::new();
        let mut index_of: HashMap<NodeId, usize> = HashMap::new();
        for &id in ids {
            if id == self.root || index_of.contains_key(&id) {
                continue;
            }
            let covered = self
                .node(id)
                .and_then(Node::parent)
                .is_some_and(|p| selected.iter().any(|&s| s != id && analysis::is_ancestor(self, s, p)));
            if covered {
                continue;
            }
            self.capture_subtree(id, &mut records, &mut index_of);
        }
        debug!("Copied {} nodes", records.len());
        Ok(serde_json::to_string_pretty(&ClipboardPayload { nodes: records })?)
    }

    fn capture_subtree(
        &self,
        start: NodeId,
        records: &mut Vec<NodeRecord>,
        index_of: &mut HashMap<NodeId, usize>,
    ) {
        for id in analysis::subtree(self, start) {
            let Some(node) = self.node(id) else {
                continue;
            };
            let parent = if id == start {
                None
            } else {
                node.parent().and_then(|p| index_of.get(&p).copied())
            };
            index_of.insert(id, records.len());
            records.push(NodeRecord::capture(node, parent));
        }
    }

    /// Inserts a copied payload under `parent` (the root when `None`).
    ///
    /// Nothing is inserted unless the whole payload is valid. Pasted names are
    /// made unique and connections between pasted nodes follow the renames.
    pub fn paste_nodes(&mut self, payload: &str, parent: Option<NodeId>) -> Result<Vec<NodeId>> {
        let payload: ClipboardPayload =
            serde_json::from_str(payload).map_err(|e| malformed(e.to_string()))?;
        let parent = parent.unwrap_or(self.root);
        if self.node(parent).is_none() {
            return Err(LibraryError::node_not_found(parent));
        }
        self.validate_records(&payload.nodes, false)?;

        let renames = self.plan_names(&payload.nodes);
        let base = self.nodes.len();
        let created = self.batch(|graph| {
            let mut created = Vec::with_capacity(payload.nodes.len());
            for (index, record) in payload.nodes.iter().enumerate() {
                let node_parent = record.parent.map(|p| NodeId(base + p)).unwrap_or(parent);
                let id = graph.restore(record, &renames, Some(node_parent));
                let name = graph.node(id).map(Node::name).unwrap_or_default();
                debug!("Pasted record {} as {}", index, name);
                graph.events.emit(&GraphEvent::NodeCreated { node: name });
                created.push(id);
            }
            graph.structure_changed();
            created
        });
        info!("Pasted {} nodes", created.len());
        Ok(created)
    }

    /// Serializes the whole graph.
    pub fn save_snapshot(&self) -> Result<String> {
        let root = self
            .node(self.root)
            .ok_or_else(|| LibraryError::node_not_found(self.root))?;
        let mut records = Vec::new();
        let mut index_of = HashMap::new();
        for &child in root.children() {
            self.capture_subtree(child, &mut records, &mut index_of);
        }
        let snapshot = GraphSnapshot {
            time: self.time,
            root: NodeRecord::capture(root, None),
            nodes: records,
        };
        Ok(serde_json::to_string_pretty(&snapshot)?)
    }

    /// Replaces every node with a saved snapshot.
    ///
    /// The graph is left untouched if the snapshot does not load. The live
    /// document and listeners are kept.
    pub fn load_snapshot(&mut self, snapshot: &str) -> Result<()> {
        let snapshot: GraphSnapshot =
            serde_json::from_str(snapshot).map_err(|e| malformed(e.to_string()))?;
        if snapshot.root.type_name != ROOT {
            return Err(malformed(format!(
                "snapshot root has type '{}'",
                snapshot.root.type_name
            )));
        }
        self.validate_records(std::slice::from_ref(&snapshot.root), true)?;
        self.validate_records(&snapshot.nodes, false)?;

        let mut fresh = SceneGraph::new(self.registry.clone());
        fresh.live_update = self.live_update;
        fresh.time = snapshot.time;
        let root_name = snapshot.root.name().unwrap_or_else(|| ROOT.to_string());
        fresh.names.clear();
        fresh.names.insert(root_name, fresh.root);
        fresh.nodes[fresh.root.0] = Some(Node::from_parts(
            fresh.root,
            ROOT,
            snapshot.root.params.clone(),
            snapshot.root.position,
        ));

        let renames = fresh.plan_names(&snapshot.nodes);
        let root = fresh.root;
        for record in &snapshot.nodes {
            let parent = record.parent.map(|p| NodeId(1 + p)).unwrap_or(root);
            fresh.restore(record, &renames, Some(parent));
        }

        std::mem::swap(&mut fresh.events, &mut self.events);
        fresh.document = std::mem::take(&mut self.document);
        *self = fresh;
        info!("Loaded snapshot with {} nodes", self.len());
        self.structure_changed();
        Ok(())
    }

    fn validate_records(&self, records: &[NodeRecord], allow_root: bool) -> Result<()> {
        for (index, record) in records.iter().enumerate() {
            if record.type_name == ROOT && !allow_root {
                return Err(malformed("a payload cannot contain a Root node"));
            }
            if !self.registry.is_registered(&record.type_name) {
                return Err(LibraryError::UnsupportedType(format!(
                    "node type '{}'",
                    record.type_name
                )));
            }
            if record.name().is_none() {
                return Err(malformed(format!("record {} has no name", index)));
            }
            if record.parent.is_some_and(|p| p >= index) {
                return Err(malformed(format!(
                    "record {} refers to a later parent",
                    index
                )));
            }
        }
        Ok(())
    }

    /// Unique names for every record, keyed by stored name, in record order.
    fn plan_names(&self, records: &[NodeRecord]) -> Vec<(String, String)> {
        let mut planned: Vec<(String, String)> = Vec::with_capacity(records.len());
        for record in records {
            let stored = record.name().unwrap_or_default();
            let name = super::naming::unique_name(&stored, |n| {
                self.is_taken(n) || planned.iter().any(|(_, taken)| taken == n)
            });
            planned.push((stored, name));
        }
        planned
    }

    /// Rebuilds one record as a node, renamed and with connections remapped.
    fn restore(
        &mut self,
        record: &NodeRecord,
        planned: &[(String, String)],
        parent: Option<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let mut node = Node::from_parts(id, &record.type_name, record.params.clone(), record.position);
        let stored = node.name();
        let renames: HashMap<String, String> = planned.iter().cloned().collect();
        if let Some((_, name)) = planned.iter().find(|(old, _)| *old == stored) {
            node.set_name(name);
        }
        for param in node.params_mut() {
            param.remap_connection_nodes(&renames);
        }
        self.insert(node, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::connection::ConnectionTarget;
    use crate::model::value::{Value, ValueType};
    use crate::nodes::prim::PRIM_NAME;
    use crate::nodes::{ATTRIBUTE_SET, PRIM_DEFINE};
    use crate::registry::NodeRegistry;
    use std::sync::Arc;

    fn graph() -> SceneGraph {
        SceneGraph::new(Arc::new(NodeRegistry::with_builtins()))
    }

    #[test]
    fn test_copy_paste_renames_and_remaps() {
        let mut graph = graph();
        let world = graph.create_node(PRIM_DEFINE, Some("World"), None).unwrap();
        graph.set_parameter_value(world, PRIM_NAME, Value::from("World")).unwrap();
        let a = graph.create_node(ATTRIBUTE_SET, Some("A"), Some(world)).unwrap();
        let b = graph.create_node(ATTRIBUTE_SET, Some("B"), Some(a)).unwrap();
        graph.add_dynamic_parameter(a, Parameter::new("size", ValueType::Double));
        graph.add_dynamic_parameter(b, Parameter::new("size", ValueType::Double));
        graph
            .set_parameter_connection(b, "size", Some(ConnectionTarget::new("A", "size")))
            .unwrap();

        let payload = graph.copy_nodes(&[world, b]).unwrap();
        let pasted = graph.paste_nodes(&payload, None).unwrap();
        assert_eq!(pasted.len(), 3);

        let names: Vec<String> = pasted.iter().map(|&id| graph.node(id).unwrap().name()).collect();
        assert_eq!(names, vec!["World1", "A1", "B1"]);
        let copy_b = graph.node(pasted[2]).unwrap();
        assert_eq!(copy_b.parent(), Some(pasted[1]));
        assert_eq!(
            copy_b.param("size").unwrap().connection(),
            Some(&ConnectionTarget::new("A1", "size"))
        );
        assert_eq!(graph.node(pasted[0]).unwrap().parent(), Some(graph.root()));
    }

    #[test]
    fn test_malformed_paste_leaves_graph_unchanged() {
        let mut graph = graph();
        graph.create_node(PRIM_DEFINE, Some("World"), None).unwrap();
        let before = graph.len();

        assert!(matches!(
            graph.paste_nodes("{not json", None),
            Err(LibraryError::MalformedPayload(_))
        ));
        let payload = r#"{"nodes": [
            {"type_name": "AttributeSet", "params": [
                {"name": "name", "value_type": "string", "default_value": "X"}
            ]},
            {"type_name": "Teapot", "params": [
                {"name": "name", "value_type": "string", "default_value": "Y"}
            ], "parent": 0}
        ]}"#;
        assert!(graph.paste_nodes(payload, None).is_err());
        assert_eq!(graph.len(), before);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut graph = graph();
        let world = graph.create_node(PRIM_DEFINE, Some("World"), None).unwrap();
        graph.set_parameter_value(world, PRIM_NAME, Value::from("World")).unwrap();
        graph.create_node(PRIM_DEFINE, Some("Mesh"), Some(world)).unwrap();
        graph.set_time(4.0);
        let saved = graph.save_snapshot().unwrap();

        let mut restored = SceneGraph::new(graph.registry().clone());
        restored.load_snapshot(&saved).unwrap();
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.time(), 4.0);
        let mesh = restored.node_by_name("Mesh").unwrap();
        assert_eq!(restored.node(mesh.parent().unwrap()).unwrap().name(), "World");
        assert_eq!(restored.export_to_document(), graph.export_to_document());
    }
}
