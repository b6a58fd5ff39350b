//! Building a graph from an existing document.

use std::sync::Arc;

use log::{debug, info, warn};

use super::SceneGraph;
use crate::model::connection::ConnectionTarget;
use crate::model::node::NodeId;
use crate::model::value::Vec2;
use crate::nodes::arc::import_arc;
use crate::nodes::root::{import_layer_metadata, import_sublayer};
use crate::nodes::variant::{import_selection, import_switch, import_variant_set};
use crate::nodes::{
    ATTRIBUTE_SET, LAYER, MATERIAL_ASSIGN, MATERIAL_BINDING_PREFIX, PAYLOAD, PRIM_OVERRIDE,
    REFERENCE, RELATIONSHIP_SET, TRANSFORM, TRANSFORM_PREFIX, VARIANT_SELECT, VARIANT_SET,
    VARIANT_SWITCH, definer_for,
};
use crate::registry::{Capability, NodeRegistry};
use crate::stage::{PrimSpec, ScenePath, Specifier, Stage, split_attribute_path};

/// An attribute connection waiting for its target node to exist.
struct PendingConnection {
    node: NodeId,
    parameter: String,
    source: String,
}

impl SceneGraph {
    /// A graph reproducing `document`, which also becomes its live document.
    pub fn from_document(registry: Arc<NodeRegistry>, document: Stage) -> Self {
        let mut graph = SceneGraph::new(registry);
        graph.load_document(document);
        graph
    }

    /// Replaces every node with ones imported from `document`.
    ///
    /// Listeners, the live-update flag and the stage time are kept.
    pub fn load_document(&mut self, document: Stage) {
        let mut fresh = SceneGraph::new(self.registry.clone());
        fresh.live_update = self.live_update;
        fresh.time = self.time;
        std::mem::swap(&mut fresh.events, &mut self.events);
        *self = fresh;

        self.batch(|graph| {
            let mut pending = Vec::new();
            graph.import_layer(&document, &mut pending);
            graph.resync_paths();
            graph.connect_pending(pending);
            for node in graph.nodes.iter_mut().flatten() {
                node.refresh_label();
            }
            graph.structure_changed();
        });
        info!(
            "Imported {} nodes from {} root prims",
            self.len(),
            document.prims().len()
        );
        self.document = document;
    }

    fn import_layer(&mut self, document: &Stage, pending: &mut Vec<PendingConnection>) {
        let root = self.root;
        if let Some(node) = self.node_mut(root) {
            import_layer_metadata(node, document.metadata());
        }
        for (index, sublayer) in document.metadata().sublayers.iter().enumerate() {
            let Some(id) = self.attach_new(LAYER, None, Some(root)) else {
                continue;
            };
            if let Some(node) = self.node_mut(id) {
                import_sublayer(node, sublayer);
                node.set_position(Vec2::new(0.0, index as f64));
            }
        }
        for prim in document.prims() {
            self.import_prim(prim, &ScenePath::root(), root, pending);
        }
    }

    fn import_prim(
        &mut self,
        prim: &PrimSpec,
        parent_path: &ScenePath,
        parent: NodeId,
        pending: &mut Vec<PendingConnection>,
    ) {
        let path = parent_path.append_child(&prim.name);
        let type_name = match prim.specifier {
            Specifier::Def | Specifier::Class => definer_for(&self.registry, prim.type_name.as_deref()),
            Specifier::Over => PRIM_OVERRIDE,
        };
        let Some(id) = self.import_node(type_name, &prim.name, parent, prim, pending) else {
            return;
        };
        debug!("Imported {} as {}", path, type_name);
        let captured = self.registry.has_capability(type_name, Capability::Attributes);
        self.import_body(prim, &path, id, !captured, pending);
    }

    /// Chains the nodes for everything on `spec` besides its identity, then
    /// imports its children under the end of the chain.
    fn import_body(
        &mut self,
        spec: &PrimSpec,
        path: &ScenePath,
        start: NodeId,
        with_attributes: bool,
        pending: &mut Vec<PendingConnection>,
    ) {
        let mut tail = start;

        for (arcs, type_name) in [(&spec.references, REFERENCE), (&spec.payloads, PAYLOAD)] {
            for arc in arcs {
                let Some(id) = self.attach_new(type_name, None, Some(tail)) else {
                    continue;
                };
                if let Some(node) = self.node_mut(id) {
                    import_arc(node, arc);
                }
                tail = id;
            }
        }

        if with_attributes {
            let has_transform = spec.attributes.keys().any(|n| n.starts_with(TRANSFORM_PREFIX));
            let has_other = spec.attributes.keys().any(|n| !n.starts_with(TRANSFORM_PREFIX));
            for (present, type_name) in [(has_transform, TRANSFORM), (has_other, ATTRIBUTE_SET)] {
                if present {
                    if let Some(id) = self.import_node(type_name, type_name, tail, spec, pending) {
                        tail = id;
                    }
                }
            }
        }

        let has_binding = spec
            .relationships
            .keys()
            .any(|n| n.starts_with(MATERIAL_BINDING_PREFIX));
        let has_other = spec
            .relationships
            .keys()
            .any(|n| !n.starts_with(MATERIAL_BINDING_PREFIX));
        for (present, type_name) in [(has_binding, MATERIAL_ASSIGN), (has_other, RELATIONSHIP_SET)] {
            if present {
                if let Some(id) = self.import_node(type_name, type_name, tail, spec, pending) {
                    tail = id;
                }
            }
        }

        for set in &spec.variant_sets {
            let Some(set_node) = self.attach_new(VARIANT_SET, Some(&set.name), Some(tail)) else {
                continue;
            };
            if let Some(node) = self.node_mut(set_node) {
                import_variant_set(node, set);
            }
            for variant in &set.variants {
                let Some(switch) = self.attach_new(VARIANT_SWITCH, Some(&variant.name), Some(set_node))
                else {
                    continue;
                };
                if let Some(node) = self.node_mut(switch) {
                    import_switch(node, &set.name, &variant.name);
                }
                let variant_path = path.append_variant_selection(&set.name, &variant.name);
                self.import_body(variant, &variant_path, switch, true, pending);
            }
            tail = match spec.variant_selections.get(&set.name) {
                Some(selection) => self.import_selection_node(&set.name, selection, set_node),
                None => set_node,
            };
        }

        for (set, selection) in &spec.variant_selections {
            if spec.variant_set(set).is_none() {
                tail = self.import_selection_node(set, selection, tail);
            }
        }

        for child in &spec.children {
            self.import_prim(child, path, tail, pending);
        }
    }

    fn import_selection_node(&mut self, set: &str, selection: &str, parent: NodeId) -> NodeId {
        let Some(id) = self.attach_new(VARIANT_SELECT, Some(set), Some(parent)) else {
            return parent;
        };
        if let Some(node) = self.node_mut(id) {
            import_selection(node, set, selection);
        }
        id
    }

    /// Creates a node, runs its type's import hook on `spec` and queues the
    /// connections of every attribute it captured.
    fn import_node(
        &mut self,
        type_name: &str,
        name: &str,
        parent: NodeId,
        spec: &PrimSpec,
        pending: &mut Vec<PendingConnection>,
    ) -> Option<NodeId> {
        let id = self.attach_new(type_name, Some(name), Some(parent))?;
        let behavior = self.registry.behavior(type_name);
        let node = self.node_mut(id)?;
        behavior.import_prim(node, spec);
        for (attribute_name, attribute) in &spec.attributes {
            let Some(source) = attribute.connections.first() else {
                continue;
            };
            if node.param(attribute_name).is_some() {
                pending.push(PendingConnection {
                    node: id,
                    parameter: attribute_name.clone(),
                    source: source.clone(),
                });
            }
        }
        Some(id)
    }

    /// The first of `candidates` carrying `parameter`.
    fn connection_target(&self, candidates: &[NodeId], parameter: &str) -> Option<ConnectionTarget> {
        candidates.iter().find_map(|&id| {
            let node = self.node(id)?;
            node.param(parameter)
                .is_some()
                .then(|| ConnectionTarget::new(&node.name(), parameter))
        })
    }

    /// Wires attribute connections onto the nodes owning their sources.
    fn connect_pending(&mut self, pending: Vec<PendingConnection>) {
        for connection in pending {
            let Some((path, parameter)) = split_attribute_path(&connection.source) else {
                warn!("Malformed connection source '{}'", connection.source);
                continue;
            };
            // Exact owners first, then owners inside any other variant.
            let exact = self.path_index.get(&path).cloned().unwrap_or_default();
            let target = self
                .connection_target(&exact, parameter)
                .or_else(|| self.connection_target(&self.nodes_at_stripped_path(&path), parameter));
            let Some(target) = target else {
                warn!("Connection source {} has no node", connection.source);
                continue;
            };
            if let Some(param) = self
                .node_mut(connection.node)
                .and_then(|n| n.param_mut(&connection.parameter))
            {
                debug!("Connected {} to {}", connection.parameter, target);
                param.set_inherited_connection(Some(target));
            }
        }
    }
}
