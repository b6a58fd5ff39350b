//! Replaying the graph into a document.

use log::{debug, info, warn};

use super::SceneGraph;
use super::analysis;
use crate::model::node::{ExecState, NodeId};
use crate::nodes::LAYER;
use crate::registry::ApplyContext;
use crate::stage::{ScenePath, Stage};

impl SceneGraph {
    /// Composes the graph into a fresh document.
    ///
    /// Layer nodes run first, ordered by their vertical position. The rest of
    /// the graph runs depth first from the root, each node handing the path
    /// it returns to its children.
    pub fn export_to_document(&mut self) -> Stage {
        self.resync_paths();
        for node in self.nodes.iter_mut().flatten() {
            node.set_state(ExecState::Unexecuted);
        }
        let mut stage = Stage::new();
        let root_path = ScenePath::root();

        let mut layers: Vec<(f64, NodeId)> = analysis::preorder(self)
            .into_iter()
            .filter_map(|id| {
                let node = self.node(id)?;
                self.registry
                    .is_subtype(node.type_name(), LAYER)
                    .then(|| (node.position().y.into_inner(), id))
            })
            .collect();
        layers.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, id) in layers {
            let (context, _) = self.execute_node(id, &mut stage, &root_path);
            self.record_path(id, &stage, &context);
        }

        self.traverse(self.root, &mut stage, &root_path);
        info!(
            "Composed {} nodes into {} root prims",
            self.len(),
            stage.prims().len()
        );
        stage
    }

    fn traverse(&mut self, id: NodeId, stage: &mut Stage, context: &ScenePath) {
        let Some(node) = self.node(id) else {
            return;
        };
        let children = node.children().to_vec();

        // Layer nodes already ran; their children still compose.
        if node.state() == ExecState::Executed {
            for child in children {
                self.traverse(child, stage, context);
            }
            return;
        }

        let (next, switch) = self.execute_node(id, stage, context);
        let Some((set, variant)) = switch else {
            self.record_path(id, stage, &next);
            for child in children {
                self.traverse(child, stage, &next);
            }
            return;
        };

        let previous = stage.variant_selection(&next, &set);
        if let Err(e) = stage.set_variant_selection(&next, &set, Some(variant.as_str())) {
            warn!("Could not select {}={} on {}: {}", set, variant, next, e);
        }
        stage.push_variant_edit(&next, &set, &variant);
        self.record_path(id, stage, &next);
        for child in children {
            self.traverse(child, stage, &next);
        }
        stage.pop_variant_edit();
        if let Err(e) = stage.set_variant_selection(&next, &set, previous.as_deref()) {
            warn!("Could not restore {} selection on {}: {}", set, next, e);
        }
    }

    /// Applies one node and returns the context for its children, plus the
    /// variant its children compose inside, if any.
    ///
    /// A disabled node hands back `context` untouched. A failing apply is
    /// logged and also hands back `context`.
    fn execute_node(
        &mut self,
        id: NodeId,
        stage: &mut Stage,
        context: &ScenePath,
    ) -> (ScenePath, Option<(String, String)>) {
        let Some(node) = self.node_mut(id) else {
            return (context.clone(), None);
        };
        node.clear_recorded_paths();
        if node.is_disabled() {
            debug!("Skipping disabled node {}", node.name());
            node.set_state(ExecState::Executed);
            return (context.clone(), None);
        }
        node.set_state(ExecState::Executing);

        let (next, switch) = {
            let Some(node) = self.node(id) else {
                return (context.clone(), None);
            };
            let behavior = self.registry.behavior(node.type_name());
            let ctx = ApplyContext::new(self, node, self.time);
            match behavior.apply(&ctx, stage, context) {
                Ok(next) => {
                    debug!("{} -> {}", node.name(), next);
                    (next, behavior.variant_switch(&ctx))
                }
                Err(e) => {
                    warn!("Node {} skipped: {}", node.name(), e);
                    (context.clone(), None)
                }
            }
        };

        if let Some(node) = self.node_mut(id) {
            node.set_state(ExecState::Executed);
        }
        (next, switch)
    }

    /// Records where the node's result landed, through any open variant edit.
    fn record_path(&mut self, id: NodeId, stage: &Stage, path: &ScenePath) {
        let recorded = stage.edit_path(path);
        if let Some(node) = self.node_mut(id) {
            if !node.is_disabled() {
                node.record_path(recorded);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::node::DISABLED_PARAM;
    use crate::model::value::{Value, Vec2};
    use crate::nodes::prim::PRIM_NAME;
    use crate::nodes::root::LAYER_PATH;
    use crate::nodes::{PRIM_DEFINE, REFERENCE};
    use crate::nodes::arc::ASSET_PATH;
    use crate::registry::NodeRegistry;
    use std::sync::Arc;

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    fn graph() -> SceneGraph {
        SceneGraph::new(Arc::new(NodeRegistry::with_builtins()))
    }

    fn prim(graph: &mut SceneGraph, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = graph.create_node(PRIM_DEFINE, Some(name), parent).unwrap();
        graph
            .set_parameter_value(id, PRIM_NAME, Value::from(name))
            .unwrap();
        id
    }

    #[test]
    fn test_nested_prims_and_states() {
        let mut graph = graph();
        let world = prim(&mut graph, "World", None);
        let mesh = prim(&mut graph, "Mesh", Some(world));
        let stage = graph.export_to_document();

        assert!(stage.has_prim(&path("/World/Mesh")));
        assert_eq!(graph.node(mesh).unwrap().state(), ExecState::Executed);
        assert_eq!(graph.node(mesh).unwrap().recorded_paths(), &[path("/World/Mesh")]);
    }

    #[test]
    fn test_disabled_prim_passes_context_through() {
        let mut graph = graph();
        let world = prim(&mut graph, "World", None);
        prim(&mut graph, "Mesh", Some(world));
        graph
            .set_parameter_value(world, DISABLED_PARAM, Value::from(true))
            .unwrap();
        let stage = graph.export_to_document();

        assert!(!stage.has_prim(&path("/World")));
        assert!(stage.has_prim(&path("/Mesh")));
        assert!(graph.node(world).unwrap().recorded_paths().is_empty());
    }

    #[test]
    fn test_failing_node_does_not_stop_traversal() {
        let mut graph = graph();
        let world = prim(&mut graph, "World", None);
        // No asset path: the reference is skipped.
        let reference = graph.create_node(REFERENCE, None, Some(world)).unwrap();
        prim(&mut graph, "Mesh", Some(reference));
        let stage = graph.export_to_document();

        assert!(stage.prim(&path("/World")).unwrap().references.is_empty());
        assert!(stage.has_prim(&path("/World/Mesh")));
    }

    #[test]
    fn test_layers_run_first_by_position() {
        let mut graph = graph();
        for (name, y) in [("b.json", 2.0), ("a.json", 1.0)] {
            let layer = graph.create_node(LAYER, None, None).unwrap();
            graph
                .set_parameter_value(layer, LAYER_PATH, Value::from(name))
                .unwrap();
            graph.set_position(layer, Vec2::new(0.0, y));
        }
        let stage = graph.export_to_document();
        let order: Vec<&str> = stage
            .metadata()
            .sublayers
            .iter()
            .map(|s| s.asset_path.as_str())
            .collect();
        assert_eq!(order, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_reference_lands_on_context_prim() {
        let mut graph = graph();
        let world = prim(&mut graph, "World", None);
        let reference = graph.create_node(REFERENCE, None, Some(world)).unwrap();
        graph
            .set_parameter_value(reference, ASSET_PATH, Value::from("chair.json"))
            .unwrap();
        let stage = graph.export_to_document();
        let references = &stage.prim(&path("/World")).unwrap().references;
        assert_eq!(references.len(), 1);
        assert_eq!(references[0].asset_path, "chair.json");
    }
}
