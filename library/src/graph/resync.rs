//! Derived node paths and path lookup.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use super::SceneGraph;
use super::analysis;
use crate::model::node::NodeId;
use crate::model::value::Value;
use crate::nodes::prim::PRIM_NAME;
use crate::nodes::{PRIM, PRIM_OVERRIDE};
use crate::registry::ApplyContext;
use crate::stage::ScenePath;

impl SceneGraph {
    /// Recomputes every node's document paths from the root down and
    /// rebuilds the path index.
    ///
    /// Prim nodes append their prim name and variant switches append their
    /// selection to every path but the root. Other nodes pass their parent's
    /// paths through.
    /// Disabled nodes pass through, as they do during execution.
    pub fn resync_paths(&mut self) {
        let order = analysis::preorder(self);
        let mut derived: HashMap<NodeId, Vec<ScenePath>> = HashMap::new();

        for &id in &order {
            let Some(node) = self.node(id) else {
                continue;
            };
            if id == self.root {
                derived.insert(id, vec![ScenePath::root()]);
                continue;
            }
            let inherited = node
                .parent()
                .and_then(|p| derived.get(&p))
                .cloned()
                .unwrap_or_else(|| vec![ScenePath::root()]);

            let paths = if node.is_disabled() {
                inherited
            } else if self.registry.is_subtype(node.type_name(), PRIM) {
                let name = self
                    .evaluate_parameter(id, PRIM_NAME, self.time)
                    .and_then(|v| v.get_as::<String>())
                    .unwrap_or_default();
                if name.is_empty() {
                    inherited
                } else {
                    inherited.iter().map(|p| p.append_child(&name)).collect()
                }
            } else {
                let behavior = self.registry.behavior(node.type_name());
                let ctx = ApplyContext::new(self, node, self.time);
                match behavior.variant_switch(&ctx) {
                    // The root has no variants.
                    Some((set, variant)) => inherited
                        .iter()
                        .map(|p| {
                            if p.is_root() {
                                p.clone()
                            } else {
                                p.append_variant_selection(&set, &variant)
                            }
                        })
                        .collect(),
                    None => inherited,
                }
            };

            let mut unique: Vec<ScenePath> = Vec::with_capacity(paths.len());
            for path in paths {
                if !unique.contains(&path) {
                    unique.push(path);
                }
            }
            derived.insert(id, unique);
        }

        let mut index: BTreeMap<ScenePath, Vec<NodeId>> = BTreeMap::new();
        for &id in &order {
            let paths = derived.remove(&id).unwrap_or_default();
            for path in &paths {
                index.entry(path.clone()).or_default().push(id);
            }
            if let Some(node) = self.node_mut(id) {
                node.set_paths(paths);
            }
        }
        debug!("Resynchronized {} nodes onto {} paths", order.len(), index.len());
        self.path_index = index;
        self.paths_dirty = false;
    }

    /// Resynchronizes only when a structural edit invalidated the index.
    pub fn ensure_paths(&mut self) {
        if self.paths_dirty {
            self.resync_paths();
        }
    }

    /// Nodes whose derived paths include exactly `path`.
    pub fn nodes_at_path(&mut self, path: &ScenePath) -> Vec<NodeId> {
        self.ensure_paths();
        self.path_index.get(path).cloned().unwrap_or_default()
    }

    /// Nodes whose derived paths equal `path` once variant selections are
    /// stripped from both.
    ///
    /// Nodes inside variants nested under `path` itself come first, then the
    /// ones reached through other selections.
    pub(crate) fn nodes_at_stripped_path(&self, path: &ScenePath) -> Vec<NodeId> {
        let stripped = path.strip_variant_selections();
        let (nested, others): (Vec<_>, Vec<_>) = self
            .path_index
            .iter()
            .filter(|(candidate, _)| candidate.strip_variant_selections() == stripped)
            .partition(|(candidate, _)| candidate.has_prefix(path));
        nested
            .into_iter()
            .chain(others)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Prim nodes (or the root) owning `path`, creating override nodes for
    /// the part of the path no node owns yet.
    ///
    /// Variant selections are ignored when matching. Every node owning the
    /// longest matched prefix gets its own chain of new `PrimOverride` nodes;
    /// the returned ids are the nodes that now own `path`.
    pub fn find_node_at_path(&mut self, path: &ScenePath) -> Vec<NodeId> {
        self.resync_paths();
        let target = path.strip_variant_selections();
        let target_depth = target.prim_depth();

        let mut best_depth = 0;
        let mut best = vec![self.root];
        for node in self.nodes() {
            if !self.registry.is_subtype(node.type_name(), PRIM) {
                continue;
            }
            for owned in node.paths() {
                let owned = owned.strip_variant_selections();
                if owned.is_root() || !target.has_prefix(&owned) {
                    continue;
                }
                let depth = owned.prim_depth();
                if depth > best_depth {
                    best_depth = depth;
                    best = vec![node.id()];
                } else if depth == best_depth && !best.contains(&node.id()) {
                    best.push(node.id());
                }
            }
        }

        if best_depth == target_depth {
            return best;
        }

        let remaining: Vec<String> = target
            .prim_names()
            .skip(best_depth)
            .map(str::to_string)
            .collect();
        debug!(
            "Creating {} override nodes under {} matches for {}",
            remaining.len(),
            best.len(),
            path
        );
        let created = self.batch(|graph| {
            let mut tails = Vec::new();
            for &anchor in &best {
                let mut parent = anchor;
                for name in &remaining {
                    let Some(id) = graph.create_node(PRIM_OVERRIDE, Some(name), Some(parent)) else {
                        break;
                    };
                    if let Err(e) = graph.set_parameter_value(id, PRIM_NAME, Value::from(name.as_str())) {
                        warn!("Could not name override for {}: {}", name, e);
                    }
                    parent = id;
                }
                tails.push(parent);
            }
            tails
        });
        self.resync_paths();
        created
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{ATTRIBUTE_SET, PRIM_DEFINE, VARIANT_SWITCH};
    use crate::nodes::variant::{SWITCH_SET, SWITCH_VARIANT};
    use crate::registry::NodeRegistry;
    use std::sync::Arc;

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    fn prim(graph: &mut SceneGraph, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = graph.create_node(PRIM_DEFINE, Some(name), parent).unwrap();
        graph
            .set_parameter_value(id, PRIM_NAME, Value::from(name))
            .unwrap();
        id
    }

    #[test]
    fn test_paths_follow_prims_and_switches() {
        let mut graph = SceneGraph::new(Arc::new(NodeRegistry::with_builtins()));
        let world = prim(&mut graph, "World", None);
        let attrs = graph.create_node(ATTRIBUTE_SET, None, Some(world)).unwrap();
        let switch = graph.create_node(VARIANT_SWITCH, None, Some(attrs)).unwrap();
        graph.set_parameter_value(switch, SWITCH_SET, Value::from("look")).unwrap();
        graph.set_parameter_value(switch, SWITCH_VARIANT, Value::from("red")).unwrap();
        let mesh = prim(&mut graph, "Mesh", Some(switch));

        graph.resync_paths();
        assert_eq!(graph.node(graph.root()).unwrap().paths(), &[ScenePath::root()]);
        assert_eq!(graph.node(attrs).unwrap().paths(), &[path("/World")]);
        assert_eq!(graph.node(switch).unwrap().paths(), &[path("/World{look=red}")]);
        assert_eq!(graph.node(mesh).unwrap().paths(), &[path("/World{look=red}Mesh")]);
        assert_eq!(graph.nodes_at_path(&path("/World")), vec![world, attrs]);
    }

    #[test]
    fn test_switch_under_root_passes_root_through() {
        let mut graph = SceneGraph::new(Arc::new(NodeRegistry::with_builtins()));
        let switch = graph.create_node(VARIANT_SWITCH, None, None).unwrap();
        graph.set_parameter_value(switch, SWITCH_SET, Value::from("look")).unwrap();
        graph.set_parameter_value(switch, SWITCH_VARIANT, Value::from("red")).unwrap();
        let a = prim(&mut graph, "A", Some(switch));

        graph.resync_paths();
        assert_eq!(graph.node(switch).unwrap().paths(), &[ScenePath::root()]);
        assert_eq!(graph.node(a).unwrap().paths(), &[path("/A")]);

        let stage = graph.export_to_document();
        assert!(stage.has_prim(&path("/A")));
        assert_eq!(graph.node(a).unwrap().recorded_paths(), graph.node(a).unwrap().paths());
    }

    #[test]
    fn test_resync_is_idempotent() {
        let mut graph = SceneGraph::new(Arc::new(NodeRegistry::with_builtins()));
        let world = prim(&mut graph, "World", None);
        prim(&mut graph, "Child", Some(world));
        graph.resync_paths();
        let first: Vec<_> = graph.nodes().map(|n| n.paths().to_vec()).collect();
        graph.resync_paths();
        let second: Vec<_> = graph.nodes().map(|n| n.paths().to_vec()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_find_creates_missing_overrides() {
        let mut graph = SceneGraph::new(Arc::new(NodeRegistry::with_builtins()));
        let world = prim(&mut graph, "World", None);

        assert_eq!(graph.find_node_at_path(&path("/World")), vec![world]);

        let found = graph.find_node_at_path(&path("/World/Set/Mesh"));
        assert_eq!(found.len(), 1);
        let mesh = graph.node(found[0]).unwrap();
        assert_eq!(mesh.type_name(), PRIM_OVERRIDE);
        assert_eq!(mesh.paths(), &[path("/World/Set/Mesh")]);
        let set = mesh.parent().unwrap();
        assert_eq!(graph.node(set).unwrap().parent(), Some(world));

        assert_eq!(graph.find_node_at_path(&path("/World/Set/Mesh")), found);
    }
}
