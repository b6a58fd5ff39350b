use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use layergraph::events::{
    GRAPH_EXECUTED, LAYER_CHANGES_APPLIED, NODE_CREATED, STAGE_TIME_CHANGED,
};
use layergraph::nodes::arc::ASSET_PATH;
use layergraph::nodes::prim::PRIM_NAME;
use layergraph::nodes::{ATTRIBUTE_SET, PRIM_DEFINE, PRIM_OVERRIDE, REFERENCE, SHADER};
use layergraph::stage::{Attribute, Specifier};
use layergraph::{
    GraphEvent, LibraryError, NodeId, NodeRegistry, Parameter, SceneGraph, ScenePath, Stage,
    Value, ValueType,
};
use pretty_assertions::assert_eq;

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

fn variant_document() -> Stage {
    let mut stage = Stage::new();
    let set = path("/World/Set");
    stage.define_prim(&path("/World"), Some("Xform")).unwrap();
    stage.define_prim(&set, None).unwrap();
    for variant in ["red", "blue"] {
        stage.add_variant(&set, "look", variant).unwrap();
        stage.with_variant_edit(&set, "look", variant, |stage| {
            stage.define_prim(&path("/World/Set/Mesh"), Some("Mesh")).unwrap();
        });
    }
    stage.set_variant_selection(&set, "look", Some("red")).unwrap();
    stage
}

fn counter(graph: &mut SceneGraph, event_name: &str) -> Rc<RefCell<Vec<GraphEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = seen.clone();
    graph.events_mut().subscribe(event_name, move |event| {
        sink.borrow_mut().push(event.clone());
        Ok(())
    });
    seen
}

#[test]
fn test_unique_names_reuse_lowest_suffix() {
    let mut graph = graph();
    let names: Vec<String> = (0..3)
        .map(|_| {
            let id = graph.create_node("Node", None, None).unwrap();
            graph.node(id).unwrap().name()
        })
        .collect();
    assert_eq!(names, vec!["Node", "Node1", "Node2"]);

    let second = graph.node_id("Node1").unwrap();
    assert!(graph.delete_node(second));
    let again = graph.create_node("Node", None, None).unwrap();
    assert_eq!(graph.node(again).unwrap().name(), "Node1");
}

#[test]
fn test_rename_to_taken_name_gets_suffix() {
    let mut graph = graph();
    let a = graph.create_node("Node", Some("A"), None).unwrap();
    graph.create_node("Node", Some("B"), None).unwrap();
    assert_eq!(graph.rename_node(a, "B"), Some("B1".to_string()));
    assert!(graph.node_by_name("A").is_none());
    assert_eq!(graph.node_id("B1"), Some(a));
}

#[test]
fn test_delete_keeps_children_in_place() {
    let mut graph = graph();
    let world = prim(&mut graph, "World", None);
    let before = prim(&mut graph, "Before", Some(world));
    let middle = graph.create_node(ATTRIBUTE_SET, None, Some(world)).unwrap();
    let child = prim(&mut graph, "Child", Some(middle));
    let after = prim(&mut graph, "After", Some(world));

    assert!(graph.delete_node(middle));
    assert_eq!(graph.node(world).unwrap().children(), &[before, child, after]);
    assert_eq!(graph.node(child).unwrap().parent(), Some(world));
    assert!(!graph.delete_node(graph.root()));

    let stage = graph.export_to_document();
    assert!(stage.has_prim(&path("/World/Child")));
}

#[test]
fn test_delete_severs_connections() {
    let mut graph = graph();
    let a = graph.create_node(ATTRIBUTE_SET, Some("A"), None).unwrap();
    let b = graph.create_node(ATTRIBUTE_SET, Some("B"), None).unwrap();
    graph.add_dynamic_parameter(a, Parameter::new("size", ValueType::Double));
    graph.add_dynamic_parameter(b, Parameter::new("size", ValueType::Double));
    graph
        .set_parameter_connection(b, "size", Some("A.size".parse().unwrap()))
        .unwrap();
    assert_eq!(graph.port_links().len(), 1);

    graph.delete_node(a);
    assert!(graph.node(b).unwrap().param("size").unwrap().connection().is_none());
    assert!(graph.port_links().is_empty());
}

#[test]
fn test_connection_to_missing_parameter_is_refused() {
    let mut graph = graph();
    let a = graph.create_node(ATTRIBUTE_SET, Some("A"), None).unwrap();
    let b = graph.create_node(ATTRIBUTE_SET, Some("B"), None).unwrap();
    graph.add_dynamic_parameter(b, Parameter::new("size", ValueType::Double));

    let result = graph.set_parameter_connection(b, "size", Some("A.size".parse().unwrap()));
    assert!(matches!(result, Err(LibraryError::ParameterNotFound { .. })));
    let result = graph.set_parameter_connection(b, "size", Some("Gone.size".parse().unwrap()));
    assert!(matches!(result, Err(LibraryError::NodeNotFound(_))));
    assert!(graph.node(a).unwrap().param("size").is_none());
}

#[test]
fn test_copy_paste_under_new_parent() {
    let mut graph = graph();
    let world = prim(&mut graph, "World", None);
    let mesh = prim(&mut graph, "Mesh", Some(world));
    let attrs = graph.create_node(ATTRIBUTE_SET, None, Some(mesh)).unwrap();
    graph.add_dynamic_parameter(attrs, Parameter::new("size", ValueType::Double));
    graph.set_parameter_value(attrs, "size", Value::from(3.0)).unwrap();
    let other = prim(&mut graph, "Other", None);

    let payload = graph.copy_nodes(&[mesh]).unwrap();
    let pasted = graph.paste_nodes(&payload, Some(other)).unwrap();
    assert_eq!(pasted.len(), 2);
    assert_eq!(graph.node(pasted[0]).unwrap().name(), "Mesh1");
    assert_eq!(graph.node(pasted[0]).unwrap().parent(), Some(other));

    let stage = graph.export_to_document();
    for prim in ["/World/Mesh", "/Other/Mesh"] {
        assert_eq!(
            stage.attribute_value(&path(prim), "size", 0.0),
            Some(Value::from(3.0))
        );
    }
}

#[test]
fn test_paste_refuses_root_records() {
    let mut graph = graph();
    let payload = r#"{"nodes": [
        {"type_name": "Root", "params": [
            {"name": "name", "value_type": "string", "default_value": "Root"}
        ]}
    ]}"#;
    assert!(matches!(
        graph.paste_nodes(payload, None),
        Err(LibraryError::MalformedPayload(_))
    ));
    assert_eq!(graph.len(), 1);
}

#[test]
fn test_failed_snapshot_load_keeps_graph() {
    let mut graph = graph();
    prim(&mut graph, "World", None);
    assert!(graph.load_snapshot("[]").is_err());
    assert!(graph.node_by_name("World").is_some());
}

#[test]
fn test_listeners_hear_time_and_apply() {
    let mut graph = graph();
    let times = counter(&mut graph, STAGE_TIME_CHANGED);
    let applied = counter(&mut graph, LAYER_CHANGES_APPLIED);

    graph.set_time(12.0);
    prim(&mut graph, "World", None);
    let document = graph.apply_changes().clone();

    assert_eq!(*times.borrow(), vec![GraphEvent::StageTimeChanged { time: 12.0 }]);
    assert_eq!(*applied.borrow(), vec![GraphEvent::LayerChangesApplied]);
    assert!(document.has_prim(&path("/World")));
    assert_eq!(graph.document(), &document);
}

#[test]
fn test_failing_listener_does_not_block_others() {
    let mut graph = graph();
    graph
        .events_mut()
        .subscribe(NODE_CREATED, |_| Err(LibraryError::listener("refused")));
    graph
        .events_mut()
        .subscribe(NODE_CREATED, |_| panic!("listener bug"));
    let seen = counter(&mut graph, NODE_CREATED);

    graph.create_node("Node", Some("A"), None).unwrap();
    assert_eq!(*seen.borrow(), vec![GraphEvent::NodeCreated { node: "A".to_string() }]);

    let completed = graph
        .events_mut()
        .emit(&GraphEvent::NodeCreated { node: "B".to_string() });
    assert_eq!(completed, 1);
}

#[test]
fn test_unsubscribed_listener_is_silent() {
    let mut graph = graph();
    let seen = Rc::new(RefCell::new(0));
    let sink = seen.clone();
    let id = graph.events_mut().subscribe(NODE_CREATED, move |_| {
        *sink.borrow_mut() += 1;
        Ok(())
    });
    graph.create_node("Node", None, None);
    assert!(graph.events_mut().unsubscribe(id));
    graph.create_node("Node", None, None);
    assert_eq!(*seen.borrow(), 1);
}

#[test]
fn test_live_update_recomposes_once_per_batch() {
    let mut graph = graph();
    graph.set_live_update(true);
    let executed = counter(&mut graph, GRAPH_EXECUTED);

    graph.batch(|graph| {
        let world = prim(graph, "World", None);
        let attrs = graph.create_node(ATTRIBUTE_SET, None, Some(world)).unwrap();
        graph.add_dynamic_parameter(attrs, Parameter::new("size", ValueType::Double));
        graph.set_parameter_value(attrs, "size", Value::from(2.0)).unwrap();
    });

    assert_eq!(graph.recompose_count(), 1);
    assert_eq!(executed.borrow().len(), 1);
    assert_eq!(
        graph.composition().attribute_value(&path("/World"), "size", 0.0),
        Some(Value::from(2.0))
    );
    // Composition is scratch; the live document only changes on apply.
    assert!(graph.document().prims().is_empty());
}

#[test]
fn test_live_update_follows_time() {
    let mut graph = graph();
    let world = prim(&mut graph, "World", None);
    let attrs = graph.create_node(ATTRIBUTE_SET, None, Some(world)).unwrap();
    graph.add_dynamic_parameter(attrs, Parameter::new("active", ValueType::Bool));
    graph.set_live_update(true);

    let before = graph.recompose_count();
    graph.set_time(3.0);
    assert_eq!(graph.recompose_count(), before + 1);
    graph.set_live_update(false);
    graph.set_time(4.0);
    assert_eq!(graph.recompose_count(), before + 1);
}

#[test]
fn test_find_matches_every_variant() {
    let mut graph = SceneGraph::from_document(Arc::new(NodeRegistry::with_builtins()), variant_document());
    let found = graph.find_node_at_path(&path("/World/Set{look=red}Mesh"));
    assert_eq!(found.len(), 2);
    let paths: Vec<ScenePath> = found
        .iter()
        .flat_map(|&id| graph.node(id).unwrap().paths().to_vec())
        .collect();
    assert_eq!(
        paths,
        vec![path("/World/Set{look=red}Mesh"), path("/World/Set{look=blue}Mesh")]
    );
}

#[test]
fn test_find_extends_every_variant() {
    let mut graph = SceneGraph::from_document(Arc::new(NodeRegistry::with_builtins()), variant_document());
    let before = graph.len();
    let found = graph.find_node_at_path(&path("/World/Set/Mesh/Leaf"));
    assert_eq!(found.len(), 2);
    assert_eq!(graph.len(), before + 2);
    for &id in &found {
        assert_eq!(graph.node(id).unwrap().type_name(), PRIM_OVERRIDE);
    }

    let stage = graph.export_to_document();
    for variant in ["red", "blue"] {
        let leaf = stage
            .prim(&path(&format!("/World/Set{{look={}}}Mesh/Leaf", variant)))
            .unwrap();
        assert_eq!(leaf.specifier, Specifier::Over);
    }
}

#[test]
fn test_nodes_at_path_after_edit() {
    let mut graph = graph();
    let world = prim(&mut graph, "World", None);
    assert_eq!(graph.nodes_at_path(&path("/World")), vec![world]);
    graph
        .set_parameter_value(world, PRIM_NAME, Value::from("Renamed"))
        .unwrap();
    assert!(graph.nodes_at_path(&path("/World")).is_empty());
    assert_eq!(graph.nodes_at_path(&path("/Renamed")), vec![world]);
}

#[test]
fn test_labels_follow_parameters() {
    let mut graph = graph();
    let world = prim(&mut graph, "World", None);
    let reference = graph.create_node(REFERENCE, None, Some(world)).unwrap();
    graph
        .set_parameter_value(reference, ASSET_PATH, Value::from("props/chair.json"))
        .unwrap();
    assert_eq!(graph.node(world).unwrap().display_label(), "World");
    assert_eq!(graph.node(reference).unwrap().display_label(), "chair.json");
}

#[test]
fn test_shader_ports_link_after_import() {
    let mut stage = Stage::new();
    let tex = path("/Mat/Tex");
    let surface = path("/Mat/Surface");
    stage.define_prim(&path("/Mat"), Some("Material")).unwrap();
    stage.define_prim(&tex, Some("Shader")).unwrap();
    stage
        .set_attribute(&tex, "outputs:rgb", Attribute::new("color3f"))
        .unwrap();
    stage.define_prim(&surface, Some("Shader")).unwrap();
    stage
        .set_attribute(
            &surface,
            "inputs:diffuseColor",
            Attribute::new("color3f").with_connection("/Mat/Tex.outputs:rgb"),
        )
        .unwrap();

    let graph = SceneGraph::from_document(Arc::new(NodeRegistry::with_builtins()), stage);
    let links = graph.port_links();
    assert_eq!(links.len(), 1);
    let shader = graph.node(links[0].to.node_id).unwrap();
    assert_eq!(shader.type_name(), SHADER);
    assert_eq!(shader.name(), "Surface");
    assert_eq!(graph.node(links[0].from.node_id).unwrap().name(), "Tex");
}
