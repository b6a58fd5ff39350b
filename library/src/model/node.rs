use std::fmt;

use serde::{Deserialize, Serialize};

use super::parameter::Parameter;
use super::value::{Value, ValueType, Vec2};
use crate::expression;
use crate::stage::path::ScenePath;

pub const NAME_PARAM: &str = "name";
pub const LABEL_PARAM: &str = "label";
pub const POSITION_PARAM: &str = "position";
pub const DISABLED_PARAM: &str = "disabled";

/// Index of a node in the graph arena.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Per-run execution state. Re-running the graph resets every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ExecState {
    #[default]
    Unexecuted,
    Executing,
    Executed,
}

/// A typed object holding named parameters, placed in the execution tree.
///
/// The node's behavior lives in the registry under its `type_name`; the node
/// itself is plain data so the graph can own it in an arena.
#[derive(Clone, Debug)]
pub struct Node {
    id: NodeId,
    type_name: String,
    params: Vec<Parameter>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Paths derived by re-synchronization.
    paths: Vec<ScenePath>,
    /// Paths written by the last execution.
    recorded_paths: Vec<ScenePath>,
    state: ExecState,
    position: Vec2,
    label_cache: String,
}

impl Node {
    pub fn new(id: NodeId, type_name: &str, name: &str, label_template: &str) -> Self {
        let builtins = vec![
            Parameter::new(NAME_PARAM, ValueType::String)
                .with_default(name)
                .built_in()
                .hidden(),
            Parameter::new(LABEL_PARAM, ValueType::String)
                .with_default(label_template)
                .built_in()
                .hidden(),
            Parameter::new(POSITION_PARAM, ValueType::Float2)
                .built_in()
                .hidden(),
            Parameter::new(DISABLED_PARAM, ValueType::Bool).built_in(),
        ];
        let mut node = Self {
            id,
            type_name: type_name.to_string(),
            params: builtins,
            parent: None,
            children: Vec::new(),
            paths: Vec::new(),
            recorded_paths: Vec::new(),
            state: ExecState::Unexecuted,
            position: Vec2::default(),
            label_cache: String::new(),
        };
        node.refresh_label();
        node
    }

    /// Rebuilds a node from stored parameters, e.g. a snapshot or a paste.
    pub(crate) fn from_parts(id: NodeId, type_name: &str, params: Vec<Parameter>, position: Vec2) -> Self {
        let mut node = Self {
            id,
            type_name: type_name.to_string(),
            params,
            parent: None,
            children: Vec::new(),
            paths: Vec::new(),
            recorded_paths: Vec::new(),
            state: ExecState::Unexecuted,
            position,
            label_cache: String::new(),
        };
        node.refresh_label();
        node
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn name(&self) -> String {
        self.param_string(NAME_PARAM)
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name() == name)
    }

    pub fn param_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.iter_mut().find(|p| p.name() == name)
    }

    pub fn params_mut(&mut self) -> impl Iterator<Item = &mut Parameter> {
        self.params.iter_mut()
    }

    /// Adds a parameter; an existing parameter with the same name is kept.
    pub fn add_parameter(&mut self, param: Parameter) -> bool {
        if self.param(param.name()).is_some() {
            return false;
        }
        self.params.push(param);
        true
    }

    /// Removes a dynamic parameter. Built-ins stay.
    pub fn remove_parameter(&mut self, name: &str) -> Option<Parameter> {
        let index = self
            .params
            .iter()
            .position(|p| p.name() == name && !p.is_built_in())?;
        Some(self.params.remove(index))
    }

    /// Parameters that take part in composition.
    pub fn scene_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| !p.is_built_in())
    }

    pub fn is_disabled(&self) -> bool {
        self.get_value(DISABLED_PARAM, 0.0)
            .get_as::<bool>()
            .unwrap_or(false)
    }

    /// Names whose value reflects presentation state rather than stored data.
    pub fn is_live_property(&self, name: &str) -> bool {
        name == POSITION_PARAM
    }

    pub fn get_value(&self, name: &str, time: f64) -> Value {
        if self.is_live_property(name) {
            return Value::Vec2(self.position);
        }
        self.param(name)
            .map(|p| p.get_value(time))
            .unwrap_or_else(|| Value::String(String::new()))
    }

    pub fn param_string(&self, name: &str) -> String {
        match self.get_value(name, 0.0) {
            Value::String(s) => s,
            other => other.to_string(),
        }
    }

    pub fn param_f64(&self, name: &str, time: f64) -> Option<f64> {
        self.param(name)?.get_value(time).get_as::<f64>()
    }

    pub fn param_strings(&self, name: &str) -> Vec<String> {
        self.param(name)
            .and_then(|p| p.get_value(0.0).get_as::<Vec<String>>())
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn paths(&self) -> &[ScenePath] {
        &self.paths
    }

    pub fn recorded_paths(&self) -> &[ScenePath] {
        &self.recorded_paths
    }

    pub fn state(&self) -> ExecState {
        self.state
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn display_label(&self) -> &str {
        &self.label_cache
    }

    /// Re-derives the cached label from the label template.
    pub fn refresh_label(&mut self) {
        let template = self.param_string(LABEL_PARAM);
        let resolved = expression::resolve_label(&template, |name| {
            self.param(name).map(|_| self.get_value(name, 0.0))
        });
        self.label_cache = if resolved.is_empty() {
            self.name()
        } else {
            resolved
        };
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    pub(crate) fn set_paths(&mut self, paths: Vec<ScenePath>) {
        self.paths = paths;
    }

    pub(crate) fn clear_recorded_paths(&mut self) {
        self.recorded_paths.clear();
    }

    pub(crate) fn record_path(&mut self, path: ScenePath) {
        if !self.recorded_paths.contains(&path) {
            self.recorded_paths.push(path);
        }
    }

    pub(crate) fn set_state(&mut self, state: ExecState) {
        self.state = state;
    }

    pub(crate) fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        if let Some(param) = self.param_mut(NAME_PARAM) {
            param.set_default_value(Value::from(name));
            param.revert();
        }
        self.refresh_label();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_present() {
        let node = Node::new(NodeId(0), "PrimDefine", "World", "{name}");
        for name in [NAME_PARAM, LABEL_PARAM, POSITION_PARAM, DISABLED_PARAM] {
            assert!(node.param(name).is_some_and(|p| p.is_built_in()));
        }
        assert_eq!(node.scene_params().count(), 0);
        assert_eq!(node.name(), "World");
        assert_eq!(node.display_label(), "World");
    }

    #[test]
    fn test_position_is_live() {
        let mut node = Node::new(NodeId(0), "Layer", "Layer", "");
        node.set_position(Vec2::new(3.0, 4.0));
        assert_eq!(node.get_value(POSITION_PARAM, 0.0), Value::Vec2(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_builtins_cannot_be_removed() {
        let mut node = Node::new(NodeId(0), "AttributeSet", "Attrs", "");
        assert!(node.remove_parameter(NAME_PARAM).is_none());
        node.add_parameter(Parameter::new("size", ValueType::Double));
        assert!(!node.add_parameter(Parameter::new("size", ValueType::Float)));
        assert!(node.remove_parameter("size").is_some());
    }
}
