//! Typed value cells attached to nodes.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::connection::{ConnectionTarget, PortDirection};
use super::time_samples::TimeSamples;
use super::value::{Value, ValueType};
use crate::error::LibraryError;

/// Metadata key that forces step interpolation of time samples.
pub const INTERPOLATION_KEY: &str = "interpolation";

/// Where a parameter's effective value currently comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterSource<'a> {
    Connection(&'a ConnectionTarget),
    Samples(&'a TimeSamples),
    Value(&'a Value),
    Default(&'a Value),
}

/// A named, typed value on a node.
///
/// Holds two value triples (scalar, time samples, connection): the override
/// triple written by edits, and the inherit triple captured from a document
/// object at import time. `is_override` picks which one is consulted.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Parameter {
    name: String,
    value_type: ValueType,
    #[serde(default)]
    label: String,
    default_value: Value,
    #[serde(default)]
    override_value: Option<Value>,
    #[serde(default)]
    override_time_samples: Option<TimeSamples>,
    #[serde(default)]
    override_connect: Option<ConnectionTarget>,
    #[serde(default)]
    inherit_value: Option<Value>,
    #[serde(default)]
    inherit_time_samples: Option<TimeSamples>,
    #[serde(default)]
    inherit_connect: Option<ConnectionTarget>,
    #[serde(default)]
    is_override: bool,
    #[serde(default)]
    built_in: bool,
    #[serde(default)]
    custom: bool,
    #[serde(default = "default_visible")]
    visible: bool,
    #[serde(default)]
    port: Option<PortDirection>,
    #[serde(default)]
    choices: Vec<String>,
    #[serde(default)]
    metadata: BTreeMap<String, Value>,
}

fn default_visible() -> bool {
    true
}

impl Parameter {
    pub fn new(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            value_type,
            label: String::new(),
            default_value: value_type.zero_value(),
            override_value: None,
            override_time_samples: None,
            override_connect: None,
            inherit_value: None,
            inherit_time_samples: None,
            inherit_connect: None,
            is_override: false,
            built_in: false,
            custom: false,
            visible: true,
            port: None,
            choices: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default_value = value.into();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_choices(mut self, choices: &[&str]) -> Self {
        self.choices = choices.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_port(mut self, direction: PortDirection) -> Self {
        self.port = Some(direction);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn built_in(mut self) -> Self {
        self.built_in = true;
        self
    }

    pub fn custom(mut self) -> Self {
        self.custom = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn label(&self) -> &str {
        if self.label.is_empty() {
            &self.name
        } else {
            &self.label
        }
    }

    pub fn default_value(&self) -> &Value {
        &self.default_value
    }

    pub fn set_default_value(&mut self, value: Value) {
        self.default_value = value;
    }

    pub fn is_built_in(&self) -> bool {
        self.built_in
    }

    pub fn is_custom(&self) -> bool {
        self.custom
    }

    pub fn set_custom(&mut self, custom: bool) {
        self.custom = custom;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn port(&self) -> Option<PortDirection> {
        self.port
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn metadata(&self) -> &BTreeMap<String, Value> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: &str, value: Value) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn is_override(&self) -> bool {
        self.is_override
    }

    pub fn set_override(&mut self, is_override: bool) {
        self.is_override = is_override;
    }

    /// Writes the override scalar, coercing it to the declared type.
    pub fn set_value(&mut self, value: Value) -> Result<(), LibraryError> {
        let value = self.coerce(value)?;
        self.override_value = Some(value);
        self.is_override = true;
        Ok(())
    }

    pub fn set_time_samples(&mut self, samples: Option<TimeSamples>) {
        self.override_time_samples = samples.filter(|s| !s.is_empty());
        self.is_override = true;
    }

    pub fn set_connection(&mut self, target: Option<ConnectionTarget>) {
        self.override_connect = target;
        self.is_override = true;
    }

    /// Captures the values found on a pre-existing document object.
    pub fn set_inherited(
        &mut self,
        value: Option<Value>,
        samples: Option<TimeSamples>,
        connect: Option<ConnectionTarget>,
    ) {
        self.inherit_value = value;
        self.inherit_time_samples = samples.filter(|s| !s.is_empty());
        self.inherit_connect = connect;
    }

    pub fn set_inherited_connection(&mut self, connect: Option<ConnectionTarget>) {
        self.inherit_connect = connect;
    }

    /// Drops every local edit so the inherited values apply again.
    pub fn revert(&mut self) {
        self.override_value = None;
        self.override_time_samples = None;
        self.override_connect = None;
        self.is_override = false;
    }

    pub fn override_value(&self) -> Option<&Value> {
        self.override_value.as_ref()
    }

    pub fn inherit_value(&self) -> Option<&Value> {
        self.inherit_value.as_ref()
    }

    /// The scalar of the active triple.
    pub fn value(&self) -> Option<&Value> {
        if self.is_override {
            self.override_value.as_ref()
        } else {
            self.inherit_value.as_ref()
        }
    }

    /// The time samples of the active triple.
    pub fn time_samples(&self) -> Option<&TimeSamples> {
        if self.is_override {
            self.override_time_samples.as_ref()
        } else {
            self.inherit_time_samples.as_ref()
        }
    }

    /// The connection of the active triple.
    pub fn connection(&self) -> Option<&ConnectionTarget> {
        if self.is_override {
            self.override_connect.as_ref()
        } else {
            self.inherit_connect.as_ref()
        }
    }

    /// Rewrites connections in both triples that name `old` to name `new`.
    pub fn rename_connection_node(&mut self, old: &str, new: &str) {
        for target in [&mut self.override_connect, &mut self.inherit_connect]
            .into_iter()
            .flatten()
        {
            if target.node == old {
                target.node = new.to_string();
            }
        }
    }

    /// Rewrites connection node names through `names`; unmapped names stay.
    pub fn remap_connection_nodes(&mut self, names: &HashMap<String, String>) {
        for target in [&mut self.override_connect, &mut self.inherit_connect]
            .into_iter()
            .flatten()
        {
            if let Some(new) = names.get(&target.node) {
                target.node = new.clone();
            }
        }
    }

    /// Clears connections in both triples that name `node`.
    pub fn sever_connections_to(&mut self, node: &str) -> bool {
        let mut severed = false;
        for slot in [&mut self.override_connect, &mut self.inherit_connect] {
            if slot.as_ref().is_some_and(|target| target.node == node) {
                *slot = None;
                severed = true;
            }
        }
        severed
    }

    /// Connection takes precedence over samples, samples over the scalar.
    pub fn source(&self) -> ParameterSource<'_> {
        if let Some(target) = self.connection() {
            ParameterSource::Connection(target)
        } else if let Some(samples) = self.time_samples() {
            ParameterSource::Samples(samples)
        } else if let Some(value) = self.value() {
            ParameterSource::Value(value)
        } else {
            ParameterSource::Default(&self.default_value)
        }
    }

    /// Whether time samples blend linearly for this parameter.
    pub fn interpolates(&self) -> bool {
        let held = self
            .metadata
            .get(INTERPOLATION_KEY)
            .and_then(Value::as_str)
            .is_some_and(|mode| mode == "held");
        self.value_type.is_interpolable() && !held
    }

    /// Local value at `time`, ignoring any connection.
    ///
    /// Connections are resolved by the graph, which can see the target node.
    pub fn get_value(&self, time: f64) -> Value {
        if let Some(samples) = self.time_samples() {
            if let Some(value) = samples.evaluate(time, self.interpolates()) {
                return value;
            }
        }
        self.value()
            .cloned()
            .unwrap_or_else(|| self.default_value.clone())
    }

    /// Whether the inherit triple holds anything captured from a document.
    pub fn has_inherited(&self) -> bool {
        self.inherit_value.is_some()
            || self.inherit_time_samples.is_some()
            || self.inherit_connect.is_some()
    }

    /// Whether an attribute-style node should author this parameter.
    ///
    /// Values captured at import count as authored so an imported document
    /// recomposes unchanged. Ports are always declared.
    pub fn is_authored(&self) -> bool {
        !self.built_in
            && (self.is_override
                || self.custom
                || self.port.is_some()
                || self.has_inherited()
                || !self.metadata.is_empty())
    }

    fn coerce(&self, value: Value) -> Result<Value, LibraryError> {
        let shown = value.to_string();
        self.value_type.coerce(value).ok_or_else(|| {
            LibraryError::UnsupportedType(format!(
                "value '{}' for {} parameter '{}'",
                shown, self.value_type, self.name
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layered() -> Parameter {
        let mut param = Parameter::new("radius", ValueType::Float).with_default(1.0);
        param.set_inherited(Some(Value::from(2.0)), None, None);
        param.set_value(Value::from(3.0)).unwrap();
        param
    }

    #[test]
    fn test_override_selects_active_triple() {
        let mut param = layered();
        assert_eq!(param.get_value(0.0), Value::from(3.0));
        param.set_override(false);
        assert_eq!(param.get_value(0.0), Value::from(2.0));
    }

    #[test]
    fn test_default_when_triple_is_empty() {
        let param = Parameter::new("radius", ValueType::Float).with_default(1.5);
        assert_eq!(param.get_value(7.0), Value::from(1.5));
        assert_eq!(param.source(), ParameterSource::Default(&Value::from(1.5)));
    }

    #[test]
    fn test_samples_win_over_scalar() {
        let mut param = layered();
        param.set_time_samples(Some([(0.0, 10.0), (10.0, 20.0)].into_iter().collect()));
        assert_eq!(param.get_value(5.0), Value::from(15.0));
    }

    #[test]
    fn test_held_metadata_disables_interpolation() {
        let mut param = Parameter::new("radius", ValueType::Float)
            .with_metadata(INTERPOLATION_KEY, "held");
        param.set_time_samples(Some([(0.0, 10.0), (10.0, 20.0)].into_iter().collect()));
        assert_eq!(param.get_value(5.0), Value::from(10.0));
    }

    #[test]
    fn test_connection_is_effective_source() {
        let mut param = layered();
        param.set_connection(Some(ConnectionTarget::new("Other", "radius")));
        assert!(matches!(param.source(), ParameterSource::Connection(_)));
    }

    #[test]
    fn test_set_value_rejects_mismatched_kind() {
        let mut param = Parameter::new("color", ValueType::Color3f);
        assert!(param.set_value(Value::from("red")).is_err());
        assert!(!param.is_override());
    }

    #[test]
    fn test_revert_restores_inherited() {
        let mut param = layered();
        param.revert();
        assert!(!param.is_override());
        assert_eq!(param.get_value(0.0), Value::from(2.0));
    }

    #[test]
    fn test_sever_connections() {
        let mut param = Parameter::new("inputs:rgb", ValueType::Color3f);
        param.set_inherited(None, None, Some(ConnectionTarget::new("Tex", "outputs:rgb")));
        assert!(param.sever_connections_to("Tex"));
        assert!(param.connection().is_none());
    }

    #[test]
    fn test_authored_rules() {
        let plain = Parameter::new("a", ValueType::Float);
        assert!(!plain.is_authored());
        let mut imported = Parameter::new("a", ValueType::Float);
        imported.set_inherited(Some(Value::from(1.0)), None, None);
        assert!(imported.is_authored());
        assert!(Parameter::new("a", ValueType::Float).custom().is_authored());
        assert!(
            !Parameter::new("name", ValueType::String)
                .built_in()
                .custom()
                .is_authored()
        );
    }
}
