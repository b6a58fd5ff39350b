//! Node type definitions and the registry that owns them.

pub mod behavior;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, error, warn};

pub use behavior::{ApplyContext, NodeBehavior, PassThrough};

use crate::model::node::{Node, NodeId};
use crate::model::value::Value;

/// Type name of the generic fallback node.
pub const GENERIC_NODE: &str = "Node";

/// Category of a node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Document-wide settings (root, sublayers)
    Layer,
    /// Prim definitions and overrides
    Prim,
    /// Materials and shaders
    Shading,
    /// Attribute and relationship authoring
    Property,
    /// References and payloads
    Composition,
    /// Variant sets, selections and switches
    Variant,
    /// Anything else
    Generic,
}

impl std::fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NodeCategory::Layer => "Layer",
            NodeCategory::Prim => "Prim",
            NodeCategory::Shading => "Shading",
            NodeCategory::Property => "Property",
            NodeCategory::Composition => "Composition",
            NodeCategory::Variant => "Variant",
            NodeCategory::Generic => "Generic",
        };
        write!(f, "{}", s)
    }
}

/// Orthogonal traits a node type can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Contributes a prim name to its path.
    PrimIdentity,
    /// Authors attributes from its parameters.
    Attributes,
    /// Authors relationships from its parameters.
    Relationships,
    /// Reads or writes variant state.
    VariantAware,
}

/// Definition of a node type, registered in the `NodeRegistry`.
#[derive(Clone)]
pub struct NodeTypeDefinition {
    /// Unique type name (e.g. "PrimDefine", "VariantSwitch")
    pub type_name: String,
    /// Type this one derives from, if any
    pub parent: Option<String>,
    pub category: NodeCategory,
    /// Description shown in tooltips
    pub description: String,
    /// Label template resolved by the expression resolver
    pub label: String,
    pub capabilities: Vec<Capability>,
    pub behavior: Option<Arc<dyn NodeBehavior>>,
}

impl NodeTypeDefinition {
    pub fn new(type_name: &str, category: NodeCategory) -> Self {
        Self {
            type_name: type_name.to_string(),
            parent: None,
            category,
            description: String::new(),
            label: String::new(),
            capabilities: Vec::new(),
            behavior: None,
        }
    }

    pub fn with_parent(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = desc.to_string();
        self
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    pub fn with_capabilities(mut self, capabilities: &[Capability]) -> Self {
        self.capabilities = capabilities.to_vec();
        self
    }

    pub fn with_behavior(mut self, behavior: impl NodeBehavior + 'static) -> Self {
        self.behavior = Some(Arc::new(behavior));
        self
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

impl std::fmt::Debug for NodeTypeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeTypeDefinition")
            .field("type_name", &self.type_name)
            .field("parent", &self.parent)
            .field("category", &self.category)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

/// Maps type names to definitions, plus site defaults layered on top.
///
/// Constructed by the application and shared with graphs through an `Arc`.
#[derive(Debug)]
pub struct NodeRegistry {
    definitions: HashMap<String, NodeTypeDefinition>,
    order: Vec<String>,
    defaults: HashMap<String, BTreeMap<String, Value>>,
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeRegistry {
    /// An empty registry holding only the generic fallback type.
    pub fn new() -> Self {
        let mut registry = Self {
            definitions: HashMap::new(),
            order: Vec::new(),
            defaults: HashMap::new(),
        };
        registry.register(
            NodeTypeDefinition::new(GENERIC_NODE, NodeCategory::Generic)
                .with_description("Passes its context through unchanged")
                .with_label("{name}")
                .with_behavior(PassThrough),
        );
        registry
    }

    /// A registry with every built-in node type.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::nodes::register_builtin_nodes(&mut registry);
        registry
    }

    /// Registers a type. A definition without behavior is rejected.
    pub fn register(&mut self, definition: NodeTypeDefinition) -> bool {
        if definition.behavior.is_none() {
            error!(
                "Node type '{}' has no behavior; registration ignored",
                definition.type_name
            );
            return false;
        }
        if let Some(parent) = &definition.parent {
            if !self.definitions.contains_key(parent) {
                warn!(
                    "Node type '{}' derives from unregistered type '{}'",
                    definition.type_name, parent
                );
            }
        }
        debug!("Registered node type {}", definition.type_name);
        if !self.definitions.contains_key(&definition.type_name) {
            self.order.push(definition.type_name.clone());
        }
        self.definitions
            .insert(definition.type_name.clone(), definition);
        true
    }

    pub fn get(&self, type_name: &str) -> Option<&NodeTypeDefinition> {
        self.definitions.get(type_name)
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.definitions.contains_key(type_name)
    }

    /// The definition for `type_name`, or the generic fallback.
    pub fn class_of(&self, type_name: &str) -> &NodeTypeDefinition {
        self.definitions
            .get(type_name)
            .or_else(|| self.definitions.get(GENERIC_NODE))
            .unwrap_or_else(|| unreachable!("generic node type is always registered"))
    }

    pub fn behavior(&self, type_name: &str) -> Arc<dyn NodeBehavior> {
        self.class_of(type_name)
            .behavior
            .clone()
            .unwrap_or_else(|| Arc::new(PassThrough))
    }

    /// Type names in registration order.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `type_name` followed by each registered ancestor, nearest first.
    pub fn ancestors(&self, type_name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut current = Some(type_name.to_string());
        while let Some(name) = current {
            if chain.contains(&name) {
                break;
            }
            current = self.definitions.get(&name).and_then(|d| d.parent.clone());
            chain.push(name);
        }
        chain
    }

    pub fn is_subtype(&self, type_name: &str, ancestor: &str) -> bool {
        self.ancestors(type_name).iter().any(|name| name == ancestor)
    }

    pub fn has_capability(&self, type_name: &str, capability: Capability) -> bool {
        self.class_of(type_name).has_capability(capability)
    }

    /// Stores a site default consulted by every future instance.
    pub fn set_default(&mut self, type_name: &str, param: &str, value: impl Into<Value>) {
        self.defaults
            .entry(type_name.to_string())
            .or_default()
            .insert(param.to_string(), value.into());
    }

    /// The nearest site default for `param`, searching up the ancestry.
    pub fn default_for(&self, type_name: &str, param: &str) -> Option<&Value> {
        self.ancestors(type_name)
            .iter()
            .find_map(|name| self.defaults.get(name)?.get(param))
    }

    /// Builds a node of a registered type; unknown types are refused.
    pub fn instantiate(&self, id: NodeId, type_name: &str, name: &str) -> Option<Node> {
        let Some(definition) = self.definitions.get(type_name) else {
            warn!("Unsupported node type '{}'", type_name);
            return None;
        };
        let mut node = Node::new(id, type_name, name, &definition.label);
        for param in self.behavior(type_name).parameters() {
            node.add_parameter(param);
        }
        self.apply_defaults(&mut node);
        Some(node)
    }

    fn apply_defaults(&self, node: &mut Node) {
        let type_name = node.type_name().to_string();
        for param in node.params_mut() {
            let Some(value) = self.default_for(&type_name, param.name()) else {
                continue;
            };
            match param.value_type().coerce(value.clone()) {
                Some(value) => param.set_default_value(value),
                None => warn!(
                    "Default {} for {}.{} does not fit type {}",
                    value,
                    type_name,
                    param.name(),
                    param.value_type()
                ),
            }
        }
        node.refresh_label();
    }
}
