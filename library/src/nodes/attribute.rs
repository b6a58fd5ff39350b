//! Attribute and relationship authoring.

use log::warn;

use super::{MATERIAL_BINDING_PREFIX, TRANSFORM_PREFIX, require_prim};
use crate::error::Result;
use crate::model::connection::PortDirection;
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{Value, ValueType};
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{Attribute, PrimSpec, Relationship, ScenePath, Stage};

/// Selects names by prefix: either only `prefix`, or everything except `excluded`.
#[derive(Clone, Copy, Debug)]
struct NameFilter {
    prefix: Option<&'static str>,
    excluded: &'static [&'static str],
}

impl NameFilter {
    fn accepts(&self, name: &str) -> bool {
        match self.prefix {
            Some(prefix) => name.starts_with(prefix),
            None => !self.excluded.iter().any(|p| name.starts_with(p)),
        }
    }
}

pub struct AttributeSetNode {
    filter: NameFilter,
}

impl AttributeSetNode {
    pub fn generic() -> Self {
        Self {
            filter: NameFilter {
                prefix: None,
                excluded: &[TRANSFORM_PREFIX],
            },
        }
    }

    pub fn transform() -> Self {
        Self {
            filter: NameFilter {
                prefix: Some(TRANSFORM_PREFIX),
                excluded: &[],
            },
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.filter.accepts(name)
    }
}

impl NodeBehavior for AttributeSetNode {
    fn import_prim(&self, node: &mut Node, prim: &PrimSpec) {
        for (name, attribute) in &prim.attributes {
            if self.accepts(name) {
                import_attribute(node, name, attribute);
            }
        }
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "attributes")?;
        author_attributes(ctx, stage, path, ctx.node.scene_params())?;
        Ok(path.clone())
    }
}

/// Adds a parameter mirroring a document attribute. Unsupported types are skipped.
pub fn import_attribute(node: &mut Node, name: &str, attribute: &Attribute) -> bool {
    let Some(value_type) = ValueType::from_tag(&attribute.type_name) else {
        warn!(
            "Skipping attribute {} on {}: unsupported type '{}'",
            name,
            node.name(),
            attribute.type_name
        );
        return false;
    };

    let mut param = Parameter::new(name, value_type);
    let port = PortDirection::from_attribute_name(name).or_else(|| {
        (!attribute.connections.is_empty()).then_some(PortDirection::Input)
    });
    if let Some(direction) = port {
        param = param.with_port(direction);
    }
    for (key, value) in &attribute.metadata {
        param.set_metadata(key, value.clone());
    }
    param.set_custom(attribute.custom);
    param.set_inherited(attribute.value.clone(), attribute.time_samples.clone(), None);

    if let Some(existing) = node.param_mut(name) {
        if existing.is_built_in() {
            warn!("Attribute {} collides with a built-in parameter of {}", name, node.name());
            return false;
        }
        *existing = param;
        return true;
    }
    node.add_parameter(param)
}

/// Writes every authored parameter onto the prim at `path`.
///
/// A connected parameter writes only its connection; a connection whose
/// target cannot be resolved is dropped with a warning.
pub fn author_attributes<'p>(
    ctx: &ApplyContext<'_>,
    stage: &mut Stage,
    path: &ScenePath,
    params: impl Iterator<Item = &'p Parameter>,
) -> Result<()> {
    for param in params.filter(|p| p.is_authored()) {
        let mut attribute = Attribute::new(param.value_type().tag());
        attribute.custom = param.is_custom();
        attribute.metadata = param.metadata().clone();

        if let Some(target) = param.connection() {
            match ctx.connection_source(target) {
                Some(source) => attribute.connections.push(source),
                None => warn!(
                    "{}.{}: connection to {} does not resolve",
                    ctx.node.name(),
                    param.name(),
                    target
                ),
            }
        } else {
            attribute.value = param.value().cloned();
            attribute.time_samples = param.time_samples().cloned();
        }
        stage.set_attribute(path, param.name(), attribute)?;
    }
    Ok(())
}

pub struct RelationshipSetNode {
    filter: NameFilter,
}

impl RelationshipSetNode {
    pub fn generic() -> Self {
        Self {
            filter: NameFilter {
                prefix: None,
                excluded: &[MATERIAL_BINDING_PREFIX],
            },
        }
    }

    pub fn material_binding() -> Self {
        Self {
            filter: NameFilter {
                prefix: Some(MATERIAL_BINDING_PREFIX),
                excluded: &[],
            },
        }
    }

    pub fn accepts(&self, name: &str) -> bool {
        self.filter.accepts(name)
    }
}

impl NodeBehavior for RelationshipSetNode {
    fn import_prim(&self, node: &mut Node, prim: &PrimSpec) {
        for (name, relationship) in &prim.relationships {
            if !self.accepts(name) {
                continue;
            }
            let targets: Vec<Value> = relationship
                .targets
                .iter()
                .map(|t| Value::from(t.to_string()))
                .collect();
            let mut param = Parameter::new(name, ValueType::Relationship);
            for (key, value) in &relationship.metadata {
                param.set_metadata(key, value.clone());
            }
            param.set_inherited(Some(Value::Array(targets)), None, None);
            node.add_parameter(param);
        }
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "relationships")?;
        for param in ctx.node.scene_params().filter(|p| p.is_authored()) {
            let names = ctx.strings(param.name());
            let mut targets = Vec::with_capacity(names.len());
            for name in names {
                match name.parse::<ScenePath>() {
                    Ok(target) => targets.push(target),
                    Err(e) => warn!("{}.{}: skipping target: {}", ctx.node.name(), param.name(), e),
                }
            }
            let mut relationship = Relationship::new(targets);
            relationship.metadata = param.metadata().clone();
            stage.set_relationship(path, param.name(), relationship)?;
        }
        Ok(path.clone())
    }
}
