use log::debug;

use crate::error::{LibraryError, Result};
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{Value, ValueType};
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{PrimSpec, ScenePath, Specifier, Stage};

pub const PRIM_NAME: &str = "primName";
pub const TYPE_NAME: &str = "typeName";
pub const SPECIFIER: &str = "specifier";
pub const KIND: &str = "kind";

/// Parameters describing prim identity rather than prim contents.
pub const IDENTITY_PARAMS: &[&str] = &[PRIM_NAME, TYPE_NAME, SPECIFIER, KIND];

/// Defines or overrides the prim `<context>/<primName>`.
pub struct PrimNode {
    specifier: Specifier,
    type_name: &'static str,
}

impl PrimNode {
    pub fn new(specifier: Specifier, type_name: &'static str) -> Self {
        Self {
            specifier,
            type_name,
        }
    }
}

impl NodeBehavior for PrimNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(PRIM_NAME, ValueType::String).with_label("Prim Name"),
            Parameter::new(TYPE_NAME, ValueType::Token)
                .with_label("Type")
                .with_default(self.type_name),
            Parameter::new(SPECIFIER, ValueType::Choice)
                .with_label("Specifier")
                .with_default(self.specifier.as_str())
                .with_choices(&["def", "over", "class"]),
            Parameter::new(KIND, ValueType::Token).with_label("Kind"),
        ]
    }

    fn import_prim(&self, node: &mut Node, prim: &PrimSpec) {
        import_identity(node, prim);
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        author_prim(ctx, stage, path, self.specifier)
    }
}

pub(crate) fn import_identity(node: &mut Node, prim: &PrimSpec) {
    let captured = [
        (PRIM_NAME, Some(Value::from(prim.name.as_str()))),
        (TYPE_NAME, prim.type_name.as_deref().map(Value::from)),
        (SPECIFIER, Some(Value::from(prim.specifier.as_str()))),
        (KIND, prim.kind.as_deref().map(Value::from)),
    ];
    for (name, value) in captured {
        if let Some(param) = node.param_mut(name) {
            param.set_inherited(value, None, None);
        }
    }
}

/// Writes the prim described by the identity parameters under `parent`.
pub(crate) fn author_prim(
    ctx: &ApplyContext<'_>,
    stage: &mut Stage,
    parent: &ScenePath,
    fallback: Specifier,
) -> Result<ScenePath> {
    let name = ctx.string(PRIM_NAME);
    if name.is_empty() {
        return Err(LibraryError::graph(format!(
            "{} has no prim name",
            ctx.node.name()
        )));
    }
    let path = parent.append_child(&name);
    let type_name = ctx.string(TYPE_NAME);
    let specifier = Specifier::parse(&ctx.string(SPECIFIER)).unwrap_or(fallback);

    let written = match specifier {
        Specifier::Def => stage.define_prim(&path, Some(type_name.as_str()))?,
        Specifier::Over | Specifier::Class => {
            let written = stage.override_prim(&path)?;
            let spec = stage.edit_prim(&path)?;
            if specifier == Specifier::Class {
                spec.specifier = Specifier::Class;
            }
            if !type_name.is_empty() {
                spec.type_name = Some(type_name);
            }
            written
        }
    };

    let kind = ctx.string(KIND);
    if !kind.is_empty() {
        stage.edit_prim(&path)?.kind = Some(kind);
    }
    debug!("{} authored {}", ctx.node.name(), written);
    Ok(path)
}
