//! References and payloads.

use super::require_prim;
use crate::error::{LibraryError, Result};
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{Value, ValueType};
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{CompositionArc, LayerOffset, ScenePath, Stage};

pub const ASSET_PATH: &str = "assetPath";
pub const PRIM_PATH: &str = "primPath";
pub const LAYER_OFFSET: &str = "layerOffset";
pub const LAYER_SCALE: &str = "layerScale";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArcKind {
    Reference,
    Payload,
}

pub struct ArcNode {
    kind: ArcKind,
}

impl ArcNode {
    pub fn new(kind: ArcKind) -> Self {
        Self { kind }
    }
}

impl NodeBehavior for ArcNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(ASSET_PATH, ValueType::Asset).with_label("Asset"),
            Parameter::new(PRIM_PATH, ValueType::String).with_label("Prim Path"),
            Parameter::new(LAYER_OFFSET, ValueType::Double).with_label("Offset"),
            Parameter::new(LAYER_SCALE, ValueType::Double)
                .with_label("Scale")
                .with_default(1.0),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "composition arc")?;
        let asset_path = ctx.string(ASSET_PATH);
        if asset_path.is_empty() {
            return Err(LibraryError::graph(format!(
                "{} has no asset path",
                ctx.node.name()
            )));
        }
        let prim_path = ctx.string(PRIM_PATH);
        let arc = CompositionArc {
            asset_path,
            prim_path: if prim_path.is_empty() {
                None
            } else {
                Some(prim_path.parse()?)
            },
            layer_offset: LayerOffset::new(
                ctx.get::<f64>(LAYER_OFFSET).unwrap_or(0.0),
                ctx.get::<f64>(LAYER_SCALE).unwrap_or(1.0),
            ),
        };
        match self.kind {
            ArcKind::Reference => stage.add_reference(path, arc)?,
            ArcKind::Payload => stage.add_payload(path, arc)?,
        }
        Ok(path.clone())
    }
}

pub fn import_arc(node: &mut Node, arc: &CompositionArc) {
    let captured = [
        (ASSET_PATH, Value::from(arc.asset_path.as_str())),
        (
            PRIM_PATH,
            Value::from(arc.prim_path.as_ref().map(ToString::to_string).unwrap_or_default()),
        ),
        (LAYER_OFFSET, Value::Float(arc.layer_offset.offset)),
        (LAYER_SCALE, Value::Float(arc.layer_offset.scale)),
    ];
    for (name, value) in captured {
        if let Some(param) = node.param_mut(name) {
            param.set_inherited(Some(value), None, None);
        }
    }
}
