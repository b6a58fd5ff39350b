//! Layer-wide nodes.

use crate::error::{LibraryError, Result};
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{Value, ValueType};
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{LayerMetadata, LayerOffset, ScenePath, Stage, SubLayer};

pub const DEFAULT_PRIM: &str = "defaultPrim";
pub const UP_AXIS: &str = "upAxis";
pub const START_TIME_CODE: &str = "startTimeCode";
pub const END_TIME_CODE: &str = "endTimeCode";

pub const LAYER_PATH: &str = "layerPath";
pub const OFFSET: &str = "offset";
pub const SCALE: &str = "scale";

fn is_authored(ctx: &ApplyContext<'_>, name: &str) -> bool {
    ctx.node.param(name).is_some_and(Parameter::is_authored)
}

fn inherit(node: &mut Node, name: &str, value: Option<Value>) {
    if let Some(param) = node.param_mut(name) {
        param.set_inherited(value, None, None);
    }
}

/// The single root of every graph. Writes layer metadata.
pub struct RootNode;

impl NodeBehavior for RootNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(DEFAULT_PRIM, ValueType::Token).with_label("Default Prim"),
            Parameter::new(UP_AXIS, ValueType::Choice)
                .with_label("Up Axis")
                .with_default("Y")
                .with_choices(&["Y", "Z"]),
            Parameter::new(START_TIME_CODE, ValueType::Double).with_label("Start"),
            Parameter::new(END_TIME_CODE, ValueType::Double).with_label("End"),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, _path: &ScenePath) -> Result<ScenePath> {
        let metadata = stage.metadata_mut();
        if is_authored(ctx, DEFAULT_PRIM) {
            metadata.default_prim = Some(ctx.string(DEFAULT_PRIM)).filter(|s| !s.is_empty());
        }
        if is_authored(ctx, UP_AXIS) {
            metadata.up_axis = Some(ctx.string(UP_AXIS)).filter(|s| !s.is_empty());
        }
        if is_authored(ctx, START_TIME_CODE) {
            metadata.start_time_code = ctx.get::<f64>(START_TIME_CODE);
        }
        if is_authored(ctx, END_TIME_CODE) {
            metadata.end_time_code = ctx.get::<f64>(END_TIME_CODE);
        }
        Ok(ScenePath::root())
    }
}

pub fn import_layer_metadata(node: &mut Node, metadata: &LayerMetadata) {
    inherit(node, DEFAULT_PRIM, metadata.default_prim.as_deref().map(Value::from));
    inherit(node, UP_AXIS, metadata.up_axis.as_deref().map(Value::from));
    inherit(node, START_TIME_CODE, metadata.start_time_code.map(Value::from));
    inherit(node, END_TIME_CODE, metadata.end_time_code.map(Value::from));
}

/// Appends a sublayer. Layer nodes run before the rest of the graph.
pub struct LayerNode;

impl NodeBehavior for LayerNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(LAYER_PATH, ValueType::Asset).with_label("Layer"),
            Parameter::new(OFFSET, ValueType::Double).with_label("Offset"),
            Parameter::new(SCALE, ValueType::Double)
                .with_label("Scale")
                .with_default(1.0),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        let asset_path = ctx.string(LAYER_PATH);
        if asset_path.is_empty() {
            return Err(LibraryError::graph(format!(
                "{} has no layer path",
                ctx.node.name()
            )));
        }
        let layer_offset = LayerOffset::new(
            ctx.get::<f64>(OFFSET).unwrap_or(0.0),
            ctx.get::<f64>(SCALE).unwrap_or(1.0),
        );
        stage.metadata_mut().sublayers.push(SubLayer {
            asset_path,
            layer_offset,
        });
        Ok(path.clone())
    }
}

pub fn import_sublayer(node: &mut Node, sublayer: &SubLayer) {
    inherit(node, LAYER_PATH, Some(Value::from(sublayer.asset_path.as_str())));
    inherit(node, OFFSET, Some(Value::Float(sublayer.layer_offset.offset)));
    inherit(node, SCALE, Some(Value::Float(sublayer.layer_offset.scale)));
}
