//! Variant sets, selections and switches.

use super::require_prim;
use crate::error::{LibraryError, Result};
use crate::model::node::Node;
use crate::model::parameter::Parameter;
use crate::model::value::{Value, ValueType};
use crate::registry::{ApplyContext, NodeBehavior};
use crate::stage::{ScenePath, Stage, VariantSetSpec};

pub const VARIANT_SET_NAME: &str = "variantSetName";
pub const VARIANTS: &str = "variants";
pub const VARIANT_SELECTION: &str = "variantSelection";
pub const SWITCH_SET: &str = "variantSet";
pub const SWITCH_VARIANT: &str = "variant";

fn required(ctx: &ApplyContext<'_>, name: &str) -> Result<String> {
    let value = ctx.string(name);
    if value.is_empty() {
        return Err(LibraryError::graph(format!(
            "{} has no {}",
            ctx.node.name(),
            name
        )));
    }
    Ok(value)
}

fn inherit(node: &mut Node, name: &str, value: Value) {
    if let Some(param) = node.param_mut(name) {
        param.set_inherited(Some(value), None, None);
    }
}

/// Declares a variant set and its variants on the context prim.
pub struct VariantSetNode;

impl NodeBehavior for VariantSetNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(VARIANT_SET_NAME, ValueType::String).with_label("Variant Set"),
            Parameter::new(VARIANTS, ValueType::StringArray).with_label("Variants"),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "variant set")?;
        let set = required(ctx, VARIANT_SET_NAME)?;
        stage.add_variant_set(path, &set)?;
        for variant in ctx.strings(VARIANTS).iter().filter(|v| !v.is_empty()) {
            stage.add_variant(path, &set, variant)?;
        }
        Ok(path.clone())
    }
}

pub fn import_variant_set(node: &mut Node, set: &VariantSetSpec) {
    inherit(node, VARIANT_SET_NAME, Value::from(set.name.as_str()));
    inherit(node, VARIANTS, Value::from(set.variant_names()));
}

/// Commits a selection on the context prim.
pub struct VariantSelectNode;

impl NodeBehavior for VariantSelectNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(VARIANT_SET_NAME, ValueType::String).with_label("Variant Set"),
            Parameter::new(VARIANT_SELECTION, ValueType::String).with_label("Selection"),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "variant selection")?;
        let set = required(ctx, VARIANT_SET_NAME)?;
        let selection = required(ctx, VARIANT_SELECTION)?;
        stage.set_variant_selection(path, &set, Some(selection.as_str()))?;
        Ok(path.clone())
    }
}

pub fn import_selection(node: &mut Node, set: &str, selection: &str) {
    inherit(node, VARIANT_SET_NAME, Value::from(set));
    inherit(node, VARIANT_SELECTION, Value::from(selection));
}

/// Makes its children compose inside one variant.
///
/// The node itself only ensures the variant exists; the graph opens the
/// variant edit context around the children.
pub struct VariantSwitchNode;

impl NodeBehavior for VariantSwitchNode {
    fn parameters(&self) -> Vec<Parameter> {
        vec![
            Parameter::new(SWITCH_SET, ValueType::String).with_label("Variant Set"),
            Parameter::new(SWITCH_VARIANT, ValueType::String).with_label("Variant"),
        ]
    }

    fn apply(&self, ctx: &ApplyContext<'_>, stage: &mut Stage, path: &ScenePath) -> Result<ScenePath> {
        require_prim(path, "variant switch")?;
        let set = required(ctx, SWITCH_SET)?;
        let variant = required(ctx, SWITCH_VARIANT)?;
        stage.add_variant(path, &set, &variant)?;
        Ok(path.clone())
    }

    fn variant_switch(&self, ctx: &ApplyContext<'_>) -> Option<(String, String)> {
        let set = ctx.string(SWITCH_SET);
        let variant = ctx.string(SWITCH_VARIANT);
        (!set.is_empty() && !variant.is_empty()).then_some((set, variant))
    }
}

pub fn import_switch(node: &mut Node, set: &str, variant: &str) {
    inherit(node, SWITCH_SET, Value::from(set));
    inherit(node, SWITCH_VARIANT, Value::from(variant));
}
