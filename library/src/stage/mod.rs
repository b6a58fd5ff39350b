//! In-memory layered scene document.
//!
//! A `Stage` holds one layer of prim specs plus layer metadata. Writes go
//! through the edit target stack, so while a variant edit is open every
//! write addressed to the composed path lands inside the selected variant.

pub mod path;
pub mod spec;

use log::debug;
use serde::{Deserialize, Serialize};

pub use path::{PathElement, ScenePath, split_attribute_path};
pub use spec::{
    Attribute, CompositionArc, LayerOffset, PrimSpec, Relationship, Specifier, VariantSetSpec,
};

use crate::error::{LibraryError, Result};
use crate::model::value::{Value, ValueType};
use crate::model::parameter::INTERPOLATION_KEY;
use spec::child_mut_or_create;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct SubLayer {
    pub asset_path: String,
    #[serde(default, skip_serializing_if = "LayerOffset::is_identity")]
    pub layer_offset: LayerOffset,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct LayerMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_prim: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub up_axis: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time_code: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time_code: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sublayers: Vec<SubLayer>,
}

#[derive(Clone, Debug, PartialEq)]
struct VariantEditTarget {
    prim: ScenePath,
    set: String,
    variant: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Stage {
    #[serde(default)]
    metadata: LayerMetadata,
    #[serde(default)]
    prims: Vec<PrimSpec>,
    #[serde(skip)]
    edit_targets: Vec<VariantEditTarget>,
}

impl PartialEq for Stage {
    fn eq(&self, other: &Self) -> bool {
        self.metadata == other.metadata && self.prims == other.prims
    }
}

impl Stage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_text(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn metadata(&self) -> &LayerMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut LayerMetadata {
        &mut self.metadata
    }

    /// Root prims in authored order.
    pub fn prims(&self) -> &[PrimSpec] {
        &self.prims
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty() && self.metadata == LayerMetadata::default()
    }

    /// Spec stored at exactly `path`; variant elements address variant specs.
    pub fn prim(&self, path: &ScenePath) -> Option<&PrimSpec> {
        let mut elements = path.elements().iter();
        let PathElement::Prim(first) = elements.next()? else {
            return None;
        };
        let mut current = self.prims.iter().find(|p| &p.name == first)?;
        for element in elements {
            current = match element {
                PathElement::Prim(name) => current.child(name)?,
                PathElement::Variant { set, variant } => current.variant(set, variant)?,
            };
        }
        Some(current)
    }

    pub fn has_prim(&self, path: &ScenePath) -> bool {
        self.prim(path).is_some()
    }

    /// Maps a composed path through the open variant edit contexts.
    ///
    /// Each open context inserts its `{set=variant}` right after the prim it
    /// was opened on. Paths that already carry variant elements are returned
    /// as given.
    pub fn edit_path(&self, path: &ScenePath) -> ScenePath {
        if self.edit_targets.is_empty()
            || path
                .elements()
                .iter()
                .any(|e| matches!(e, PathElement::Variant { .. }))
        {
            return path.clone();
        }

        let mut elements = Vec::new();
        for (index, name) in path.prim_names().enumerate() {
            elements.push(PathElement::Prim(name.to_string()));
            let depth = index + 1;
            for target in &self.edit_targets {
                if target.prim.prim_depth() != depth || path.common_prim_prefix(&target.prim) != depth
                {
                    continue;
                }
                let element = PathElement::Variant {
                    set: target.set.clone(),
                    variant: target.variant.clone(),
                };
                if !elements.contains(&element) {
                    elements.push(element);
                }
            }
        }
        ScenePath::from_elements(elements)
    }

    /// Gets or creates the spec at the edit path of `path`.
    ///
    /// Missing ancestors are created as `over`.
    pub fn edit_prim(&mut self, path: &ScenePath) -> Result<&mut PrimSpec> {
        let target = self.edit_path(path);
        let mut elements = target.elements().iter();
        let Some(PathElement::Prim(first)) = elements.next() else {
            return Err(LibraryError::invalid_path(format!(
                "'{}' does not address a prim",
                target
            )));
        };
        let mut current = child_mut_or_create(&mut self.prims, first);
        for element in elements {
            let spec = current;
            current = match element {
                PathElement::Prim(name) => child_mut_or_create(&mut spec.children, name),
                PathElement::Variant { set, variant } => spec.variant_mut_or_create(set, variant),
            };
        }
        Ok(current)
    }

    /// Defines a prim, returning the path it was written to.
    pub fn define_prim(&mut self, path: &ScenePath, type_name: Option<&str>) -> Result<ScenePath> {
        let spec = self.edit_prim(path)?;
        spec.specifier = Specifier::Def;
        if let Some(type_name) = type_name.filter(|t| !t.is_empty()) {
            spec.type_name = Some(type_name.to_string());
        }
        Ok(self.edit_path(path))
    }

    /// Gets or creates an `over`; an existing spec keeps its specifier.
    pub fn override_prim(&mut self, path: &ScenePath) -> Result<ScenePath> {
        self.edit_prim(path)?;
        Ok(self.edit_path(path))
    }

    pub fn set_attribute(&mut self, path: &ScenePath, name: &str, attribute: Attribute) -> Result<()> {
        self.edit_prim(path)?
            .attributes
            .insert(name.to_string(), attribute);
        Ok(())
    }

    pub fn set_relationship(
        &mut self,
        path: &ScenePath,
        name: &str,
        relationship: Relationship,
    ) -> Result<()> {
        self.edit_prim(path)?
            .relationships
            .insert(name.to_string(), relationship);
        Ok(())
    }

    pub fn add_reference(&mut self, path: &ScenePath, arc: CompositionArc) -> Result<()> {
        self.edit_prim(path)?.references.push(arc);
        Ok(())
    }

    pub fn add_payload(&mut self, path: &ScenePath, arc: CompositionArc) -> Result<()> {
        self.edit_prim(path)?.payloads.push(arc);
        Ok(())
    }

    pub fn add_variant_set(&mut self, path: &ScenePath, set: &str) -> Result<()> {
        self.edit_prim(path)?.variant_set_mut_or_create(set);
        Ok(())
    }

    pub fn add_variant(&mut self, path: &ScenePath, set: &str, variant: &str) -> Result<()> {
        self.edit_prim(path)?.variant_mut_or_create(set, variant);
        Ok(())
    }

    /// Selection authored at the edit path of `path`.
    pub fn variant_selection(&self, path: &ScenePath, set: &str) -> Option<String> {
        self.prim(&self.edit_path(path))?
            .variant_selections
            .get(set)
            .cloned()
    }

    /// Authors (`Some`) or clears (`None`) a selection.
    pub fn set_variant_selection(
        &mut self,
        path: &ScenePath,
        set: &str,
        variant: Option<&str>,
    ) -> Result<()> {
        let spec = self.edit_prim(path)?;
        match variant {
            Some(variant) => {
                spec.variant_selections
                    .insert(set.to_string(), variant.to_string());
            }
            None => {
                spec.variant_selections.remove(set);
            }
        }
        Ok(())
    }

    /// Runs `edit` with writes under `prim` redirected into `{set=variant}`.
    pub fn with_variant_edit<R>(
        &mut self,
        prim: &ScenePath,
        set: &str,
        variant: &str,
        edit: impl FnOnce(&mut Stage) -> R,
    ) -> R {
        self.push_variant_edit(prim, set, variant);
        let result = edit(self);
        self.pop_variant_edit();
        result
    }

    pub(crate) fn push_variant_edit(&mut self, prim: &ScenePath, set: &str, variant: &str) {
        debug!("Opening variant edit {}{{{}={}}}", prim, set, variant);
        self.edit_targets.push(VariantEditTarget {
            prim: prim.strip_variant_selections(),
            set: set.to_string(),
            variant: variant.to_string(),
        });
    }

    pub(crate) fn pop_variant_edit(&mut self) {
        self.edit_targets.pop();
    }

    pub fn in_variant_edit(&self) -> bool {
        !self.edit_targets.is_empty()
    }

    /// Specs contributing to the composed prim at `path`, strongest first.
    ///
    /// A prim's local opinions are stronger than those of its selected
    /// variants; variants nested in a selected variant follow it.
    pub fn composed_specs(&self, path: &ScenePath) -> Vec<&PrimSpec> {
        let mut current: Vec<&PrimSpec> = Vec::new();
        for (depth, name) in path.prim_names().enumerate() {
            let found: Vec<&PrimSpec> = if depth == 0 {
                self.prims.iter().filter(|p| p.name == name).collect()
            } else {
                current.iter().filter_map(|spec| spec.child(name)).collect()
            };
            current = Vec::new();
            for spec in found {
                collect_with_selected_variants(spec, &mut current);
            }
            if current.is_empty() {
                break;
            }
        }
        current
    }

    pub fn attribute(&self, path: &ScenePath, name: &str) -> Option<&Attribute> {
        self.composed_specs(path)
            .into_iter()
            .find_map(|spec| spec.attributes.get(name))
    }

    pub fn relationship(&self, path: &ScenePath, name: &str) -> Option<&Relationship> {
        self.composed_specs(path)
            .into_iter()
            .find_map(|spec| spec.relationships.get(name))
    }

    /// Resolved attribute value at `time`; samples win over the default.
    pub fn attribute_value(&self, path: &ScenePath, name: &str, time: f64) -> Option<Value> {
        let attribute = self.attribute(path, name)?;
        if let Some(samples) = &attribute.time_samples {
            let held = attribute
                .metadata
                .get(INTERPOLATION_KEY)
                .and_then(Value::as_str)
                .is_some_and(|mode| mode == "held");
            let interpolate = ValueType::from_tag(&attribute.type_name)
                .is_some_and(ValueType::is_interpolable)
                && !held;
            if let Some(value) = samples.evaluate(time, interpolate) {
                return Some(value);
            }
        }
        attribute.value.clone()
    }

    /// Composed variant selection for `set` on the prim at `path`.
    pub fn composed_variant_selection(&self, path: &ScenePath, set: &str) -> Option<String> {
        self.composed_specs(path)
            .into_iter()
            .find_map(|spec| spec.variant_selections.get(set).cloned())
    }

    /// Every stored spec path in document order, variant specs included.
    pub fn spec_paths(&self) -> Vec<ScenePath> {
        let mut paths = Vec::new();
        for prim in &self.prims {
            collect_spec_paths(prim, &ScenePath::root().append_child(&prim.name), &mut paths);
        }
        paths
    }
}

fn collect_with_selected_variants<'a>(spec: &'a PrimSpec, out: &mut Vec<&'a PrimSpec>) {
    out.push(spec);
    for set in &spec.variant_sets {
        let selected = spec
            .variant_selections
            .get(&set.name)
            .and_then(|selection| set.variant(selection));
        if let Some(variant) = selected {
            collect_with_selected_variants(variant, out);
        }
    }
}

fn collect_spec_paths(spec: &PrimSpec, path: &ScenePath, out: &mut Vec<ScenePath>) {
    out.push(path.clone());
    for set in &spec.variant_sets {
        for variant in &set.variants {
            let variant_path = path.append_variant_selection(&set.name, &variant.name);
            collect_spec_paths(variant, &variant_path, out);
        }
    }
    for child in &spec.children {
        collect_spec_paths(child, &path.append_child(&child.name), out);
    }
}
