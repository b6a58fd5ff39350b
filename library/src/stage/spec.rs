//! Authored opinions stored in a layer.

use std::collections::BTreeMap;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use super::path::ScenePath;
use crate::model::time_samples::TimeSamples;
use crate::model::value::Value;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Specifier {
    #[default]
    Def,
    Over,
    Class,
}

impl Specifier {
    pub fn as_str(self) -> &'static str {
        match self {
            Specifier::Def => "def",
            Specifier::Over => "over",
            Specifier::Class => "class",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "def" => Some(Specifier::Def),
            "over" => Some(Specifier::Over),
            "class" => Some(Specifier::Class),
            _ => None,
        }
    }
}

fn default_scale() -> OrderedFloat<f64> {
    OrderedFloat(1.0)
}

/// Time offset and scale applied to an external layer.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerOffset {
    #[serde(default)]
    pub offset: OrderedFloat<f64>,
    #[serde(default = "default_scale")]
    pub scale: OrderedFloat<f64>,
}

impl Default for LayerOffset {
    fn default() -> Self {
        Self {
            offset: OrderedFloat(0.0),
            scale: default_scale(),
        }
    }
}

impl LayerOffset {
    pub fn new(offset: f64, scale: f64) -> Self {
        Self {
            offset: OrderedFloat(offset),
            scale: OrderedFloat(scale),
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == LayerOffset::default()
    }
}

/// A reference or payload arc pulling another document into a prim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CompositionArc {
    pub asset_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prim_path: Option<ScenePath>,
    #[serde(default, skip_serializing_if = "LayerOffset::is_identity")]
    pub layer_offset: LayerOffset,
}

impl CompositionArc {
    pub fn new(asset_path: &str) -> Self {
        Self {
            asset_path: asset_path.to_string(),
            prim_path: None,
            layer_offset: LayerOffset::default(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Attribute {
    /// Declared value type tag, e.g. `float3`.
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_samples: Option<TimeSamples>,
    /// Connection sources written `"/prim/path.attribute"`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    #[serde(default)]
    pub custom: bool,
}

impl Attribute {
    pub fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_time_samples(mut self, samples: TimeSamples) -> Self {
        self.time_samples = Some(samples);
        self
    }

    pub fn with_connection(mut self, source: &str) -> Self {
        self.connections.push(source.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct Relationship {
    #[serde(default)]
    pub targets: Vec<ScenePath>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl Relationship {
    pub fn new(targets: Vec<ScenePath>) -> Self {
        Self {
            targets,
            metadata: BTreeMap::new(),
        }
    }
}

/// A named set of alternative sub-compositions.
///
/// Each variant is a `PrimSpec` named after the variant; its contents are
/// composed onto the owning prim when the variant is selected.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct VariantSetSpec {
    pub name: String,
    #[serde(default)]
    pub variants: Vec<PrimSpec>,
}

impl VariantSetSpec {
    pub fn variant(&self, name: &str) -> Option<&PrimSpec> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_names(&self) -> Vec<String> {
        self.variants.iter().map(|v| v.name.clone()).collect()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct PrimSpec {
    pub name: String,
    #[serde(default)]
    pub specifier: Specifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Attribute>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<CompositionArc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub payloads: Vec<CompositionArc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variant_sets: Vec<VariantSetSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variant_selections: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<PrimSpec>,
}

impl PrimSpec {
    pub fn new(name: &str, specifier: Specifier) -> Self {
        Self {
            name: name.to_string(),
            specifier,
            ..Default::default()
        }
    }

    pub fn with_type(mut self, type_name: &str) -> Self {
        self.type_name = Some(type_name.to_string());
        self
    }

    pub fn child(&self, name: &str) -> Option<&PrimSpec> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn variant_set(&self, name: &str) -> Option<&VariantSetSpec> {
        self.variant_sets.iter().find(|s| s.name == name)
    }

    pub fn variant(&self, set: &str, variant: &str) -> Option<&PrimSpec> {
        self.variant_set(set)?.variant(variant)
    }

    pub fn variant_set_mut_or_create(&mut self, set: &str) -> &mut VariantSetSpec {
        let index = match self.variant_sets.iter().position(|s| s.name == set) {
            Some(index) => index,
            None => {
                self.variant_sets.push(VariantSetSpec {
                    name: set.to_string(),
                    variants: Vec::new(),
                });
                self.variant_sets.len() - 1
            }
        };
        &mut self.variant_sets[index]
    }

    pub fn variant_mut_or_create(&mut self, set: &str, variant: &str) -> &mut PrimSpec {
        let variant_set = self.variant_set_mut_or_create(set);
        child_mut_or_create(&mut variant_set.variants, variant)
    }
}

/// Finds `name` in `specs`, appending an `over` when it is missing.
pub(crate) fn child_mut_or_create<'a>(specs: &'a mut Vec<PrimSpec>, name: &str) -> &'a mut PrimSpec {
    let index = match specs.iter().position(|s| s.name == name) {
        Some(index) => index,
        None => {
            specs.push(PrimSpec::new(name, Specifier::Over));
            specs.len() - 1
        }
    };
    &mut specs[index]
}
