//! Paths addressing objects in a layered document.
//!
//! A path is a list of prim names interleaved with variant selections, e.g.
//! `/World/Set{shading=red}Mesh`. Canonical printing follows the layer
//! convention that a prim name directly after a variant selection has no
//! leading `/`; parsing also accepts `/World/Set{shading=red}/Mesh`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LibraryError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    Prim(String),
    Variant { set: String, variant: String },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScenePath {
    elements: Vec<PathElement>,
}

impl ScenePath {
    /// The absolute root path `/`.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Self { elements }
    }

    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Last prim name, ignoring trailing variant selections.
    pub fn name(&self) -> Option<&str> {
        self.elements.iter().rev().find_map(|e| match e {
            PathElement::Prim(name) => Some(name.as_str()),
            PathElement::Variant { .. } => None,
        })
    }

    pub fn prim_names(&self) -> impl Iterator<Item = &str> {
        self.elements.iter().filter_map(|e| match e {
            PathElement::Prim(name) => Some(name.as_str()),
            PathElement::Variant { .. } => None,
        })
    }

    pub fn prim_depth(&self) -> usize {
        self.prim_names().count()
    }

    pub fn append_child(&self, name: &str) -> ScenePath {
        let mut elements = self.elements.clone();
        elements.push(PathElement::Prim(name.to_string()));
        ScenePath { elements }
    }

    /// Appends `{set=variant}` unless the path already ends with exactly it.
    pub fn append_variant_selection(&self, set: &str, variant: &str) -> ScenePath {
        if self.variant_suffix() == Some((set, variant)) {
            return self.clone();
        }
        let mut elements = self.elements.clone();
        elements.push(PathElement::Variant {
            set: set.to_string(),
            variant: variant.to_string(),
        });
        ScenePath { elements }
    }

    /// The selection the path ends with, if it ends inside a variant.
    pub fn variant_suffix(&self) -> Option<(&str, &str)> {
        match self.elements.last()? {
            PathElement::Variant { set, variant } => Some((set.as_str(), variant.as_str())),
            PathElement::Prim(_) => None,
        }
    }

    pub fn strip_variant_selections(&self) -> ScenePath {
        ScenePath {
            elements: self
                .elements
                .iter()
                .filter(|e| matches!(e, PathElement::Prim(_)))
                .cloned()
                .collect(),
        }
    }

    pub fn parent(&self) -> Option<ScenePath> {
        if self.elements.is_empty() {
            return None;
        }
        let mut elements = self.elements.clone();
        elements.pop();
        Some(ScenePath { elements })
    }

    pub fn has_prefix(&self, prefix: &ScenePath) -> bool {
        self.elements.starts_with(&prefix.elements)
    }

    /// Number of leading prim names shared with `other`, ignoring variant selections.
    pub fn common_prim_prefix(&self, other: &ScenePath) -> usize {
        self.prim_names()
            .zip(other.prim_names())
            .take_while(|(a, b)| a == b)
            .count()
    }
}

fn is_name_char(c: char) -> bool {
    !matches!(c, '/' | '{' | '}' | '=' | '.' | '[' | ']') && !c.is_whitespace()
}

impl FromStr for ScenePath {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| LibraryError::invalid_path(format!("'{}': {}", s, reason));

        let mut rest = s.strip_prefix('/').ok_or_else(|| invalid("must start with '/'"))?;
        let mut elements = Vec::new();
        if rest.is_empty() {
            return Ok(ScenePath { elements });
        }

        // Each step reads one prim name and the selections that follow it.
        loop {
            let end = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
            if end == 0 {
                return Err(invalid("empty prim name"));
            }
            elements.push(PathElement::Prim(rest[..end].to_string()));
            rest = &rest[end..];

            let mut after_variant = false;
            while let Some(body) = rest.strip_prefix('{') {
                let end = body.find('}').ok_or_else(|| invalid("unterminated '{'"))?;
                let (set, variant) = body[..end]
                    .split_once('=')
                    .ok_or_else(|| invalid("selection must be '{set=variant}'"))?;
                if set.is_empty() || variant.is_empty() {
                    return Err(invalid("empty variant set or variant"));
                }
                if !set.chars().all(is_name_char) || !variant.chars().all(is_name_char) {
                    return Err(invalid("bad character in variant selection"));
                }
                elements.push(PathElement::Variant {
                    set: set.to_string(),
                    variant: variant.to_string(),
                });
                rest = &body[end + 1..];
                after_variant = true;
            }

            if rest.is_empty() {
                break;
            }
            if let Some(after) = rest.strip_prefix('/') {
                rest = after;
            } else if !after_variant {
                return Err(invalid("unexpected character after prim name"));
            }
        }

        Ok(ScenePath { elements })
    }
}

impl fmt::Display for ScenePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return f.write_str("/");
        }
        let mut after_variant = false;
        for element in &self.elements {
            match element {
                PathElement::Prim(name) => {
                    if !after_variant {
                        f.write_str("/")?;
                    }
                    f.write_str(name)?;
                    after_variant = false;
                }
                PathElement::Variant { set, variant } => {
                    write!(f, "{{{}={}}}", set, variant)?;
                    after_variant = true;
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<String> for ScenePath {
    type Error = LibraryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScenePath> for String {
    fn from(path: ScenePath) -> Self {
        path.to_string()
    }
}

/// Splits `"/Prim/Path.attribute"` into its prim path and attribute name.
pub fn split_attribute_path(s: &str) -> Option<(ScenePath, &str)> {
    let tail_start = s.rfind(['/', '}']).map(|i| i + 1).unwrap_or(0);
    let dot = tail_start + s[tail_start..].find('.')?;
    let attribute = &s[dot + 1..];
    if attribute.is_empty() {
        return None;
    }
    let path = s[..dot].parse().ok()?;
    Some((path, attribute))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> ScenePath {
        s.parse().unwrap()
    }

    #[test]
    fn test_root_round_trip() {
        assert!(path("/").is_root());
        assert_eq!(ScenePath::root().to_string(), "/");
    }

    #[test]
    fn test_canonical_printing_across_variant_boundary() {
        assert_eq!(path("/World/Set{shading=red}/Mesh").to_string(), "/World/Set{shading=red}Mesh");
        assert_eq!(path("/World/Set{shading=red}Mesh").to_string(), "/World/Set{shading=red}Mesh");
    }

    #[test]
    fn test_append_child_after_variant() {
        let set = path("/Set").append_variant_selection("shading", "red");
        assert_eq!(set.append_child("Mesh").to_string(), "/Set{shading=red}Mesh");
        assert_eq!(ScenePath::root().append_child("World").to_string(), "/World");
    }

    #[test]
    fn test_variant_selection_is_not_duplicated() {
        let once = path("/Set{shading=red}");
        assert_eq!(once.append_variant_selection("shading", "red"), once);
        assert_eq!(
            once.append_variant_selection("lod", "high").to_string(),
            "/Set{shading=red}{lod=high}"
        );
    }

    #[test]
    fn test_strip_and_suffix() {
        let p = path("/A{v=x}B{w=y}");
        assert_eq!(p.variant_suffix(), Some(("w", "y")));
        assert_eq!(p.strip_variant_selections().to_string(), "/A/B");
        assert_eq!(p.name(), Some("B"));
    }

    #[test]
    fn test_nested_paths_parse_and_print() {
        for text in [
            "/A/B",
            "/World/Proxy",
            "/A/B/C/D",
            "/A{v=x}B/C",
            "/A{v=x}{w=y}B",
            "/A/B{v=x}",
        ] {
            let parsed = path(text);
            assert_eq!(parsed.to_string(), text);
            assert_eq!(path(&parsed.to_string()), parsed);
        }
        assert_eq!(
            path("/A/B").elements(),
            &[PathElement::Prim("A".into()), PathElement::Prim("B".into())]
        );
        assert_eq!(path("/A{v=x}/B/C"), path("/A{v=x}B/C"));
        assert_eq!(path("/A{v=x}B/C").prim_depth(), 3);
    }

    #[test]
    fn test_nested_path_serde() {
        let nested = path("/Mat{look=red}Surface/Tex");
        let json = serde_json::to_string(&nested).unwrap();
        assert_eq!(json, "\"/Mat{look=red}Surface/Tex\"");
        assert_eq!(serde_json::from_str::<ScenePath>(&json).unwrap(), nested);
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "", "A", "//A", "/A/", "/A//B", "/{v=x}", "/A{v}", "/A{v=x", "/A{=x}", "/A B", "/A{v=x} B",
        ] {
            assert!(bad.parse::<ScenePath>().is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_common_prefix_ignores_variants() {
        assert_eq!(path("/A{v=x}B/C").common_prim_prefix(&path("/A/B/D")), 2);
    }

    #[test]
    fn test_split_attribute_path() {
        let (prim, attr) = split_attribute_path("/Mat/Tex.outputs:rgb").unwrap();
        assert_eq!(prim, path("/Mat/Tex"));
        assert_eq!(attr, "outputs:rgb");
        let (prim, attr) = split_attribute_path("/Mat{v=a}Tex.outputs:rgb").unwrap();
        assert_eq!(prim.to_string(), "/Mat{v=a}Tex");
        assert_eq!(attr, "outputs:rgb");
        assert!(split_attribute_path("/Mat/Tex").is_none());
    }
}
