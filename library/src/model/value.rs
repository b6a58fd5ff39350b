//! Typed values carried by parameters and document attributes.

use std::fmt;
use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
#[serde(deny_unknown_fields)]
pub struct Vec2 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
#[serde(deny_unknown_fields)]
pub struct Vec3 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
    pub z: OrderedFloat<f64>,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
#[serde(deny_unknown_fields)]
pub struct Vec4 {
    pub x: OrderedFloat<f64>,
    pub y: OrderedFloat<f64>,
    pub z: OrderedFloat<f64>,
    pub w: OrderedFloat<f64>,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
        }
    }
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
            z: OrderedFloat(z),
        }
    }
}

impl Vec4 {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self {
            x: OrderedFloat(x),
            y: OrderedFloat(y),
            z: OrderedFloat(z),
            w: OrderedFloat(w),
        }
    }
}

/// A value stored on a parameter or attribute.
///
/// Serialized untagged so the document text form stays readable; the
/// declared [`ValueType`] travels next to the value wherever the kind matters.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    String(String),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Array(Vec<Value>),
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.hash(state),
            Value::String(s) => s.hash(state),
            Value::Vec2(v) => v.hash(state),
            Value::Vec3(v) => v.hash(state),
            Value::Vec4(v) => v.hash(state),
            Value::Array(items) => items.hash(state),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(OrderedFloat(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(OrderedFloat(value as f64))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<Vec2> for Value {
    fn from(value: Vec2) -> Self {
        Value::Vec2(value)
    }
}

impl From<Vec3> for Value {
    fn from(value: Vec3) -> Self {
        Value::Vec3(value)
    }
}

impl From<Vec4> for Value {
    fn from(value: Vec4) -> Self {
        Value::Vec4(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::String(String::new()),
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(OrderedFloat(n.as_f64().unwrap_or(0.0)))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(o) => {
                let component = |key: &str| o.get(key).and_then(|v| v.as_f64());
                match (
                    component("x"),
                    component("y"),
                    component("z"),
                    component("w"),
                ) {
                    (Some(x), Some(y), Some(z), Some(w)) => Value::Vec4(Vec4::new(x, y, z, w)),
                    (Some(x), Some(y), Some(z), None) => Value::Vec3(Vec3::new(x, y, z)),
                    (Some(x), Some(y), None, None) => Value::Vec2(Vec2::new(x, y)),
                    // Objects with other keys have no value kind; keep their text.
                    _ => Value::String(serde_json::Value::Object(o).to_string()),
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v.into_inner()),
            Value::String(s) => write!(f, "{}", s),
            Value::Vec2(v) => write!(f, "({}, {})", v.x, v.y),
            Value::Vec3(v) => write!(f, "({}, {}, {})", v.x, v.y, v.z),
            Value::Vec4(v) => write!(f, "({}, {}, {}, {})", v.x, v.y, v.z, v.w),
            Value::Array(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Type-safe extraction from Value
pub trait TryGetValue<T> {
    fn try_get(v: &Value) -> Option<T>;
}

impl TryGetValue<f64> for f64 {
    fn try_get(v: &Value) -> Option<f64> {
        match v {
            Value::Float(f) => Some(f.into_inner()),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl TryGetValue<i64> for i64 {
    fn try_get(v: &Value) -> Option<i64> {
        match v {
            Value::Int(i) => Some(*i),
            Value::Float(f) if f.fract().abs() < f64::EPSILON => Some(f.into_inner() as i64),
            _ => None,
        }
    }
}

impl TryGetValue<bool> for bool {
    fn try_get(v: &Value) -> Option<bool> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl TryGetValue<String> for String {
    fn try_get(v: &Value) -> Option<String> {
        match v {
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl TryGetValue<Vec<String>> for Vec<String> {
    fn try_get(v: &Value) -> Option<Vec<String>> {
        match v {
            Value::Array(items) => items.iter().map(|item| item.get_as::<String>()).collect(),
            _ => None,
        }
    }
}

impl TryGetValue<Vec2> for Vec2 {
    fn try_get(v: &Value) -> Option<Vec2> {
        match v {
            Value::Vec2(v) => Some(*v),
            _ => None,
        }
    }
}

impl TryGetValue<Vec3> for Vec3 {
    fn try_get(v: &Value) -> Option<Vec3> {
        match v {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }
}

impl Value {
    pub fn get_as<T: TryGetValue<T>>(&self) -> Option<T> {
        T::try_get(self)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Linear blend between two values of the same shape.
    ///
    /// Returns `None` when the pair has no numeric interpretation.
    pub fn lerp(&self, other: &Value, t: f64) -> Option<Value> {
        let mix = |a: OrderedFloat<f64>, b: OrderedFloat<f64>| OrderedFloat(a.0 + (b.0 - a.0) * t);
        match (self, other) {
            (Value::Float(a), Value::Float(b)) => Some(Value::Float(mix(*a, *b))),
            (Value::Int(a), Value::Int(b)) => Some(Value::Float(mix(
                OrderedFloat(*a as f64),
                OrderedFloat(*b as f64),
            ))),
            (Value::Int(a), Value::Float(b)) => {
                Some(Value::Float(mix(OrderedFloat(*a as f64), *b)))
            }
            (Value::Float(a), Value::Int(b)) => {
                Some(Value::Float(mix(*a, OrderedFloat(*b as f64))))
            }
            (Value::Vec2(a), Value::Vec2(b)) => Some(Value::Vec2(Vec2 {
                x: mix(a.x, b.x),
                y: mix(a.y, b.y),
            })),
            (Value::Vec3(a), Value::Vec3(b)) => Some(Value::Vec3(Vec3 {
                x: mix(a.x, b.x),
                y: mix(a.y, b.y),
                z: mix(a.z, b.z),
            })),
            (Value::Vec4(a), Value::Vec4(b)) => Some(Value::Vec4(Vec4 {
                x: mix(a.x, b.x),
                y: mix(a.y, b.y),
                z: mix(a.z, b.z),
                w: mix(a.w, b.w),
            })),
            (Value::Array(a), Value::Array(b)) if a.len() == b.len() => a
                .iter()
                .zip(b.iter())
                .map(|(start, end)| start.lerp(end, t))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        }
    }
}

/// Closed set of value kinds a parameter or attribute may declare.
///
/// The string tags are the document's type names; anything outside this
/// table is an unsupported type.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    Double,
    Half,
    String,
    Token,
    Asset,
    Float2,
    Float3,
    Double3,
    Color3f,
    Point3f,
    Normal3f,
    Vector3f,
    Float4,
    Quatf,
    StringArray,
    TokenArray,
    IntArray,
    FloatArray,
    DoubleArray,
    AssetArray,
    Relationship,
    Choice,
}

const TYPE_TAGS: &[(ValueType, &str)] = &[
    (ValueType::Bool, "bool"),
    (ValueType::Int, "int"),
    (ValueType::Float, "float"),
    (ValueType::Double, "double"),
    (ValueType::Half, "half"),
    (ValueType::String, "string"),
    (ValueType::Token, "token"),
    (ValueType::Asset, "asset"),
    (ValueType::Float2, "float2"),
    (ValueType::Float3, "float3"),
    (ValueType::Double3, "double3"),
    (ValueType::Color3f, "color3f"),
    (ValueType::Point3f, "point3f"),
    (ValueType::Normal3f, "normal3f"),
    (ValueType::Vector3f, "vector3f"),
    (ValueType::Float4, "float4"),
    (ValueType::Quatf, "quatf"),
    (ValueType::StringArray, "string[]"),
    (ValueType::TokenArray, "token[]"),
    (ValueType::IntArray, "int[]"),
    (ValueType::FloatArray, "float[]"),
    (ValueType::DoubleArray, "double[]"),
    (ValueType::AssetArray, "asset[]"),
    (ValueType::Relationship, "rel"),
    (ValueType::Choice, "choice"),
];

impl ValueType {
    pub fn from_tag(tag: &str) -> Option<ValueType> {
        TYPE_TAGS
            .iter()
            .find(|(_, name)| *name == tag)
            .map(|(ty, _)| *ty)
    }

    pub fn tag(self) -> &'static str {
        TYPE_TAGS
            .iter()
            .find(|(ty, _)| *ty == self)
            .map(|(_, name)| *name)
            .unwrap_or("string")
    }

    pub fn is_array(self) -> bool {
        matches!(
            self,
            ValueType::StringArray
                | ValueType::TokenArray
                | ValueType::IntArray
                | ValueType::FloatArray
                | ValueType::DoubleArray
                | ValueType::AssetArray
                | ValueType::Relationship
        )
    }

    /// Whether time samples of this kind blend linearly or hold the earlier sample.
    pub fn is_interpolable(self) -> bool {
        matches!(
            self,
            ValueType::Float
                | ValueType::Double
                | ValueType::Half
                | ValueType::Float2
                | ValueType::Float3
                | ValueType::Double3
                | ValueType::Color3f
                | ValueType::Point3f
                | ValueType::Normal3f
                | ValueType::Vector3f
                | ValueType::Float4
                | ValueType::Quatf
                | ValueType::FloatArray
                | ValueType::DoubleArray
        )
    }

    pub fn zero_value(self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float | ValueType::Double | ValueType::Half => Value::from(0.0),
            ValueType::String | ValueType::Token | ValueType::Asset | ValueType::Choice => {
                Value::String(String::new())
            }
            ValueType::Float2 => Value::Vec2(Vec2::default()),
            ValueType::Float3
            | ValueType::Double3
            | ValueType::Color3f
            | ValueType::Point3f
            | ValueType::Normal3f
            | ValueType::Vector3f => Value::Vec3(Vec3::default()),
            ValueType::Float4 | ValueType::Quatf => Value::Vec4(Vec4::default()),
            ValueType::StringArray
            | ValueType::TokenArray
            | ValueType::IntArray
            | ValueType::FloatArray
            | ValueType::DoubleArray
            | ValueType::AssetArray
            | ValueType::Relationship => Value::Array(Vec::new()),
        }
    }

    /// Converts a value into this kind using the fixed conversion table.
    ///
    /// Returns `None` when the value has no meaning for this kind.
    pub fn coerce(self, value: Value) -> Option<Value> {
        match (self, value) {
            (ValueType::Bool, Value::Bool(b)) => Some(Value::Bool(b)),
            (ValueType::Bool, Value::Int(i)) => Some(Value::Bool(i != 0)),
            (ValueType::Int, Value::Int(i)) => Some(Value::Int(i)),
            (ValueType::Int, Value::Bool(b)) => Some(Value::Int(b as i64)),
            (ValueType::Int, Value::Float(f)) => Some(Value::Int(f.round() as i64)),
            (ValueType::Float | ValueType::Double | ValueType::Half, Value::Float(f)) => {
                Some(Value::Float(f))
            }
            (ValueType::Float | ValueType::Double | ValueType::Half, Value::Int(i)) => {
                Some(Value::from(i as f64))
            }
            (
                ValueType::String | ValueType::Token | ValueType::Asset | ValueType::Choice,
                Value::String(s),
            ) => Some(Value::String(s)),
            (ValueType::String | ValueType::Token, other @ (Value::Int(_) | Value::Float(_))) => {
                Some(Value::String(other.to_string()))
            }
            (ValueType::Float2, Value::Vec2(v)) => Some(Value::Vec2(v)),
            (
                ValueType::Float3
                | ValueType::Double3
                | ValueType::Color3f
                | ValueType::Point3f
                | ValueType::Normal3f
                | ValueType::Vector3f,
                Value::Vec3(v),
            ) => Some(Value::Vec3(v)),
            (ValueType::Float4 | ValueType::Quatf, Value::Vec4(v)) => Some(Value::Vec4(v)),
            (ty, Value::Array(items)) if ty.is_array() => {
                let element = ty.element_type()?;
                items
                    .into_iter()
                    .map(|item| element.coerce(item))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
            }
            _ => None,
        }
    }

    fn element_type(self) -> Option<ValueType> {
        match self {
            ValueType::StringArray | ValueType::Relationship => Some(ValueType::String),
            ValueType::TokenArray => Some(ValueType::Token),
            ValueType::IntArray => Some(ValueType::Int),
            ValueType::FloatArray => Some(ValueType::Float),
            ValueType::DoubleArray => Some(ValueType::Double),
            ValueType::AssetArray => Some(ValueType::Asset),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        ValueType::from_tag(&tag).ok_or_else(|| format!("unsupported value type '{}'", tag))
    }
}

impl From<ValueType> for String {
    fn from(ty: ValueType) -> Self {
        ty.tag().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table_is_bijective() {
        for (ty, tag) in TYPE_TAGS {
            assert_eq!(ValueType::from_tag(tag), Some(*ty));
            assert_eq!(ty.tag(), *tag);
        }
        assert_eq!(ValueType::from_tag("matrix4d"), None);
    }

    #[test]
    fn test_coerce_numeric() {
        assert_eq!(
            ValueType::Float.coerce(Value::Int(3)),
            Some(Value::from(3.0))
        );
        assert_eq!(ValueType::Int.coerce(Value::from(2.6)), Some(Value::Int(3)));
        assert_eq!(ValueType::Float3.coerce(Value::from(1.0)), None);
    }

    #[test]
    fn test_coerce_array_elements() {
        let tokens = Value::from(vec!["a", "b"]);
        assert_eq!(ValueType::TokenArray.coerce(tokens.clone()), Some(tokens));
        assert_eq!(
            ValueType::IntArray.coerce(Value::from(vec!["a"])),
            None
        );
    }

    #[test]
    fn test_lerp_vectors() {
        let a = Value::Vec3(Vec3::new(0.0, 0.0, 0.0));
        let b = Value::Vec3(Vec3::new(2.0, 4.0, 6.0));
        assert_eq!(a.lerp(&b, 0.5), Some(Value::Vec3(Vec3::new(1.0, 2.0, 3.0))));
        assert_eq!(Value::from("a").lerp(&Value::from("b"), 0.5), None);
    }

    #[test]
    fn test_json_value_inference() {
        let v: Value = serde_json::json!({"x": 1.0, "y": 2.0, "z": 3.0}).into();
        assert_eq!(v, Value::Vec3(Vec3::new(1.0, 2.0, 3.0)));
        let v: Value = serde_json::json!(4).into();
        assert_eq!(v, Value::Int(4));
    }
}
