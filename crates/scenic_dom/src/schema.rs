//! Component schemas and canonical string forms.
//!
//! A schema describes either a single anonymous value (`position`, `visible`)
//! or a map of named properties (`material`, `geometry`). Each property has a
//! type, a default, and string (de)serialization through that type: `parse`
//! consumes the canonical form `stringify` produces, and `parse` is
//! idempotent over it.

use crate::error::{DomError, Result};
use crate::value::Value;
use std::collections::BTreeMap;

/// Property value types understood by the schema layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    Bool,
    Int,
    Number,
    String,
    Color,
    Selector,
    Vec2,
    Vec3,
    Vec4,
}

impl PropertyType {
    pub fn name(&self) -> &'static str {
        match self {
            PropertyType::Bool => "bool",
            PropertyType::Int => "int",
            PropertyType::Number => "number",
            PropertyType::String => "string",
            PropertyType::Color => "color",
            PropertyType::Selector => "selector",
            PropertyType::Vec2 => "vec2",
            PropertyType::Vec3 => "vec3",
            PropertyType::Vec4 => "vec4",
        }
    }

    /// The type's zero value, the floor of the implicit-value chain.
    pub fn zero(&self) -> Value {
        match self {
            PropertyType::Bool => Value::Bool(false),
            PropertyType::Int => Value::Int(0),
            PropertyType::Number => Value::Float(0.0),
            PropertyType::String | PropertyType::Color | PropertyType::Selector => {
                Value::String(String::new())
            }
            PropertyType::Vec2 => Value::Vec2([0.0; 2]),
            PropertyType::Vec3 => Value::Vec3([0.0; 3]),
            PropertyType::Vec4 => Value::Vec4([0.0; 4]),
        }
    }

    /// Parse a canonical string into a typed value.
    pub fn parse(&self, input: &str) -> Result<Value> {
        let trimmed = input.trim();
        match self {
            PropertyType::Bool => match trimmed {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(self.parse_error(input)),
            },
            PropertyType::Int => trimmed
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| self.parse_error(input)),
            PropertyType::Number => trimmed
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.parse_error(input)),
            PropertyType::String | PropertyType::Color | PropertyType::Selector => {
                Ok(Value::String(trimmed.to_string()))
            }
            PropertyType::Vec2 => self.parse_vector::<2>(input).map(Value::Vec2),
            PropertyType::Vec3 => self.parse_vector::<3>(input).map(Value::Vec3),
            PropertyType::Vec4 => self.parse_vector::<4>(input).map(Value::Vec4),
        }
    }

    /// Canonical string form; inverse of [`parse`](Self::parse).
    pub fn stringify(&self, value: &Value) -> String {
        value.to_string()
    }

    /// Missing trailing coordinates fill with zero; extra tokens are ignored.
    fn parse_vector<const N: usize>(&self, input: &str) -> Result<[f32; N]> {
        let mut out = [0.0f32; N];
        for (i, token) in input.split_whitespace().take(N).enumerate() {
            out[i] = token.parse::<f32>().map_err(|_| self.parse_error(input))?;
        }
        Ok(out)
    }

    fn parse_error(&self, input: &str) -> DomError {
        DomError::Parse {
            ty: self.name(),
            input: input.to_string(),
        }
    }
}

/// Descriptor of one schema property: its type and default value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    pub ty: PropertyType,
    pub default: Value,
}

impl PropertySchema {
    /// Descriptor with the type's zero value as default.
    pub fn new(ty: PropertyType) -> Self {
        Self {
            default: ty.zero(),
            ty,
        }
    }

    pub fn with_default(ty: PropertyType, default: impl Into<Value>) -> Self {
        Self {
            ty,
            default: default.into(),
        }
    }

    pub fn parse(&self, input: &str) -> Result<Value> {
        self.ty.parse(input)
    }

    pub fn stringify(&self, value: &Value) -> String {
        self.ty.stringify(value)
    }
}

/// Schema of a component class or live component instance.
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSchema {
    /// One anonymous value, e.g. `position` or `visible`.
    Single(PropertySchema),
    /// Named properties, e.g. `material` or `geometry`.
    Map(BTreeMap<String, PropertySchema>),
}

impl ComponentSchema {
    pub fn single(descriptor: PropertySchema) -> Self {
        ComponentSchema::Single(descriptor)
    }

    pub fn map() -> Self {
        ComponentSchema::Map(BTreeMap::new())
    }

    /// Builder: add a named property. No effect on single-value schemas.
    pub fn property(mut self, name: &str, descriptor: PropertySchema) -> Self {
        if let ComponentSchema::Map(map) = &mut self {
            map.insert(name.to_string(), descriptor);
        }
        self
    }

    pub fn is_single(&self) -> bool {
        matches!(self, ComponentSchema::Single(_))
    }

    /// Descriptor lookup: `None` addresses a single-value schema's one
    /// descriptor, `Some(name)` a map property.
    pub fn descriptor(&self, property: Option<&str>) -> Option<&PropertySchema> {
        match (self, property) {
            (ComponentSchema::Single(d), None) => Some(d),
            (ComponentSchema::Map(map), Some(name)) => map.get(name),
            _ => None,
        }
    }

    pub fn map_properties(&self) -> Option<&BTreeMap<String, PropertySchema>> {
        match self {
            ComponentSchema::Map(map) => Some(map),
            ComponentSchema::Single(_) => None,
        }
    }

    /// Schema-default data: the single default, or an object of all property
    /// defaults.
    pub fn default_value(&self) -> Value {
        match self {
            ComponentSchema::Single(d) => d.default.clone(),
            ComponentSchema::Map(map) => map
                .iter()
                .map(|(name, d)| (name.clone(), d.default.clone()))
                .collect(),
        }
    }

    /// Parse an authored component string leniently.
    ///
    /// Map schemas consume the `key: value; key: value` form and return an
    /// object holding only the keys present in the input. Unknown keys and
    /// unparseable scalars degrade to raw strings with a debug log rather
    /// than failing, matching how authored attributes behave.
    pub fn parse(&self, input: &str) -> Value {
        match self {
            ComponentSchema::Single(d) => d.parse(input).unwrap_or_else(|_| {
                log::debug!("keeping unparseable {} value {:?} as raw string", d.ty.name(), input);
                Value::String(input.trim().to_string())
            }),
            ComponentSchema::Map(map) => {
                let mut out = BTreeMap::new();
                for pair in input.split(';') {
                    let Some((key, raw)) = pair.split_once(':') else {
                        continue;
                    };
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    let raw = raw.trim();
                    let value = match map.get(key) {
                        Some(d) => d.parse(raw).unwrap_or_else(|_| {
                            log::debug!(
                                "keeping unparseable {} value {:?} for {:?} as raw string",
                                d.ty.name(),
                                raw,
                                key
                            );
                            Value::String(raw.to_string())
                        }),
                        None => {
                            log::debug!("property {:?} not in schema, keeping raw", key);
                            Value::String(raw.to_string())
                        }
                    };
                    out.insert(key.to_string(), value);
                }
                Value::Object(out)
            }
        }
    }

    /// Canonical component string. Object data serializes only the keys it
    /// holds, in key order, so partial (authored-only) maps stay partial.
    pub fn stringify(&self, value: &Value) -> String {
        match (self, value) {
            (ComponentSchema::Single(d), v) => d.stringify(v),
            (ComponentSchema::Map(_), Value::Object(_)) => value.to_string(),
            (ComponentSchema::Map(_), v) => v.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_parse_and_stringify() {
        let ty = PropertyType::Number;
        assert_eq!(ty.parse("2.5").unwrap(), Value::Float(2.5));
        assert_eq!(ty.stringify(&Value::Float(2.5)), "2.5");
        assert!(ty.parse("abc").is_err());

        assert_eq!(PropertyType::Bool.parse("true").unwrap(), Value::Bool(true));
        assert!(PropertyType::Bool.parse("yes").is_err());
        assert_eq!(PropertyType::Int.parse(" 7 ").unwrap(), Value::Int(7));
    }

    #[test]
    fn test_vector_parse_pads_missing_coordinates() {
        let ty = PropertyType::Vec3;
        assert_eq!(ty.parse("1 2 3").unwrap(), Value::Vec3([1.0, 2.0, 3.0]));
        assert_eq!(ty.parse("1 2").unwrap(), Value::Vec3([1.0, 2.0, 0.0]));
        assert!(ty.parse("1 x 3").is_err());
    }

    #[test]
    fn test_parse_is_idempotent_over_stringify() {
        for (ty, input) in [
            (PropertyType::Vec3, " 1  0   0.5 "),
            (PropertyType::Number, "2.50"),
            (PropertyType::Color, " red "),
            (PropertyType::Bool, "true"),
        ] {
            let value = ty.parse(input).unwrap();
            let canonical = ty.stringify(&value);
            assert_eq!(ty.parse(&canonical).unwrap(), value);
        }
    }

    #[test]
    fn test_map_schema_parses_partial_objects() {
        let schema = ComponentSchema::map()
            .property("color", PropertySchema::with_default(PropertyType::Color, "#fff"))
            .property("metalness", PropertySchema::new(PropertyType::Number));

        let parsed = schema.parse("color: blue");
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(parsed.get("color").and_then(Value::as_str), Some("blue"));

        let parsed = schema.parse("color: red; metalness: 0.25");
        assert_eq!(parsed.get("metalness").and_then(Value::as_float), Some(0.25));
    }

    #[test]
    fn test_map_schema_stringify_round_trip() {
        let schema = ComponentSchema::map()
            .property("color", PropertySchema::with_default(PropertyType::Color, "#fff"))
            .property("metalness", PropertySchema::new(PropertyType::Number));

        let value = schema.parse("metalness: 0.5; color: green");
        assert_eq!(schema.stringify(&value), "color: green; metalness: 0.5");
        assert_eq!(schema.parse(&schema.stringify(&value)), value);
    }

    #[test]
    fn test_single_schema_descriptor_lookup() {
        let schema = ComponentSchema::single(PropertySchema::new(PropertyType::Vec3));
        assert!(schema.descriptor(None).is_some());
        assert!(schema.descriptor(Some("x")).is_none());
        assert_eq!(schema.default_value(), Value::Vec3([0.0; 3]));
    }

    #[test]
    fn test_map_default_value_collects_property_defaults() {
        let schema = ComponentSchema::map()
            .property("color", PropertySchema::with_default(PropertyType::Color, "#fff"))
            .property("width", PropertySchema::with_default(PropertyType::Number, 1.0));
        let defaults = schema.default_value();
        assert_eq!(defaults.get("color").and_then(Value::as_str), Some("#fff"));
        assert_eq!(defaults.get("width").and_then(Value::as_float), Some(1.0));
    }
}
