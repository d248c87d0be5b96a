//! Primitive element registry.
//!
//! A primitive is a named element kind (`box`, `sphere`) that contributes to
//! implicit values two ways: plain-attribute mappings (`color="red"` on a box
//! feeds `material.color`) and injected default components the element carries
//! before any authoring.

use crate::value::Value;
use std::collections::BTreeMap;

/// Maps a plain attribute name to a component property.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeMapping {
    pub component: String,
    /// `None` for single-value components.
    pub property: Option<String>,
}

/// A registered primitive element kind.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveDef {
    /// Plain attribute name → component property fed by it.
    pub mappings: BTreeMap<String, AttributeMapping>,
    /// Component data the element injects, keyed by component name.
    pub defaults: BTreeMap<String, Value>,
}

impl PrimitiveDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: map a plain attribute onto a component property.
    pub fn map_attribute(mut self, attribute: &str, component: &str, property: Option<&str>) -> Self {
        self.mappings.insert(
            attribute.to_string(),
            AttributeMapping {
                component: component.to_string(),
                property: property.map(str::to_string),
            },
        );
        self
    }

    /// Builder: inject default component data.
    pub fn inject(mut self, component: &str, value: impl Into<Value>) -> Self {
        self.defaults.insert(component.to_string(), value.into());
        self
    }

    /// The mapping that feeds `component`/`property`, if any.
    pub fn mapping_for(&self, component: &str, property: Option<&str>) -> Option<&str> {
        self.mappings
            .iter()
            .find(|(_, m)| m.component == component && m.property.as_deref() == property)
            .map(|(attr, _)| attr.as_str())
    }
}

/// Registry of primitive element kinds.
#[derive(Debug, Clone, Default)]
pub struct PrimitiveRegistry {
    defs: BTreeMap<String, PrimitiveDef>,
}

impl PrimitiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the core primitives.
    pub fn core() -> Self {
        let mut registry = Self::new();
        registry.register("entity", PrimitiveDef::new());
        registry.register("scene", PrimitiveDef::new());
        registry.register(
            "box",
            PrimitiveDef::new()
                .inject("geometry", Value::from_iter([("primitive", "box")]))
                .map_attribute("color", "material", Some("color"))
                .map_attribute("width", "geometry", Some("width"))
                .map_attribute("height", "geometry", Some("height"))
                .map_attribute("depth", "geometry", Some("depth")),
        );
        registry.register(
            "sphere",
            PrimitiveDef::new()
                .inject("geometry", Value::from_iter([("primitive", "sphere")]))
                .map_attribute("color", "material", Some("color"))
                .map_attribute("radius", "geometry", Some("radius")),
        );
        registry
    }

    pub fn register(&mut self, element: &str, def: PrimitiveDef) {
        self.defs.insert(element.to_string(), def);
    }

    pub fn get(&self, element: &str) -> Option<&PrimitiveDef> {
        self.defs.get(element)
    }

    pub fn contains(&self, element: &str) -> bool {
        self.defs.contains_key(element)
    }
}
