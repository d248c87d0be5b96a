//! Component classes and live component instances.

use crate::schema::{ComponentSchema, PropertySchema, PropertyType};
use crate::value::Value;
use std::collections::BTreeMap;

/// A registered component class.
#[derive(Debug, Clone)]
pub struct ComponentDef {
    pub name: String,
    pub schema: ComponentSchema,
}

/// Global registry of component classes.
///
/// The registry is the second level of schema resolution: a live component
/// instance's own (possibly augmented) schema wins, the class schema here is
/// the fallback, and names known to neither degrade to raw attributes.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    defs: BTreeMap<String, ComponentDef>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the core component classes.
    pub fn core() -> Self {
        let mut registry = Self::new();
        registry.register(
            "position",
            ComponentSchema::single(PropertySchema::new(PropertyType::Vec3)),
        );
        // Euler angles in degrees, applied in XYZ order.
        registry.register(
            "rotation",
            ComponentSchema::single(PropertySchema::new(PropertyType::Vec3)),
        );
        registry.register(
            "scale",
            ComponentSchema::single(PropertySchema::with_default(
                PropertyType::Vec3,
                [1.0, 1.0, 1.0],
            )),
        );
        registry.register(
            "visible",
            ComponentSchema::single(PropertySchema::with_default(PropertyType::Bool, true)),
        );
        registry.register(
            "material",
            ComponentSchema::map()
                .property("color", PropertySchema::with_default(PropertyType::Color, "#fff"))
                .property("metalness", PropertySchema::new(PropertyType::Number))
                .property(
                    "roughness",
                    PropertySchema::with_default(PropertyType::Number, 0.5),
                )
                .property(
                    "shader",
                    PropertySchema::with_default(PropertyType::String, "standard"),
                ),
        );
        registry.register(
            "geometry",
            ComponentSchema::map()
                .property(
                    "primitive",
                    PropertySchema::with_default(PropertyType::String, "box"),
                )
                .property("width", PropertySchema::with_default(PropertyType::Number, 1.0))
                .property("height", PropertySchema::with_default(PropertyType::Number, 1.0))
                .property("depth", PropertySchema::with_default(PropertyType::Number, 1.0))
                .property("radius", PropertySchema::with_default(PropertyType::Number, 1.0)),
        );
        registry
    }

    pub fn register(&mut self, name: &str, schema: ComponentSchema) {
        self.defs.insert(
            name.to_string(),
            ComponentDef {
                name: name.to_string(),
                schema,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&ComponentDef> {
        self.defs.get(name)
    }

    pub fn schema(&self, name: &str) -> Option<&ComponentSchema> {
        self.defs.get(name).map(|def| &def.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.defs.keys().map(String::as_str)
    }
}

/// A live component instance on a node: its schema (which may have been
/// augmented at runtime) and its full typed data.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentState {
    pub schema: ComponentSchema,
    pub data: Value,
}

impl ComponentState {
    pub fn new(schema: ComponentSchema) -> Self {
        let data = schema.default_value();
        Self { schema, data }
    }

    pub fn with_data(schema: ComponentSchema, data: Value) -> Self {
        Self { schema, data }
    }

    /// Runtime schema augmentation: add a property this instance understands
    /// beyond its class schema. No effect on single-value schemas.
    pub fn extend_schema(&mut self, name: &str, descriptor: PropertySchema) {
        if let ComponentSchema::Map(map) = &mut self.schema {
            if let Value::Object(data) = &mut self.data {
                data.entry(name.to_string())
                    .or_insert_with(|| descriptor.default.clone());
            }
            map.insert(name.to_string(), descriptor);
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }
}
