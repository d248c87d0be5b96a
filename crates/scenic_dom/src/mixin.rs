//! Mixins: named, reusable bundles of component values.
//!
//! A node opts into mixins through its space-separated `mixin` attribute.
//! When several listed mixins define the same component property, the later
//! entry in the node's list wins (see `implicit::mixin_property_value`).

use std::collections::BTreeMap;

/// A mixin's component values, stored in authored (canonical string) form and
/// parsed on demand through the component's schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mixin {
    components: BTreeMap<String, String>,
}

impl Mixin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: set a component's authored value.
    pub fn component(mut self, name: &str, value: &str) -> Self {
        self.components.insert(name.to_string(), value.to_string());
        self
    }

    pub fn get(&self, component: &str) -> Option<&str> {
        self.components.get(component).map(String::as_str)
    }

    pub fn components(&self) -> impl Iterator<Item = (&str, &str)> {
        self.components
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Registry of mixins in document order.
#[derive(Debug, Clone, Default)]
pub struct MixinRegistry {
    order: Vec<String>,
    defs: BTreeMap<String, Mixin>,
}

impl MixinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a mixin. First registration fixes document order.
    pub fn register(&mut self, id: &str, mixin: Mixin) {
        if !self.defs.contains_key(id) {
            self.order.push(id.to_string());
        }
        self.defs.insert(id.to_string(), mixin);
    }

    pub fn get(&self, id: &str) -> Option<&Mixin> {
        self.defs.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.defs.contains_key(id)
    }

    /// Mixin ids in document order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_keeps_document_order() {
        let mut registry = MixinRegistry::new();
        registry.register("red", Mixin::new().component("material", "color: red"));
        registry.register("shiny", Mixin::new().component("material", "metalness: 1"));
        registry.register("red", Mixin::new().component("material", "color: darkred"));

        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(ids, vec!["red", "shiny"]);
        assert_eq!(
            registry.get("red").and_then(|m| m.get("material")),
            Some("color: darkred")
        );
    }
}
