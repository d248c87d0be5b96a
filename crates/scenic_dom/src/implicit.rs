//! Implicit-value resolution.
//!
//! For a given (entity, component, property) this answers: what value would
//! the entity carry had the author never set it explicitly? The precedence
//! chain, highest first:
//!
//! 1. a primitive attribute mapping fed by a plain attribute on the element
//!    (`color="red"` on a box feeds `material.color`),
//! 2. the entity's mixins, where a later entry in the mixin list wins,
//! 3. component data the element kind injects by default,
//! 4. the schema default, which is always defined.
//!
//! Explicit component attributes and live component data are deliberately
//! ignored; the minimal serializer diffs those against this chain.

use crate::scene::{Scene, SchemaLookup};
use crate::schema::ComponentSchema;
use crate::id::NodeId;
use crate::value::Value;

/// The implicit value of a component, or of one property of it.
///
/// `property: None` resolves the whole component: the single value for
/// single-value schemas, an object of every schema property for map schemas.
/// Returns `None` only when the component name has no schema anywhere.
pub fn implicit_value(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    property: Option<&str>,
) -> Option<Value> {
    let SchemaLookup::Found(schema) = scene.schema_lookup(id, component) else {
        return None;
    };
    match (&schema, property) {
        (ComponentSchema::Single(_), _) => implicit_single(scene, id, component, &schema),
        (ComponentSchema::Map(map), Some(prop)) => {
            map.contains_key(prop)
                .then(|| implicit_property(scene, id, component, &schema, prop))
        }
        (ComponentSchema::Map(map), None) => {
            let object = map
                .keys()
                .map(|prop| {
                    (
                        prop.clone(),
                        implicit_property(scene, id, component, &schema, prop),
                    )
                })
                .collect();
            Some(object)
        }
    }
}

/// Actual-or-implicit: the value the entity effectively carries. Explicit
/// (live or authored) values win; the implicit chain is the fallback.
pub fn resolved_value(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    property: Option<&str>,
) -> Option<Value> {
    scene
        .actual_value(id, component, property)
        .or_else(|| implicit_value(scene, id, component, property))
}

fn implicit_single(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    schema: &ComponentSchema,
) -> Option<Value> {
    let descriptor = schema.descriptor(None)?;
    if let Some(value) = primitive_mapped_value(scene, id, component, None) {
        return descriptor.parse(&value).ok().or(Some(Value::String(value)));
    }
    if let Some(raw) = mixin_component_value(scene, id, component) {
        return Some(schema.parse(&raw));
    }
    if let Some(injected) = injected_default(scene, id, component) {
        return Some(injected);
    }
    Some(descriptor.default.clone())
}

fn implicit_property(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    schema: &ComponentSchema,
    property: &str,
) -> Value {
    if let Some(value) = primitive_mapped_value(scene, id, component, Some(property)) {
        if let Some(descriptor) = schema.descriptor(Some(property)) {
            return descriptor
                .parse(&value)
                .unwrap_or_else(|_| Value::String(value));
        }
        return Value::String(value);
    }
    if let Some(raw) = mixin_component_value(scene, id, component) {
        if let Some(value) = schema.parse(&raw).get(property) {
            return value.clone();
        }
    }
    if let Some(value) = injected_default(scene, id, component).and_then(|v| v.get(property).cloned())
    {
        return value;
    }
    schema
        .descriptor(Some(property))
        .map(|d| d.default.clone())
        .unwrap_or(Value::Null)
}

/// A plain attribute the element kind maps onto this component/property,
/// e.g. `width` on a box feeding `geometry.width`.
fn primitive_mapped_value(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    property: Option<&str>,
) -> Option<String> {
    let node = scene.get(id)?;
    let def = scene.primitives().get(node.element())?;
    let attribute = def.mapping_for(component, property)?;
    node.attribute(attribute).map(str::to_string)
}

/// The authored value the winning mixin contributes for this component.
///
/// Rule: later in the entity's mixin list wins. The scan walks the list in
/// authored order and keeps the last registered mixin that defines the
/// component, independent of any iteration trick.
fn mixin_component_value(scene: &Scene, id: &NodeId, component: &str) -> Option<String> {
    let node = scene.get(id)?;
    let mut winner = None;
    for mixin_id in node.mixin_list() {
        if let Some(value) = scene.mixins().get(mixin_id).and_then(|m| m.get(component)) {
            winner = Some(value.to_string());
        }
    }
    winner
}

fn injected_default(scene: &Scene, id: &NodeId, component: &str) -> Option<Value> {
    let node = scene.get(id)?;
    scene
        .primitives()
        .get(node.element())?
        .defaults
        .get(component)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixin::Mixin;
    use crate::node::NodeDefinition;

    fn scene_with_box() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let root = scene.root().clone();
        let id = scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();
        (scene, id)
    }

    #[test]
    fn test_schema_default_is_the_floor() {
        let (scene, id) = scene_with_box();
        assert_eq!(
            implicit_value(&scene, &id, "position", None),
            Some(Value::Vec3([0.0; 3]))
        );
        assert_eq!(
            implicit_value(&scene, &id, "material", Some("color")),
            Some(Value::from("#fff"))
        );
        assert_eq!(implicit_value(&scene, &id, "no-such-component", None), None);
    }

    #[test]
    fn test_injected_default_beats_schema_default() {
        let (scene, id) = scene_with_box();
        // The box element injects geometry.primitive = "box".
        assert_eq!(
            implicit_value(&scene, &id, "geometry", Some("primitive")),
            Some(Value::from("box"))
        );
    }

    #[test]
    fn test_mixin_beats_injected_default() {
        let (mut scene, id) = scene_with_box();
        scene
            .mixins_mut()
            .register("tall", Mixin::new().component("geometry", "height: 4"));
        scene.set_attribute(&id, "mixin", "tall");
        assert_eq!(
            implicit_value(&scene, &id, "geometry", Some("height")),
            Some(Value::Float(4.0))
        );
        // Untouched properties still come from the lower rungs.
        assert_eq!(
            implicit_value(&scene, &id, "geometry", Some("primitive")),
            Some(Value::from("box"))
        );
    }

    #[test]
    fn test_later_mixin_in_list_wins() {
        let (mut scene, id) = scene_with_box();
        scene
            .mixins_mut()
            .register("red", Mixin::new().component("material", "color: red"));
        scene
            .mixins_mut()
            .register("blue", Mixin::new().component("material", "color: blue"));
        scene.set_attribute(&id, "mixin", "red blue");
        assert_eq!(
            implicit_value(&scene, &id, "material", Some("color")),
            Some(Value::from("blue"))
        );
        scene.set_attribute(&id, "mixin", "blue red");
        assert_eq!(
            implicit_value(&scene, &id, "material", Some("color")),
            Some(Value::from("red"))
        );
    }

    #[test]
    fn test_primitive_mapping_beats_mixin() {
        let (mut scene, id) = scene_with_box();
        scene
            .mixins_mut()
            .register("red", Mixin::new().component("material", "color: red"));
        scene.set_attribute(&id, "mixin", "red");
        // Plain `color` attribute on a box maps onto material.color.
        scene.set_attribute(&id, "color", "green");
        assert_eq!(
            implicit_value(&scene, &id, "material", Some("color")),
            Some(Value::from("green"))
        );
    }

    #[test]
    fn test_whole_component_implicit_collects_properties() {
        let (mut scene, id) = scene_with_box();
        scene
            .mixins_mut()
            .register("shiny", Mixin::new().component("material", "metalness: 1"));
        scene.set_attribute(&id, "mixin", "shiny");
        let material = implicit_value(&scene, &id, "material", None).unwrap();
        assert_eq!(material.get("metalness").and_then(Value::as_float), Some(1.0));
        assert_eq!(material.get("color").and_then(Value::as_str), Some("#fff"));
        assert_eq!(material.get("roughness").and_then(Value::as_float), Some(0.5));
    }

    #[test]
    fn test_resolved_value_prefers_explicit() {
        let (mut scene, id) = scene_with_box();
        assert_eq!(
            resolved_value(&scene, &id, "position", None),
            Some(Value::Vec3([0.0; 3]))
        );
        scene.set_attribute(&id, "position", "1 2 3");
        assert_eq!(
            resolved_value(&scene, &id, "position", None),
            Some(Value::Vec3([1.0, 2.0, 3.0]))
        );
    }
}
