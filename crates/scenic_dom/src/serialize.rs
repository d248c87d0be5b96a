//! Minimal serialization: the smallest faithful declarative form.
//!
//! The exported snapshot keeps only what the author actually contributed.
//! Every component value is diffed against the implicit chain (primitive
//! mappings, mixins, injected defaults, schema defaults); anything the entity
//! would carry anyway is subtracted out. The test is value equality, never
//! mere attribute presence, so re-authoring a mixin's exact value still
//! serializes to nothing.

use crate::id::NodeId;
use crate::implicit;
use crate::node::NodeSnapshot;
use crate::scene::{Scene, SchemaLookup};
use crate::schema::ComponentSchema;
use crate::value::Value;
use std::collections::BTreeSet;

/// Export a subtree as its minimal declarative snapshot.
///
/// Plain attributes (`id`, `class`, `mixin`, `data-*`, primitive mappings)
/// pass through untouched; component attributes shrink to the properties that
/// differ from their implicit values, or vanish when nothing differs.
pub fn prepare_for_serialization(scene: &Scene, id: &NodeId) -> Option<NodeSnapshot> {
    let node = scene.get(id)?;
    let mut snapshot = NodeSnapshot::new(node.element().to_string());

    let mut names: BTreeSet<String> = node.attributes().map(|(k, _)| k.to_string()).collect();
    names.extend(node.component_names().map(str::to_string));

    for name in names {
        match scene.schema_lookup(id, &name) {
            SchemaLookup::Found(schema) => {
                if let Some(diff) = component_diff(scene, id, &name, &schema) {
                    snapshot
                        .attributes
                        .insert(name.clone(), schema.stringify(&diff));
                }
            }
            SchemaLookup::RawAttribute => {
                if let Some(value) = node.attribute(&name) {
                    snapshot.attributes.insert(name.clone(), value.to_string());
                }
            }
        }
    }

    for child in node.children() {
        if let Some(child_snapshot) = prepare_for_serialization(scene, child) {
            snapshot.children.push(child_snapshot);
        }
    }
    Some(snapshot)
}

/// The canonical clipboard string for one component of an entity: the same
/// implicit-subtracted diff the serializer writes, or the empty string when
/// the component carries nothing of its own.
pub fn component_clipboard_representation(scene: &Scene, id: &NodeId, component: &str) -> String {
    match scene.schema_lookup(id, component) {
        SchemaLookup::Found(schema) => component_diff(scene, id, component, &schema)
            .map(|diff| schema.stringify(&diff))
            .unwrap_or_default(),
        SchemaLookup::RawAttribute => scene
            .attribute(id, component)
            .unwrap_or_default()
            .to_string(),
    }
}

/// Actual minus implicit. `None` means the whole component is implied.
fn component_diff(
    scene: &Scene,
    id: &NodeId,
    component: &str,
    schema: &ComponentSchema,
) -> Option<Value> {
    let actual = scene.actual_value(id, component, None)?;
    match schema {
        ComponentSchema::Single(_) => {
            let implied = implicit::implicit_value(scene, id, component, None)?;
            (!values_equal(&actual, &implied)).then_some(actual)
        }
        ComponentSchema::Map(_) => {
            let actual_map = actual.as_object()?;
            let mut diff = Value::object();
            for (property, value) in actual_map {
                let implied = implicit::implicit_value(scene, id, component, Some(property))
                    .unwrap_or(Value::Null);
                if !values_equal(value, &implied) {
                    diff.set(property.clone(), value.clone());
                }
            }
            let empty = diff.as_object().map(|m| m.is_empty()).unwrap_or(true);
            (!empty).then_some(diff)
        }
    }
}

/// Value equality after canonicalization: "1 0 0" and Vec3([1,0,0]) compare
/// equal, and floats compare through their canonical string form so parsed
/// and authored values agree.
fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    a.to_string() == b.to_string()
}
