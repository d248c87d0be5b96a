//! The workhorse update command: set a component, one of its properties, or
//! a plain attribute.

use crate::commands::{resume, Command, CommandResult, Continuation};
use crate::editor::Editor;
use crate::events::EditorEvent;
use scenic_dom::{implicit, NodeId, Scene, SchemaLookup, Value};
use std::any::Any;

/// Sets a value on an entity and remembers what it replaced.
///
/// The old value is captured at construction through the same two-level
/// schema lookup the scene mutators use: the live component instance's
/// schema when one exists, the global component class otherwise, raw
/// attribute semantics for everything else (`id`, `class`, `mixin`,
/// `data-*`). Schema-resolved values are stored in canonical string form so
/// undo and redo replay exactly what the serializer would have written.
pub struct EntityUpdate {
    label: String,
    target: NodeId,
    component: String,
    property: Option<String>,
    old_value: Value,
    new_value: Value,
}

impl EntityUpdate {
    pub fn new(
        scene: &Scene,
        target: NodeId,
        component: &str,
        property: Option<&str>,
        new_value: Value,
    ) -> Self {
        let (old_value, new_value) = match scene.schema_lookup(&target, component) {
            SchemaLookup::Found(schema) => match property {
                Some(prop) if !schema.is_single() => {
                    let old = implicit::resolved_value(scene, &target, component, Some(prop))
                        .unwrap_or(Value::Null);
                    let descriptor = schema.descriptor(Some(prop));
                    let typed = match (&new_value, descriptor) {
                        (Value::String(s), Some(d)) => d.parse(s).unwrap_or(new_value.clone()),
                        _ => new_value.clone(),
                    };
                    let through = |v: &Value| match descriptor {
                        Some(d) => Value::String(d.stringify(v)),
                        None => Value::String(v.to_string()),
                    };
                    (through(&old), through(&typed))
                }
                _ if schema.is_single() => {
                    let old = implicit::resolved_value(scene, &target, component, None)
                        .unwrap_or_else(|| schema.default_value());
                    let typed = match &new_value {
                        Value::String(s) => schema.parse(s),
                        other => other.clone(),
                    };
                    (
                        Value::String(schema.stringify(&old)),
                        Value::String(schema.stringify(&typed)),
                    )
                }
                // Whole map component: deep-copy the current data map and
                // keep the caller's value as-is.
                _ => (
                    scene
                        .actual_value(&target, component, None)
                        .unwrap_or_else(Value::object),
                    new_value,
                ),
            },
            SchemaLookup::RawAttribute => {
                let old = scene
                    .attribute(&target, component)
                    .map(|v| Value::String(v.to_string()))
                    .unwrap_or(Value::Null);
                (old, new_value)
            }
        };

        let label = match property {
            Some(prop) => format!("Set {}.{}", component, prop),
            None => format!("Set {}", component),
        };
        Self {
            label,
            target,
            component: component.to_string(),
            property: property.map(str::to_string),
            old_value,
            new_value,
        }
    }

    /// Apply `value` to the target, re-resolving schema and id.
    fn apply(&mut self, editor: &mut Editor, value: Value) {
        if !editor.scene.contains(&self.target) {
            log::debug!("entityupdate: {} not found", self.target);
            return;
        }
        if self.component == "id" {
            self.retarget(editor, &value);
            return;
        }
        match editor.scene.schema_lookup(&self.target, &self.component) {
            SchemaLookup::Found(_) => match &self.property {
                Some(prop) => {
                    editor
                        .scene
                        .set_component_property(&self.target, &self.component, prop, value);
                }
                None => {
                    editor.scene.set_component(&self.target, &self.component, value);
                }
            },
            SchemaLookup::RawAttribute => match value {
                Value::Null => {
                    editor.scene.remove_attribute(&self.target, &self.component);
                }
                other => {
                    let text = match other {
                        Value::String(s) => s,
                        v => v.to_string(),
                    };
                    if self.component == "mixin" && is_single_mixin(&text) {
                        // Clear first so hosts keyed on mixin transitions
                        // observe a change even when the value looks similar.
                        editor.scene.set_attribute(&self.target, "mixin", "");
                    }
                    editor.scene.set_attribute(&self.target, &self.component, &text);
                }
            },
        }
    }

    /// `component == "id"` renames the node; the command follows the entity
    /// across its own rename so undo finds it again.
    fn retarget(&mut self, editor: &mut Editor, value: &Value) {
        let Some(new_id) = value.as_str() else {
            log::debug!("entityupdate: id value must be a string");
            return;
        };
        if editor.scene.set_attribute(&self.target, "id", new_id) {
            if let Ok(id) = NodeId::new(new_id) {
                self.target = id;
            }
        }
    }

    fn notify(&self, editor: &mut Editor) {
        editor.events.send(EditorEvent::EntityUpdate {
            entity: self.target.clone(),
            component: self.component.clone(),
            property: self.property.clone(),
        });
    }
}

/// A single space-free mixin id, the form the transition rule applies to.
fn is_single_mixin(value: &str) -> bool {
    !value.is_empty() && !value.contains(char::is_whitespace)
}

impl Command for EntityUpdate {
    fn kind(&self) -> &'static str {
        "entityupdate"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }

    fn target(&self) -> Option<&NodeId> {
        Some(&self.target)
    }

    fn updatable(&self) -> bool {
        true
    }

    fn component(&self) -> Option<&str> {
        Some(&self.component)
    }

    fn property(&self) -> Option<&str> {
        self.property.as_deref()
    }

    fn absorb(&mut self, incoming: &dyn Command) {
        if let Some(update) = incoming.as_any().downcast_ref::<EntityUpdate>() {
            self.new_value = update.new_value.clone();
        }
    }

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let value = self.new_value.clone();
        self.apply(editor, value);
        self.notify(editor);
        resume(editor, next);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let value = self.old_value.clone();
        self.apply(editor, value);
        self.notify(editor);
        resume(editor, next);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with_box() -> (Editor, NodeId) {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let id = editor
            .scene
            .create_from_definition(&scenic_dom::NodeDefinition::element("box"), &root, None)
            .unwrap();
        editor.settle();
        (editor, id)
    }

    #[test]
    fn test_property_update_round_trips() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "material",
            Some("color"),
            Value::from("blue"),
        );
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(
            editor.scene.attribute(&id, "material"),
            Some("color: blue")
        );

        cmd.undo(&mut editor, None).unwrap();
        // Back to the implicit default, authored explicitly now.
        assert_eq!(
            editor
                .scene
                .component_data(&id, "material")
                .and_then(|d| d.get("color"))
                .and_then(Value::as_str),
            Some("#fff")
        );
    }

    #[test]
    fn test_single_component_update() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("1 2 3"),
        );
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("1 2 3"));

        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("0 0 0"));
    }

    #[test]
    fn test_raw_attribute_update_and_removal_on_undo() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "data-name",
            None,
            Value::from("Hero"),
        );
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "data-name"), Some("Hero"));

        // Attribute did not exist before, so undo removes it outright.
        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "data-name"), None);
    }

    #[test]
    fn test_id_update_retargets_the_command() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "id",
            None,
            Value::from("hero"),
        );
        cmd.execute(&mut editor, None).unwrap();
        assert!(!editor.scene.contains(&id));
        assert_eq!(cmd.target().map(NodeId::as_str), Some("hero"));

        cmd.undo(&mut editor, None).unwrap();
        assert!(editor.scene.contains(&id));
        assert_eq!(cmd.target(), Some(&id));
    }

    #[test]
    fn test_absorb_keeps_old_replaces_new() {
        let (mut editor, id) = editor_with_box();
        let mut first = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("1 0 0"),
        );
        first.execute(&mut editor, None).unwrap();

        let second = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("2 0 0"),
        );
        first.absorb(&second);

        first.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("0 0 0"));
        first.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("2 0 0"));
    }

    #[test]
    fn test_missing_target_is_a_silent_noop() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("1 2 3"),
        );
        editor.scene.remove_subtree(&id);
        assert!(cmd.execute(&mut editor, None).is_ok());
        assert!(cmd.undo(&mut editor, None).is_ok());
    }
}
