//! Component add/remove command pair.

use crate::commands::{resume, Command, CommandResult, Continuation};
use crate::editor::Editor;
use crate::events::EditorEvent;
use scenic_dom::{NodeId, Scene, SchemaLookup, Value};
use std::any::Any;

/// Sets a component attribute on an entity; undo removes it again.
pub struct AddComponent {
    label: String,
    target: NodeId,
    component: String,
    value: Value,
}

impl AddComponent {
    pub fn new(target: NodeId, component: &str, value: Value) -> Self {
        Self {
            label: format!("Add {}", component),
            target,
            component: component.to_string(),
            value,
        }
    }
}

impl Command for AddComponent {
    fn kind(&self) -> &'static str {
        "componentadd"
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

    fn component(&self) -> Option<&str> {
        Some(&self.component)
    }

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if editor.scene.contains(&self.target) {
            editor
                .scene
                .set_component(&self.target, &self.component, self.value.clone());
            editor.events.send(EditorEvent::ComponentAdd {
                entity: self.target.clone(),
                component: self.component.clone(),
            });
        } else {
            log::debug!("componentadd: {} not found", self.target);
        }
        resume(editor, next);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if editor.scene.remove_attribute(&self.target, &self.component) {
            editor.events.send(EditorEvent::ComponentRemove {
                entity: self.target.clone(),
                component: self.component.clone(),
            });
        }
        resume(editor, next);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Removes a component attribute; undo restores the value that was there.
///
/// The pre-existing value is captured at construction, before the removal
/// destroys it.
pub struct RemoveComponent {
    label: String,
    target: NodeId,
    component: String,
    previous: Option<Value>,
}

impl RemoveComponent {
    pub fn new(scene: &Scene, target: NodeId, component: &str) -> Self {
        let previous = match scene.schema_lookup(&target, component) {
            SchemaLookup::Found(_) => scene.actual_value(&target, component, None),
            SchemaLookup::RawAttribute => scene
                .attribute(&target, component)
                .map(|v| Value::String(v.to_string())),
        };
        Self {
            label: format!("Remove {}", component),
            target,
            component: component.to_string(),
            previous,
        }
    }
}

impl Command for RemoveComponent {
    fn kind(&self) -> &'static str {
        "componentremove"
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

    fn component(&self) -> Option<&str> {
        Some(&self.component)
    }

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if editor.scene.remove_attribute(&self.target, &self.component) {
            editor.events.send(EditorEvent::ComponentRemove {
                entity: self.target.clone(),
                component: self.component.clone(),
            });
        } else {
            log::debug!("componentremove: nothing to remove on {}", self.target);
        }
        resume(editor, next);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if let Some(previous) = &self.previous {
            if editor.scene.contains(&self.target) {
                editor
                    .scene
                    .set_component(&self.target, &self.component, previous.clone());
                editor.events.send(EditorEvent::ComponentAdd {
                    entity: self.target.clone(),
                    component: self.component.clone(),
                });
            } else {
                log::debug!("componentremove undo: {} not found", self.target);
            }
        }
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
    fn test_add_component_round_trip() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = AddComponent::new(id.clone(), "material", Value::from("color: red"));
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "material"), Some("color: red"));
        assert_eq!(editor.events.drain().last().map(|e| e.kind()), Some("componentadd"));

        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "material"), None);
        assert_eq!(editor.events.drain().last().map(|e| e.kind()), Some("componentremove"));
    }

    #[test]
    fn test_remove_component_restores_captured_value() {
        let (mut editor, id) = editor_with_box();
        editor.scene.set_attribute(&id, "material", "color: red; metalness: 1");

        let mut cmd = RemoveComponent::new(&editor.scene, id.clone(), "material");
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "material"), None);

        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(
            editor
                .scene
                .component_data(&id, "material")
                .and_then(|d| d.get("metalness"))
                .and_then(Value::as_float),
            Some(1.0)
        );
    }

    #[test]
    fn test_remove_of_absent_component_is_a_noop_pair() {
        let (mut editor, id) = editor_with_box();
        let mut cmd = RemoveComponent::new(&editor.scene, id.clone(), "material");
        cmd.execute(&mut editor, None).unwrap();
        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "material"), None);
    }
}
