//! Entity lifecycle commands: create, remove, clone, rename.
//!
//! Create, clone, and the remove-undo all pay the same asynchronous load
//! barrier: they finish (select, notify, run their continuation) only when
//! the recreated node's load event is pumped through the editor.

use crate::commands::{resume, Command, CommandResult, Continuation};
use crate::editor::Editor;
use crate::events::EditorEvent;
use crate::selection::SelectionMode;
use scenic_dom::{NodeDefinition, NodeId, NodeSnapshot, Scene};
use std::any::Any;

/// Builds a node from a declarative definition under a parent (scene root by
/// default). The generated id is baked into the definition on first execute
/// so every redo recreates the same entity.
pub struct EntityCreate {
    label: String,
    definition: NodeDefinition,
    parent: Option<NodeId>,
    created: Option<NodeId>,
}

impl EntityCreate {
    pub fn new(definition: NodeDefinition, parent: Option<NodeId>) -> Self {
        let element = definition.element.as_deref().unwrap_or("entity");
        Self {
            label: format!("Create {}", element),
            definition,
            parent,
            created: None,
        }
    }
}

impl Command for EntityCreate {
    fn kind(&self) -> &'static str {
        "entitycreate"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }

    fn target(&self) -> Option<&NodeId> {
        self.created.as_ref()
    }

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let parent = self
            .parent
            .clone()
            .unwrap_or_else(|| editor.scene.root().clone());
        if !editor.scene.contains(&parent) {
            log::debug!("entitycreate: parent {} not found", parent);
            resume(editor, next);
            return Ok(());
        }
        let id = editor.scene.create_from_definition(&self.definition, &parent, None)?;
        // Bake the id in so redo after undo lands on the same entity.
        self.definition.id = Some(id.to_string());
        self.created = Some(id.clone());

        editor.on_loaded(
            id.clone(),
            Box::new(move |ed| {
                ed.selection.select(id.clone(), SelectionMode::Replace);
                ed.events.send(EditorEvent::EntityCreated { entity: id });
                resume(ed, next);
            }),
        );
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if let Some(id) = &self.created {
            editor.selection.remove(id);
            if editor.scene.remove_subtree(id) {
                editor.events.send(EditorEvent::EntityRemoved { entity: id.clone() });
            }
        }
        resume(editor, next);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Removes a subtree; undo reinserts it at the exact original parent and
/// index, not appended.
///
/// Position and the closest sibling (next preferred, else previous, for the
/// selection handoff) are captured at construction. The undo payload is a
/// detached snapshot taken at execute time, so teardown hooks cannot re-fire
/// while it waits on the stack.
pub struct EntityRemove {
    label: String,
    target: NodeId,
    parent: Option<NodeId>,
    index: Option<usize>,
    sibling: Option<NodeId>,
    snapshot: Option<NodeSnapshot>,
}

impl EntityRemove {
    pub fn new(scene: &Scene, target: NodeId) -> Self {
        let parent = scene.get(&target).and_then(|n| n.parent().cloned());
        let index = scene.index_in_parent(&target);
        let sibling = scene.closest_sibling(&target);
        Self {
            label: "Remove entity".to_string(),
            target,
            parent,
            index,
            sibling,
            snapshot: None,
        }
    }
}

impl Command for EntityRemove {
    fn kind(&self) -> &'static str {
        "entityremove"
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

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let Some(snapshot) = editor.scene.export_subtree(&self.target) else {
            log::debug!("entityremove: {} not found", self.target);
            resume(editor, next);
            return Ok(());
        };
        if !editor.scene.remove_subtree(&self.target) {
            log::debug!("entityremove: {} cannot be removed", self.target);
            resume(editor, next);
            return Ok(());
        }
        self.snapshot = Some(snapshot);
        editor.selection.remove(&self.target);
        if let Some(sibling) = &self.sibling {
            if editor.scene.contains(sibling) {
                editor.selection.select(sibling.clone(), SelectionMode::Replace);
            }
        }
        editor.events.send(EditorEvent::EntityRemoved {
            entity: self.target.clone(),
        });
        resume(editor, next);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let Some(snapshot) = &self.snapshot else {
            resume(editor, next);
            return Ok(());
        };
        let parent = self
            .parent
            .clone()
            .unwrap_or_else(|| editor.scene.root().clone());
        if !editor.scene.contains(&parent) {
            log::debug!("entityremove undo: parent {} not found", parent);
            resume(editor, next);
            return Ok(());
        }
        editor.scene.instantiate_snapshot(snapshot, &parent, self.index)?;
        let id = self.target.clone();
        editor.on_loaded(
            id.clone(),
            Box::new(move |ed| {
                ed.selection.select(id.clone(), SelectionMode::Replace);
                ed.events.send(EditorEvent::EntityCreated { entity: id });
                resume(ed, next);
            }),
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Duplicates an entity and its descendants immediately after the original.
///
/// The detached template is built once, on first execute, with freshly
/// generated ids baked in; every later execute instantiates that same
/// template, so descendant ids are identical across undo/redo cycles.
pub struct EntityClone {
    label: String,
    target: NodeId,
    template: Option<NodeSnapshot>,
    clone_id: Option<NodeId>,
}

impl EntityClone {
    pub fn new(target: NodeId) -> Self {
        Self {
            label: "Clone entity".to_string(),
            target,
            template: None,
            clone_id: None,
        }
    }

    fn build_template(&mut self, editor: &mut Editor) -> bool {
        if self.template.is_some() {
            return true;
        }
        let Some(mut snapshot) = editor.scene.export_subtree(&self.target) else {
            return false;
        };
        reassign_ids(&mut editor.scene, &mut snapshot);
        self.clone_id = snapshot.id().and_then(|id| NodeId::new(id).ok());
        self.template = Some(snapshot);
        true
    }
}

/// Replace every id in the snapshot with a freshly allocated one.
fn reassign_ids(scene: &mut Scene, snapshot: &mut NodeSnapshot) {
    let id = scene.allocate_id(&snapshot.element);
    snapshot.attributes.insert("id".to_string(), id.to_string());
    for child in &mut snapshot.children {
        reassign_ids(scene, child);
    }
}

impl Command for EntityClone {
    fn kind(&self) -> &'static str {
        "entityclone"
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

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if !self.build_template(editor) {
            log::debug!("entityclone: {} not found", self.target);
            resume(editor, next);
            return Ok(());
        }
        let (Some(template), Some(clone_id)) = (&self.template, &self.clone_id) else {
            resume(editor, next);
            return Ok(());
        };
        // Insert immediately after the original; fall back to the root when
        // the original has since disappeared.
        let (parent, index) = match (
            editor.scene.get(&self.target).and_then(|n| n.parent().cloned()),
            editor.scene.index_in_parent(&self.target),
        ) {
            (Some(parent), index) => (parent, index.map(|i| i + 1)),
            (None, _) => (editor.scene.root().clone(), None),
        };
        editor.scene.instantiate_snapshot(template, &parent, index)?;
        let id = clone_id.clone();
        editor.on_loaded(
            id.clone(),
            Box::new(move |ed| {
                ed.selection.select(id.clone(), SelectionMode::Replace);
                ed.events.send(EditorEvent::EntityClone { entity: id });
                resume(ed, next);
            }),
        );
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if let Some(id) = &self.clone_id {
            editor.selection.remove(id);
            if editor.scene.remove_subtree(id) {
                editor.events.send(EditorEvent::EntityRemoved { entity: id.clone() });
            }
        }
        resume(editor, next);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sets the display-name attribute. Not undoable: the undo is a logged stub.
pub struct EntityRename {
    label: String,
    target: NodeId,
    name: String,
}

impl EntityRename {
    pub const NAME_ATTRIBUTE: &'static str = "data-name";

    pub fn new(target: NodeId, name: impl Into<String>) -> Self {
        Self {
            label: "Rename entity".to_string(),
            target,
            name: name.into(),
        }
    }
}

impl Command for EntityRename {
    fn kind(&self) -> &'static str {
        "entityrename"
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

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        if editor
            .scene
            .set_attribute(&self.target, Self::NAME_ATTRIBUTE, &self.name)
        {
            editor.events.send(EditorEvent::EntityUpdate {
                entity: self.target.clone(),
                component: Self::NAME_ATTRIBUTE.to_string(),
                property: None,
            });
        } else {
            log::debug!("entityrename: {} not found", self.target);
        }
        resume(editor, next);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        log::warn!("rename of {} cannot be undone", self.target);
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

    fn pumped(editor: &mut Editor) {
        editor.settle();
    }

    fn editor_with_children(n: usize) -> (Editor, Vec<NodeId>) {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let ids = (0..n)
            .map(|_| {
                editor
                    .scene
                    .create_from_definition(&NodeDefinition::element("box"), &root, None)
                    .unwrap()
            })
            .collect();
        pumped(&mut editor);
        (editor, ids)
    }

    #[test]
    fn test_create_selects_after_load() {
        let mut editor = Editor::new();
        let mut cmd = EntityCreate::new(NodeDefinition::element("box"), None);
        cmd.execute(&mut editor, None).unwrap();

        let id = cmd.target().cloned().unwrap();
        assert!(editor.scene.contains(&id));
        assert!(editor.selection.is_empty());

        pumped(&mut editor);
        assert!(editor.selection.is_primary(&id));
        assert!(editor
            .events
            .drain()
            .iter()
            .any(|e| e.kind() == "entitycreated"));
    }

    #[test]
    fn test_create_redo_reuses_the_generated_id() {
        let mut editor = Editor::new();
        let mut cmd = EntityCreate::new(NodeDefinition::element("box"), None);
        cmd.execute(&mut editor, None).unwrap();
        pumped(&mut editor);
        let id = cmd.target().cloned().unwrap();

        cmd.undo(&mut editor, None).unwrap();
        assert!(!editor.scene.contains(&id));

        cmd.execute(&mut editor, None).unwrap();
        pumped(&mut editor);
        assert!(editor.scene.contains(&id));
    }

    #[test]
    fn test_remove_undo_restores_exact_position() {
        let (mut editor, ids) = editor_with_children(4);
        let third = ids[2].clone();

        let mut cmd = EntityRemove::new(&editor.scene, third.clone());
        cmd.execute(&mut editor, None).unwrap();
        assert!(!editor.scene.contains(&third));
        // Next sibling preferred for the selection handoff.
        assert!(editor.selection.is_primary(&ids[3]));

        cmd.undo(&mut editor, None).unwrap();
        pumped(&mut editor);
        assert_eq!(editor.scene.index_in_parent(&third), Some(2));
        assert!(editor.selection.is_primary(&third));
    }

    #[test]
    fn test_clone_inserts_after_original_with_stable_ids() {
        let (mut editor, ids) = editor_with_children(2);
        let original = ids[0].clone();
        let child = editor
            .scene
            .create_from_definition(&NodeDefinition::element("sphere"), &original, None)
            .unwrap();
        pumped(&mut editor);
        let _ = child;

        let mut cmd = EntityClone::new(original.clone());
        cmd.execute(&mut editor, None).unwrap();
        pumped(&mut editor);
        let clone_id = editor.selection.primary().cloned().unwrap();
        assert_ne!(clone_id, original);
        assert_eq!(editor.scene.index_in_parent(&clone_id), Some(1));
        let first_ids = editor.scene.export_subtree(&clone_id).unwrap().ids();

        cmd.undo(&mut editor, None).unwrap();
        assert!(!editor.scene.contains(&clone_id));

        cmd.execute(&mut editor, None).unwrap();
        pumped(&mut editor);
        let second_ids = editor.scene.export_subtree(&clone_id).unwrap().ids();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_rename_is_irreversible() {
        let (mut editor, ids) = editor_with_children(1);
        let mut cmd = EntityRename::new(ids[0].clone(), "Hero");
        cmd.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&ids[0], "data-name"), Some("Hero"));

        cmd.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&ids[0], "data-name"), Some("Hero"));
    }
}
