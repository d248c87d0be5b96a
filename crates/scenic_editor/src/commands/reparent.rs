//! Reparenting with world-pose preservation.

use crate::commands::{resume, Command, CommandResult, Continuation};
use crate::editor::Editor;
use crate::events::EditorEvent;
use crate::selection::SelectionMode;
use glam::{Quat, Vec3};
use scenic_dom::{transform, NodeId, NodeSnapshot, Scene};
use std::any::Any;

/// Moves a subtree under a new parent at a given index while keeping its
/// world position and orientation fixed.
///
/// Construction captures the world pose, the original parent and index, and
/// a detached export of the subtree. Both directions recreate the subtree
/// from that export and, once its load event fires, pause it, solve
/// local = parent_world⁻¹ · world against the destination parent's *current*
/// world matrix, write the solved pose back, and play it again.
pub struct EntityReparent {
    label: String,
    target: NodeId,
    new_parent: NodeId,
    new_index: Option<usize>,
    old_parent: Option<NodeId>,
    old_index: Option<usize>,
    world_position: Vec3,
    world_rotation: Quat,
    snapshot: Option<NodeSnapshot>,
}

impl EntityReparent {
    pub fn new(scene: &Scene, target: NodeId, new_parent: NodeId, new_index: Option<usize>) -> Self {
        let (world_position, world_rotation) = transform::world_pose(scene, &target);
        Self {
            label: "Reparent entity".to_string(),
            old_parent: scene.get(&target).and_then(|n| n.parent().cloned()),
            old_index: scene.index_in_parent(&target),
            snapshot: scene.export_subtree(&target),
            target,
            new_parent,
            new_index,
            world_position,
            world_rotation,
        }
    }

    /// True when `node` is the target or one of its live descendants.
    fn owns(&self, scene: &Scene, node: &NodeId) -> bool {
        let mut cursor = Some(node.clone());
        while let Some(id) = cursor {
            if id == self.target {
                return true;
            }
            cursor = scene.get(&id).and_then(|n| n.parent().cloned());
        }
        false
    }

    /// Detach, recreate under `parent` at `index`, and solve the local pose
    /// on load.
    fn relocate(
        &self,
        editor: &mut Editor,
        parent: NodeId,
        index: Option<usize>,
        next: Option<Continuation>,
    ) -> CommandResult {
        let Some(snapshot) = &self.snapshot else {
            log::debug!("entityreparent: {} had no exportable subtree", self.target);
            resume(editor, next);
            return Ok(());
        };
        if !editor.scene.contains(&parent) {
            log::debug!("entityreparent: parent {} not found", parent);
            resume(editor, next);
            return Ok(());
        }
        // A destination inside the moved subtree would be deleted by the
        // detach, leaving nothing to reattach to.
        if self.owns(&editor.scene, &parent) {
            log::debug!("entityreparent: {} lies inside the moved subtree", parent);
            resume(editor, next);
            return Ok(());
        }
        // An already-missing target skips the detach; the captured export
        // still gets reinstated below.
        if editor.scene.contains(&self.target) {
            if !editor.scene.remove_subtree(&self.target) {
                log::debug!("entityreparent: {} cannot be detached", self.target);
                resume(editor, next);
                return Ok(());
            }
            editor.selection.remove(&self.target);
            editor.events.send(EditorEvent::EntityRemoved {
                entity: self.target.clone(),
            });
        }
        editor.scene.instantiate_snapshot(snapshot, &parent, index)?;

        let target = self.target.clone();
        let world_position = self.world_position;
        let world_rotation = self.world_rotation;
        editor.on_loaded(
            target.clone(),
            Box::new(move |ed| {
                ed.scene.pause(&target);
                let parent_world = transform::world_matrix(&ed.scene, &parent);
                let (position, rotation) =
                    transform::solve_local(parent_world, world_position, world_rotation);
                transform::apply_local_pose(&mut ed.scene, &target, position, rotation);
                ed.scene.play(&target);
                ed.selection.select(target.clone(), SelectionMode::Replace);
                ed.events.send(EditorEvent::EntityCreated { entity: target });
                resume(ed, next);
            }),
        );
        Ok(())
    }
}

impl Command for EntityReparent {
    fn kind(&self) -> &'static str {
        "entityreparent"
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
        self.relocate(editor, self.new_parent.clone(), self.new_index, next)
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let parent = self
            .old_parent
            .clone()
            .unwrap_or_else(|| editor.scene.root().clone());
        self.relocate(editor, parent, self.old_index, next)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_dom::NodeDefinition;

    const EPS: f32 = 1e-4;

    fn world_position(editor: &Editor, id: &NodeId) -> Vec3 {
        transform::world_pose(&editor.scene, id).0
    }

    fn scene_with_two_parents() -> (Editor, NodeId, NodeId, NodeId) {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let a = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();
        let b = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();
        let child = editor
            .scene
            .create_from_definition(&NodeDefinition::element("sphere"), &a, None)
            .unwrap();
        editor.scene.set_attribute(&a, "position", "3 0 0");
        editor.scene.set_attribute(&b, "position", "0 2 0");
        editor.scene.set_attribute(&b, "rotation", "0 0 45");
        editor.scene.set_attribute(&child, "position", "1 1 1");
        editor.settle();
        (editor, a, b, child)
    }

    #[test]
    fn test_reparent_preserves_world_position() {
        let (mut editor, _a, b, child) = scene_with_two_parents();
        let before = world_position(&editor, &child);

        let mut cmd = EntityReparent::new(&editor.scene, child.clone(), b.clone(), None);
        cmd.execute(&mut editor, None).unwrap();
        editor.settle();

        assert_eq!(
            editor.scene.get(&child).and_then(|n| n.parent()),
            Some(&b)
        );
        let after = world_position(&editor, &child);
        assert!((after - before).length() < EPS, "{:?} != {:?}", after, before);
        assert!(!editor.scene.get(&child).map(|n| n.is_paused()).unwrap_or(true));
    }

    #[test]
    fn test_reparent_under_own_descendant_is_rejected() {
        let (mut editor, a, _b, child) = scene_with_two_parents();
        let root = editor.scene.root().clone();

        let mut cmd = EntityReparent::new(&editor.scene, a.clone(), child.clone(), None);
        cmd.execute(&mut editor, None).unwrap();
        editor.settle();

        // Nothing moved and nothing was lost.
        assert!(editor.scene.contains(&a));
        assert!(editor.scene.contains(&child));
        assert_eq!(editor.scene.get(&a).and_then(|n| n.parent()), Some(&root));
        assert_eq!(editor.scene.get(&child).and_then(|n| n.parent()), Some(&a));

        cmd.undo(&mut editor, None).unwrap();
        editor.settle();
        assert!(editor.scene.contains(&a));
        assert_eq!(editor.scene.get(&child).and_then(|n| n.parent()), Some(&a));
    }

    #[test]
    fn test_undo_reinstates_a_target_that_went_missing() {
        let (mut editor, a, b, child) = scene_with_two_parents();

        let mut cmd = EntityReparent::new(&editor.scene, child.clone(), b, None);
        cmd.execute(&mut editor, None).unwrap();
        editor.settle();
        assert!(editor.scene.remove_subtree(&child));

        cmd.undo(&mut editor, None).unwrap();
        editor.settle();
        assert!(editor.scene.contains(&child));
        assert_eq!(editor.scene.get(&child).and_then(|n| n.parent()), Some(&a));
    }

    #[test]
    fn test_undo_restores_parent_index_and_world_position() {
        let (mut editor, a, b, child) = scene_with_two_parents();
        // Give the child a sibling so index restoration is observable.
        let sibling = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &a, Some(0))
            .unwrap();
        editor.settle();
        let _ = sibling;
        let before = world_position(&editor, &child);
        assert_eq!(editor.scene.index_in_parent(&child), Some(1));

        let mut cmd = EntityReparent::new(&editor.scene, child.clone(), b, None);
        cmd.execute(&mut editor, None).unwrap();
        editor.settle();
        cmd.undo(&mut editor, None).unwrap();
        editor.settle();

        assert_eq!(
            editor.scene.get(&child).and_then(|n| n.parent()),
            Some(&a)
        );
        assert_eq!(editor.scene.index_in_parent(&child), Some(1));
        let after = world_position(&editor, &child);
        assert!((after - before).length() < EPS, "{:?} != {:?}", after, before);
    }
}
