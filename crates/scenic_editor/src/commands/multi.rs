//! Ordered command batches executed as one undoable unit.

use crate::commands::registry::CommandRegistry;
use crate::commands::{resume, Command, CommandResult, Continuation};
use crate::editor::Editor;
use scenic_dom::{Scene, Value};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

type SharedCommands = Rc<Vec<Rc<RefCell<Box<dyn Command>>>>>;

/// Chains member commands through their continuations: each member runs only
/// after the previous one's (possibly asynchronous) completion, so observable
/// state changes happen in declared order even across load barriers. Undo
/// unwinds in reverse declaration order under the same gating.
///
/// There is no atomicity: a member failing mid-chain stops the chain and
/// leaves the earlier members applied.
pub struct MultiCommand {
    label: String,
    members: SharedCommands,
    /// Outer completion callback, consumed by the first execute.
    on_complete: Option<Continuation>,
}

impl MultiCommand {
    /// Resolve `(kind, payload)` pairs against the registry. Fails up front
    /// on the first unknown kind or bad payload, before anything executes.
    pub fn from_specs(
        registry: &CommandRegistry,
        scene: &Scene,
        specs: &[(String, Value)],
        on_complete: Option<Continuation>,
    ) -> CommandResult<Self> {
        let mut members = Vec::with_capacity(specs.len());
        for (kind, payload) in specs {
            members.push(registry.resolve(scene, kind, payload)?);
        }
        Ok(Self::from_commands(members, on_complete))
    }

    pub fn from_commands(
        commands: Vec<Box<dyn Command>>,
        on_complete: Option<Continuation>,
    ) -> Self {
        Self {
            label: "Multiple edits".to_string(),
            members: Rc::new(commands.into_iter().map(|c| Rc::new(RefCell::new(c))).collect()),
            on_complete,
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Run members left-to-right from `index`, each continuing into the next.
fn execute_from(members: SharedCommands, index: usize, editor: &mut Editor, done: Option<Continuation>) {
    let Some(member) = members.get(index).cloned() else {
        resume(editor, done);
        return;
    };
    let rest = members.clone();
    let next: Continuation = Box::new(move |ed| execute_from(rest, index + 1, ed, done));
    let result = member.borrow_mut().execute(editor, Some(next));
    if let Err(e) = result {
        // Earlier members stay applied; the chain stops here.
        log::error!("multi-command member {} failed: {}", index, e);
    }
}

/// Undo members right-to-left; `remaining` counts members still to unwind.
fn undo_from(members: SharedCommands, remaining: usize, editor: &mut Editor, done: Option<Continuation>) {
    if remaining == 0 {
        resume(editor, done);
        return;
    }
    let member = match members.get(remaining - 1).cloned() {
        Some(member) => member,
        None => {
            resume(editor, done);
            return;
        }
    };
    let rest = members.clone();
    let next: Continuation = Box::new(move |ed| undo_from(rest, remaining - 1, ed, done));
    let result = member.borrow_mut().undo(editor, Some(next));
    if let Err(e) = result {
        log::error!("multi-command member {} undo failed: {}", remaining - 1, e);
    }
}

impl Command for MultiCommand {
    fn kind(&self) -> &'static str {
        "multi"
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn set_label(&mut self, label: String) {
        self.label = label;
    }

    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        let done = match (next, self.on_complete.take()) {
            (Some(next), Some(outer)) => Some(Box::new(move |ed: &mut Editor| {
                outer(ed);
                next(ed);
            }) as Continuation),
            (next, outer) => next.or(outer),
        };
        execute_from(self.members.clone(), 0, editor, done);
        Ok(())
    }

    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult {
        undo_from(self.members.clone(), self.members.len(), editor, next);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{EntityCreate, EntityUpdate};
    use scenic_dom::NodeDefinition;

    #[test]
    fn test_members_run_in_declared_order_across_the_load_barrier() {
        let mut editor = Editor::new();
        // The update targets the entity the create makes; it only works if
        // the create fully completes (load event included) first.
        let create = EntityCreate::new(NodeDefinition::element("box").with_id("hero"), None);
        let update = EntityUpdate::new(
            &editor.scene,
            scenic_dom::NodeId::new("hero").unwrap(),
            "position",
            None,
            Value::from("1 2 3"),
        );
        let mut multi = MultiCommand::from_commands(
            vec![Box::new(create), Box::new(update)],
            Some(Box::new(|ed| {
                ed.events.send(crate::events::EditorEvent::HistoryChanged { command: None });
            })),
        );

        multi.execute(&mut editor, None).unwrap();
        let hero = scenic_dom::NodeId::new("hero").unwrap();
        // Before the pump: created but the dependent update has not run.
        assert_eq!(editor.scene.attribute(&hero, "position"), None);
        assert!(editor.events.is_empty());

        editor.settle();
        assert_eq!(editor.scene.attribute(&hero, "position"), Some("1 2 3"));
        // Outer completion ran last.
        assert_eq!(
            editor.events.drain().last().map(|e| e.kind()),
            Some("historychanged")
        );
    }

    #[test]
    fn test_failed_member_stops_the_chain() {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        editor
            .scene
            .create_from_definition(&NodeDefinition::element("box").with_id("taken"), &root, None)
            .unwrap();
        editor.settle();

        let taken = scenic_dom::NodeId::new("taken").unwrap();
        let first = EntityUpdate::new(
            &editor.scene,
            taken.clone(),
            "position",
            None,
            Value::from("1 0 0"),
        );
        // Creating a second "taken" fails with a duplicate-id error.
        let clash = EntityCreate::new(NodeDefinition::element("box").with_id("taken"), None);
        let tail = EntityUpdate::new(
            &editor.scene,
            taken.clone(),
            "rotation",
            None,
            Value::from("0 90 0"),
        );
        let mut multi = MultiCommand::from_commands(
            vec![Box::new(first), Box::new(clash), Box::new(tail)],
            None,
        );
        multi.execute(&mut editor, None).unwrap();
        editor.settle();

        // The member before the failure applied; the one after never ran.
        assert_eq!(editor.scene.attribute(&taken, "position"), Some("1 0 0"));
        assert_eq!(editor.scene.attribute(&taken, "rotation"), None);
    }

    #[test]
    fn test_undo_unwinds_in_reverse_order() {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let id = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();
        editor.settle();

        let first = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("1 0 0"),
        );
        let mut multi = MultiCommand::from_commands(vec![Box::new(first)], None);
        multi.execute(&mut editor, None).unwrap();

        let second = EntityUpdate::new(
            &editor.scene,
            id.clone(),
            "position",
            None,
            Value::from("2 0 0"),
        );
        let mut outer = MultiCommand::from_commands(vec![Box::new(second)], None);
        outer.execute(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("2 0 0"));

        outer.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("1 0 0"));
        multi.undo(&mut editor, None).unwrap();
        assert_eq!(editor.scene.attribute(&id, "position"), Some("0 0 0"));
    }
}
