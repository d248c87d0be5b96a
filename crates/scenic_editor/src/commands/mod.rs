//! Command trait, errors, and the concrete command variants.
//!
//! Every mutation of the scene goes through a command so it can be undone.
//! Commands capture their reversing state at construction, before their own
//! first execution, because executing may destroy the very state needed to
//! reverse it (removing a subtree, for instance). They hold entity ids, never
//! node references, and re-resolve the target on every execute/undo; a target
//! that no longer exists makes the command a logged no-op rather than an
//! error, so history stays usable against a tree that moved on without it.

pub mod component;
pub mod entity;
pub mod multi;
pub mod registry;
pub mod reparent;
pub mod update;

pub use component::{AddComponent, RemoveComponent};
pub use entity::{EntityClone, EntityCreate, EntityRemove, EntityRename};
pub use multi::MultiCommand;
pub use registry::CommandRegistry;
pub use reparent::EntityReparent;
pub use update::EntityUpdate;

use crate::editor::Editor;
use scenic_dom::{DomError, NodeId};
use std::any::Any;
use thiserror::Error;

/// One-shot completion callback. Commands with an asynchronous leg (anything
/// that waits on a load event) invoke it only once that leg finishes, which
/// is how [`MultiCommand`] sequences its members.
pub type Continuation = Box<dyn FnOnce(&mut Editor)>;

/// Result type for command construction and execution.
pub type CommandResult<T = ()> = Result<T, CommandError>;

/// Hard misuse surfaced to whoever built the command. Stale targets and
/// unknown components are deliberately *not* here; those degrade to logged
/// no-ops or raw-attribute semantics.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command kind: {0}")]
    UnknownKind(String),

    #[error("invalid {kind} payload: {reason}")]
    Payload { kind: String, reason: String },

    #[error(transparent)]
    Dom(#[from] DomError),
}

/// Identity of a history entry, as surfaced on the notification bus and in
/// undo/redo menus.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInfo {
    /// Sequence number, assigned when the command is pushed.
    pub id: u64,
    pub kind: &'static str,
    pub label: String,
    pub target: Option<NodeId>,
}

/// An undoable mutation of the editor.
pub trait Command {
    /// Stable discriminator string ("entityupdate", "entitycreate", ...).
    fn kind(&self) -> &'static str;

    /// Human-readable label for the undo/redo menu.
    fn label(&self) -> &str;

    fn set_label(&mut self, label: String);

    /// The entity this command operates on, when it has a single one.
    fn target(&self) -> Option<&NodeId> {
        None
    }

    /// Whether rapid matching successors may merge into this entry instead
    /// of stacking their own.
    fn updatable(&self) -> bool {
        false
    }

    /// Component discriminator for coalescing.
    fn component(&self) -> Option<&str> {
        None
    }

    /// Property discriminator for coalescing.
    fn property(&self) -> Option<&str> {
        None
    }

    /// Coalescing hook: take over the incoming command's new value, keeping
    /// this entry's old value.
    fn absorb(&mut self, _incoming: &dyn Command) {}

    /// Apply the command. `next` runs once the effect has fully completed,
    /// which for asynchronous commands is after the load event fires, not
    /// when this call returns.
    fn execute(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult;

    /// Reverse the command. Same completion contract as [`Command::execute`].
    fn undo(&mut self, editor: &mut Editor, next: Option<Continuation>) -> CommandResult;

    /// Downcast support for [`Command::absorb`].
    fn as_any(&self) -> &dyn Any;
}

/// Run a completion continuation, if any.
pub(crate) fn resume(editor: &mut Editor, next: Option<Continuation>) {
    if let Some(next) = next {
        next(editor);
    }
}
