//! # scenic_editor - Reversible Scene Mutation
//!
//! The command engine on top of `scenic_dom`:
//!
//! - **Commands**: every mutation is a command holding the state needed to
//!   reverse itself, captured before its first execution
//! - **History**: undo/redo stacks with time-windowed coalescing of rapid
//!   matching updates and a coarse disabled gate
//! - **Async completion**: entity (re)creation finishes on the node's
//!   one-shot load event; commands sequence through continuations, and the
//!   host pumps loads via `Editor::complete_loads` / `Editor::settle`
//! - **Composer**: ordered command batches as one undoable unit, resolved
//!   through an injectable registry
//! - **Bus**: outbound notification events external layers drain
//!
//! Everything is single-threaded and cooperative; there is no locking and no
//! `Send`/`Sync` bound on commands.

pub mod commands;
pub mod config;
pub mod editor;
pub mod events;
pub mod history;
pub mod selection;

pub use commands::{
    Command, CommandError, CommandInfo, CommandRegistry, CommandResult, Continuation, MultiCommand,
};
pub use config::{ConfigError, EditorConfig, HistoryConfig};
pub use editor::Editor;
pub use events::{EditorEvent, EventChannel};
pub use history::History;
pub use selection::{SelectionManager, SelectionMode};
