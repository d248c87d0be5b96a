//! Undo/redo history: stacks, coalescing, and the disabled gate.
//!
//! The history owns executed commands. Undoing pops an entry off the undo
//! stack, runs its `undo()`, and parks it on the redo stack; redo is the
//! mirror image. Rapid matching updates coalesce into the top undo entry
//! instead of stacking one entry per keystroke of a drag.

use crate::commands::{Command, CommandInfo};
use crate::config::HistoryConfig;
use std::time::{Duration, Instant};

/// A pushed command plus its assigned sequence number.
pub struct HistoryEntry {
    pub id: u64,
    pub command: Box<dyn Command>,
}

impl HistoryEntry {
    pub fn info(&self) -> CommandInfo {
        CommandInfo {
            id: self.id,
            kind: self.command.kind(),
            label: self.command.label().to_string(),
            target: self.command.target().cloned(),
        }
    }
}

/// Undo/redo stacks with time-windowed coalescing.
pub struct History {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    /// When the most recent execute happened, for the coalescing window.
    last_execution: Option<Instant>,
    id_counter: u64,
    /// Rejects undo/redo wholesale while set.
    disabled: bool,
    coalesce_window: Duration,
    /// Maximum undo depth; `None` keeps everything.
    capacity: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub const DEFAULT_COALESCE_WINDOW: Duration = Duration::from_millis(500);

    pub fn new() -> Self {
        Self::from_config(&HistoryConfig::default())
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            last_execution: None,
            id_counter: 0,
            disabled: false,
            coalesce_window: Duration::from_millis(config.coalesce_window_ms),
            capacity: config.capacity,
        }
    }

    pub fn coalesce_window(&self) -> Duration {
        self.coalesce_window
    }

    pub fn set_coalesce_window(&mut self, window: Duration) {
        self.coalesce_window = window;
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// Label of the next command undo would reverse.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.command.label())
    }

    /// Label of the next command redo would re-apply.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.command.label())
    }

    /// Info of the top undo entry.
    pub fn last_info(&self) -> Option<CommandInfo> {
        self.undo_stack.last().map(HistoryEntry::info)
    }

    /// Try to absorb `incoming` into the top undo entry.
    ///
    /// Succeeds only when both commands are updatable, agree on kind, target,
    /// component and property, and `incoming` arrives within the coalescing
    /// window of the previous execution. On success the top entry takes over
    /// the incoming new value, the redo stack clears, and the merged entry's
    /// info is returned; the caller still executes (then drops) `incoming`.
    pub fn try_merge(&mut self, incoming: &dyn Command, now: Instant) -> Option<CommandInfo> {
        let within_window = self
            .last_execution
            .map(|at| now.duration_since(at) < self.coalesce_window)
            .unwrap_or(false);
        if !within_window {
            return None;
        }
        let last = self.undo_stack.last_mut()?;
        let compatible = last.command.updatable()
            && incoming.updatable()
            && last.command.kind() == incoming.kind()
            && last.command.target() == incoming.target()
            && last.command.component() == incoming.component()
            && last.command.property() == incoming.property();
        if !compatible {
            return None;
        }
        last.command.absorb(incoming);
        let info = last.info();
        self.redo_stack.clear();
        Some(info)
    }

    /// Push an executed command as a fresh entry with the next sequence
    /// number. Clears the redo stack and evicts the oldest entries beyond
    /// capacity.
    pub fn push(&mut self, command: Box<dyn Command>) -> CommandInfo {
        self.id_counter += 1;
        let entry = HistoryEntry {
            id: self.id_counter,
            command,
        };
        let info = entry.info();
        self.undo_stack.push(entry);
        self.redo_stack.clear();
        if let Some(capacity) = self.capacity {
            while self.undo_stack.len() > capacity {
                self.undo_stack.remove(0);
            }
        }
        info
    }

    /// Record when an execute happened, for the coalescing window.
    pub fn note_execution(&mut self, at: Instant) {
        self.last_execution = Some(at);
    }

    /// Replace the label of the top undo entry.
    pub fn relabel_last(&mut self, label: String) {
        if let Some(entry) = self.undo_stack.last_mut() {
            entry.command.set_label(label);
        }
    }

    /// Pop the entry undo would reverse next.
    pub fn pop_undo(&mut self) -> Option<HistoryEntry> {
        self.undo_stack.pop()
    }

    /// Pop the entry redo would re-apply next.
    pub fn pop_redo(&mut self) -> Option<HistoryEntry> {
        self.redo_stack.pop()
    }

    /// Return a redone entry to the undo stack, keeping its id.
    pub fn push_to_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);
    }

    /// Park an undone entry on the redo stack, keeping its id.
    pub fn push_to_redo(&mut self, entry: HistoryEntry) {
        self.redo_stack.push(entry);
    }

    /// Drop everything and reset the id counter. Nothing that lived on the
    /// stacks may be replayed afterward.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.id_counter = 0;
        self.last_execution = None;
    }
}
