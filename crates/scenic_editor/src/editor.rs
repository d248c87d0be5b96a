//! The editor state container.
//!
//! Owns the scene, selection, history, event channel, and the load-waiter
//! table that gives commands their asynchronous completion. Everything is
//! single-threaded and cooperative: the only suspension point is the one-shot
//! load event a node fires after (re)creation, which the host delivers by
//! pumping [`Editor::complete_loads`] or [`Editor::settle`].

use crate::commands::registry::CommandRegistry;
use crate::commands::{
    Command, CommandInfo, CommandResult, Continuation, MultiCommand,
};
use crate::config::EditorConfig;
use crate::events::{EditorEvent, EventChannel};
use crate::history::History;
use crate::selection::SelectionManager;
use scenic_dom::{NodeId, Scene, Value};
use std::time::Instant;

pub struct Editor {
    pub scene: Scene,
    pub selection: SelectionManager,
    pub history: History,
    pub events: EventChannel,
    registry: CommandRegistry,
    /// One-shot closures waiting on a node's load event, in registration
    /// order.
    waiters: Vec<(NodeId, Continuation)>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        Self::with_config(&EditorConfig::default())
    }

    pub fn with_config(config: &EditorConfig) -> Self {
        Self {
            scene: Scene::new(),
            selection: SelectionManager::new(),
            history: History::from_config(&config.history),
            events: EventChannel::new(),
            registry: CommandRegistry::core(),
            waiters: Vec::new(),
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Hosts register additional command kinds here.
    pub fn registry_mut(&mut self) -> &mut CommandRegistry {
        &mut self.registry
    }

    // ------------------------------------------------------------------
    // Execute / undo / redo
    // ------------------------------------------------------------------

    /// Execute a command and record it on the undo stack, or absorb it into
    /// the top entry when it coalesces. Returns the effective entry's info.
    /// A command whose execute fails is not recorded; its info comes back
    /// with id 0.
    pub fn execute(&mut self, command: Box<dyn Command>) -> CommandInfo {
        self.execute_inner(command, None)
    }

    /// Like [`Editor::execute`], overriding the effective entry's label.
    pub fn execute_named(
        &mut self,
        command: Box<dyn Command>,
        label: impl Into<String>,
    ) -> CommandInfo {
        self.execute_inner(command, Some(label.into()))
    }

    fn execute_inner(
        &mut self,
        mut command: Box<dyn Command>,
        label: Option<String>,
    ) -> CommandInfo {
        let now = Instant::now();
        let merged = self.history.try_merge(command.as_ref(), now);
        let info = match merged {
            Some(mut info) => {
                if let Some(label) = label {
                    self.history.relabel_last(label.clone());
                    info.label = label;
                }
                // The incoming command still executes; it is then dropped
                // because the absorbing entry already records the span.
                if let Err(e) = command.execute(self, None) {
                    log::error!("{} failed: {}", info.kind, e);
                }
                info
            }
            None => {
                if let Some(label) = label {
                    command.set_label(label);
                }
                match command.execute(self, None) {
                    Ok(()) => self.history.push(command),
                    Err(e) => {
                        // Nothing to undo, so the entry is not recorded and
                        // the coalescing window stays closed.
                        log::error!("{} failed: {}", command.kind(), e);
                        return CommandInfo {
                            id: 0,
                            kind: command.kind(),
                            label: command.label().to_string(),
                            target: command.target().cloned(),
                        };
                    }
                }
            }
        };
        self.history.note_execution(now);
        self.events.send(EditorEvent::HistoryChanged {
            command: Some(info.clone()),
        });
        info
    }

    /// Reverse the most recent command. Returns its info, or `None` when the
    /// stack is empty or the history is disabled.
    pub fn undo(&mut self) -> Option<CommandInfo> {
        if self.history.is_disabled() {
            log::warn!("history is disabled; undo ignored");
            return None;
        }
        let mut entry = self.history.pop_undo()?;
        if let Err(e) = entry.command.undo(self, None) {
            log::error!("undo of {} failed: {}", entry.command.kind(), e);
        }
        let info = entry.info();
        self.history.push_to_redo(entry);
        self.events.send(EditorEvent::HistoryChanged {
            command: Some(info.clone()),
        });
        Some(info)
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Option<CommandInfo> {
        if self.history.is_disabled() {
            log::warn!("history is disabled; redo ignored");
            return None;
        }
        let mut entry = self.history.pop_redo()?;
        if let Err(e) = entry.command.execute(self, None) {
            log::error!("redo of {} failed: {}", entry.command.kind(), e);
        }
        let info = entry.info();
        self.history.push_to_undo(entry);
        self.events.send(EditorEvent::HistoryChanged {
            command: Some(info.clone()),
        });
        Some(info)
    }

    /// Drop the whole history, e.g. when switching documents.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.events
            .send(EditorEvent::HistoryChanged { command: None });
    }

    /// Build a command through the registry and execute it.
    pub fn execute_spec(&mut self, kind: &str, payload: &Value) -> CommandResult<CommandInfo> {
        let command = self.registry.resolve(&self.scene, kind, payload)?;
        Ok(self.execute(command))
    }

    /// Build and execute an ordered batch of `(kind, payload)` pairs as one
    /// undoable unit. `on_complete` runs after the last member settles.
    pub fn execute_multi(
        &mut self,
        specs: &[(String, Value)],
        on_complete: Option<Continuation>,
    ) -> CommandResult<CommandInfo> {
        let multi = MultiCommand::from_specs(&self.registry, &self.scene, specs, on_complete)?;
        Ok(self.execute(Box::new(multi)))
    }

    // ------------------------------------------------------------------
    // Load pump
    // ------------------------------------------------------------------

    /// Register a one-shot closure to run once `id` finishes loading. Fires
    /// immediately when the node is already loaded; a waiter whose node
    /// never loads (or is removed first) never runs.
    pub fn on_loaded(&mut self, id: NodeId, continuation: Continuation) {
        match self.scene.get(&id) {
            Some(node) if node.is_loaded() => continuation(self),
            Some(_) => self.waiters.push((id, continuation)),
            None => log::debug!("on_loaded: {} not found, dropping waiter", id),
        }
    }

    /// Deliver pending load events, running waiters in registration order.
    /// Returns how many waiters ran.
    pub fn complete_loads(&mut self) -> usize {
        self.waiters.retain(|(id, _)| self.scene.contains(id));
        self.scene.take_pending_loads();
        let mut fired = 0;
        // Waiters may queue more work; re-scan until none are ready.
        while let Some(at) = self.waiters.iter().position(|(id, _)| {
            self.scene.get(id).map(|n| n.is_loaded()).unwrap_or(false)
        }) {
            let (_, continuation) = self.waiters.remove(at);
            continuation(self);
            fired += 1;
        }
        fired
    }

    /// Pump loads until nothing is pending.
    pub fn settle(&mut self) {
        while self.scene.has_pending_loads() {
            self.complete_loads();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_dom::NodeDefinition;

    #[test]
    fn test_on_loaded_fires_after_pump() {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let id = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();

        let target = id.clone();
        editor.on_loaded(id.clone(), Box::new(move |ed| {
            ed.events.send(EditorEvent::EntityCreated { entity: target });
        }));
        assert!(editor.events.is_empty());

        assert_eq!(editor.complete_loads(), 1);
        assert_eq!(editor.events.drain().len(), 1);

        // Already loaded: fires synchronously.
        editor.on_loaded(id, Box::new(|ed| {
            ed.selection.clear();
        }));
        assert_eq!(editor.complete_loads(), 0);
    }

    #[test]
    fn test_failed_execute_is_not_recorded() {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        editor
            .scene
            .create_from_definition(&NodeDefinition::element("box").with_id("taken"), &root, None)
            .unwrap();
        editor.settle();

        let info = editor.execute(Box::new(crate::commands::EntityCreate::new(
            NodeDefinition::element("box").with_id("taken"),
            None,
        )));
        assert_eq!(info.id, 0);
        assert_eq!(editor.history.undo_count(), 0);
        assert!(editor.undo().is_none());
        assert!(editor.events.is_empty());
    }

    #[test]
    fn test_waiter_for_removed_node_never_runs() {
        let mut editor = Editor::new();
        let root = editor.scene.root().clone();
        let id = editor
            .scene
            .create_from_definition(&NodeDefinition::element("box"), &root, None)
            .unwrap();
        editor.on_loaded(id.clone(), Box::new(|ed| {
            ed.events.send(EditorEvent::HistoryChanged { command: None });
        }));
        editor.scene.remove_subtree(&id);

        assert_eq!(editor.complete_loads(), 0);
        assert!(editor.events.is_empty());
    }
}
