//! Notification bus between the editor core and its hosts.
//!
//! The core pushes events onto a channel that external layers (inspector
//! panels, outliners, renderers) drain on their own schedule. The core never
//! reads UI state back; the bus is strictly outbound.

use crate::commands::CommandInfo;
use scenic_dom::NodeId;
use std::collections::VecDeque;

/// Everything the editor core announces to the outside world.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// A component attribute appeared on an entity.
    ComponentAdd { entity: NodeId, component: String },
    /// A component attribute was removed from an entity.
    ComponentRemove { entity: NodeId, component: String },
    /// An entity finished loading into the tree.
    EntityCreated { entity: NodeId },
    /// An entity left the tree.
    EntityRemoved { entity: NodeId },
    /// A duplicate of an entity finished loading.
    EntityClone { entity: NodeId },
    /// An attribute, component, or property changed on an entity.
    EntityUpdate {
        entity: NodeId,
        component: String,
        property: Option<String>,
    },
    /// The undo/redo stacks changed shape. Carries the effective command,
    /// or `None` after a history clear.
    HistoryChanged { command: Option<CommandInfo> },
}

impl EditorEvent {
    /// Stable discriminator string, matching the command kinds where the
    /// event mirrors one.
    pub fn kind(&self) -> &'static str {
        match self {
            EditorEvent::ComponentAdd { .. } => "componentadd",
            EditorEvent::ComponentRemove { .. } => "componentremove",
            EditorEvent::EntityCreated { .. } => "entitycreated",
            EditorEvent::EntityRemoved { .. } => "entityremoved",
            EditorEvent::EntityClone { .. } => "entityclone",
            EditorEvent::EntityUpdate { .. } => "entityupdate",
            EditorEvent::HistoryChanged { .. } => "historychanged",
        }
    }
}

/// FIFO queue of pending editor events.
#[derive(Debug, Default)]
pub struct EventChannel {
    queue: VecDeque<EditorEvent>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, event: EditorEvent) {
        log::debug!("event: {}", event.kind());
        self.queue.push_back(event);
    }

    /// Take every queued event, oldest first.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
