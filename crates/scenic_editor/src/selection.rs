//! Selection management with multi-select support.
//!
//! Keeps an ordered multi-selection plus a primary entity (the one gizmos
//! and inspectors follow). Commands hand selection off as part of their
//! effect: create selects the new entity, remove selects the closest
//! sibling, clone selects the duplicate.

use scenic_dom::NodeId;

/// How an incoming selection interacts with the current one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// Replace current selection
    #[default]
    Replace,
    /// Add to current selection
    Add,
    /// Remove from current selection
    Remove,
    /// Toggle selection state
    Toggle,
}

/// Ordered entity selection with a primary entry.
#[derive(Clone, Debug, Default)]
pub struct SelectionManager {
    /// Currently selected entities, in selection order
    selected: Vec<NodeId>,
    /// Primary selected entity (last selected)
    primary: Option<NodeId>,
    /// Whether selection has changed since last checked
    dirty: bool,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The primary (last selected) entity.
    pub fn primary(&self) -> Option<&NodeId> {
        self.primary.as_ref()
    }

    /// All selected entities in selection order.
    pub fn selected(&self) -> &[NodeId] {
        &self.selected
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, id: &NodeId) -> bool {
        self.selected.contains(id)
    }

    pub fn is_primary(&self, id: &NodeId) -> bool {
        self.primary.as_ref() == Some(id)
    }

    /// Check and clear the dirty flag.
    pub fn take_dirty(&mut self) -> bool {
        let was_dirty = self.dirty;
        self.dirty = false;
        was_dirty
    }

    /// Select an entity with the given mode.
    pub fn select(&mut self, id: NodeId, mode: SelectionMode) {
        match mode {
            SelectionMode::Replace => {
                self.selected.clear();
                self.selected.push(id.clone());
                self.primary = Some(id);
            }
            SelectionMode::Add => {
                if !self.selected.contains(&id) {
                    self.selected.push(id.clone());
                }
                self.primary = Some(id);
            }
            SelectionMode::Remove => {
                self.selected.retain(|e| *e != id);
                if self.primary.as_ref() == Some(&id) {
                    self.primary = self.selected.last().cloned();
                }
            }
            SelectionMode::Toggle => {
                if self.selected.contains(&id) {
                    self.select(id, SelectionMode::Remove);
                    return;
                }
                self.select(id, SelectionMode::Add);
                return;
            }
        }
        self.dirty = true;
    }

    /// Clear all selection.
    pub fn clear(&mut self) {
        if !self.selected.is_empty() {
            self.selected.clear();
            self.primary = None;
            self.dirty = true;
        }
    }

    /// Drop an entity from the selection, e.g. when it leaves the tree.
    pub fn remove(&mut self, id: &NodeId) {
        if self.selected.contains(id) {
            self.select(id.clone(), SelectionMode::Remove);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> NodeId {
        NodeId::new(s).unwrap()
    }

    #[test]
    fn test_selection_replace() {
        let mut sel = SelectionManager::new();
        sel.select(id("a"), SelectionMode::Replace);
        sel.select(id("b"), SelectionMode::Replace);

        assert_eq!(sel.count(), 1);
        assert!(sel.is_selected(&id("b")));
        assert!(!sel.is_selected(&id("a")));
    }

    #[test]
    fn test_selection_add_keeps_order_and_primary() {
        let mut sel = SelectionManager::new();
        sel.select(id("a"), SelectionMode::Replace);
        sel.select(id("b"), SelectionMode::Add);

        assert_eq!(sel.selected(), &[id("a"), id("b")]);
        assert!(sel.is_primary(&id("b")));
    }

    #[test]
    fn test_selection_toggle() {
        let mut sel = SelectionManager::new();
        sel.select(id("a"), SelectionMode::Replace);
        sel.select(id("a"), SelectionMode::Toggle);

        assert!(sel.is_empty());
        assert_eq!(sel.primary(), None);
    }

    #[test]
    fn test_remove_falls_back_to_previous_primary() {
        let mut sel = SelectionManager::new();
        sel.select(id("a"), SelectionMode::Replace);
        sel.select(id("b"), SelectionMode::Add);
        sel.remove(&id("b"));

        assert!(sel.is_primary(&id("a")));
        assert!(sel.take_dirty());
        assert!(!sel.take_dirty());
    }
}
