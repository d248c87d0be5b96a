//! The scene arena: stable-id node storage and all tree mutation.
//!
//! `Scene` is the single owner of live nodes. Everything else (commands, the
//! serializer, the transform solver) addresses nodes by [`NodeId`] and
//! re-resolves on every use, because create/remove/reparent cycles destroy and
//! recreate the underlying node. Mutation that touches both the authored
//! attribute form and the live component data goes through the methods here so
//! the two stay in sync.

use crate::component::ComponentState;
use crate::error::{DomError, Result};
use crate::id::{IdAllocator, NodeId};
use crate::implicit;
use crate::mixin::MixinRegistry;
use crate::node::{Node, NodeDefinition, NodeSnapshot};
use crate::primitive::PrimitiveRegistry;
use crate::schema::ComponentSchema;
use crate::value::Value;
use crate::component::ComponentRegistry;
use std::collections::BTreeMap;

/// Outcome of the two-level schema lookup for an attribute name.
///
/// The live component instance's schema wins (it reflects runtime schema
/// augmentation), the global class schema is the fallback, and names known to
/// neither carry raw attribute semantics (`id`, `class`, `mixin`, `data-*`).
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaLookup {
    Found(ComponentSchema),
    RawAttribute,
}

impl SchemaLookup {
    pub fn schema(&self) -> Option<&ComponentSchema> {
        match self {
            SchemaLookup::Found(schema) => Some(schema),
            SchemaLookup::RawAttribute => None,
        }
    }
}

/// The live entity tree plus the registries implicit resolution draws from.
#[derive(Debug, Clone)]
pub struct Scene {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
    components: ComponentRegistry,
    primitives: PrimitiveRegistry,
    mixins: MixinRegistry,
    ids: IdAllocator,
    /// Nodes inserted but not yet signalled loaded, in insertion order.
    pending_loads: Vec<NodeId>,
}

impl Scene {
    /// An empty scene holding only the root node.
    pub fn new() -> Self {
        let root = NodeId::unchecked("scene");
        let mut root_node = Node::new(root.clone(), "scene");
        root_node.loaded = true;
        root_node.attributes.insert("id".into(), root.to_string());
        let mut nodes = BTreeMap::new();
        nodes.insert(root.clone(), root_node);
        Self {
            nodes,
            root,
            components: ComponentRegistry::core(),
            primitives: PrimitiveRegistry::core(),
            mixins: MixinRegistry::new(),
            ids: IdAllocator::new(),
            pending_loads: Vec::new(),
        }
    }

    pub fn root(&self) -> &NodeId {
        &self.root
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes.keys()
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    pub fn primitives(&self) -> &PrimitiveRegistry {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut PrimitiveRegistry {
        &mut self.primitives
    }

    pub fn mixins(&self) -> &MixinRegistry {
        &self.mixins
    }

    pub fn mixins_mut(&mut self) -> &mut MixinRegistry {
        &mut self.mixins
    }

    /// Allocate a fresh id that collides with nothing in the arena.
    pub fn allocate_id(&mut self, stem: &str) -> NodeId {
        let nodes = &self.nodes;
        self.ids.allocate(stem, |candidate| nodes.contains_key(candidate))
    }

    /// Two-level schema resolution for an attribute name on a node.
    pub fn schema_lookup(&self, id: &NodeId, name: &str) -> SchemaLookup {
        if let Some(state) = self.nodes.get(id).and_then(|n| n.component(name)) {
            return SchemaLookup::Found(state.schema.clone());
        }
        match self.components.schema(name) {
            Some(schema) => SchemaLookup::Found(schema.clone()),
            None => SchemaLookup::RawAttribute,
        }
    }

    // ------------------------------------------------------------------
    // Creation and hierarchy surgery
    // ------------------------------------------------------------------

    /// Build a node from a declarative definition and insert it under
    /// `parent` (append, or at `index` when given). The node starts pending
    /// its one-shot load event.
    pub fn create_from_definition(
        &mut self,
        def: &NodeDefinition,
        parent: &NodeId,
        index: Option<usize>,
    ) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(DomError::NodeNotFound(parent.to_string()));
        }
        let element = def.element.clone().unwrap_or_else(|| "entity".to_string());
        let id = match &def.id {
            Some(authored) => {
                let id = NodeId::new(authored.clone())?;
                if self.nodes.contains_key(&id) {
                    return Err(DomError::DuplicateId(id.to_string()));
                }
                id
            }
            None => self.allocate_id(&element),
        };

        let mut node = Node::new(id.clone(), element);
        node.attributes.insert("id".into(), id.to_string());
        if let Some(class) = &def.class {
            node.attributes.insert("class".into(), class.clone());
        }
        if let Some(mixin) = &def.mixin {
            node.attributes.insert("mixin".into(), mixin.clone());
        }
        for (name, value) in &def.data {
            node.attributes.insert(name.clone(), value.clone());
        }
        self.nodes.insert(id.clone(), node);
        self.attach(parent, &id, index);
        self.pending_loads.push(id.clone());

        for (name, value) in &def.components {
            self.set_component(&id, name, value.clone());
        }
        Ok(id)
    }

    /// Recreate a detached snapshot as live nodes under `parent`.
    ///
    /// The subtree root lands at `index`; descendants append in snapshot
    /// order. Every recreated node starts pending its load event.
    pub fn instantiate_snapshot(
        &mut self,
        snapshot: &NodeSnapshot,
        parent: &NodeId,
        index: Option<usize>,
    ) -> Result<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(DomError::NodeNotFound(parent.to_string()));
        }
        let id = match snapshot.id() {
            Some(authored) => {
                let id = NodeId::new(authored.to_string())?;
                if self.nodes.contains_key(&id) {
                    return Err(DomError::DuplicateId(id.to_string()));
                }
                id
            }
            None => self.allocate_id(&snapshot.element),
        };

        let mut node = Node::new(id.clone(), snapshot.element.clone());
        node.attributes.insert("id".into(), id.to_string());
        self.nodes.insert(id.clone(), node);
        self.attach(parent, &id, index);
        self.pending_loads.push(id.clone());

        for (name, value) in &snapshot.attributes {
            if name != "id" {
                self.set_attribute(&id, name, value);
            }
        }
        for child in &snapshot.children {
            self.instantiate_snapshot(child, &id, None)?;
        }
        Ok(id)
    }

    fn attach(&mut self, parent: &NodeId, child: &NodeId, index: Option<usize>) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.clone());
        }
        if let Some(parent_node) = self.nodes.get_mut(parent) {
            let at = index
                .unwrap_or(parent_node.children.len())
                .min(parent_node.children.len());
            parent_node.children.insert(at, child.clone());
        }
    }

    /// Remove a node and all descendants from the arena. The root cannot be
    /// removed; a missing id is a no-op. Returns whether anything was removed.
    pub fn remove_subtree(&mut self, id: &NodeId) -> bool {
        if *id == self.root {
            log::debug!("ignoring removal of the scene root");
            return false;
        }
        let Some(node) = self.nodes.get(id) else {
            log::debug!("remove_subtree: {} not found", id);
            return false;
        };
        let parent = node.parent.clone();
        let mut doomed = Vec::new();
        self.collect_subtree(id, &mut doomed);
        for victim in &doomed {
            self.nodes.remove(victim);
            self.pending_loads.retain(|p| p != victim);
        }
        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                parent_node.children.retain(|c| c != id);
            }
        }
        true
    }

    fn collect_subtree(&self, id: &NodeId, out: &mut Vec<NodeId>) {
        out.push(id.clone());
        if let Some(node) = self.nodes.get(id) {
            for child in &node.children {
                self.collect_subtree(child, out);
            }
        }
    }

    /// Position of a node within its parent's child list.
    pub fn index_in_parent(&self, id: &NodeId) -> Option<usize> {
        let parent = self.nodes.get(id)?.parent.as_ref()?;
        self.nodes
            .get(parent)?
            .children
            .iter()
            .position(|c| c == id)
    }

    /// The sibling selection falls back to when a node goes away: the next
    /// sibling if there is one, else the previous.
    pub fn closest_sibling(&self, id: &NodeId) -> Option<NodeId> {
        let parent = self.nodes.get(id)?.parent.as_ref()?;
        let children = &self.nodes.get(parent)?.children;
        let index = children.iter().position(|c| c == id)?;
        children
            .get(index + 1)
            .or_else(|| index.checked_sub(1).and_then(|i| children.get(i)))
            .cloned()
    }

    /// Give a node a new id, rekeying the arena and every reference to it.
    pub fn rename_node(&mut self, old: &NodeId, new: &str) -> Result<NodeId> {
        let new_id = NodeId::new(new.to_string())?;
        if new_id == *old {
            return Ok(new_id);
        }
        if self.nodes.contains_key(&new_id) {
            return Err(DomError::DuplicateId(new_id.to_string()));
        }
        let Some(mut node) = self.nodes.remove(old) else {
            return Err(DomError::NodeNotFound(old.to_string()));
        };
        node.id = new_id.clone();
        node.attributes.insert("id".into(), new_id.to_string());
        let parent = node.parent.clone();
        let children = node.children.clone();
        self.nodes.insert(new_id.clone(), node);

        if let Some(parent) = parent {
            if let Some(parent_node) = self.nodes.get_mut(&parent) {
                for slot in &mut parent_node.children {
                    if slot == old {
                        *slot = new_id.clone();
                    }
                }
            }
        }
        for child in children {
            if let Some(child_node) = self.nodes.get_mut(&child) {
                child_node.parent = Some(new_id.clone());
            }
        }
        for slot in &mut self.pending_loads {
            if slot == old {
                *slot = new_id.clone();
            }
        }
        if self.root == *old {
            self.root = new_id.clone();
        }
        Ok(new_id)
    }

    // ------------------------------------------------------------------
    // Attribute and component mutation
    // ------------------------------------------------------------------

    /// Set an authored attribute, keeping live component data in sync.
    ///
    /// Component names parse through their schema into live data; `id` rekeys
    /// the node; a change to `mixin` refreshes every live component against
    /// the new implicit values. Returns false when the node is missing.
    pub fn set_attribute(&mut self, id: &NodeId, name: &str, value: &str) -> bool {
        if !self.nodes.contains_key(id) {
            log::debug!("set_attribute: {} not found", id);
            return false;
        }
        if name == "id" {
            return match self.rename_node(id, value) {
                Ok(_) => true,
                Err(e) => {
                    log::debug!("rename of {} failed: {}", id, e);
                    false
                }
            };
        }
        match self.schema_lookup(id, name) {
            SchemaLookup::Found(schema) => {
                let authored = schema.parse(value);
                let data = self.overlay_implicit(id, name, &schema, &authored);
                if let Some(node) = self.nodes.get_mut(id) {
                    node.attributes.insert(name.to_string(), value.to_string());
                    node.components
                        .insert(name.to_string(), ComponentState::with_data(schema, data));
                }
            }
            SchemaLookup::RawAttribute => {
                if let Some(node) = self.nodes.get_mut(id) {
                    node.attributes.insert(name.to_string(), value.to_string());
                }
                if name == "mixin" {
                    self.refresh_mixins(id);
                }
            }
        }
        true
    }

    /// Remove an authored attribute and any matching live component.
    pub fn remove_attribute(&mut self, id: &NodeId, name: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            log::debug!("remove_attribute: {} not found", id);
            return false;
        };
        let had = node.attributes.remove(name).is_some() | node.components.remove(name).is_some();
        if name == "mixin" && had {
            self.refresh_mixins(id);
        }
        had
    }

    pub fn attribute(&self, id: &NodeId, name: &str) -> Option<&str> {
        self.nodes.get(id)?.attribute(name)
    }

    /// Set a whole component's data. Typed values are taken as the authored
    /// data; string values parse through the schema first. Unknown component
    /// names degrade to raw attributes.
    pub fn set_component(&mut self, id: &NodeId, name: &str, value: Value) -> bool {
        if !self.nodes.contains_key(id) {
            log::debug!("set_component: {} not found", id);
            return false;
        }
        match self.schema_lookup(id, name) {
            SchemaLookup::Found(schema) => {
                let authored = match &value {
                    Value::String(s) => schema.parse(s),
                    other => other.clone(),
                };
                let canonical = schema.stringify(&authored);
                let data = self.overlay_implicit(id, name, &schema, &authored);
                if let Some(node) = self.nodes.get_mut(id) {
                    node.attributes.insert(name.to_string(), canonical);
                    node.components
                        .insert(name.to_string(), ComponentState::with_data(schema, data));
                }
                true
            }
            SchemaLookup::RawAttribute => self.set_attribute(id, name, &value.to_string()),
        }
    }

    /// Set one property of a map component, creating the live component from
    /// implicit values if it does not exist yet. The authored attribute keeps
    /// only the properties actually authored.
    pub fn set_component_property(
        &mut self,
        id: &NodeId,
        component: &str,
        property: &str,
        value: Value,
    ) -> bool {
        if !self.nodes.contains_key(id) {
            log::debug!("set_component_property: {} not found", id);
            return false;
        }
        let SchemaLookup::Found(schema) = self.schema_lookup(id, component) else {
            log::debug!("{} has no schema, cannot set property {}", component, property);
            return false;
        };
        if schema.is_single() {
            return self.set_component(id, component, value);
        }
        let typed = match (&value, schema.descriptor(Some(property))) {
            (Value::String(s), Some(d)) => d.parse(s).unwrap_or(value.clone()),
            _ => value.clone(),
        };

        // Authored partial map: existing attribute plus this property.
        let mut authored = self
            .nodes
            .get(id)
            .and_then(|n| n.attribute(component))
            .map(|attr| schema.parse(attr))
            .unwrap_or_else(Value::object);
        authored.set(property, typed.clone());
        let canonical = schema.stringify(&authored);

        let data = self.overlay_implicit(id, component, &schema, &authored);
        if let Some(node) = self.nodes.get_mut(id) {
            node.attributes.insert(component.to_string(), canonical);
            node.components
                .insert(component.to_string(), ComponentState::with_data(schema, data));
        }
        true
    }

    /// Live component data for a node.
    pub fn component_data(&self, id: &NodeId, name: &str) -> Option<&Value> {
        self.nodes.get(id)?.component(name).map(|c| &c.data)
    }

    /// The value a component/property actually carries right now: live data
    /// first, then the parsed authored attribute. `None` means nothing
    /// explicit exists and the implicit chain governs.
    pub fn actual_value(&self, id: &NodeId, component: &str, property: Option<&str>) -> Option<Value> {
        let node = self.nodes.get(id)?;
        if let Some(state) = node.component(component) {
            return match property {
                Some(prop) => state.data.get(prop).cloned(),
                None => Some(state.data.clone()),
            };
        }
        let attr = node.attribute(component)?;
        match self.schema_lookup(id, component) {
            SchemaLookup::Found(schema) => {
                let parsed = schema.parse(attr);
                match property {
                    Some(prop) => parsed.get(prop).cloned(),
                    None => Some(parsed),
                }
            }
            SchemaLookup::RawAttribute => match property {
                Some(_) => None,
                None => Some(Value::String(attr.to_string())),
            },
        }
    }

    /// Full component data: implicit values overlaid with the authored part.
    fn overlay_implicit(
        &self,
        id: &NodeId,
        component: &str,
        schema: &ComponentSchema,
        authored: &Value,
    ) -> Value {
        match schema {
            ComponentSchema::Single(_) => authored.clone(),
            ComponentSchema::Map(_) => {
                let mut data = implicit::implicit_value(self, id, component, None)
                    .unwrap_or_else(|| schema.default_value());
                if let Some(map) = authored.as_object() {
                    for (key, value) in map {
                        data.set(key.clone(), value.clone());
                    }
                }
                data
            }
        }
    }

    /// Rebuild live component data after a mixin transition. Authored
    /// attribute values stay authoritative; only the implicit floor moves.
    pub fn refresh_mixins(&mut self, id: &NodeId) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        let names: Vec<String> = node.component_names().map(str::to_string).collect();
        for name in names {
            let Some(state) = self.nodes.get(id).and_then(|n| n.component(&name)) else {
                continue;
            };
            let schema = state.schema.clone();
            let authored = self
                .nodes
                .get(id)
                .and_then(|n| n.attribute(&name))
                .map(|attr| schema.parse(attr))
                .unwrap_or_else(Value::object);
            let data = self.overlay_implicit(id, &name, &schema, &authored);
            if let Some(state) = self.nodes.get_mut(id).and_then(|n| n.component_mut(&name)) {
                state.data = data;
            }
        }
    }

    /// Write live component data back into the authored attributes.
    ///
    /// Single-value components overwrite their attribute; map components
    /// update only the properties already authored, so minimal attributes
    /// stay minimal.
    pub fn flush_node(&mut self, id: &NodeId) -> bool {
        let Some(node) = self.nodes.get(id) else {
            return false;
        };
        let mut updates = Vec::new();
        for (name, state) in &node.components {
            match &state.schema {
                ComponentSchema::Single(_) => {
                    updates.push((name.clone(), state.schema.stringify(&state.data)));
                }
                ComponentSchema::Map(_) => {
                    let Some(attr) = node.attribute(name) else {
                        continue;
                    };
                    let mut authored = state.schema.parse(attr);
                    let keys: Vec<String> = authored
                        .as_object()
                        .map(|m| m.keys().cloned().collect())
                        .unwrap_or_default();
                    for key in keys {
                        if let Some(live) = state.data.get(&key) {
                            authored.set(key, live.clone());
                        }
                    }
                    updates.push((name.clone(), state.schema.stringify(&authored)));
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            for (name, value) in updates {
                node.attributes.insert(name, value);
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------

    /// Export a subtree as a detached, full-fidelity snapshot.
    ///
    /// Component attributes are refreshed from live data the same way
    /// [`flush_node`](Self::flush_node) would write them, without mutating the
    /// live tree. Instantiating the snapshot reproduces the subtree exactly.
    pub fn export_subtree(&self, id: &NodeId) -> Option<NodeSnapshot> {
        let node = self.nodes.get(id)?;
        let mut snapshot = NodeSnapshot::new(node.element.clone());
        snapshot.attributes = node.attributes.clone();
        for (name, state) in &node.components {
            match &state.schema {
                ComponentSchema::Single(_) => {
                    snapshot
                        .attributes
                        .insert(name.clone(), state.schema.stringify(&state.data));
                }
                ComponentSchema::Map(_) => {
                    let Some(attr) = node.attribute(name) else {
                        continue;
                    };
                    let mut authored = state.schema.parse(attr);
                    let keys: Vec<String> = authored
                        .as_object()
                        .map(|m| m.keys().cloned().collect())
                        .unwrap_or_default();
                    for key in keys {
                        if let Some(live) = state.data.get(&key) {
                            authored.set(key, live.clone());
                        }
                    }
                    snapshot
                        .attributes
                        .insert(name.clone(), state.schema.stringify(&authored));
                }
            }
        }
        for child in &node.children {
            if let Some(child_snapshot) = self.export_subtree(child) {
                snapshot.children.push(child_snapshot);
            }
        }
        Some(snapshot)
    }

    // ------------------------------------------------------------------
    // Load and pause bookkeeping
    // ------------------------------------------------------------------

    /// Drain the nodes currently awaiting their load event, marking each
    /// loaded. Insertion order is preserved.
    pub fn take_pending_loads(&mut self) -> Vec<NodeId> {
        let pending = std::mem::take(&mut self.pending_loads);
        for id in &pending {
            if let Some(node) = self.nodes.get_mut(id) {
                node.loaded = true;
            }
        }
        pending
    }

    pub fn has_pending_loads(&self) -> bool {
        !self.pending_loads.is_empty()
    }

    pub fn pause(&mut self, id: &NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.paused = true;
        }
    }

    pub fn play(&mut self, id: &NodeId) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.paused = false;
        }
    }

    /// Drop every node except the root and reset load bookkeeping. Used when
    /// switching documents.
    pub fn clear(&mut self) {
        let root_node = self.nodes.remove(&self.root);
        self.nodes.clear();
        self.pending_loads.clear();
        if let Some(mut root_node) = root_node {
            root_node.children.clear();
            self.nodes.insert(self.root.clone(), root_node);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
