//! Kind-string → command-constructor registry.
//!
//! The registry is injectable state, never a module-level singleton: hosts
//! build one (or start from [`CommandRegistry::core`]) and hand it to the
//! editor, so external command kinds compose with [`super::MultiCommand`]
//! without touching the composer.

use crate::commands::{
    AddComponent, Command, CommandError, CommandResult, EntityClone, EntityCreate, EntityRemove,
    EntityRename, EntityReparent, EntityUpdate, RemoveComponent,
};
use scenic_dom::{NodeDefinition, NodeId, Scene, Value};
use std::collections::BTreeMap;

/// Builds a command from a payload, capturing undo state from the scene.
pub type CommandConstructor = Box<dyn Fn(&Scene, &Value) -> CommandResult<Box<dyn Command>>>;

#[derive(Default)]
pub struct CommandRegistry {
    constructors: BTreeMap<String, CommandConstructor>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in command kinds.
    pub fn core() -> Self {
        let mut registry = Self::new();
        registry.register("entityupdate", |scene, payload| {
            let target = required_id(payload, "entity", "entityupdate")?;
            let component = required_str(payload, "component", "entityupdate")?;
            let property = payload.get("property").and_then(Value::as_str);
            let value = payload.get("value").cloned().unwrap_or(Value::Null);
            Ok(Box::new(EntityUpdate::new(
                scene, target, &component, property, value,
            )))
        });
        registry.register("componentadd", |_scene, payload| {
            let target = required_id(payload, "entity", "componentadd")?;
            let component = required_str(payload, "component", "componentadd")?;
            let value = payload.get("value").cloned().unwrap_or_else(Value::object);
            Ok(Box::new(AddComponent::new(target, &component, value)))
        });
        registry.register("componentremove", |scene, payload| {
            let target = required_id(payload, "entity", "componentremove")?;
            let component = required_str(payload, "component", "componentremove")?;
            Ok(Box::new(RemoveComponent::new(scene, target, &component)))
        });
        registry.register("entitycreate", |_scene, payload| {
            let parent = optional_id(payload, "parent", "entitycreate")?;
            let definition = match payload.get("definition") {
                Some(definition) => NodeDefinition::from_value(definition)?,
                None => {
                    // Inline form: the payload itself is the definition,
                    // minus the parent key.
                    let mut inline = payload.clone();
                    if let Some(map) = inline.as_object_mut() {
                        map.remove("parent");
                    }
                    NodeDefinition::from_value(&inline)?
                }
            };
            Ok(Box::new(EntityCreate::new(definition, parent)))
        });
        registry.register("entityremove", |scene, payload| {
            let target = required_id(payload, "entity", "entityremove")?;
            Ok(Box::new(EntityRemove::new(scene, target)))
        });
        registry.register("entityclone", |_scene, payload| {
            let target = required_id(payload, "entity", "entityclone")?;
            Ok(Box::new(EntityClone::new(target)))
        });
        registry.register("entityrename", |_scene, payload| {
            let target = required_id(payload, "entity", "entityrename")?;
            let name = required_str(payload, "name", "entityrename")?;
            Ok(Box::new(EntityRename::new(target, name)))
        });
        registry.register("entityreparent", |scene, payload| {
            let target = required_id(payload, "entity", "entityreparent")?;
            let parent = required_id(payload, "parent", "entityreparent")?;
            let index = payload
                .get("index")
                .and_then(Value::as_int)
                .map(|i| i.max(0) as usize);
            Ok(Box::new(EntityReparent::new(scene, target, parent, index)))
        });
        registry
    }

    /// Register (or replace) a constructor for a kind.
    pub fn register(
        &mut self,
        kind: impl Into<String>,
        constructor: impl Fn(&Scene, &Value) -> CommandResult<Box<dyn Command>> + 'static,
    ) {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Build a command for `kind` from `payload`.
    pub fn resolve(
        &self,
        scene: &Scene,
        kind: &str,
        payload: &Value,
    ) -> CommandResult<Box<dyn Command>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| CommandError::UnknownKind(kind.to_string()))?;
        constructor(scene, payload)
    }
}

fn required_str(payload: &Value, key: &str, kind: &str) -> CommandResult<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CommandError::Payload {
            kind: kind.to_string(),
            reason: format!("missing string field {:?}", key),
        })
}

fn required_id(payload: &Value, key: &str, kind: &str) -> CommandResult<NodeId> {
    let raw = required_str(payload, key, kind)?;
    NodeId::new(raw).map_err(|e| CommandError::Payload {
        kind: kind.to_string(),
        reason: e.to_string(),
    })
}

fn optional_id(payload: &Value, key: &str, kind: &str) -> CommandResult<Option<NodeId>> {
    match payload.get(key) {
        None => Ok(None),
        Some(_) => required_id(payload, key, kind).map(Some),
    }
}
