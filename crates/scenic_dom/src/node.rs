//! Scene tree nodes and their detached plain representations.

use crate::component::ComponentState;
use crate::error::{DomError, Result};
use crate::id::NodeId;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A live node in the scene tree.
///
/// Mutation goes through [`Scene`](crate::Scene) so authored attributes and
/// live component data stay in sync; the node itself only exposes reads plus
/// direct component access for runtime schema augmentation.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) element: String,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) components: BTreeMap<String, ComponentState>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) loaded: bool,
    pub(crate) paused: bool,
}

impl Node {
    pub(crate) fn new(id: NodeId, element: impl Into<String>) -> Self {
        Self {
            id,
            element: element.into(),
            attributes: BTreeMap::new(),
            components: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            loaded: false,
            paused: false,
        }
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn parent(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Authored attribute value (canonical string form for components).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Live component instance.
    pub fn component(&self, name: &str) -> Option<&ComponentState> {
        self.components.get(name)
    }

    /// Mutable live component access, used for runtime schema augmentation.
    pub fn component_mut(&mut self, name: &str) -> Option<&mut ComponentState> {
        self.components.get_mut(name)
    }

    pub fn has_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// The node's mixin list in authored order.
    pub fn mixin_list(&self) -> Vec<&str> {
        self.attribute("mixin")
            .map(|list| list.split_whitespace().collect())
            .unwrap_or_default()
    }

    /// Whether the one-shot load event has fired for this node.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

fn default_element() -> String {
    "entity".to_string()
}

/// Detached plain representation of a subtree.
///
/// This is the exchange format for undo payloads, clone templates, clipboard
/// and document export. It is never attached to a scene, so holding one on
/// the history stacks cannot re-trigger attach or teardown side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    #[serde(default = "default_element")]
    pub element: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl NodeSnapshot {
    pub fn new(element: impl Into<String>) -> Self {
        Self {
            element: element.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.attributes.get("id").map(String::as_str)
    }

    /// Ids of this snapshot and all descendants, in tree order.
    pub fn ids(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_ids(&mut out);
        out
    }

    fn collect_ids(&self, out: &mut Vec<String>) {
        if let Some(id) = self.id() {
            out.push(id.to_string());
        }
        for child in &self.children {
            child.collect_ids(out);
        }
    }
}

impl Default for NodeSnapshot {
    fn default() -> Self {
        Self::new(default_element())
    }
}

/// Declarative definition for creating a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeDefinition {
    pub element: Option<String>,
    pub id: Option<String>,
    pub class: Option<String>,
    pub mixin: Option<String>,
    /// `data-*` attributes, keyed by full attribute name.
    pub data: BTreeMap<String, String>,
    /// Component values; strings parse through the component schema.
    pub components: BTreeMap<String, Value>,
}

impl NodeDefinition {
    pub fn element(element: &str) -> Self {
        Self {
            element: Some(element.to_string()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = Some(class.to_string());
        self
    }

    pub fn with_mixin(mut self, mixin: &str) -> Self {
        self.mixin = Some(mixin.to_string());
        self
    }

    pub fn with_data(mut self, name: &str, value: &str) -> Self {
        self.data.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_component(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.components.insert(name.to_string(), value.into());
        self
    }

    /// Build a definition from a dynamic payload object.
    ///
    /// Recognized keys: `element`, `id`, `class`, `mixin`, `components`, and
    /// any `data-*` key. Anything else is rejected.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(map) = value.as_object() else {
            return Err(DomError::Definition("definition must be an object".into()));
        };
        let mut def = NodeDefinition::default();
        for (key, entry) in map {
            match key.as_str() {
                "element" => def.element = Some(expect_string(key, entry)?),
                "id" => def.id = Some(expect_string(key, entry)?),
                "class" => def.class = Some(expect_string(key, entry)?),
                "mixin" => def.mixin = Some(expect_string(key, entry)?),
                "components" => {
                    let Some(components) = entry.as_object() else {
                        return Err(DomError::Definition("components must be an object".into()));
                    };
                    def.components = components.clone();
                }
                other if other.starts_with("data-") => {
                    def.data.insert(other.to_string(), expect_string(key, entry)?);
                }
                other => {
                    return Err(DomError::Definition(format!("unknown key {:?}", other)));
                }
            }
        }
        Ok(def)
    }
}

fn expect_string(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DomError::Definition(format!("{:?} must be a string", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serde_skips_empty_fields() {
        let snapshot = NodeSnapshot::new("box");
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, "{\"element\":\"box\"}");

        let back: NodeSnapshot = serde_json::from_str("{}").unwrap();
        assert_eq!(back.element, "entity");
    }

    #[test]
    fn test_snapshot_collects_descendant_ids() {
        let mut root = NodeSnapshot::new("box");
        root.attributes.insert("id".into(), "box-1".into());
        let mut child = NodeSnapshot::new("sphere");
        child.attributes.insert("id".into(), "sphere-1".into());
        root.children.push(child);

        assert_eq!(root.ids(), vec!["box-1".to_string(), "sphere-1".to_string()]);
    }

    #[test]
    fn test_definition_from_value() {
        let payload: Value = [
            ("element", Value::from("box")),
            ("id", Value::from("hero")),
            ("data-name", Value::from("Hero Box")),
            (
                "components",
                [("position", Value::from("1 2 3"))].into_iter().collect(),
            ),
        ]
        .into_iter()
        .collect();

        let def = NodeDefinition::from_value(&payload).unwrap();
        assert_eq!(def.element.as_deref(), Some("box"));
        assert_eq!(def.id.as_deref(), Some("hero"));
        assert_eq!(def.data.get("data-name").map(String::as_str), Some("Hero Box"));
        assert!(def.components.contains_key("position"));
    }

    #[test]
    fn test_definition_rejects_unknown_keys() {
        let payload: Value = [("parent", Value::from("scene"))].into_iter().collect();
        assert!(NodeDefinition::from_value(&payload).is_err());
    }
}
