//! Whole-scene document export and import.
//!
//! A document is the minimal snapshot of everything under the scene root plus
//! the mixin definitions it relies on, serialized as JSON. Loading replaces
//! the current scene content; callers are expected to clear their history at
//! the same time, since no command recorded against the old document may be
//! replayed against the new one.

use crate::error::Result;
use crate::mixin::Mixin;
use crate::node::NodeSnapshot;
use crate::scene::Scene;
use crate::serialize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Serialized form of a whole scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Mixin id → component name → authored value, in canonical string form.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub mixins: BTreeMap<String, BTreeMap<String, String>>,
    /// Minimal snapshot of the scene root.
    pub root: NodeSnapshot,
}

/// Capture the current scene as a document.
pub fn export(scene: &Scene) -> SceneDocument {
    let mut mixins = BTreeMap::new();
    for id in scene.mixins().ids() {
        if let Some(mixin) = scene.mixins().get(id) {
            let components: BTreeMap<String, String> = mixin
                .components()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            mixins.insert(id.to_string(), components);
        }
    }
    let root = serialize::prepare_for_serialization(scene, scene.root())
        .unwrap_or_default();
    SceneDocument { mixins, root }
}

/// Serialize the scene to a pretty-printed JSON document.
pub fn save_to_string(scene: &Scene) -> Result<String> {
    Ok(serde_json::to_string_pretty(&export(scene))?)
}

/// Replace the scene's content with a document's.
///
/// Mixins register in document order, then the root's children recreate under
/// the existing scene root. Recreated nodes go through the usual pending-load
/// cycle.
pub fn import(scene: &mut Scene, document: &SceneDocument) -> Result<()> {
    scene.clear();
    for (id, components) in &document.mixins {
        let mut mixin = Mixin::new();
        for (name, value) in components {
            mixin = mixin.component(name, value);
        }
        scene.mixins_mut().register(id, mixin);
    }
    let root = scene.root().clone();
    for child in &document.root.children {
        scene.instantiate_snapshot(child, &root, None)?;
    }
    Ok(())
}

/// Parse and import a JSON document.
pub fn load_from_str(scene: &mut Scene, json: &str) -> Result<()> {
    let document: SceneDocument = serde_json::from_str(json)?;
    import(scene, &document)
}
