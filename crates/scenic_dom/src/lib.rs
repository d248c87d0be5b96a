//! # scenic_dom - Scene Document Model
//!
//! The entity tree underneath the scenic editor:
//!
//! - **Arena + stable ids**: `Scene` owns every node; everything else
//!   addresses nodes by `NodeId` and re-resolves on each use
//! - **Two-form values**: typed in-memory `Value` plus a canonical authored
//!   string per component schema
//! - **Implicit resolution**: what an entity carries "for free" from its
//!   element kind, mixins, injected defaults, and schema defaults
//! - **Minimal serialization**: snapshots that subtract implicit values out
//! - **Transform math**: world matrices and local-pose solving via `glam`
//!
//! The mutation engine lives in `scenic_editor`; this crate holds no undo
//! state and emits no events.

pub mod component;
pub mod document;
pub mod error;
pub mod id;
pub mod implicit;
pub mod mixin;
pub mod node;
pub mod primitive;
pub mod scene;
pub mod schema;
pub mod serialize;
pub mod transform;
pub mod value;

pub use component::{ComponentDef, ComponentRegistry, ComponentState};
pub use error::{DomError, Result};
pub use id::{IdAllocator, IdError, NodeId};
pub use mixin::{Mixin, MixinRegistry};
pub use node::{Node, NodeDefinition, NodeSnapshot};
pub use primitive::{AttributeMapping, PrimitiveDef, PrimitiveRegistry};
pub use scene::{Scene, SchemaLookup};
pub use schema::{ComponentSchema, PropertySchema, PropertyType};
pub use value::Value;
