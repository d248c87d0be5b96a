//! Error types for the scene document model

use thiserror::Error;

/// Scene document errors
#[derive(Debug, Error)]
pub enum DomError {
    /// Entity id not present in the scene
    #[error("entity not found: {0}")]
    NodeNotFound(String),

    /// An id is already taken by another entity
    #[error("duplicate entity id: {0}")]
    DuplicateId(String),

    /// Component name unknown to both the live instance and the registry
    #[error("unknown component: {0}")]
    UnknownComponent(String),

    /// Property name not present in the component schema
    #[error("unknown property '{property}' on component '{component}'")]
    UnknownProperty { component: String, property: String },

    /// A canonical string could not be parsed as the schema type
    #[error("cannot parse {input:?} as {ty}")]
    Parse { ty: &'static str, input: String },

    /// Malformed declarative node definition
    #[error("invalid definition: {0}")]
    Definition(String),

    /// Operation not permitted on the scene root
    #[error("the scene root cannot be {0}")]
    RootImmutable(&'static str),

    /// Invalid entity id
    #[error(transparent)]
    Id(#[from] crate::id::IdError),

    /// Document (de)serialization failure
    #[error("document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for scene document operations
pub type Result<T> = std::result::Result<T, DomError>;
