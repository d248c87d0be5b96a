//! Stable string identifiers for scene nodes.
//!
//! Every node is addressed by a generated, collision-free string id. Commands
//! store ids, never node references, so a node can be destroyed and recreated
//! (the async load cycle does exactly that) without invalidating history.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced when validating an entity id.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdError {
    #[error("entity id cannot be empty")]
    Empty,

    /// Leading digits and hyphens collide with selector and list syntax.
    #[error("entity id cannot start with a digit or hyphen: {0:?}")]
    BadLeadingChar(String),

    /// Ids appear in space-separated mixin lists, so whitespace is reserved.
    #[error("entity id cannot contain whitespace: {0:?}")]
    Whitespace(String),
}

/// Identifier of a node in the scene tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId(String);

impl NodeId {
    /// Validate and wrap an id string.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        let Some(first) = id.chars().next() else {
            return Err(IdError::Empty);
        };
        if first.is_ascii_digit() || first == '-' {
            return Err(IdError::BadLeadingChar(id));
        }
        if id.chars().any(char::is_whitespace) {
            return Err(IdError::Whitespace(id));
        }
        Ok(NodeId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wrap a statically known-valid id, bypassing validation.
    pub(crate) fn unchecked(id: &str) -> Self {
        NodeId(id.to_string())
    }
}

impl std::borrow::Borrow<str> for NodeId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeId::new(s)
    }
}

impl TryFrom<String> for NodeId {
    type Error = IdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        NodeId::new(s)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

impl PartialEq<str> for NodeId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NodeId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Allocates fresh ids of the form `stem-N` with a counter per stem.
///
/// The allocator itself never guarantees uniqueness across externally
/// authored ids; callers pass a `taken` predicate backed by the live arena.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    counters: BTreeMap<String, u64>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next free id for `stem`, skipping anything `taken`.
    pub fn allocate(&mut self, stem: &str, taken: impl Fn(&str) -> bool) -> NodeId {
        let stem = sanitize_stem(stem);
        let counter = self.counters.entry(stem.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}-{}", stem, counter);
            if !taken(&candidate) {
                // sanitize_stem guarantees an alphabetic first char
                if let Ok(id) = NodeId::new(candidate) {
                    return id;
                }
            }
        }
    }
}

/// Reduce an element name to an id stem: ascii alphanumerics and hyphens
/// only, guaranteed to start with an ascii letter.
fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    match cleaned.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => cleaned,
        _ => "entity".to_string(),
    }
}
