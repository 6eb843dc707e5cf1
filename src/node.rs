//! Metadata tree node view
//!
//! The enforcement API is typed against this minimal node shape. Building and
//! mutating actual metadata trees is the external loader's business; the core
//! only needs the node's type id, name, and current attribute values.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::type_id::TypeId;

/// Minimal view of one node in a concrete metadata tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaNode {
    pub id: TypeId,
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, serde_json::Value>,
}

impl MetaNode {
    pub fn new(id: TypeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&serde_json::Value> {
        self.attributes.get(name)
    }
}
