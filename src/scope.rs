//! Registration scopes
//!
//! A scope groups every registration contributed by one dynamically loadable
//! module so the registry can purge them in bulk when the module is unloaded.
//! Release is explicit (`MetaDataRegistry::release_scope`); nothing relies on
//! collector timing.

use serde::{Deserialize, Serialize};

/// Tag identifying the module scope of a registration
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeTag(pub String);

impl ScopeTag {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ScopeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ScopeTag {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
