//! Canonical type identifiers
//!
//! Every registered kind is keyed by a `(type, subtype)` string pair, e.g.
//! `("field", "long")`. The pair is the only registry key; there is no
//! reliance on runtime type identity.

use serde::{Deserialize, Serialize};

use crate::error::{MetaTypeError, Result};

/// Wildcard marker used in placement rules (never in a [`TypeId`])
pub const WILDCARD: &str = "*";

/// Canonical identifier for a registered metadata kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId {
    /// Major kind, e.g. "object", "field", "attribute"
    pub type_name: String,
    /// Minor kind, e.g. "base", "long", "pojo"
    pub sub_type: String,
}

impl TypeId {
    /// Create a type id, rejecting wildcard components
    ///
    /// Wildcards are only meaningful in placement rules; a definition keyed
    /// by a wildcard would be unaddressable.
    pub fn new(type_name: impl Into<String>, sub_type: impl Into<String>) -> Result<Self> {
        let type_name = type_name.into();
        let sub_type = sub_type.into();

        if type_name == WILDCARD || sub_type == WILDCARD {
            return Err(MetaTypeError::InvalidTypeId {
                type_name,
                sub_type,
                reason: "wildcard components are reserved for rules".to_string(),
            });
        }
        if type_name.is_empty() || sub_type.is_empty() {
            return Err(MetaTypeError::InvalidTypeId {
                type_name,
                sub_type,
                reason: "components must be non-empty".to_string(),
            });
        }

        Ok(Self {
            type_name,
            sub_type,
        })
    }

    /// Parse a canonical "type/subtype" string
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((t, st)) => Self::new(t, st),
            None => Err(MetaTypeError::InvalidTypeId {
                type_name: s.to_string(),
                sub_type: String::new(),
                reason: "expected 'type/subtype'".to_string(),
            }),
        }
    }

    /// Canonical "type/subtype" form
    pub fn canonical(&self) -> String {
        format!("{}/{}", self.type_name, self.sub_type)
    }
}

impl std::fmt::Display for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.type_name, self.sub_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_and_display() {
        let id = TypeId::new("field", "long").unwrap();
        assert_eq!(id.to_string(), "field/long");
        assert_eq!(id.canonical(), "field/long");
    }

    #[test]
    fn test_parse_round_trip() {
        let id = TypeId::parse("object/pojo").unwrap();
        assert_eq!(id.type_name, "object");
        assert_eq!(id.sub_type, "pojo");
        assert_eq!(TypeId::parse(&id.canonical()).unwrap(), id);
    }

    #[test]
    fn test_rejects_wildcards() {
        assert!(TypeId::new("*", "long").is_err());
        assert!(TypeId::new("field", "*").is_err());
        assert!(TypeId::new("", "long").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        assert!(TypeId::parse("field").is_err());
    }
}
