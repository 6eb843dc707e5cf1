//! Imperative placement and validation constraints
//!
//! Declarative accepts-rules cover the common placement cases; constraints
//! cover everything they cannot express. A constraint is an independently
//! registered predicate object with a stable id, an applicability check, and
//! an evaluation function. Constraints only ever narrow: a single placement
//! denial is final, and every applicable validation constraint must pass.

use regex::Regex;

use crate::node::MetaNode;
use crate::type_id::TypeId;

/// Predicate deciding whether a specific parent/child attachment is allowed
/// beyond what declarative accepts-rules say
pub trait PlacementConstraint: Send + Sync {
    /// Stable id, unique across placement and validation constraints
    fn constraint_id(&self) -> &str;

    fn description(&self) -> &str;

    /// Should this constraint be consulted for the pair at all?
    fn applies_to(&self, parent: &TypeId, child: &TypeId) -> bool;

    /// `false` denies the attachment
    fn evaluate(&self, parent: &TypeId, child: &TypeId, child_name: &str) -> bool;
}

/// Predicate checked against a proposed attribute value
pub trait ValidationConstraint: Send + Sync {
    /// Stable id, unique across placement and validation constraints
    fn constraint_id(&self) -> &str;

    fn description(&self) -> &str;

    /// Should this constraint be consulted for the node + attribute at all?
    fn applies_to(&self, node: &MetaNode, attr_name: &str) -> bool;

    /// `Err` carries the human-readable reason for the rejection
    fn evaluate(
        &self,
        node: &MetaNode,
        attr_name: &str,
        proposed: &serde_json::Value,
    ) -> Result<(), String>;
}

// =============================================================================
// Shipped placement constraints
// =============================================================================

/// Denies any child whose node name matches a pattern
///
/// Applies to every parent/child pair unless narrowed to a child type.
pub struct NamePatternPlacementConstraint {
    id: String,
    description: String,
    denied: Regex,
    child_type: Option<String>,
}

impl NamePatternPlacementConstraint {
    pub fn new(id: impl Into<String>, denied: Regex) -> Self {
        let id = id.into();
        Self {
            description: format!("denies child names matching /{}/", denied.as_str()),
            id,
            denied,
            child_type: None,
        }
    }

    /// Compile the denied pattern from a string
    pub fn try_new(id: impl Into<String>, denied: &str) -> crate::error::Result<Self> {
        Ok(Self::new(id, Regex::new(denied)?))
    }

    /// Only consult this constraint for children of the given major type
    pub fn for_child_type(mut self, child_type: impl Into<String>) -> Self {
        self.child_type = Some(child_type.into());
        self
    }
}

impl PlacementConstraint for NamePatternPlacementConstraint {
    fn constraint_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applies_to(&self, _parent: &TypeId, child: &TypeId) -> bool {
        match &self.child_type {
            Some(t) => child.type_name == *t,
            None => true,
        }
    }

    fn evaluate(&self, _parent: &TypeId, _child: &TypeId, child_name: &str) -> bool {
        !self.denied.is_match(child_name)
    }
}

// =============================================================================
// Shipped validation constraints
// =============================================================================

/// Requires an attribute to be a positive integer
///
/// Accepts JSON integers and integer-valued strings; external descriptions
/// frequently carry numbers as text.
pub struct PositiveIntegerConstraint {
    id: String,
    description: String,
    attr_name: String,
}

impl PositiveIntegerConstraint {
    pub fn new(id: impl Into<String>, attr_name: impl Into<String>) -> Self {
        let attr_name = attr_name.into();
        Self {
            id: id.into(),
            description: format!("'{}' must be a positive integer", attr_name),
            attr_name,
        }
    }
}

impl ValidationConstraint for PositiveIntegerConstraint {
    fn constraint_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applies_to(&self, _node: &MetaNode, attr_name: &str) -> bool {
        attr_name == self.attr_name
    }

    fn evaluate(
        &self,
        _node: &MetaNode,
        attr_name: &str,
        proposed: &serde_json::Value,
    ) -> Result<(), String> {
        let parsed = match proposed {
            serde_json::Value::Number(n) => n.as_i64(),
            serde_json::Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        match parsed {
            Some(v) if v > 0 => Ok(()),
            Some(v) => Err(format!("'{}' must be positive, got {}", attr_name, v)),
            None => Err(format!(
                "'{}' must be an integer, got {}",
                attr_name, proposed
            )),
        }
    }
}

/// Restricts an attribute to a closed set of string values
pub struct AllowedValuesConstraint {
    id: String,
    description: String,
    attr_name: String,
    allowed: Vec<String>,
}

impl AllowedValuesConstraint {
    pub fn new<I, S>(id: impl Into<String>, attr_name: impl Into<String>, allowed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let attr_name = attr_name.into();
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        Self {
            id: id.into(),
            description: format!("'{}' must be one of {:?}", attr_name, allowed),
            attr_name,
            allowed,
        }
    }
}

impl ValidationConstraint for AllowedValuesConstraint {
    fn constraint_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn applies_to(&self, _node: &MetaNode, attr_name: &str) -> bool {
        attr_name == self.attr_name
    }

    fn evaluate(
        &self,
        _node: &MetaNode,
        attr_name: &str,
        proposed: &serde_json::Value,
    ) -> Result<(), String> {
        match proposed.as_str() {
            Some(s) if self.allowed.iter().any(|a| a == s) => Ok(()),
            Some(s) => Err(format!(
                "'{}' value '{}' not in allowed set {:?}",
                attr_name, s, self.allowed
            )),
            None => Err(format!("'{}' must be a string", attr_name)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> MetaNode {
        MetaNode::new(TypeId::new("field", "string").unwrap(), "firstName")
    }

    #[test]
    fn test_name_pattern_denies_match() {
        let c = NamePatternPlacementConstraint::new("no-digit-prefix", Regex::new(r"^\d").unwrap());
        let parent = TypeId::new("object", "pojo").unwrap();
        let child = TypeId::new("field", "string").unwrap();
        assert!(!c.evaluate(&parent, &child, "1stName"));
        assert!(c.evaluate(&parent, &child, "firstName"));
    }

    #[test]
    fn test_name_pattern_child_type_scoping() {
        let c = NamePatternPlacementConstraint::new("fields-only", Regex::new(r"^\d").unwrap())
            .for_child_type("field");
        let parent = TypeId::new("object", "pojo").unwrap();
        assert!(c.applies_to(&parent, &TypeId::new("field", "long").unwrap()));
        assert!(!c.applies_to(&parent, &TypeId::new("object", "base").unwrap()));
    }

    #[test]
    fn test_positive_integer_constraint() {
        let c = PositiveIntegerConstraint::new("maxlength.positive", "maxLength");
        let n = node();
        assert!(c.evaluate(&n, "maxLength", &serde_json::json!("100")).is_ok());
        assert!(c.evaluate(&n, "maxLength", &serde_json::json!(7)).is_ok());
        assert!(c.evaluate(&n, "maxLength", &serde_json::json!("-5")).is_err());
        assert!(c.evaluate(&n, "maxLength", &serde_json::json!(0)).is_err());
        assert!(c.evaluate(&n, "maxLength", &serde_json::json!("ten")).is_err());
    }

    #[test]
    fn test_allowed_values_constraint() {
        let c = AllowedValuesConstraint::new("fetch.mode", "fetch", ["lazy", "eager"]);
        let n = node();
        assert!(c.evaluate(&n, "fetch", &serde_json::json!("lazy")).is_ok());
        assert!(c.evaluate(&n, "fetch", &serde_json::json!("sometimes")).is_err());
        assert!(c.evaluate(&n, "fetch", &serde_json::json!(3)).is_err());
    }
}
