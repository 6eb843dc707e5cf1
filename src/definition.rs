//! Type definitions and declarative placement rules
//!
//! A [`TypeDefinition`] is the full declaration for one [`TypeId`]: optional
//! parent, the child/parent placement rules it declares directly, the rules
//! it inherits from its ancestor chain, and its attribute schema. Definitions
//! are built through [`TypeDefinitionBuilder`] during provider registration
//! and are immutable once published; post-hoc extension goes through the
//! registry's copy-on-write draft path.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::scope::ScopeTag;
use crate::type_id::{TypeId, WILDCARD};

// =============================================================================
// Placement rules
// =============================================================================

/// Declares that a parent type accepts children of a given shape
///
/// Each component may be the wildcard `"*"`. The name pattern is either an
/// exact node name or `"*"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildRule {
    pub child_type: String,
    pub child_sub_type: String,
    pub name_pattern: String,
}

impl ChildRule {
    pub fn new(
        child_type: impl Into<String>,
        child_sub_type: impl Into<String>,
        name_pattern: impl Into<String>,
    ) -> Self {
        Self {
            child_type: child_type.into(),
            child_sub_type: child_sub_type.into(),
            name_pattern: name_pattern.into(),
        }
    }

    /// Accept any child of the given type, any subtype, any name
    pub fn any_of_type(child_type: impl Into<String>) -> Self {
        Self::new(child_type, WILDCARD, WILDCARD)
    }

    /// Does this rule match the given child id and node name?
    pub fn matches(&self, child: &TypeId, name: &str) -> bool {
        component_matches(&self.child_type, &child.type_name)
            && component_matches(&self.child_sub_type, &child.sub_type)
            && component_matches(&self.name_pattern, name)
    }

    /// Rule specificity for most-specific-wins resolution
    ///
    /// Exact name outranks exact subtype outranks exact type, so the score
    /// weights the components 4/2/1.
    pub fn specificity(&self) -> u8 {
        let mut score = 0;
        if self.name_pattern != WILDCARD {
            score += 4;
        }
        if self.child_sub_type != WILDCARD {
            score += 2;
        }
        if self.child_type != WILDCARD {
            score += 1;
        }
        score
    }

    /// True if this rule targets the same (type, subtype) shape as `other`
    pub fn same_target(&self, other: &ChildRule) -> bool {
        self.child_type == other.child_type && self.child_sub_type == other.child_sub_type
    }
}

/// Declares, from the child's perspective, which parents it accepts
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRule {
    pub parent_type: String,
    pub parent_sub_type: String,
    pub expected_name_pattern: String,
}

impl ParentRule {
    pub fn new(
        parent_type: impl Into<String>,
        parent_sub_type: impl Into<String>,
        expected_name_pattern: impl Into<String>,
    ) -> Self {
        Self {
            parent_type: parent_type.into(),
            parent_sub_type: parent_sub_type.into(),
            expected_name_pattern: expected_name_pattern.into(),
        }
    }

    /// Accept any parent of the given type
    pub fn any_of_type(parent_type: impl Into<String>) -> Self {
        Self::new(parent_type, WILDCARD, WILDCARD)
    }

    /// Does this rule match the given parent id and the child's node name?
    pub fn matches(&self, parent: &TypeId, child_name: &str) -> bool {
        component_matches(&self.parent_type, &parent.type_name)
            && component_matches(&self.parent_sub_type, &parent.sub_type)
            && component_matches(&self.expected_name_pattern, child_name)
    }
}

fn component_matches(pattern: &str, value: &str) -> bool {
    pattern == WILDCARD || pattern == value
}

// =============================================================================
// Attribute schema
// =============================================================================

/// Value type of a declared attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Int,
    Float,
    Bool,
    /// Closed set of string values (see `allowed_values`)
    Enumerated,
}

/// Schema entry for one attribute of a type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,
    pub kind: AttributeKind,
    pub required: bool,
    /// Closed value set for [`AttributeKind::Enumerated`] (or an extra
    /// restriction on string attributes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<BTreeSet<String>>,
    /// Whether a JSON array of the base kind is also accepted
    #[serde(default)]
    pub array_allowed: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: AttributeKind, required: bool) -> Self {
        Self {
            name: name.into(),
            kind,
            required,
            allowed_values: None,
            array_allowed: false,
        }
    }

    pub fn with_allowed_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_array_allowed(mut self) -> Self {
        self.array_allowed = true;
        self
    }

    /// Does the proposed JSON value satisfy this spec's kind and value set?
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;

        if let Value::Array(items) = value {
            return self.array_allowed && items.iter().all(|v| self.accepts_scalar(v));
        }
        self.accepts_scalar(value)
    }

    fn accepts_scalar(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value;

        let kind_ok = match self.kind {
            AttributeKind::String | AttributeKind::Enumerated => value.is_string(),
            AttributeKind::Int => value.is_i64() || value.is_u64(),
            AttributeKind::Float => value.is_number(),
            AttributeKind::Bool => value.is_boolean(),
        };
        if !kind_ok {
            return false;
        }

        match (&self.allowed_values, value) {
            (Some(allowed), Value::String(s)) => allowed.contains(s),
            (Some(_), _) => false,
            (None, _) => true,
        }
    }
}

// =============================================================================
// Type definition
// =============================================================================

/// Inheritance resolution state of a definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum ResolutionState {
    /// No parent declared
    Root,
    /// Parent chain fully walked; inherited rules are populated
    Resolved,
    /// Declared parent not registered yet; inherited rules are empty
    Deferred,
    /// Ancestor chain loops back onto this definition
    Cyclic,
}

impl ResolutionState {
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolutionState::Root | ResolutionState::Resolved)
    }
}

/// The full declaration for one registered [`TypeId`]
///
/// Inherited rule vectors are derived from the ancestor chain and stored on
/// the resolved value; they are recomputed (never patched in place) whenever
/// the registry replaces the definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub id: TypeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TypeId>,
    #[serde(default)]
    pub description: String,
    pub direct_accepts_children: Vec<ChildRule>,
    pub direct_accepts_parents: Vec<ParentRule>,
    /// Union of all ancestors' direct child rules, nearest ancestor first
    pub inherited_accepts_children: Vec<ChildRule>,
    /// Union of all ancestors' direct parent rules, nearest ancestor first
    pub inherited_accepts_parents: Vec<ParentRule>,
    pub attributes: BTreeMap<String, AttributeSpec>,
    pub resolution: ResolutionState,
    /// Module scope this definition was contributed under, for bulk release
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeTag>,
}

impl TypeDefinition {
    /// All child rules: direct first, then inherited
    pub fn all_accepts_children(&self) -> impl Iterator<Item = &ChildRule> {
        self.direct_accepts_children
            .iter()
            .chain(self.inherited_accepts_children.iter())
    }

    /// All parent rules: direct first, then inherited
    pub fn all_accepts_parents(&self) -> impl Iterator<Item = &ParentRule> {
        self.direct_accepts_parents
            .iter()
            .chain(self.inherited_accepts_parents.iter())
    }

    /// Look up the attribute schema entry for a name
    pub fn attribute(&self, name: &str) -> Option<&AttributeSpec> {
        self.attributes.get(name)
    }

    /// Names of required attributes
    pub fn required_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .values()
            .filter(|a| a.required)
            .map(|a| a.name.as_str())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Fluent construction of a draft [`TypeDefinition`]
///
/// Handed to the closure passed to `MetaDataRegistry::register_type`; the
/// finished value is frozen by the registry.
#[derive(Debug)]
pub struct TypeDefinitionBuilder {
    def: TypeDefinition,
}

impl TypeDefinitionBuilder {
    pub fn new(id: TypeId) -> Self {
        Self {
            def: TypeDefinition {
                id,
                parent: None,
                description: String::new(),
                direct_accepts_children: Vec::new(),
                direct_accepts_parents: Vec::new(),
                inherited_accepts_children: Vec::new(),
                inherited_accepts_parents: Vec::new(),
                attributes: BTreeMap::new(),
                resolution: ResolutionState::Root,
                scope: None,
            },
        }
    }

    /// Declare the single inheritance parent
    pub fn parent(&mut self, parent: TypeId) -> &mut Self {
        self.def.parent = Some(parent);
        self
    }

    pub fn describe(&mut self, description: impl Into<String>) -> &mut Self {
        self.def.description = description.into();
        self
    }

    /// Declare that this type accepts children matching the rule
    pub fn accepts_child(&mut self, rule: ChildRule) -> &mut Self {
        self.def.direct_accepts_children.push(rule);
        self
    }

    /// Declare which parents this type may be placed under
    pub fn accepts_parent(&mut self, rule: ParentRule) -> &mut Self {
        self.def.direct_accepts_parents.push(rule);
        self
    }

    pub fn attribute(&mut self, spec: AttributeSpec) -> &mut Self {
        self.def.attributes.insert(spec.name.clone(), spec);
        self
    }

    pub fn optional_attribute(&mut self, name: impl Into<String>, kind: AttributeKind) -> &mut Self {
        self.attribute(AttributeSpec::new(name, kind, false))
    }

    pub fn required_attribute(&mut self, name: impl Into<String>, kind: AttributeKind) -> &mut Self {
        self.attribute(AttributeSpec::new(name, kind, true))
    }

    /// Finish the draft; resolution state is decided by the registry
    pub(crate) fn build(self) -> TypeDefinition {
        self.def
    }
}
