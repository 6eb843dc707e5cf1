//! Constraint enforcement
//!
//! The single choke point mutation operations call before committing a change
//! to a metadata tree. Both checks are pure functions of current registry
//! state plus the proposed operation: they may be called speculatively and
//! leave nothing behind on failure.

use std::sync::Arc;

use crate::error::{MetaTypeError, Result};
use crate::node::MetaNode;
use crate::registry::MetaDataRegistry;
use crate::type_id::TypeId;

/// Builtin constraint id for "attribute is not declared on this type"
pub const ATTRIBUTE_DECLARED: &str = "attribute.declared";
/// Builtin constraint id for "value does not satisfy the attribute schema"
pub const ATTRIBUTE_KIND: &str = "attribute.kind";

/// Runtime-facing enforcement API over a registry
pub struct ConstraintEnforcer {
    registry: Arc<MetaDataRegistry>,
}

impl ConstraintEnforcer {
    pub fn new(registry: Arc<MetaDataRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MetaDataRegistry {
        &self.registry
    }

    /// Check whether a child may be attached under `parent`
    ///
    /// Called before a metadata node is attached; a denial leaves the tree
    /// unchanged.
    pub fn check_placement(
        &self,
        parent: &MetaNode,
        child_type: &TypeId,
        child_name: &str,
    ) -> Result<()> {
        if self
            .registry
            .accepts_child(&parent.id, child_type, child_name)
        {
            Ok(())
        } else {
            Err(MetaTypeError::PlacementDenied {
                parent: parent.id.clone(),
                child: child_type.clone(),
                name: child_name.to_string(),
            })
        }
    }

    /// Check a proposed attribute value against the schema and every
    /// applicable validation constraint
    ///
    /// The declared [`AttributeSpec`](crate::definition::AttributeSpec) is
    /// enforced first (declared at all, then kind/allowed values), then
    /// registered constraints run in registration order; the first failure
    /// short-circuits with its constraint id and reason.
    pub fn check_value(
        &self,
        node: &MetaNode,
        attr_name: &str,
        proposed: &serde_json::Value,
    ) -> Result<()> {
        if let Some(def) = self.registry.get_type_definition(&node.id) {
            match def.attribute(attr_name) {
                None => {
                    return Err(MetaTypeError::ConstraintViolation {
                        constraint_id: ATTRIBUTE_DECLARED.to_string(),
                        reason: format!(
                            "attribute '{}' is not declared on {}",
                            attr_name, node.id
                        ),
                    });
                }
                Some(spec) => {
                    if !spec.accepts(proposed) {
                        return Err(MetaTypeError::ConstraintViolation {
                            constraint_id: ATTRIBUTE_KIND.to_string(),
                            reason: format!(
                                "value {} does not satisfy {:?} for attribute '{}'",
                                proposed, spec.kind, attr_name
                            ),
                        });
                    }
                }
            }
        }

        for constraint in self.registry.get_all_validation_constraints() {
            if !constraint.applies_to(node, attr_name) {
                continue;
            }
            if let Err(reason) = constraint.evaluate(node, attr_name, proposed) {
                return Err(MetaTypeError::ConstraintViolation {
                    constraint_id: constraint.constraint_id().to_string(),
                    reason,
                });
            }
        }

        Ok(())
    }
}
