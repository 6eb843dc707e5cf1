//! Error types for the metadata type registry

use thiserror::Error;

use crate::type_id::TypeId;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, MetaTypeError>;

/// Metadata registry errors
#[derive(Error, Debug)]
pub enum MetaTypeError {
    #[error("Type already registered: {id}")]
    RegistrationConflict { id: TypeId },

    #[error("Type not found: {id}")]
    NotFound { id: TypeId },

    #[error("Invalid type id '{type_name}/{sub_type}': {reason}")]
    InvalidTypeId {
        type_name: String,
        sub_type: String,
        reason: String,
    },

    #[error("Provider dependency cycle: {members:?}")]
    ProviderDependencyCycle { members: Vec<String> },

    #[error("Provider '{provider_id}' failed during registration: {reason}")]
    ProviderFailed { provider_id: String, reason: String },

    #[error("Placement denied: {child} named '{name}' under {parent}")]
    PlacementDenied {
        parent: TypeId,
        child: TypeId,
        name: String,
    },

    #[error("Constraint '{constraint_id}' violated: {reason}")]
    ConstraintViolation {
        constraint_id: String,
        reason: String,
    },

    #[error("Constraint id already registered: {constraint_id}")]
    DuplicateConstraint { constraint_id: String },

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
