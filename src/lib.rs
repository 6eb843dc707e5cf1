//! Metadata Type Registry
//!
//! A runtime type registry and constraint-enforcement engine. Independently
//! loaded modules declaratively extend a shared taxonomy of metadata kinds
//! (record kinds, field kinds, attribute kinds), each with single-parent
//! inheritance, declared parent/child placement rules, and attribute schemas.
//! The engine then enforces those rules whenever a concrete metadata tree is
//! assembled or mutated.
//!
//! ## Features
//!
//! - **Open extensibility**: any number of independently compiled modules may
//!   add or extend types at different times, via the provider SPI
//! - **Deferred resolution**: a child type may register before its parent;
//!   inheritance resolves once the parent arrives
//! - **Copy-on-write extension**: later-loaded modules add optional
//!   attributes/rules to existing types without readers ever seeing a
//!   half-updated definition
//! - **Flattened enforcement**: declared rules plus imperative constraints
//!   collapse into an atomically swapped lookup table; placement checks are
//!   O(1) amortized
//! - **Scoped cleanup**: registrations carry an optional module scope and can
//!   be purged in bulk on unload
//!
//! ## Architecture
//!
//! ```text
//! providers ──(bootstrap, one-time)──> MetaDataRegistry
//!                                          │
//!                            (derived, rebuilt lazily)
//!                                          ▼
//!                                 ConstraintFlattener
//!                                          │
//!                              (queried continuously)
//!                                          ▼
//!                                 ConstraintEnforcer
//! ```
//!
//! The `TypeDefinition` graph is the single source of truth; the flattener's
//! table is pure derived state that can always be rebuilt from it.

pub mod constraint;
pub mod definition;
pub mod enforce;
pub mod error;
pub mod flatten;
pub mod node;
pub mod provider;
pub mod registry;
pub mod scope;
pub mod type_id;

pub use constraint::{
    AllowedValuesConstraint, NamePatternPlacementConstraint, PlacementConstraint,
    PositiveIntegerConstraint, ValidationConstraint,
};
pub use definition::{
    AttributeKind, AttributeSpec, ChildRule, ParentRule, ResolutionState, TypeDefinition,
    TypeDefinitionBuilder,
};
pub use enforce::ConstraintEnforcer;
pub use error::{MetaTypeError, Result};
pub use flatten::{ConstraintFlattener, FlattenedRule, RuleOrigin};
pub use node::MetaNode;
pub use provider::{
    bootstrap, bootstrap_discovered, discover_providers, BootstrapReport, ProviderRegistration,
    TypeProvider,
};
pub use registry::{ExtensionDraft, MetaDataRegistry, UnresolvedDiagnostic};
pub use scope::ScopeTag;
pub use type_id::{TypeId, WILDCARD};
