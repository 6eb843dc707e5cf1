//! Metadata type registry
//!
//! Central store of [`TypeDefinition`]s. Owns the child→parent graph, the
//! deferred-resolution queue, and the constraint stores. Definitions are
//! created during provider registration, frozen behind `Arc`, and replaced
//! wholesale (copy-on-write) when a later-loaded module extends them; readers
//! never observe a half-updated definition.
//!
//! Mutation goes through one `RwLock` held only for the in-memory update.
//! Steady-state queries take the read lock or hit the flattener's lock-free
//! snapshot. A generation counter, bumped by every state change, keys the
//! flattener's derived table.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constraint::{PlacementConstraint, ValidationConstraint};
use crate::definition::{ResolutionState, TypeDefinition, TypeDefinitionBuilder};
use crate::error::{MetaTypeError, Result};
use crate::flatten::ConstraintFlattener;
use crate::scope::ScopeTag;
use crate::type_id::TypeId;

/// Diagnostic entry for a definition that never resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedDiagnostic {
    pub id: TypeId,
    pub state: ResolutionState,
    /// The declared parent that could not be reached
    pub parent: Option<TypeId>,
}

/// Mutable state behind the registry lock
struct RegistryState {
    definitions: HashMap<TypeId, Arc<TypeDefinition>>,
    /// Ids whose declared parent was absent at registration time
    deferred: Vec<TypeId>,
    placement_constraints: Vec<(Arc<dyn PlacementConstraint>, Option<ScopeTag>)>,
    validation_constraints: Vec<(Arc<dyn ValidationConstraint>, Option<ScopeTag>)>,
    /// Ids claimed across both constraint kinds
    constraint_ids: HashSet<String>,
    /// Bumped on every state change; keys derived caches
    generation: u64,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            definitions: HashMap::new(),
            deferred: Vec::new(),
            placement_constraints: Vec::new(),
            validation_constraints: Vec::new(),
            constraint_ids: HashSet::new(),
            generation: 0,
        }
    }
}

/// Outcome of one ancestor-chain walk
enum InheritanceOutcome {
    Root,
    Resolved {
        children: Vec<crate::definition::ChildRule>,
        parents: Vec<crate::definition::ParentRule>,
    },
    Deferred {
        missing: TypeId,
    },
    Cyclic {
        via: TypeId,
    },
}

/// Walk the ancestor chain of `def`, collecting inherited rules
///
/// The visited set guards against cycles; revisiting any id on the chain
/// means the parent graph loops and the definition cannot resolve.
fn compute_inheritance(
    definitions: &HashMap<TypeId, Arc<TypeDefinition>>,
    def: &TypeDefinition,
) -> InheritanceOutcome {
    let Some(first_parent) = def.parent.clone() else {
        return InheritanceOutcome::Root;
    };

    let mut visited: HashSet<TypeId> = HashSet::new();
    visited.insert(def.id.clone());

    let mut children = Vec::new();
    let mut parents = Vec::new();
    let mut cursor = Some(first_parent);

    while let Some(ancestor_id) = cursor {
        if !visited.insert(ancestor_id.clone()) {
            return InheritanceOutcome::Cyclic { via: ancestor_id };
        }
        match definitions.get(&ancestor_id) {
            None => return InheritanceOutcome::Deferred {
                missing: ancestor_id,
            },
            Some(ancestor) => {
                children.extend(ancestor.direct_accepts_children.iter().cloned());
                parents.extend(ancestor.direct_accepts_parents.iter().cloned());
                cursor = ancestor.parent.clone();
            }
        }
    }

    InheritanceOutcome::Resolved { children, parents }
}

/// The central metadata type registry
///
/// Construct isolated instances with [`MetaDataRegistry::new`]; the
/// process-wide default from [`MetaDataRegistry::global`] exists for
/// top-level wiring only.
pub struct MetaDataRegistry {
    state: RwLock<RegistryState>,
    flattener: ConstraintFlattener,
}

impl Default for MetaDataRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetaDataRegistry {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(RegistryState::new()),
            flattener: ConstraintFlattener::new(),
        }
    }

    /// Process-wide default instance, for top-level wiring
    pub fn global() -> &'static Arc<MetaDataRegistry> {
        static GLOBAL: OnceLock<Arc<MetaDataRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(MetaDataRegistry::new()))
    }

    // ========== Registration ==========

    /// Register a new type definition
    ///
    /// The closure configures the draft (parent, rules, attributes). Fails
    /// with `RegistrationConflict` if the id is already present, leaving the
    /// first registration intact. If the declared parent is absent the
    /// definition is parked as `Deferred` rather than failing; see
    /// [`MetaDataRegistry::resolve_deferred_inheritance`].
    pub fn register_type<F>(&self, id: TypeId, configure: F) -> Result<()>
    where
        F: FnOnce(&mut TypeDefinitionBuilder),
    {
        self.register_type_inner(id, None, configure)
    }

    /// Register a new type definition tagged with a module scope
    pub fn register_type_scoped<F>(&self, scope: ScopeTag, id: TypeId, configure: F) -> Result<()>
    where
        F: FnOnce(&mut TypeDefinitionBuilder),
    {
        self.register_type_inner(id, Some(scope), configure)
    }

    fn register_type_inner<F>(&self, id: TypeId, scope: Option<ScopeTag>, configure: F) -> Result<()>
    where
        F: FnOnce(&mut TypeDefinitionBuilder),
    {
        let mut builder = TypeDefinitionBuilder::new(id.clone());
        configure(&mut builder);
        let mut def = builder.build();
        def.scope = scope;

        let mut state = self.state.write();
        if state.definitions.contains_key(&id) {
            return Err(MetaTypeError::RegistrationConflict { id });
        }

        match compute_inheritance(&state.definitions, &def) {
            InheritanceOutcome::Root => {
                def.resolution = ResolutionState::Root;
            }
            InheritanceOutcome::Resolved { children, parents } => {
                def.inherited_accepts_children = children;
                def.inherited_accepts_parents = parents;
                def.resolution = ResolutionState::Resolved;
            }
            InheritanceOutcome::Deferred { missing } => {
                debug!(id = %def.id, parent = %missing, "parent not registered yet, deferring");
                def.resolution = ResolutionState::Deferred;
                state.deferred.push(def.id.clone());
            }
            InheritanceOutcome::Cyclic { via } => {
                warn!(id = %def.id, via = %via, "cyclic inheritance detected");
                def.resolution = ResolutionState::Cyclic;
                mark_cyclic(&mut state, &via);
            }
        }

        debug!(id = %def.id, state = ?def.resolution, "registered type");
        state.definitions.insert(id, Arc::new(def));
        state.generation += 1;
        Ok(())
    }

    /// Open a copy-on-write extension draft for an existing definition
    ///
    /// This is the only post-construction mutation path: a later-loaded
    /// provider may add optional attributes and rules to a type another
    /// provider registered. The draft's `commit` atomically replaces the
    /// stored definition.
    pub fn find_type(self: &Arc<Self>, id: &TypeId) -> Result<ExtensionDraft> {
        let state = self.state.read();
        let def = state
            .definitions
            .get(id)
            .ok_or_else(|| MetaTypeError::NotFound { id: id.clone() })?;
        Ok(ExtensionDraft {
            registry: Arc::clone(self),
            draft: (**def).clone(),
        })
    }

    fn commit_extension(&self, draft: TypeDefinition) -> Result<()> {
        let mut state = self.state.write();
        if !state.definitions.contains_key(&draft.id) {
            // The definition was purged between draft and commit.
            return Err(MetaTypeError::NotFound { id: draft.id });
        }

        let mut def = draft;
        match compute_inheritance(&state.definitions, &def) {
            InheritanceOutcome::Root => def.resolution = ResolutionState::Root,
            InheritanceOutcome::Resolved { children, parents } => {
                def.inherited_accepts_children = children;
                def.inherited_accepts_parents = parents;
                def.resolution = ResolutionState::Resolved;
            }
            InheritanceOutcome::Deferred { .. } => def.resolution = ResolutionState::Deferred,
            InheritanceOutcome::Cyclic { via } => {
                def.resolution = ResolutionState::Cyclic;
                mark_cyclic(&mut state, &via);
            }
        }

        debug!(id = %def.id, "extension draft committed");
        state.definitions.insert(def.id.clone(), Arc::new(def));
        state.generation += 1;
        Ok(())
    }

    // ========== Deferred inheritance ==========

    /// Resolve every definition whose parent was absent at registration time
    ///
    /// Re-scans the deferred queue until a fixpoint, so entries unblocked
    /// transitively (child deferred on a parent that was itself deferred)
    /// resolve in one call. Idempotent; returns the count newly resolved.
    /// Entries whose parent is still missing stay queued for a later call.
    pub fn resolve_deferred_inheritance(&self) -> usize {
        let mut state = self.state.write();
        let mut resolved = 0;
        let mut mutated = false;

        loop {
            let mut progressed = false;
            let pending = std::mem::take(&mut state.deferred);

            for id in pending {
                let Some(def) = state.definitions.get(&id).cloned() else {
                    // Purged while deferred; drop the queue entry.
                    progressed = true;
                    continue;
                };
                match compute_inheritance(&state.definitions, &def) {
                    InheritanceOutcome::Resolved { children, parents } => {
                        let mut updated = (*def).clone();
                        updated.inherited_accepts_children = children;
                        updated.inherited_accepts_parents = parents;
                        updated.resolution = ResolutionState::Resolved;
                        state.definitions.insert(id.clone(), Arc::new(updated));
                        debug!(id = %id, "deferred inheritance resolved");
                        resolved += 1;
                        mutated = true;
                        progressed = true;
                    }
                    InheritanceOutcome::Cyclic { via } => {
                        warn!(id = %id, via = %via, "cyclic inheritance found while resolving");
                        let mut updated = (*def).clone();
                        updated.resolution = ResolutionState::Cyclic;
                        state.definitions.insert(id.clone(), Arc::new(updated));
                        mark_cyclic(&mut state, &via);
                        mutated = true;
                        progressed = true;
                    }
                    InheritanceOutcome::Deferred { .. } => {
                        state.deferred.push(id);
                    }
                    InheritanceOutcome::Root => {
                        // Parent declaration was removed by an extension; the
                        // definition no longer waits on anything.
                        progressed = true;
                    }
                }
            }

            if !progressed {
                break;
            }
        }

        if mutated {
            state.generation += 1;
        }
        resolved
    }

    /// Definitions still `Deferred` or `Cyclic`, for post-bootstrap reporting
    pub fn unresolved_types(&self) -> Vec<UnresolvedDiagnostic> {
        let state = self.state.read();
        let mut out: Vec<UnresolvedDiagnostic> = state
            .definitions
            .values()
            .filter(|d| !d.resolution.is_resolved())
            .map(|d| UnresolvedDiagnostic {
                id: d.id.clone(),
                state: d.resolution.clone(),
                parent: d.parent.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    // ========== Queries ==========

    pub fn is_registered(&self, id: &TypeId) -> bool {
        self.state.read().definitions.contains_key(id)
    }

    pub fn get_type_definition(&self, id: &TypeId) -> Option<Arc<TypeDefinition>> {
        self.state.read().definitions.get(id).cloned()
    }

    pub fn get_all_type_definitions(&self) -> Vec<Arc<TypeDefinition>> {
        let mut defs: Vec<_> = self.state.read().definitions.values().cloned().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));
        defs
    }

    /// Sorted canonical "type/subtype" names of every registered type
    pub fn get_registered_type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .state
            .read()
            .definitions
            .keys()
            .map(TypeId::canonical)
            .collect();
        names.sort();
        names
    }

    /// May `child` (named `child_name`) be attached under `parent`?
    ///
    /// Convenience wrapper over the constraint flattener.
    pub fn accepts_child(&self, parent: &TypeId, child: &TypeId, child_name: &str) -> bool {
        self.flattener.is_placement_allowed(self, parent, child, child_name)
    }

    /// The flattened placement rules for a parent type, for diagnostics
    pub fn flattened_rules(&self, parent: &TypeId) -> Vec<crate::flatten::FlattenedRule> {
        self.flattener.flattened_rules(self, parent)
    }

    /// Generation of the current registry state, for derived-cache keying
    pub fn generation(&self) -> u64 {
        self.state.read().generation
    }

    // ========== Constraints ==========

    pub fn register_placement_constraint(
        &self,
        constraint: Arc<dyn PlacementConstraint>,
    ) -> Result<()> {
        self.register_placement_constraint_inner(constraint, None)
    }

    pub fn register_placement_constraint_scoped(
        &self,
        scope: ScopeTag,
        constraint: Arc<dyn PlacementConstraint>,
    ) -> Result<()> {
        self.register_placement_constraint_inner(constraint, Some(scope))
    }

    fn register_placement_constraint_inner(
        &self,
        constraint: Arc<dyn PlacementConstraint>,
        scope: Option<ScopeTag>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let id = constraint.constraint_id().to_string();
        if !state.constraint_ids.insert(id.clone()) {
            return Err(MetaTypeError::DuplicateConstraint { constraint_id: id });
        }
        debug!(constraint_id = %id, "registered placement constraint");
        state.placement_constraints.push((constraint, scope));
        state.generation += 1;
        Ok(())
    }

    pub fn register_validation_constraint(
        &self,
        constraint: Arc<dyn ValidationConstraint>,
    ) -> Result<()> {
        self.register_validation_constraint_inner(constraint, None)
    }

    pub fn register_validation_constraint_scoped(
        &self,
        scope: ScopeTag,
        constraint: Arc<dyn ValidationConstraint>,
    ) -> Result<()> {
        self.register_validation_constraint_inner(constraint, Some(scope))
    }

    fn register_validation_constraint_inner(
        &self,
        constraint: Arc<dyn ValidationConstraint>,
        scope: Option<ScopeTag>,
    ) -> Result<()> {
        let mut state = self.state.write();
        let id = constraint.constraint_id().to_string();
        if !state.constraint_ids.insert(id.clone()) {
            return Err(MetaTypeError::DuplicateConstraint { constraint_id: id });
        }
        debug!(constraint_id = %id, "registered validation constraint");
        state.validation_constraints.push((constraint, scope));
        state.generation += 1;
        Ok(())
    }

    pub fn get_all_validation_constraints(&self) -> Vec<Arc<dyn ValidationConstraint>> {
        self.state
            .read()
            .validation_constraints
            .iter()
            .map(|(c, _)| Arc::clone(c))
            .collect()
    }

    /// Inputs for a flattener rebuild: (generation, definitions, constraints)
    pub(crate) fn placement_inputs(
        &self,
    ) -> (u64, Vec<Arc<TypeDefinition>>, Vec<Arc<dyn PlacementConstraint>>) {
        let state = self.state.read();
        (
            state.generation,
            state.definitions.values().cloned().collect(),
            state
                .placement_constraints
                .iter()
                .map(|(c, _)| Arc::clone(c))
                .collect(),
        )
    }

    // ========== Scope release ==========

    /// Purge every definition and constraint tagged with the scope
    ///
    /// Survivors whose ancestor chain lost a member fall back to `Deferred`
    /// and re-enter the queue; they are never silently re-rooted. Returns the
    /// number of entries removed.
    pub fn release_scope(&self, scope: &ScopeTag) -> usize {
        let mut state = self.state.write();
        let before_defs = state.definitions.len();
        let before_cons = state.placement_constraints.len() + state.validation_constraints.len();

        state
            .definitions
            .retain(|_, d| d.scope.as_ref() != Some(scope));

        let removed_ids: HashSet<String> = {
            let mut removed = HashSet::new();
            state.placement_constraints.retain(|(c, s)| {
                let keep = s.as_ref() != Some(scope);
                if !keep {
                    removed.insert(c.constraint_id().to_string());
                }
                keep
            });
            state.validation_constraints.retain(|(c, s)| {
                let keep = s.as_ref() != Some(scope);
                if !keep {
                    removed.insert(c.constraint_id().to_string());
                }
                keep
            });
            removed
        };
        state.constraint_ids.retain(|id| !removed_ids.contains(id));

        // Re-derive resolution for survivors; a vanished ancestor drops the
        // definition back to Deferred.
        let ids: Vec<TypeId> = state.definitions.keys().cloned().collect();
        state.deferred.clear();
        for id in ids {
            let def = state.definitions[&id].clone();
            let outcome = compute_inheritance(&state.definitions, &def);
            let mut updated = (*def).clone();
            match outcome {
                InheritanceOutcome::Root => updated.resolution = ResolutionState::Root,
                InheritanceOutcome::Resolved { children, parents } => {
                    updated.inherited_accepts_children = children;
                    updated.inherited_accepts_parents = parents;
                    updated.resolution = ResolutionState::Resolved;
                }
                InheritanceOutcome::Deferred { missing } => {
                    debug!(id = %id, parent = %missing, "parent purged with scope, deferring");
                    updated.inherited_accepts_children = Vec::new();
                    updated.inherited_accepts_parents = Vec::new();
                    updated.resolution = ResolutionState::Deferred;
                    state.deferred.push(id.clone());
                }
                InheritanceOutcome::Cyclic { .. } => {
                    updated.resolution = ResolutionState::Cyclic;
                }
            }
            state.definitions.insert(id, Arc::new(updated));
        }

        let removed = (before_defs - state.definitions.len())
            + (before_cons
                - state.placement_constraints.len()
                - state.validation_constraints.len());
        if removed > 0 {
            debug!(scope = %scope, removed, "released scope");
            state.generation += 1;
        }
        removed
    }

    // ========== Diagnostics ==========

    /// Export the inheritance forest to GraphViz DOT format
    pub fn to_dot(&self) -> String {
        let state = self.state.read();
        let mut output = String::new();

        output.push_str("digraph TypeForest {\n");
        output.push_str("  rankdir=BT;\n");
        output.push_str("  node [shape=box, style=rounded, fontname=\"Helvetica\", fontsize=10];\n");
        output.push('\n');

        let mut defs: Vec<_> = state.definitions.values().collect();
        defs.sort_by(|a, b| a.id.cmp(&b.id));

        for def in &defs {
            let color = match def.resolution {
                ResolutionState::Root | ResolutionState::Resolved => "black",
                ResolutionState::Deferred => "orange",
                ResolutionState::Cyclic => "red",
            };
            output.push_str(&format!(
                "  \"{}\" [color={}];\n",
                def.id.canonical(),
                color
            ));
        }
        output.push('\n');

        for def in &defs {
            if let Some(parent) = &def.parent {
                output.push_str(&format!(
                    "  \"{}\" -> \"{}\";\n",
                    def.id.canonical(),
                    parent.canonical()
                ));
            }
        }

        output.push_str("}\n");
        output
    }
}

/// Mark the definition at `id` as cyclic, clearing its inherited rules
fn mark_cyclic(state: &mut RegistryState, id: &TypeId) {
    if let Some(existing) = state.definitions.get(id) {
        if existing.resolution == ResolutionState::Cyclic {
            return;
        }
        let mut updated = (**existing).clone();
        updated.resolution = ResolutionState::Cyclic;
        updated.inherited_accepts_children = Vec::new();
        updated.inherited_accepts_parents = Vec::new();
        state.definitions.insert(id.clone(), Arc::new(updated));
        state.deferred.retain(|d| d != id);
    }
}

/// Copy-on-write extension of an existing [`TypeDefinition`]
///
/// Obtained from [`MetaDataRegistry::find_type`]; accumulates additions and
/// atomically replaces the stored definition on [`ExtensionDraft::commit`].
pub struct ExtensionDraft {
    registry: Arc<MetaDataRegistry>,
    draft: TypeDefinition,
}

impl ExtensionDraft {
    pub fn id(&self) -> &TypeId {
        &self.draft.id
    }

    /// Add an optional attribute to the existing schema
    pub fn optional_attribute(
        mut self,
        name: impl Into<String>,
        kind: crate::definition::AttributeKind,
    ) -> Self {
        let spec = crate::definition::AttributeSpec::new(name, kind, false);
        self.draft.attributes.insert(spec.name.clone(), spec);
        self
    }

    pub fn attribute(mut self, spec: crate::definition::AttributeSpec) -> Self {
        self.draft.attributes.insert(spec.name.clone(), spec);
        self
    }

    pub fn accepts_child(mut self, rule: crate::definition::ChildRule) -> Self {
        self.draft.direct_accepts_children.push(rule);
        self
    }

    pub fn accepts_parent(mut self, rule: crate::definition::ParentRule) -> Self {
        self.draft.direct_accepts_parents.push(rule);
        self
    }

    /// Atomically replace the stored definition with the extended value
    pub fn commit(self) -> Result<()> {
        self.registry.commit_extension(self.draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{AttributeKind, ChildRule};

    fn id(t: &str, s: &str) -> TypeId {
        TypeId::new(t, s).unwrap()
    }

    #[test]
    fn test_register_and_query() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("object", "base"), |b| {
                b.describe("base object")
                    .accepts_child(ChildRule::any_of_type("field"));
            })
            .unwrap();

        assert!(registry.is_registered(&id("object", "base")));
        assert!(!registry.is_registered(&id("object", "pojo")));
        let def = registry.get_type_definition(&id("object", "base")).unwrap();
        assert_eq!(def.resolution, ResolutionState::Root);
        assert_eq!(registry.get_registered_type_names(), vec!["object/base"]);
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("field", "long"), |b| {
                b.describe("first");
            })
            .unwrap();
        let err = registry.register_type(id("field", "long"), |b| {
            b.describe("second");
        });
        assert!(matches!(
            err,
            Err(MetaTypeError::RegistrationConflict { .. })
        ));
        let def = registry.get_type_definition(&id("field", "long")).unwrap();
        assert_eq!(def.description, "first");
    }

    #[test]
    fn test_immediate_inheritance_resolution() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("object", "base"), |b| {
                b.accepts_child(ChildRule::any_of_type("field"));
            })
            .unwrap();
        registry
            .register_type(id("object", "pojo"), |b| {
                b.parent(id("object", "base"));
            })
            .unwrap();

        let def = registry.get_type_definition(&id("object", "pojo")).unwrap();
        assert_eq!(def.resolution, ResolutionState::Resolved);
        assert_eq!(def.inherited_accepts_children.len(), 1);
    }

    #[test]
    fn test_deferred_then_resolved() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("object", "pojo"), |b| {
                b.parent(id("object", "base"));
            })
            .unwrap();
        let def = registry.get_type_definition(&id("object", "pojo")).unwrap();
        assert_eq!(def.resolution, ResolutionState::Deferred);

        registry
            .register_type(id("object", "base"), |b| {
                b.accepts_child(ChildRule::any_of_type("field"));
            })
            .unwrap();

        assert_eq!(registry.resolve_deferred_inheritance(), 1);
        let def = registry.get_type_definition(&id("object", "pojo")).unwrap();
        assert_eq!(def.resolution, ResolutionState::Resolved);
        assert_eq!(def.inherited_accepts_children.len(), 1);

        // Idempotent
        assert_eq!(registry.resolve_deferred_inheritance(), 0);
    }

    #[test]
    fn test_transitive_deferred_resolution() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("object", "grandchild"), |b| {
                b.parent(id("object", "child"));
            })
            .unwrap();
        registry
            .register_type(id("object", "child"), |b| {
                b.parent(id("object", "base"));
            })
            .unwrap();
        registry
            .register_type(id("object", "base"), |b| {
                b.accepts_child(ChildRule::any_of_type("field"));
            })
            .unwrap();

        // One call resolves both deferred entries.
        assert_eq!(registry.resolve_deferred_inheritance(), 2);
        let def = registry
            .get_type_definition(&id("object", "grandchild"))
            .unwrap();
        assert_eq!(def.resolution, ResolutionState::Resolved);
        assert_eq!(def.inherited_accepts_children.len(), 1);
    }

    #[test]
    fn test_cycle_marks_both_nodes() {
        let registry = MetaDataRegistry::new();
        registry
            .register_type(id("a", "a"), |b| {
                b.parent(id("b", "b"));
            })
            .unwrap();
        registry
            .register_type(id("b", "b"), |b| {
                b.parent(id("a", "a"));
            })
            .unwrap();
        registry
            .register_type(id("c", "c"), |b| {
                b.describe("unaffected");
            })
            .unwrap();

        registry.resolve_deferred_inheritance();

        let a = registry.get_type_definition(&id("a", "a")).unwrap();
        let b = registry.get_type_definition(&id("b", "b")).unwrap();
        assert_eq!(a.resolution, ResolutionState::Cyclic);
        assert_eq!(b.resolution, ResolutionState::Cyclic);

        // The rest of the registry is intact.
        assert_eq!(registry.get_all_type_definitions().len(), 3);
        let unresolved = registry.unresolved_types();
        assert_eq!(unresolved.len(), 2);
    }

    #[test]
    fn test_extension_draft_commit() {
        let registry = Arc::new(MetaDataRegistry::new());
        registry
            .register_type(id("field", "string"), |b| {
                b.required_attribute("name", AttributeKind::String);
            })
            .unwrap();

        let gen_before = registry.generation();
        registry
            .find_type(&id("field", "string"))
            .unwrap()
            .optional_attribute("maxLength", AttributeKind::Int)
            .commit()
            .unwrap();

        let def = registry.get_type_definition(&id("field", "string")).unwrap();
        assert!(def.attribute("maxLength").is_some());
        assert!(!def.attribute("maxLength").unwrap().required);
        assert!(def.attribute("name").unwrap().required);
        assert!(registry.generation() > gen_before);
    }

    #[test]
    fn test_find_type_missing() {
        let registry = Arc::new(MetaDataRegistry::new());
        assert!(matches!(
            registry.find_type(&id("no", "such")),
            Err(MetaTypeError::NotFound { .. })
        ));
    }

    #[test]
    fn test_release_scope_purges_and_defers_survivors() {
        let registry = MetaDataRegistry::new();
        let scope = ScopeTag::new("module-a");

        registry
            .register_type_scoped(scope.clone(), id("object", "base"), |b| {
                b.accepts_child(ChildRule::any_of_type("field"));
            })
            .unwrap();
        registry
            .register_type(id("object", "pojo"), |b| {
                b.parent(id("object", "base"));
            })
            .unwrap();

        let removed = registry.release_scope(&scope);
        assert_eq!(removed, 1);
        assert!(!registry.is_registered(&id("object", "base")));

        // Survivor's parent vanished: back to Deferred, not re-rooted.
        let def = registry.get_type_definition(&id("object", "pojo")).unwrap();
        assert_eq!(def.resolution, ResolutionState::Deferred);
        assert!(def.inherited_accepts_children.is_empty());
    }

    #[test]
    fn test_to_dot_contains_edges() {
        let registry = MetaDataRegistry::new();
        registry.register_type(id("object", "base"), |_| {}).unwrap();
        registry
            .register_type(id("object", "pojo"), |b| {
                b.parent(id("object", "base"));
            })
            .unwrap();
        let dot = registry.to_dot();
        assert!(dot.contains("\"object/pojo\" -> \"object/base\""));
    }
}
