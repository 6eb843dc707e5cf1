//! Constraint flattening
//!
//! Derives, from the inheritance graph plus registered placement constraints,
//! a flat per-parent rule table answering placement questions in O(1)
//! amortized. The table is pure derived state: it is rebuilt from the
//! registry whenever the generation counter moves and swapped in atomically,
//! so readers never observe a partially built table.
//!
//! Decision procedure (deliberate resolution of the rule-precedence
//! ambiguity; see DESIGN.md):
//! 1. every applicable placement constraint must allow — a constraint denial
//!    always overrides a declarative allowance;
//! 2. a direct rule masks an inherited rule targeting the same
//!    (child type, child subtype) pair, so subtypes can narrow what their
//!    ancestors accept;
//! 3. if the child declares parent rules, at least one must match;
//! 4. no matching rule means deny.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constraint::PlacementConstraint;
use crate::definition::{ChildRule, ParentRule, TypeDefinition};
use crate::registry::MetaDataRegistry;
use crate::type_id::TypeId;

/// Where a flattened rule came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrigin {
    Direct,
    Inherited,
}

/// One placement rule resolved against a concrete parent type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenedRule {
    pub rule: ChildRule,
    pub origin: RuleOrigin,
    pub specificity: u8,
}

/// Per-parent entry in the flattened table
#[derive(Default)]
struct ParentEntry {
    /// Child rules, most specific first, direct before inherited at equal
    /// specificity
    rules: Vec<FlattenedRule>,
}

/// Immutable snapshot of the flattened placement state
pub struct PlacementTable {
    generation: u64,
    parents: HashMap<TypeId, ParentEntry>,
    /// Parent-acceptance rules per child type (direct ∪ inherited)
    child_parent_rules: HashMap<TypeId, Vec<ParentRule>>,
    constraints: Vec<Arc<dyn PlacementConstraint>>,
}

impl PlacementTable {
    fn empty() -> Self {
        Self {
            generation: u64::MAX,
            parents: HashMap::new(),
            child_parent_rules: HashMap::new(),
            constraints: Vec::new(),
        }
    }

    fn build(
        generation: u64,
        definitions: &[Arc<TypeDefinition>],
        constraints: Vec<Arc<dyn PlacementConstraint>>,
    ) -> Self {
        let mut parents = HashMap::with_capacity(definitions.len());
        let mut child_parent_rules = HashMap::new();

        for def in definitions {
            let mut rules: Vec<FlattenedRule> = Vec::new();

            for rule in &def.direct_accepts_children {
                rules.push(FlattenedRule {
                    specificity: rule.specificity(),
                    rule: rule.clone(),
                    origin: RuleOrigin::Direct,
                });
            }
            // A direct rule for the same (type, subtype) target masks the
            // inherited one; nearer ancestors were collected first and mask
            // farther ones the same way.
            for rule in &def.inherited_accepts_children {
                let masked = rules.iter().any(|existing| existing.rule.same_target(rule));
                if !masked {
                    rules.push(FlattenedRule {
                        specificity: rule.specificity(),
                        rule: rule.clone(),
                        origin: RuleOrigin::Inherited,
                    });
                }
            }

            let origin_rank = |o: RuleOrigin| match o {
                RuleOrigin::Direct => 0u8,
                RuleOrigin::Inherited => 1,
            };
            rules.sort_by(|a, b| {
                b.specificity
                    .cmp(&a.specificity)
                    .then(origin_rank(a.origin).cmp(&origin_rank(b.origin)))
            });

            let parent_rules: Vec<ParentRule> = def.all_accepts_parents().cloned().collect();
            if !parent_rules.is_empty() {
                child_parent_rules.insert(def.id.clone(), parent_rules);
            }
            parents.insert(def.id.clone(), ParentEntry { rules });
        }

        debug!(generation, types = parents.len(), "rebuilt placement table");
        Self {
            generation,
            parents,
            child_parent_rules,
            constraints,
        }
    }

    /// The flattened rules for one parent type, most specific first
    fn rules_for(&self, parent: &TypeId) -> &[FlattenedRule] {
        self.parents
            .get(parent)
            .map(|e| e.rules.as_slice())
            .unwrap_or(&[])
    }

    fn decide(&self, parent: &TypeId, child: &TypeId, child_name: &str) -> bool {
        // Constraints narrow, never widen: one denial is final.
        for constraint in &self.constraints {
            if constraint.applies_to(parent, child)
                && !constraint.evaluate(parent, child, child_name)
            {
                debug!(
                    constraint_id = constraint.constraint_id(),
                    %parent, %child, child_name, "placement vetoed by constraint"
                );
                return false;
            }
        }

        // The child side: if it declares parent rules, one must match.
        if let Some(parent_rules) = self.child_parent_rules.get(child) {
            if !parent_rules.iter().any(|r| r.matches(parent, child_name)) {
                return false;
            }
        }

        // The parent side: default deny when nothing matches.
        self.rules_for(parent)
            .iter()
            .any(|f| f.rule.matches(child, child_name))
    }
}

/// Lazily rebuilt, atomically swapped placement lookup
///
/// Owned by the registry; readers load the current snapshot without locking.
pub struct ConstraintFlattener {
    table: ArcSwap<PlacementTable>,
}

impl ConstraintFlattener {
    pub(crate) fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(PlacementTable::empty()),
        }
    }

    /// Answer a placement question against the current registry state
    ///
    /// O(1) amortized: the snapshot is reused until the registry generation
    /// moves. Racing rebuilds each produce a valid table; the last swap wins.
    pub fn is_placement_allowed(
        &self,
        registry: &MetaDataRegistry,
        parent: &TypeId,
        child: &TypeId,
        child_name: &str,
    ) -> bool {
        let table = self.current(registry);
        table.decide(parent, child, child_name)
    }

    /// The flattened rule list for a parent type, for diagnostics
    pub fn flattened_rules(
        &self,
        registry: &MetaDataRegistry,
        parent: &TypeId,
    ) -> Vec<FlattenedRule> {
        self.current(registry).rules_for(parent).to_vec()
    }

    fn current(&self, registry: &MetaDataRegistry) -> Arc<PlacementTable> {
        let snapshot = self.table.load_full();
        let generation = registry.generation();
        if snapshot.generation == generation {
            return snapshot;
        }

        let (generation, definitions, constraints) = registry.placement_inputs();
        let rebuilt = Arc::new(PlacementTable::build(generation, &definitions, constraints));
        self.table.store(Arc::clone(&rebuilt));
        rebuilt
    }
}
