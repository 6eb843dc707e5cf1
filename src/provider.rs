//! Provider bootstrap
//!
//! A provider is the unit of registration contributed by one module: it
//! declares an id, dependencies on other providers, and a priority, and
//! populates the registry when invoked. Bootstrap collects the discovered
//! providers, orders them topologically (Kahn's algorithm, ties broken by
//! ascending priority then discovery order), invokes each, and finishes with
//! one deferred-inheritance pass.
//!
//! One broken provider never blocks the rest: registration errors and panics
//! are logged and the provider is skipped. A true dependency cycle is fatal,
//! since no valid order exists.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MetaTypeError, Result};
use crate::registry::{MetaDataRegistry, UnresolvedDiagnostic};

/// A unit of type registration contributed by one module
pub trait TypeProvider: Send + Sync {
    /// Stable id, unique among providers
    fn provider_id(&self) -> &str;

    /// Ids of providers that must run before this one
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tie-break among providers with no ordering constraint; lower runs first
    fn priority(&self) -> i32 {
        0
    }

    fn description(&self) -> &str {
        ""
    }

    /// Populate the registry with this module's types and constraints
    fn register_types(&self, registry: &MetaDataRegistry) -> Result<()>;
}

/// Link-time provider discovery record
///
/// Modules submit their providers at link time:
///
/// ```ignore
/// inventory::submit! {
///     ProviderRegistration::new(|| Box::new(MyProvider))
/// }
/// ```
pub struct ProviderRegistration {
    factory: fn() -> Box<dyn TypeProvider>,
}

impl ProviderRegistration {
    pub const fn new(factory: fn() -> Box<dyn TypeProvider>) -> Self {
        Self { factory }
    }
}

inventory::collect!(ProviderRegistration);

/// Instantiate every link-time-registered provider
pub fn discover_providers() -> Vec<Box<dyn TypeProvider>> {
    inventory::iter::<ProviderRegistration>
        .into_iter()
        .map(|r| (r.factory)())
        .collect()
}

/// Outcome of one bootstrap run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapReport {
    /// Provider ids that ran successfully, in invocation order
    pub registered: Vec<String>,
    /// Provider ids that failed or panicked and were skipped
    pub skipped: Vec<String>,
    /// Count of definitions resolved by the post-registration pass
    pub resolved: usize,
    /// Definitions still unresolved after bootstrap (diagnostic, not fatal)
    pub unresolved: Vec<UnresolvedDiagnostic>,
}

/// Run discovery and bootstrap against the registry
pub fn bootstrap_discovered(registry: &MetaDataRegistry) -> Result<BootstrapReport> {
    bootstrap(registry, discover_providers())
}

/// Order the providers and invoke each against the registry
pub fn bootstrap(
    registry: &MetaDataRegistry,
    providers: Vec<Box<dyn TypeProvider>>,
) -> Result<BootstrapReport> {
    let order = topological_order(&providers)?;

    let mut registered = Vec::new();
    let mut skipped = Vec::new();

    for idx in order {
        let provider = &providers[idx];
        let id = provider.provider_id().to_string();
        debug!(provider_id = %id, "running provider");

        let outcome = catch_unwind(AssertUnwindSafe(|| provider.register_types(registry)));
        match outcome {
            Ok(Ok(())) => registered.push(id),
            Ok(Err(e)) => {
                warn!(provider_id = %id, error = %e, "provider failed, skipping");
                skipped.push(id);
            }
            Err(_) => {
                warn!(provider_id = %id, "provider panicked, skipping");
                skipped.push(id);
            }
        }
    }

    let resolved = registry.resolve_deferred_inheritance();
    let unresolved = registry.unresolved_types();
    for diag in &unresolved {
        warn!(id = %diag.id, state = ?diag.state, "type unresolved after bootstrap");
    }

    info!(
        registered = registered.len(),
        skipped = skipped.len(),
        resolved,
        unresolved = unresolved.len(),
        "bootstrap complete"
    );

    Ok(BootstrapReport {
        registered,
        skipped,
        resolved,
        unresolved,
    })
}

/// Kahn's algorithm over the provider dependency graph
///
/// Ready-set ties are broken by ascending priority, then by discovery order,
/// so bootstrap is deterministic. A dependency on an unknown provider id is
/// logged and ignored as an edge. A true cycle has no valid order and is
/// fatal.
fn topological_order(providers: &[Box<dyn TypeProvider>]) -> Result<Vec<usize>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(providers.len(), providers.len());
    let mut nodes: Vec<NodeIndex> = Vec::with_capacity(providers.len());
    let mut by_id: HashMap<&str, usize> = HashMap::with_capacity(providers.len());

    for (idx, provider) in providers.iter().enumerate() {
        nodes.push(graph.add_node(idx));
        if by_id.insert(provider.provider_id(), idx).is_some() {
            warn!(provider_id = provider.provider_id(), "duplicate provider id; later one shadows");
        }
    }

    // Edge dep -> provider: the dependency must run first.
    for (idx, provider) in providers.iter().enumerate() {
        for dep in provider.dependencies() {
            match by_id.get(dep.as_str()) {
                Some(&dep_idx) => {
                    graph.add_edge(nodes[dep_idx], nodes[idx], ());
                }
                None => {
                    warn!(
                        provider_id = provider.provider_id(),
                        dependency = %dep,
                        "dependency on unknown provider, ignoring edge"
                    );
                }
            }
        }
    }

    let mut in_degree: Vec<usize> = nodes
        .iter()
        .map(|&n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();

    let mut ready: Vec<usize> = (0..providers.len())
        .filter(|&i| in_degree[i] == 0)
        .collect();
    let mut order = Vec::with_capacity(providers.len());

    while !ready.is_empty() {
        // Lowest priority first; discovery order breaks remaining ties.
        let pick = ready
            .iter()
            .enumerate()
            .min_by_key(|&(_, &i)| (providers[i].priority(), i))
            .map(|(pos, _)| pos)
            .unwrap_or(0);
        let idx = ready.swap_remove(pick);
        order.push(idx);

        for neighbor in graph.neighbors_directed(nodes[idx], Direction::Outgoing) {
            let n_idx = graph[neighbor];
            in_degree[n_idx] -= 1;
            if in_degree[n_idx] == 0 {
                ready.push(n_idx);
            }
        }
    }

    if order.len() < providers.len() {
        let members: Vec<String> = (0..providers.len())
            .filter(|i| !order.contains(i))
            .map(|i| providers[i].provider_id().to_string())
            .collect();
        return Err(MetaTypeError::ProviderDependencyCycle { members });
    }

    Ok(order)
}
