//! Module graph arena and weight propagation.
//!
//! Modules live in a `Vec` addressed by [`ModuleId`], ordered by
//! (chain id, position id). Adjacency is stored as index lists in both
//! directions. Topology is frozen once built; placement-dependent state
//! lives in [`crate::layout::Layout`].

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use chainplace_core::Capability;

use crate::error::GraphError;

/// Stable index of a module inside a [`ChainGraph`].
pub type ModuleId = usize;

/// Upstream description of one module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    /// Work class, the key into the profiling table.
    pub class: String,
    pub capability: Capability,
    pub chain: u32,
    pub position: u32,
    /// Stateful modules can never be replicated.
    #[serde(default)]
    pub stateful: bool,
}

/// Upstream description of a whole graph: modules plus directed edges by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    pub modules: Vec<ModuleSpec>,
    #[serde(default)]
    pub edges: Vec<(String, String)>,
}

impl GraphSpec {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
}

/// One processing stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    pub class: String,
    pub capability: Capability,
    /// Chain id as supplied upstream.
    pub chain: u32,
    /// Dense 0-based chain index, the column in capacity rows.
    pub chain_index: usize,
    pub position: u32,
    pub stateful: bool,
    pub successors: Vec<ModuleId>,
    pub predecessors: Vec<ModuleId>,
    /// Fraction of the chain's entry traffic reaching this module.
    pub weight: f64,
}

impl Module {
    pub fn is_branch(&self) -> bool {
        self.successors.len() > 1
    }

    pub fn is_merge(&self) -> bool {
        self.predecessors.len() > 1
    }

    pub fn is_entry(&self) -> bool {
        self.predecessors.is_empty()
    }

    pub fn is_tail(&self) -> bool {
        self.successors.is_empty()
    }

    /// False for stateful, branch, and merge modules.
    pub fn is_dup_safe(&self) -> bool {
        !self.stateful && !self.is_branch() && !self.is_merge()
    }
}

/// The global module DAG across all chains.
#[derive(Debug, Clone)]
pub struct ChainGraph {
    modules: Vec<Module>,
    topo: Vec<ModuleId>,
    chain_count: usize,
    dual: Vec<ModuleId>,
}

impl ChainGraph {
    /// Build and validate the arena from an upstream spec.
    pub fn from_spec(spec: &GraphSpec) -> Result<Self, GraphError> {
        let mut order: Vec<usize> = (0..spec.modules.len()).collect();
        order.sort_by_key(|&i| (spec.modules[i].chain, spec.modules[i].position, i));

        let mut ids: HashMap<&str, ModuleId> = HashMap::new();
        let mut modules = Vec::with_capacity(spec.modules.len());
        let chain_ids: BTreeSet<u32> = spec.modules.iter().map(|m| m.chain).collect();
        let chain_index: HashMap<u32, usize> =
            chain_ids.iter().enumerate().map(|(i, &c)| (c, i)).collect();

        for &i in &order {
            let m = &spec.modules[i];
            if m.capability == Capability::Invalid {
                return Err(GraphError::InvalidCapability(m.name.clone()));
            }
            if ids.insert(m.name.as_str(), modules.len()).is_some() {
                return Err(GraphError::DuplicateModule(m.name.clone()));
            }
            modules.push(Module {
                name: m.name.clone(),
                class: m.class.clone(),
                capability: m.capability,
                chain: m.chain,
                chain_index: chain_index[&m.chain],
                position: m.position,
                stateful: m.stateful,
                successors: Vec::new(),
                predecessors: Vec::new(),
                weight: 0.0,
            });
        }

        for (src, dst) in &spec.edges {
            let s = *ids
                .get(src.as_str())
                .ok_or_else(|| GraphError::UnknownModule(src.clone()))?;
            let d = *ids
                .get(dst.as_str())
                .ok_or_else(|| GraphError::UnknownModule(dst.clone()))?;
            if s == d {
                return Err(GraphError::SelfLoop(src.clone()));
            }
            if !modules[s].successors.contains(&d) {
                modules[s].successors.push(d);
                modules[d].predecessors.push(s);
            }
        }

        let topo = topological_order(&modules)?;
        let dual = modules
            .iter()
            .enumerate()
            .filter(|(_, m)| m.capability.is_dual())
            .map(|(id, _)| id)
            .collect();

        let mut graph = ChainGraph {
            modules,
            topo,
            chain_count: chain_ids.len(),
            dual,
        };
        graph.propagate_weights();
        debug!(
            modules = graph.len(),
            chains = graph.chain_count,
            dual = graph.dual.len(),
            "module graph built"
        );
        Ok(graph)
    }

    /// Assign weight 1 to every chain entry and push it along edges,
    /// splitting evenly across fan-out. Idempotent.
    pub fn propagate_weights(&mut self) {
        for m in &mut self.modules {
            m.weight = if m.is_entry() { 1.0 } else { 0.0 };
        }
        for idx in 0..self.topo.len() {
            let id = self.topo[idx];
            let share = self.modules[id].weight / self.modules[id].successors.len().max(1) as f64;
            for s in self.modules[id].successors.clone() {
                self.modules[s].weight += share;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id]
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Ids in a topological order, ties broken by (chain, position).
    pub fn topological(&self) -> &[ModuleId] {
        &self.topo
    }

    pub fn chain_count(&self) -> usize {
        self.chain_count
    }

    /// Dual-capable modules in traversal order; one pattern bit each.
    pub fn dual_modules(&self) -> &[ModuleId] {
        &self.dual
    }
}

/// Kahn's algorithm, always releasing the smallest ready id first.
fn topological_order(modules: &[Module]) -> Result<Vec<ModuleId>, GraphError> {
    let mut indegree: Vec<usize> = modules.iter().map(|m| m.predecessors.len()).collect();
    let mut ready: BinaryHeap<Reverse<ModuleId>> = indegree
        .iter()
        .enumerate()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| Reverse(id))
        .collect();
    let mut order = Vec::with_capacity(modules.len());

    while let Some(Reverse(id)) = ready.pop() {
        order.push(id);
        for &s in &modules[id].successors {
            indegree[s] -= 1;
            if indegree[s] == 0 {
                ready.push(Reverse(s));
            }
        }
    }

    if order.len() != modules.len() {
        let stuck = indegree
            .iter()
            .position(|d| *d > 0)
            .map(|id| modules[id].name.clone())
            .unwrap_or_default();
        return Err(GraphError::Cycle(stuck));
    }
    Ok(order)
}
