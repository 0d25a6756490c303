//! Latency feasibility and bounce accounting.
//!
//! A forward pass in topological order tracks the worst-case cumulative
//! cycles at every module: CPU-resident modules add their profiled cost
//! and every substrate change along an edge adds the bounce penalty. A
//! chain entering on the CPU pays one bounce up front.

use crate::capacity::CostModel;
use crate::error::PlacementResult;
use crate::graph::ChainGraph;
use crate::layout::Layout;

use chainplace_core::EngineConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct DelayReport {
    /// End-to-end cycles per chain index.
    pub per_chain: Vec<f64>,
    /// True when every chain fits its budget.
    pub feasible: bool,
}

impl DelayReport {
    pub fn total(&self) -> f64 {
        self.per_chain.iter().sum()
    }
}

/// Cumulative cycles on leaving each module.
pub fn calc_delay(
    graph: &ChainGraph,
    layout: &Layout,
    costs: CostModel<'_>,
    config: &EngineConfig,
) -> PlacementResult<Vec<f64>> {
    let mut arrival = vec![0.0_f64; graph.len()];
    let mut exit = vec![0.0_f64; graph.len()];

    for &id in graph.topological() {
        let module = graph.module(id);
        if module.is_entry() && layout.is_cpu(id) {
            arrival[id] = config.bounce_cycles;
        }
        exit[id] = arrival[id];
        if layout.is_cpu(id) {
            exit[id] += costs.cycles(&module.class)?;
        }
        for &next in &module.successors {
            let mut pass = exit[id];
            if layout.substrate(next) != layout.substrate(id) {
                pass += config.bounce_cycles;
            }
            arrival[next] = arrival[next].max(pass);
        }
    }
    Ok(exit)
}

/// Per-chain delay: the worst terminal module of each chain.
pub fn chain_delays(graph: &ChainGraph, cumulative: &[f64]) -> Vec<f64> {
    let mut per_chain = vec![0.0_f64; graph.chain_count()];
    for (id, module) in graph.modules().iter().enumerate() {
        if module.is_tail() {
            let slot = &mut per_chain[module.chain_index];
            *slot = slot.max(cumulative[id]);
        }
    }
    per_chain
}

/// Compare every chain's delay against its budget in cycles. An empty
/// budget list accepts everything.
pub fn verify_time(
    graph: &ChainGraph,
    layout: &Layout,
    costs: CostModel<'_>,
    config: &EngineConfig,
    budgets: &[f64],
) -> PlacementResult<DelayReport> {
    let cumulative = calc_delay(graph, layout, costs, config)?;
    let per_chain = chain_delays(graph, &cumulative);
    let feasible = budgets.is_empty() || per_chain.iter().zip(budgets).all(|(d, max)| d <= max);
    Ok(DelayReport { per_chain, feasible })
}

/// Number of CPU-resident modules entered from another substrate,
/// counting chains that start on the CPU.
pub fn count_bounce(graph: &ChainGraph, layout: &Layout) -> usize {
    graph
        .modules()
        .iter()
        .enumerate()
        .filter(|&(id, m)| {
            layout.is_cpu(id)
                && (m.is_entry() || m.predecessors.iter().any(|&p| layout.substrate(p) != layout.substrate(id)))
        })
        .count()
}
