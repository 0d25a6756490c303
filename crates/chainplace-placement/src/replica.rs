//! Replica allocation search.
//!
//! Every CPU subgroup costs one core. Subgroups below their chain's
//! minimum rate are topped up first; whatever remains of the spare-core
//! budget is then distributed across the replicable subgroups in every
//! possible way by [`Distributions`].

use tracing::debug;

use chainplace_core::{EngineConfig, RateBounds};

use crate::capacity::{inequal_form, CostModel};
use crate::error::PlacementResult;
use crate::graph::ChainGraph;
use crate::layout::Layout;
use crate::subgroup::{Decomposition, DupSplit};

/// Every way of splitting `total` identical cores across `slots`
/// subgroups, first slot descending from `total` to zero.
///
/// `distributions(2, 2)` yields `[2, 0]`, `[1, 1]`, `[0, 2]`.
#[derive(Debug, Clone)]
pub struct Distributions {
    counts: Vec<u32>,
    done: bool,
}

pub fn distributions(total: u32, slots: usize) -> Distributions {
    let mut counts = vec![0; slots];
    if let Some(first) = counts.first_mut() {
        *first = total;
    }
    Distributions {
        counts,
        done: slots == 0,
    }
}

impl Iterator for Distributions {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Vec<u32>> {
        if self.done {
            return None;
        }
        let current = self.counts.clone();

        let last = self.counts.len() - 1;
        let tail = std::mem::take(&mut self.counts[last]);
        match (0..last).rev().find(|&i| self.counts[i] > 0) {
            Some(i) => {
                self.counts[i] -= 1;
                self.counts[i + 1] = tail + 1;
            }
            None => self.done = true,
        }
        Some(current)
    }
}

/// State after every subgroup has received its minimum cores.
#[derive(Debug, Clone)]
pub struct PreAllocation {
    /// Layout carrying the minimum replica counts.
    pub layout: Layout,
    /// Minimum replicas per subgroup index.
    pub base: Vec<u32>,
    /// Replicable subgroups still below their chain's maximum rate.
    pub eligible: Vec<usize>,
    /// Spare cores left for distribution.
    pub usable: u32,
}

impl PreAllocation {
    /// Layout with `extra[slot]` replicas added to `eligible[slot]`.
    pub fn apply(&self, decomposition: &Decomposition, extra: &[u32]) -> Layout {
        let mut layout = self.layout.clone();
        for (&group, &more) in self.eligible.iter().zip(extra) {
            layout.set_replicas(&decomposition.subgroups[group].members, self.base[group] + more);
        }
        layout
    }
}

/// Give every subgroup one core, and replicable subgroups below their
/// chain minimum as many as the minimum needs.
///
/// Returns `None` when the spare budget cannot cover that, or when a
/// pinned subgroup is under-rate.
#[allow(clippy::too_many_arguments)]
pub fn pre_allocate(
    graph: &ChainGraph,
    mut layout: Layout,
    decomposition: &Decomposition,
    split: &DupSplit,
    costs: CostModel<'_>,
    config: &EngineConfig,
    bounds: &[RateBounds],
    spare: i64,
) -> PlacementResult<Option<PreAllocation>> {
    let mut usable = spare;
    let mut base = vec![1; decomposition.subgroups.len()];
    let mut eligible = Vec::new();

    for (idx, group) in decomposition.subgroups.iter().enumerate() {
        let chain = group.chain_index(graph);
        let rate = inequal_form(graph, &layout, group, costs, config)?.standalone_rate();
        let bound = bounds[chain];

        if split.pinned.contains(&idx) {
            if rate < bound.min {
                debug!(subgroup = idx, chain, rate, min = bound.min, "pinned subgroup under minimum rate");
                return Ok(None);
            }
            usable -= 1;
        } else if rate < bound.min {
            let needed = (bound.min / rate).ceil();
            if needed > usable as f64 {
                debug!(subgroup = idx, chain, needed, usable, "not enough cores to reach minimum rate");
                return Ok(None);
            }
            let needed = needed as u32;
            usable -= i64::from(needed);
            base[idx] = needed;
            layout.set_replicas(&group.members, needed);
            if rate * f64::from(needed) < bound.max {
                eligible.push(idx);
            }
        } else {
            usable -= 1;
            if rate < bound.max {
                eligible.push(idx);
            }
        }

        if usable < 0 {
            debug!(subgroups = decomposition.subgroups.len(), spare, "more subgroups than spare cores");
            return Ok(None);
        }
    }

    Ok(Some(PreAllocation {
        layout,
        base,
        eligible,
        usable: u32::try_from(usable).unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{edge, module};
    use crate::graph::GraphSpec;
    use crate::subgroup::{count_dup, decompose};
    use chainplace_core::{Capability, ProfileTable, Substrate};

    #[test]
    fn distributions_follow_descending_first_slot() {
        let all: Vec<Vec<u32>> = distributions(2, 2).collect();
        assert_eq!(all, vec![vec![2, 0], vec![1, 1], vec![0, 2]]);
    }

    #[test]
    fn distributions_count_and_sum() {
        // C(3 + 3 - 1, 3 - 1) = 10
        let all: Vec<Vec<u32>> = distributions(3, 3).collect();
        assert_eq!(all.len(), 10);
        assert!(all.iter().all(|d| d.iter().sum::<u32>() == 3));
        let mut unique = all.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 10);
    }

    #[test]
    fn distributions_edge_cases() {
        assert_eq!(distributions(0, 2).collect::<Vec<_>>(), vec![vec![0, 0]]);
        assert_eq!(distributions(4, 1).collect::<Vec<_>>(), vec![vec![4]]);
        assert_eq!(distributions(4, 0).count(), 0);
    }

    // chain 0: one CPU module of cost `c`, then a switch tail.
    fn setup(c: u64, stateful: bool) -> (ChainGraph, ProfileTable) {
        let mut spec = GraphSpec {
            modules: vec![
                module("m", "Work", Capability::CpuOnly, 0, 0),
                module("out", "Fwd", Capability::SwitchOnly, 0, 1),
            ],
            edges: vec![edge("m", "out")],
        };
        spec.modules[0].stateful = stateful;
        (
            ChainGraph::from_spec(&spec).unwrap(),
            ProfileTable::from_entries([("Work", c)], 8),
        )
    }

    fn run(
        graph: &ChainGraph,
        table: &ProfileTable,
        bounds: RateBounds,
        spare: i64,
    ) -> (Decomposition, Option<PreAllocation>) {
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(graph, &mut layout);
        let split = count_dup(graph, &mut layout, &d.subgroups, 0);
        let pre = pre_allocate(
            graph,
            layout,
            &d,
            &split,
            CostModel::Profiled(table),
            &EngineConfig::default(),
            &[bounds],
            spare,
        )
        .unwrap();
        (d, pre)
    }

    #[test]
    fn under_rate_group_is_topped_up() {
        // 6800 cycles gives 3e9 b/s per replica; 7e9 needs three.
        let (g, t) = setup(6800, false);
        let (d, pre) = run(&g, &t, RateBounds::new(7e9, 2e10), 5);
        let pre = pre.expect("feasible");
        assert_eq!(pre.base, vec![3]);
        assert_eq!(pre.usable, 2);
        assert_eq!(pre.eligible, vec![0]);
        let layout = pre.apply(&d, &[2]);
        assert_eq!(d.subgroups[0].replicas(&layout), 5);
    }

    #[test]
    fn top_up_beyond_budget_is_infeasible() {
        let (g, t) = setup(6800, false);
        let (_, pre) = run(&g, &t, RateBounds::new(7e9, 2e10), 2);
        assert!(pre.is_none());
    }

    #[test]
    fn pinned_under_rate_is_infeasible() {
        let (g, t) = setup(6800, true);
        let (_, pre) = run(&g, &t, RateBounds::new(7e9, 2e10), 8);
        assert!(pre.is_none());
    }

    #[test]
    fn saturated_group_is_not_eligible() {
        let (g, t) = setup(6800, false);
        let (_, pre) = run(&g, &t, RateBounds::new(1e9, 2e9), 4);
        let pre = pre.expect("feasible");
        assert_eq!(pre.base, vec![1]);
        assert!(pre.eligible.is_empty());
        assert_eq!(pre.usable, 3);
    }

    #[test]
    fn each_subgroup_needs_a_core() {
        let (g, t) = setup(6800, false);
        let (_, pre) = run(&g, &t, RateBounds::new(1e9, 2e9), 0);
        assert!(pre.is_none());
    }
}
