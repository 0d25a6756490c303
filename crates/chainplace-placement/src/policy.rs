//! Selection policies.
//!
//! Each policy picks which placement patterns to visit, which cost model
//! to use, and how spare cores become replicas. They all share pattern
//! decoding, subgroup decomposition, capacity rows, and the solver.
//!
//! | mode | policy | patterns | replicas |
//! |---|---|---|---|
//! | 0 | full search | all | every distribution |
//! | 1 | uniform cost | all | every distribution, synthetic costs |
//! | 2 | greedy | all switch | bottleneck first, chain by chain |
//! | 3 | all switch | one | every distribution |
//! | 4 | no replicas | all | one per subgroup |
//! | 5 | minimum bounce | all | even split, ranked by fewest bounces |
//! | 7 | all CPU | one | every distribution |

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use chainplace_core::Substrate;

use crate::capacity::{inequal_form, CostModel};
use crate::engine::{Evaluator, PlacementEngine, SearchOutcome};
use crate::error::{PlacementError, PlacementResult};
use crate::latency::count_bounce;
use crate::optimizer::ThroughputSolver;
use crate::pattern::{enum_case, Pattern};
use crate::ranking::{Candidate, Ranking};
use crate::replica::{distributions, pre_allocate};
use crate::subgroup::{count_dup, decompose};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Policy {
    FullSearch,
    UniformCost,
    Greedy,
    AllSwitch,
    NoReplicas,
    MinBounce,
    AllCpu,
}

impl Policy {
    /// Mode 6 is accepted as an alias of full search.
    pub fn from_mode(mode: u8) -> PlacementResult<Self> {
        match mode {
            0 | 6 => Ok(Policy::FullSearch),
            1 => Ok(Policy::UniformCost),
            2 => Ok(Policy::Greedy),
            3 => Ok(Policy::AllSwitch),
            4 => Ok(Policy::NoReplicas),
            5 => Ok(Policy::MinBounce),
            7 => Ok(Policy::AllCpu),
            other => Err(PlacementError::UnknownPolicy(other)),
        }
    }

    pub fn mode(self) -> u8 {
        match self {
            Policy::FullSearch => 0,
            Policy::UniformCost => 1,
            Policy::Greedy => 2,
            Policy::AllSwitch => 3,
            Policy::NoReplicas => 4,
            Policy::MinBounce => 5,
            Policy::AllCpu => 7,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Policy::FullSearch => "full-search",
            Policy::UniformCost => "uniform-cost",
            Policy::Greedy => "greedy",
            Policy::AllSwitch => "all-switch",
            Policy::NoReplicas => "no-replicas",
            Policy::MinBounce => "min-bounce",
            Policy::AllCpu => "all-cpu",
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.mode())
    }
}

pub(crate) fn run<S: ThroughputSolver>(engine: &PlacementEngine<S>, policy: Policy) -> PlacementResult<SearchOutcome> {
    let profiled = CostModel::Profiled(engine.profile());
    let width = engine.graph().dual_modules().len();
    let max_dual = engine.config().max_dual_modules;

    let ranking = match policy {
        Policy::FullSearch => full_search(&engine.evaluator(profiled), &enum_case(engine.graph(), max_dual)?)?,
        Policy::UniformCost => {
            let uniform = CostModel::Uniform(engine.config().uniform_cycle_cost);
            full_search(&engine.evaluator(uniform), &enum_case(engine.graph(), max_dual)?)?
        }
        Policy::Greedy => greedy(&engine.evaluator(profiled), &Pattern::uniform(width, Substrate::Switch))?,
        Policy::AllSwitch => full_search(&engine.evaluator(profiled), &[Pattern::uniform(width, Substrate::Switch)])?,
        Policy::AllCpu => full_search(&engine.evaluator(profiled), &[Pattern::uniform(width, Substrate::Cpu)])?,
        Policy::NoReplicas => no_replicas(&engine.evaluator(profiled), &enum_case(engine.graph(), max_dual)?)?,
        Policy::MinBounce => min_bounce(&engine.evaluator(profiled), &enum_case(engine.graph(), max_dual)?)?,
    };

    if ranking.is_empty() {
        Ok(SearchOutcome::NoFeasiblePlacement)
    } else {
        Ok(SearchOutcome::Found(ranking))
    }
}

/// Every pattern, every distribution of spare cores; ranked by objective.
fn full_search<S: ThroughputSolver>(ev: &Evaluator<'_, S>, patterns: &[Pattern]) -> PlacementResult<Ranking> {
    let mut found = Vec::new();
    for pattern in patterns {
        found.extend(replica_search(ev, pattern)?);
    }
    Ok(Ranking::by_objective(found))
}

/// All feasible replica distributions for one pattern.
pub(crate) fn replica_search<S: ThroughputSolver>(
    ev: &Evaluator<'_, S>,
    pattern: &Pattern,
) -> PlacementResult<Vec<Candidate>> {
    let graph = ev.graph;
    let mut layout = ev.layout_for(pattern);
    if !ev.latency_ok(pattern, &layout)? {
        return Ok(Vec::new());
    }
    let decomposition = decompose(graph, &mut layout);
    let split = count_dup(graph, &mut layout, &decomposition.subgroups, ev.device());
    let Some(pre) = pre_allocate(
        graph,
        layout,
        &decomposition,
        &split,
        ev.costs,
        ev.config,
        ev.bounds,
        ev.spare,
    )?
    else {
        debug!(pattern = %pattern, "pattern infeasible before replica search");
        return Ok(Vec::new());
    };

    let mut found = Vec::new();
    if pre.eligible.is_empty() || pre.usable == 0 {
        if let Some(rates) = ev.solve(&pre.layout, &decomposition.subgroups)? {
            found.push(ev.candidate(pattern, &pre.layout, rates));
        }
    } else {
        for extra in distributions(pre.usable, pre.eligible.len()) {
            let layout = pre.apply(&decomposition, &extra);
            match ev.solve(&layout, &decomposition.subgroups)? {
                Some(rates) => found.push(ev.candidate(pattern, &layout, rates)),
                None => debug!(pattern = %pattern, extra = ?extra, "distribution infeasible"),
            }
        }
    }
    debug!(
        pattern = %pattern,
        subgroups = decomposition.subgroups.len(),
        usable = pre.usable,
        feasible = found.len(),
        "pattern evaluated"
    );
    Ok(found)
}

/// One core per subgroup, no replica search.
fn no_replicas<S: ThroughputSolver>(ev: &Evaluator<'_, S>, patterns: &[Pattern]) -> PlacementResult<Ranking> {
    let mut found = Vec::new();
    for pattern in patterns {
        let mut layout = ev.layout_for(pattern);
        if !ev.latency_ok(pattern, &layout)? {
            continue;
        }
        let decomposition = decompose(ev.graph, &mut layout);
        if decomposition.subgroups.len() as i64 > ev.spare {
            debug!(pattern = %pattern, subgroups = decomposition.subgroups.len(), "not enough cores");
            continue;
        }
        count_dup(ev.graph, &mut layout, &decomposition.subgroups, ev.device());
        if let Some(rates) = ev.solve(&layout, &decomposition.subgroups)? {
            found.push(ev.candidate(pattern, &layout, rates));
        }
    }
    Ok(Ranking::by_objective(found))
}

/// Spare cores split evenly across chains, each chain's share going to
/// its slowest replicable subgroup. Fewest bounces first, then objective.
fn min_bounce<S: ThroughputSolver>(ev: &Evaluator<'_, S>, patterns: &[Pattern]) -> PlacementResult<Ranking> {
    let graph = ev.graph;
    let mut found: Vec<(usize, Candidate)> = Vec::new();

    for pattern in patterns {
        let mut layout = ev.layout_for(pattern);
        if !ev.latency_ok(pattern, &layout)? {
            continue;
        }
        let decomposition = decompose(graph, &mut layout);
        let split = count_dup(graph, &mut layout, &decomposition.subgroups, ev.device());
        let extra = ev.spare - decomposition.subgroups.len() as i64;
        if extra < 0 {
            debug!(pattern = %pattern, subgroups = decomposition.subgroups.len(), "not enough cores");
            continue;
        }

        let chains: BTreeSet<usize> = split
            .replicable
            .iter()
            .map(|&g| decomposition.subgroups[g].chain_index(graph))
            .collect();
        if !chains.is_empty() {
            let share = u32::try_from(extra / chains.len() as i64).unwrap_or(0);
            for &chain in &chains {
                let mut slowest: Option<(usize, f64)> = None;
                for &g in &split.replicable {
                    let group = &decomposition.subgroups[g];
                    if group.chain_index(graph) != chain {
                        continue;
                    }
                    let rate = inequal_form(graph, &layout, group, ev.costs, ev.config)?.standalone_rate();
                    if slowest.is_none_or(|(_, r)| rate < r) {
                        slowest = Some((g, rate));
                    }
                }
                if let Some((g, _)) = slowest {
                    layout.set_replicas(&decomposition.subgroups[g].members, 1 + share);
                }
            }
        }

        if let Some(rates) = ev.solve(&layout, &decomposition.subgroups)? {
            let bounces = count_bounce(graph, &layout);
            found.push((bounces, ev.candidate(pattern, &layout, rates)));
        }
    }

    found.sort_by(|(ba, a), (bb, b)| ba.cmp(bb).then(b.objective.total_cmp(&a.objective)));
    Ok(Ranking::ordered(found.into_iter().map(|(_, c)| c).collect()))
}

/// Every dual module on the switch; after the minimum top-up, each chain
/// in turn grows its slowest replicable subgroup one core at a time while
/// the chain stays within its rate bounds.
fn greedy<S: ThroughputSolver>(ev: &Evaluator<'_, S>, pattern: &Pattern) -> PlacementResult<Ranking> {
    let graph = ev.graph;
    let mut layout = ev.layout_for(pattern);
    if !ev.latency_ok(pattern, &layout)? {
        return Ok(Ranking::default());
    }
    let decomposition = decompose(graph, &mut layout);
    let split = count_dup(graph, &mut layout, &decomposition.subgroups, ev.device());
    let Some(pre) = pre_allocate(
        graph,
        layout,
        &decomposition,
        &split,
        ev.costs,
        ev.config,
        ev.bounds,
        ev.spare,
    )?
    else {
        return Ok(Ranking::default());
    };
    let mut layout = pre.layout;
    let mut usable = pre.usable;

    for chain in 0..graph.chain_count() {
        if usable == 0 {
            break;
        }
        let mut slowest: Option<(usize, f64)> = None;
        for &g in &split.replicable {
            let group = &decomposition.subgroups[g];
            if group.chain_index(graph) != chain {
                continue;
            }
            let rate = inequal_form(graph, &layout, group, ev.costs, ev.config)?.standalone_rate();
            if slowest.is_none_or(|(_, r)| rate < r) {
                slowest = Some((g, rate));
            }
        }
        let Some((g, rate)) = slowest else {
            continue;
        };
        let group = &decomposition.subgroups[g];
        let current = group.replicas(&layout);
        let per_core = rate / f64::from(current);
        if !per_core.is_finite() {
            continue;
        }

        let bound = ev.bounds[chain];
        let mut more = 0;
        while more < usable && bound.contains(per_core * f64::from(current + more + 1)) {
            more += 1;
        }
        if more > 0 {
            layout.set_replicas(&group.members, current + more);
            usable -= more;
            debug!(chain, subgroup = g, replicas = current + more, usable, "granted extra replicas");
        }
    }

    match ev.solve(&layout, &decomposition.subgroups)? {
        Some(rates) => Ok(Ranking::ordered(vec![ev.candidate(pattern, &layout, rates)])),
        None => Ok(Ranking::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_round_trip() {
        for mode in [0, 1, 2, 3, 4, 5, 7] {
            assert_eq!(Policy::from_mode(mode).unwrap().mode(), mode);
        }
    }

    #[test]
    fn mode_six_selects_full_search() {
        assert_eq!(Policy::from_mode(6).unwrap(), Policy::FullSearch);
        assert_eq!(Policy::from_mode(6).unwrap().mode(), 0);
    }

    #[test]
    fn unsupported_modes_are_rejected() {
        for mode in [8, 9, 255] {
            assert!(matches!(Policy::from_mode(mode), Err(PlacementError::UnknownPolicy(m)) if m == mode));
        }
    }

    #[test]
    fn display_names_policy_and_mode() {
        assert_eq!(Policy::MinBounce.to_string(), "min-bounce (5)");
    }
}
