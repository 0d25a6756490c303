//! Placement engine: owns the inputs of one invocation and runs a policy
//! over them.

use std::path::Path;

use tracing::{debug, info};

use chainplace_core::{Device, EngineConfig, ProfileTable, RateBounds};

use crate::capacity::{build_system, CostModel};
use crate::error::{PlacementError, PlacementResult};
use crate::graph::ChainGraph;
use crate::latency::verify_time;
use crate::layout::Layout;
use crate::optimizer::{is_infeasible, marginal_rate, within_margin, ThroughputSolver};
use crate::pattern::Pattern;
use crate::policy::{self, Policy};
use crate::ranking::{self, Candidate, Ranking, RankingFile, ResumeOutcome};
use crate::solver::SimplexSolver;
use crate::subgroup::Subgroup;

/// Result of a search. Running out of feasible candidates is an expected
/// outcome, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Found(Ranking),
    NoFeasiblePlacement,
}

impl SearchOutcome {
    pub fn best(&self) -> Option<&Candidate> {
        match self {
            SearchOutcome::Found(ranking) => ranking.best(),
            SearchOutcome::NoFeasiblePlacement => None,
        }
    }
}

pub struct PlacementEngine<S = SimplexSolver> {
    graph: ChainGraph,
    profile: ProfileTable,
    bounds: Vec<RateBounds>,
    delays: Vec<f64>,
    device: Device,
    config: EngineConfig,
    solver: S,
}

impl PlacementEngine<SimplexSolver> {
    /// Engine with the built-in solver and no latency budgets.
    pub fn new(
        graph: ChainGraph,
        profile: ProfileTable,
        bounds: Vec<RateBounds>,
        device: Device,
        config: EngineConfig,
    ) -> PlacementResult<Self> {
        if bounds.len() != graph.chain_count() {
            return Err(PlacementError::ChainCountMismatch {
                graph: graph.chain_count(),
                bounds: bounds.len(),
            });
        }
        Ok(Self {
            graph,
            profile,
            bounds,
            delays: Vec::new(),
            device,
            config,
            solver: SimplexSolver::default(),
        })
    }
}

impl<S: ThroughputSolver> PlacementEngine<S> {
    pub fn with_solver<T: ThroughputSolver>(self, solver: T) -> PlacementEngine<T> {
        PlacementEngine {
            graph: self.graph,
            profile: self.profile,
            bounds: self.bounds,
            delays: self.delays,
            device: self.device,
            config: self.config,
            solver,
        }
    }

    /// Per-chain latency budgets in cycles.
    pub fn with_delay_budgets(mut self, budgets: Vec<f64>) -> PlacementResult<Self> {
        if budgets.len() != self.graph.chain_count() {
            return Err(PlacementError::DelayCountMismatch {
                graph: self.graph.chain_count(),
                budgets: budgets.len(),
            });
        }
        self.delays = budgets;
        Ok(self)
    }

    pub fn graph(&self) -> &ChainGraph {
        &self.graph
    }

    pub fn bounds(&self) -> &[RateBounds] {
        &self.bounds
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cores available on the bound device: the smaller of its core count
    /// and the profiled budget.
    pub fn core_budget(&self) -> u32 {
        self.device.core.min(self.profile.core_budget())
    }

    /// Cores left after the reserved ones. May be negative.
    pub fn spare_cores(&self) -> i64 {
        i64::from(self.core_budget()) - i64::from(self.config.reserved_cores)
    }

    /// Run one policy and rank what it finds.
    pub fn place(&self, policy: Policy) -> PlacementResult<SearchOutcome> {
        info!(
            policy = %policy,
            modules = self.graph.len(),
            chains = self.graph.chain_count(),
            spare = self.spare_cores(),
            "placement search started"
        );
        let outcome = policy::run(self, policy)?;
        match &outcome {
            SearchOutcome::Found(ranking) => {
                if let Some(best) = ranking.best() {
                    info!(
                        policy = %policy,
                        candidates = ranking.len(),
                        pattern = %best.pattern,
                        objective = best.objective,
                        "placement found"
                    );
                }
            }
            SearchOutcome::NoFeasiblePlacement => info!(policy = %policy, "no feasible placement"),
        }
        Ok(outcome)
    }

    /// Run a policy and persist the ranking for later [`Self::resume`] calls.
    pub fn place_and_persist(&self, policy: Policy, path: &Path) -> PlacementResult<SearchOutcome> {
        let outcome = self.place(policy)?;
        if let SearchOutcome::Found(ranking) = &outcome {
            ranking.persist(path)?;
        }
        Ok(outcome)
    }

    /// Adopt the next candidate after the current one was rejected.
    pub fn resume(&self, path: &Path) -> PlacementResult<ResumeOutcome> {
        let file = RankingFile::load(path)?;
        // Validate before touching the file so a mismatch leaves it intact.
        if let Some(row) = file.rows().iter().find(|r| r.candidate.assignments.len() != self.graph.len()) {
            return Err(PlacementError::AssignmentMismatch {
                found: row.candidate.assignments.len(),
                expected: self.graph.len(),
            });
        }
        Ok(ranking::advance_and_save(file, path)?)
    }

    pub(crate) fn evaluator<'a>(&'a self, costs: CostModel<'a>) -> Evaluator<'a, S> {
        Evaluator {
            graph: &self.graph,
            costs,
            config: &self.config,
            bounds: &self.bounds,
            delays: &self.delays,
            ingress_bps: self.device.ingress_bps(),
            spare: self.spare_cores(),
            solver: &self.solver,
        }
    }

    pub(crate) fn profile(&self) -> &ProfileTable {
        &self.profile
    }
}

/// Everything a policy needs to score one layout.
pub(crate) struct Evaluator<'a, S> {
    pub graph: &'a ChainGraph,
    pub costs: CostModel<'a>,
    pub config: &'a EngineConfig,
    pub bounds: &'a [RateBounds],
    pub delays: &'a [f64],
    pub ingress_bps: f64,
    pub spare: i64,
    pub solver: &'a S,
}

impl<S: ThroughputSolver> Evaluator<'_, S> {
    pub fn device(&self) -> usize {
        self.config.device_index
    }

    /// Decoded pattern with one replica everywhere.
    pub fn layout_for(&self, pattern: &Pattern) -> Layout {
        Layout::from_placement(&pattern.decode(self.graph), self.device())
    }

    pub fn latency_ok(&self, pattern: &Pattern, layout: &Layout) -> PlacementResult<bool> {
        if self.delays.is_empty() {
            return Ok(true);
        }
        let report = verify_time(self.graph, layout, self.costs, self.config, self.delays)?;
        if !report.feasible {
            debug!(pattern = %pattern, delays = ?report.per_chain, "latency budget exceeded");
        }
        Ok(report.feasible)
    }

    /// Solve the layout's system. `None` when infeasible.
    pub fn solve(&self, layout: &Layout, subgroups: &[Subgroup]) -> PlacementResult<Option<Vec<f64>>> {
        let system = build_system(self.graph, layout, subgroups, self.costs, self.config, self.ingress_bps)?;
        let rates = self.solver.maximize(self.bounds, &system)?;
        if is_infeasible(&rates) {
            return Ok(None);
        }
        if !within_margin(self.bounds, &marginal_rate(self.bounds, &rates)) {
            debug!(rates = ?rates, "solver result outside rate bounds");
            return Ok(None);
        }
        Ok(Some(rates))
    }

    pub fn candidate(&self, pattern: &Pattern, layout: &Layout, rates: Vec<f64>) -> Candidate {
        Candidate::new(pattern.clone(), layout.assignments(), rates, self.bounds)
    }
}
