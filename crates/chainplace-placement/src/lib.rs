//! Chainplace placement engine: switch/CPU placement, replica allocation,
//! and the resumable candidate ranking.
//!
//! Given a module graph, per-class cycle costs, per-chain rate bounds and
//! a core budget, the engine decides which dual-capable modules run on the
//! CPU and how many replicas each CPU subgroup gets, maximizing the sum of
//! marginal rates across chains.
//!
//! # Components
//!
//! - **`graph`**: Module arena and weight propagation
//! - **`pattern`**: Placement bit patterns over dual-capable modules
//! - **`subgroup`**: CPU subgroup decomposition and core-group tags
//! - **`capacity`**: One `A·t ≤ b` row per subgroup
//! - **`optimizer`** / **`solver`**: Solver contract and built-in simplex
//! - **`replica`**: Spare-core top-up and distribution search
//! - **`latency`**: Delay budgets and bounce counting
//! - **`policy`**: Selection modes 0 to 7 (6 is an alias of 0)
//! - **`ranking`**: Ranked candidates and resume after rejection
//! - **`engine`**: Ties the above together for one invocation

pub mod capacity;
pub mod engine;
pub mod error;
pub mod graph;
pub mod latency;
pub mod layout;
pub mod optimizer;
pub mod pattern;
pub mod policy;
pub mod ranking;
pub mod replica;
pub mod solver;
pub mod subgroup;

pub use capacity::{build_system, inequal_form, CapacityRow, ConstraintSystem, CostModel};
pub use engine::{PlacementEngine, SearchOutcome};
pub use error::{GraphError, PlacementError, PlacementResult, RankingError, SolverError};
pub use graph::{ChainGraph, GraphSpec, Module, ModuleId, ModuleSpec};
pub use latency::{calc_delay, count_bounce, verify_time, DelayReport};
pub use layout::{Assignment, Layout};
pub use optimizer::{marginal_rate, ThroughputSolver};
pub use pattern::{enum_case, Pattern};
pub use policy::Policy;
pub use ranking::{resume, Candidate, Ranking, RankingFile, ResumeOutcome};
pub use replica::{distributions, pre_allocate, PreAllocation};
pub use solver::SimplexSolver;
pub use subgroup::{bfs_sort, count_dup, decompose, tag_core_index, Decomposition, DupSplit, Subgroup};
