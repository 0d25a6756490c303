//! Placement engine error types.
//!
//! Every variant here is fatal for the current invocation. Expected
//! outcomes such as an infeasible LP, an exhausted search, or an exhausted
//! retry are reported through return values instead.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or validating a module graph.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate module name: {0}")]
    DuplicateModule(String),

    #[error("edge references unknown module: {0}")]
    UnknownModule(String),

    #[error("self-loop on module: {0}")]
    SelfLoop(String),

    #[error("module graph contains a cycle through: {0}")]
    Cycle(String),

    #[error("module {0} can run on neither the switch nor the CPU")]
    InvalidCapability(String),
}

/// Errors from the throughput solver contract.
#[derive(Debug, Error, PartialEq)]
pub enum SolverError {
    #[error("constraint matrix has {rows} rows but {capacities} capacities")]
    RowMismatch { rows: usize, capacities: usize },

    #[error("constraint row {row} has {found} columns, expected {expected}")]
    ColumnMismatch {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("invalid rate bounds for chain {chain}: [{min}, {max}]")]
    InvalidBounds { chain: usize, min: f64, max: f64 },

    #[error("throughput problem is unbounded")]
    Unbounded,

    #[error("solver gave up after {0} pivots")]
    IterationLimit(usize),
}

/// Errors from reading or rewriting the ranking file.
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("ranking file {} does not exist; run a placement first", .0.display())]
    Missing(PathBuf),

    #[error("ranking file io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ranking file line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Ranking(#[from] RankingError),

    #[error(transparent)]
    Input(#[from] chainplace_core::InputError),

    #[error("no profiled cost for module class `{class}`")]
    MissingProfile { class: String },

    #[error("profiled cost `{value}` for module class `{class}` is not a number")]
    InvalidProfileValue { class: String, value: String },

    #[error("module {module} has replica count {replicas}; at least 1 is required")]
    InvalidReplicaCount { module: String, replicas: u32 },

    #[error("graph has {graph} chains but {bounds} rate bounds were supplied")]
    ChainCountMismatch { graph: usize, bounds: usize },

    #[error("graph has {graph} chains but {budgets} latency budgets were supplied")]
    DelayCountMismatch { graph: usize, budgets: usize },

    #[error("{count} dual-capable modules exceed the search limit of {limit}")]
    TooManyDualModules { count: usize, limit: usize },

    #[error("unknown placement policy mode: {0}")]
    UnknownPolicy(u8),

    #[error("ranking row has {found} module assignments but the graph has {expected} modules")]
    AssignmentMismatch { found: usize, expected: usize },
}

pub type PlacementResult<T> = Result<T, PlacementError>;
