//! Profiling table parser.
//!
//! Line-oriented, three whitespace-separated fields per line:
//!
//! ```text
//! cpu ACL 1700
//! cpu NAT 6800
//! cpu constraints 16
//! ```
//!
//! Kind `cpu` maps a module class to its profiled cycle cost. The reserved
//! class `constraints` carries the total CPU core budget. Lines of any other
//! kind are ignored with a warning.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{InputError, InputResult};

/// Reserved module class holding the total core budget.
pub const CORE_BUDGET_CLASS: &str = "constraints";

/// Substrate kind whose entries describe CPU cycle costs.
const CPU_KIND: &str = "cpu";

/// Profiled per-class cycle costs and the total CPU core budget.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileTable {
    /// Module class → profiled cost, kept as written and parsed on lookup.
    cpu_costs: HashMap<String, String>,
    core_budget: u32,
}

impl ProfileTable {
    /// Read and parse a profiling file. A missing file is an error.
    pub fn from_file(path: &Path) -> InputResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        Self::parse(&content, path)
    }

    /// Parse profiling text. `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &Path) -> InputResult<Self> {
        let mut cpu_costs = HashMap::new();

        for (idx, line) in content.lines().enumerate() {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.is_empty() {
                continue;
            }
            let [kind, class, value] = fields.as_slice() else {
                return Err(InputError::malformed(
                    origin,
                    idx + 1,
                    format!("expected 3 fields, found {}", fields.len()),
                ));
            };
            if kind.eq_ignore_ascii_case(CPU_KIND) {
                cpu_costs.insert((*class).to_string(), (*value).to_string());
            } else {
                warn!(kind = %kind, class = %class, "ignoring profile entry for unrecognised substrate kind");
            }
        }

        let budget = cpu_costs
            .remove(CORE_BUDGET_CLASS)
            .ok_or(InputError::MissingCoreBudget)?;
        let core_budget = budget.parse::<u32>().map_err(|_| {
            InputError::malformed(origin, 0, format!("core budget `{budget}` is not an integer"))
        })?;

        debug!(classes = cpu_costs.len(), core_budget, "profiling table loaded");
        Ok(Self {
            cpu_costs,
            core_budget,
        })
    }

    /// Build a table directly, mostly for tests and embedding.
    pub fn from_entries<I, K, V>(entries: I, core_budget: u32) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        Self {
            cpu_costs: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.to_string()))
                .collect(),
            core_budget,
        }
    }

    /// Raw profiled value for a module class.
    pub fn raw_cost(&self, class: &str) -> Option<&str> {
        self.cpu_costs.get(class).map(String::as_str)
    }

    /// Total CPU cores available according to the profile.
    pub fn core_budget(&self) -> u32 {
        self.core_budget
    }

    pub fn len(&self) -> usize {
        self.cpu_costs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_costs.is_empty()
    }
}
