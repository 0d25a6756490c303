//! Capacity rows: one linear constraint per CPU subgroup.
//!
//! For a subgroup the capacity bound is set by its slowest pipeline stage:
//!
//! ```text
//! stage_cycles[tag] = Σ weight × cost × (1 + margin) / replicas
//! capacity          = clock_hz / max(stage_cycles) × packet_bits
//! ```
//!
//! The demand vector holds, per chain, the share of traffic leaving the
//! subgroup. Together with the device ingress row these form `A·t ≤ b`.

use std::collections::BTreeMap;

use chainplace_core::{EngineConfig, ProfileTable};

use crate::error::{PlacementError, PlacementResult};
use crate::graph::ChainGraph;
use crate::layout::Layout;
use crate::subgroup::Subgroup;

/// Where per-module cycle costs come from.
#[derive(Debug, Clone, Copy)]
pub enum CostModel<'a> {
    Profiled(&'a ProfileTable),
    /// Same synthetic cost for every class.
    Uniform(f64),
}

impl CostModel<'_> {
    /// Profiled cycles for a module class.
    pub fn cycles(&self, class: &str) -> PlacementResult<f64> {
        match self {
            CostModel::Uniform(c) => Ok(*c),
            CostModel::Profiled(table) => {
                let raw = table.raw_cost(class).ok_or_else(|| PlacementError::MissingProfile {
                    class: class.to_string(),
                })?;
                raw.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|c| c.is_finite() && *c >= 0.0)
                    .ok_or_else(|| PlacementError::InvalidProfileValue {
                        class: class.to_string(),
                        value: raw.to_string(),
                    })
            }
        }
    }
}

/// One row of `A·t ≤ b`.
#[derive(Debug, Clone, PartialEq)]
pub struct CapacityRow {
    /// Per-chain demand coefficients.
    pub demand: Vec<f64>,
    /// Capacity in bits per second. Infinite when the subgroup costs nothing.
    pub capacity: f64,
}

impl CapacityRow {
    /// Largest demand coefficient across chains.
    pub fn peak_demand(&self) -> f64 {
        self.demand.iter().copied().fold(0.0, f64::max)
    }

    /// Rate the subgroup sustains on its own: capacity over peak demand.
    pub fn standalone_rate(&self) -> f64 {
        let peak = self.peak_demand();
        if peak <= 0.0 {
            f64::INFINITY
        } else {
            self.capacity / peak
        }
    }
}

/// The full system handed to the throughput solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintSystem {
    pub rows: Vec<Vec<f64>>,
    pub capacities: Vec<f64>,
}

impl ConstraintSystem {
    pub fn push(&mut self, row: CapacityRow) {
        self.rows.push(row.demand);
        self.capacities.push(row.capacity);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the capacity row of one subgroup.
pub fn inequal_form(
    graph: &ChainGraph,
    layout: &Layout,
    subgroup: &Subgroup,
    costs: CostModel<'_>,
    config: &EngineConfig,
) -> PlacementResult<CapacityRow> {
    let mut stage_cycles: BTreeMap<usize, f64> = BTreeMap::new();
    for &id in &subgroup.members {
        let module = graph.module(id);
        let state = layout.state(id);
        if state.replicas < 1 {
            return Err(PlacementError::InvalidReplicaCount {
                module: module.name.clone(),
                replicas: state.replicas,
            });
        }
        let cycles = costs.cycles(&module.class)? * (1.0 + config.error_margin);
        *stage_cycles.entry(state.core_group).or_insert(0.0) +=
            module.weight * cycles / f64::from(state.replicas);
    }

    let bottleneck = stage_cycles.values().copied().fold(0.0, f64::max);
    let capacity = if bottleneck > 0.0 {
        config.clock_hz / bottleneck * config.packet_bits
    } else {
        f64::INFINITY
    };

    let mut demand = vec![0.0; graph.chain_count()];
    for &id in &subgroup.members {
        let module = graph.module(id);
        if module.is_tail() {
            continue;
        }
        let leaving = module
            .successors
            .iter()
            .filter(|&&s| !subgroup.contains(s))
            .count();
        demand[module.chain_index] += module.weight * leaving as f64 / module.successors.len() as f64;
    }
    // Nothing crosses the boundary: the subgroup ends its chains, so its
    // tails carry the traffic back out.
    if demand.iter().all(|&d| d == 0.0) {
        for &id in &subgroup.members {
            let module = graph.module(id);
            if module.is_tail() {
                demand[module.chain_index] += module.weight;
            }
        }
    }

    Ok(CapacityRow { demand, capacity })
}

/// Rows for every subgroup plus the device ingress row.
pub fn build_system(
    graph: &ChainGraph,
    layout: &Layout,
    subgroups: &[Subgroup],
    costs: CostModel<'_>,
    config: &EngineConfig,
    ingress_bps: f64,
) -> PlacementResult<ConstraintSystem> {
    let mut system = ConstraintSystem::default();
    let mut ingress = vec![0.0; graph.chain_count()];
    for group in subgroups {
        let row = inequal_form(graph, layout, group, costs, config)?;
        for (total, d) in ingress.iter_mut().zip(&row.demand) {
            *total += d;
        }
        system.push(row);
    }
    if !subgroups.is_empty() {
        system.push(CapacityRow {
            demand: ingress,
            capacity: ingress_bps,
        });
    }
    Ok(system)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::{edge, module};
    use crate::graph::GraphSpec;
    use crate::subgroup::decompose;
    use chainplace_core::{Capability, Substrate};

    fn single_module(class: &str) -> ChainGraph {
        let spec = GraphSpec {
            modules: vec![
                module("m", class, Capability::CpuOnly, 0, 0),
                module("out", "Fwd", Capability::SwitchOnly, 0, 1),
            ],
            edges: vec![edge("m", "out")],
        };
        ChainGraph::from_spec(&spec).unwrap()
    }

    #[test]
    fn capacity_scales_with_replicas() {
        let g = single_module("NAT");
        let table = ProfileTable::from_entries([("NAT", 6800)], 8);
        let config = EngineConfig::default();
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);

        let one = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &config).unwrap();
        assert!((one.capacity - 3.0e9).abs() < 1.0, "capacity {}", one.capacity);
        assert_eq!(one.demand, vec![1.0]);

        layout.set_replicas(&d.subgroups[0].members, 2);
        let two = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &config).unwrap();
        assert!((two.capacity - 6.0e9).abs() < 1.0, "capacity {}", two.capacity);
    }

    #[test]
    fn error_margin_inflates_cost() {
        let g = single_module("NAT");
        let table = ProfileTable::from_entries([("NAT", 6800)], 8);
        let config = EngineConfig {
            error_margin: 1.0,
            ..EngineConfig::default()
        };
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);
        let row = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &config).unwrap();
        assert!((row.capacity - 1.5e9).abs() < 1.0);
    }

    #[test]
    fn sequential_stages_are_summed() {
        let spec = GraphSpec {
            modules: vec![
                module("a", "A", Capability::CpuOnly, 0, 0),
                module("b", "B", Capability::CpuOnly, 0, 1),
            ],
            edges: vec![edge("a", "b")],
        };
        let g = ChainGraph::from_spec(&spec).unwrap();
        let table = ProfileTable::from_entries([("A", 1000), ("B", 700)], 4);
        let config = EngineConfig::default();
        let mut layout = Layout::from_placement(&[Substrate::Cpu; 2], 0);
        let d = decompose(&g, &mut layout);
        let row = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &config).unwrap();
        let expected = 1.7e9 / 1700.0 * 12_000.0;
        assert!((row.capacity - expected).abs() < 1.0);
        // No edge leaves, so the tail carries the chain's traffic out.
        assert_eq!(row.demand, vec![1.0]);
    }

    #[test]
    fn branch_demand_counts_outside_successors() {
        // a -> {b, c}; only b is on the CPU with a.
        let spec = GraphSpec {
            modules: vec![
                module("a", "A", Capability::CpuOnly, 0, 0),
                module("b", "A", Capability::CpuOnly, 0, 1),
                module("c", "F", Capability::SwitchOnly, 0, 2),
            ],
            edges: vec![edge("a", "b"), edge("a", "c")],
        };
        let g = ChainGraph::from_spec(&spec).unwrap();
        let table = ProfileTable::from_entries([("A", 100)], 4);
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);
        let row = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &EngineConfig::default())
            .unwrap();
        // a sends half its traffic to c; the tail b adds nothing.
        assert!((row.demand[0] - 0.5).abs() < 1e-12, "demand {:?}", row.demand);
    }

    #[test]
    fn tails_count_only_when_nothing_leaves() {
        // a -> b -> {c, d}, all on the CPU: no edge leaves the subgroup.
        let spec = GraphSpec {
            modules: vec![
                module("a", "A", Capability::CpuOnly, 0, 0),
                module("b", "A", Capability::CpuOnly, 0, 1),
                module("c", "A", Capability::CpuOnly, 0, 2),
                module("d", "A", Capability::CpuOnly, 0, 3),
            ],
            edges: vec![edge("a", "b"), edge("b", "c"), edge("b", "d")],
        };
        let g = ChainGraph::from_spec(&spec).unwrap();
        let mut layout = Layout::from_placement(&[Substrate::Cpu; 4], 0);
        let d = decompose(&g, &mut layout);
        let row = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Uniform(100.0), &EngineConfig::default())
            .unwrap();
        assert!((row.demand[0] - 1.0).abs() < 1e-12, "demand {:?}", row.demand);
    }

    #[test]
    fn missing_profile_is_reported() {
        let g = single_module("Mystery");
        let table = ProfileTable::from_entries([("NAT", 6800)], 8);
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);
        let err = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Profiled(&table), &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, PlacementError::MissingProfile { class } if class == "Mystery"));
    }

    #[test]
    fn zero_replicas_is_an_invariant_violation() {
        let g = single_module("NAT");
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);
        layout.set_replicas(&[0], 0);
        let err = inequal_form(&g, &layout, &d.subgroups[0], CostModel::Uniform(10.0), &EngineConfig::default())
            .unwrap_err();
        assert!(matches!(err, PlacementError::InvalidReplicaCount { replicas: 0, .. }));
    }

    #[test]
    fn system_appends_ingress_row() {
        let g = single_module("NAT");
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Switch], 0);
        let d = decompose(&g, &mut layout);
        let system = build_system(&g, &layout, &d.subgroups, CostModel::Uniform(6800.0), &EngineConfig::default(), 4e10)
            .unwrap();
        assert_eq!(system.len(), 2);
        assert_eq!(system.rows[1], vec![1.0]);
        assert_eq!(system.capacities[1], 4e10);
    }
}
