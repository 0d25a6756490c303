use chainplace_core::RateBounds;
use chainplace_placement::{count_bounce, Candidate, ChainGraph, Layout};

/// Per-module table followed by per-chain rates.
pub fn format_candidate(graph: &ChainGraph, bounds: &[RateBounds], candidate: &Candidate) -> String {
    let mut out = String::new();
    let layout = Layout::from_assignments(&candidate.assignments);

    out.push_str(&format!("Pattern: {}\n", candidate.pattern));
    out.push_str(&format!(
        "Objective: {:.3} Gbps   CPU cores: {}   Bounces: {}\n\n",
        candidate.objective / 1e9,
        candidate.cpu_replicas(),
        count_bounce(graph, &layout)
    ));

    out.push_str(&format!("{:<20} {:>5}  {:<9} {:>6} {:>8}\n", "MODULE", "CHAIN", "SUBSTRATE", "DEVICE", "REPLICAS"));
    for (module, a) in graph.modules().iter().zip(&candidate.assignments) {
        let device = a.device.map_or_else(|| "-".to_string(), |d| d.to_string());
        out.push_str(&format!(
            "{:<20} {:>5}  {:<9} {:>6} {:>8}\n",
            module.name,
            module.chain,
            a.substrate.label(),
            device,
            a.replicas
        ));
    }

    out.push('\n');
    for (chain, (rate, b)) in candidate.rates.iter().zip(bounds).enumerate() {
        out.push_str(&format!(
            "chain {chain}: {:.3} Gbps (min {:.3}, max {:.3})\n",
            rate / 1e9,
            b.min / 1e9,
            b.max / 1e9
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainplace_core::{Capability, Substrate};
    use chainplace_placement::{Assignment, GraphSpec, ModuleSpec};

    #[test]
    fn table_lists_every_module() {
        let spec = GraphSpec {
            modules: vec![
                ModuleSpec {
                    name: "acl".to_string(),
                    class: "ACL".to_string(),
                    capability: Capability::Dual,
                    chain: 0,
                    position: 0,
                    stateful: false,
                },
                ModuleSpec {
                    name: "out".to_string(),
                    class: "Fwd".to_string(),
                    capability: Capability::SwitchOnly,
                    chain: 0,
                    position: 1,
                    stateful: false,
                },
            ],
            edges: vec![("acl".to_string(), "out".to_string())],
        };
        let graph = ChainGraph::from_spec(&spec).unwrap();
        let candidate = Candidate {
            pattern: "1".parse().unwrap(),
            assignments: vec![
                Assignment {
                    substrate: Substrate::Cpu,
                    device: Some(0),
                    replicas: 2,
                },
                Assignment {
                    substrate: Substrate::Switch,
                    device: None,
                    replicas: 1,
                },
            ],
            rates: vec![2e9],
            objective: 1.5e9,
        };

        let text = format_candidate(&graph, &[RateBounds::new(5e8, 2e9)], &candidate);
        assert!(text.contains("Pattern: 1"));
        assert!(text.contains("CPU cores: 2"));
        assert!(text.contains("Bounces: 1"));
        assert!(text.lines().any(|l| l.starts_with("acl") && l.contains("cpu") && l.ends_with('2')));
        assert!(text.contains("chain 0: 2.000 Gbps (min 0.500, max 2.000)"));
    }
}
