pub mod init;
pub mod next;
pub mod place;
mod report;

use std::path::Path;

use anyhow::Context;
use chainplace_core::{read_delay_budgets, read_rate_bounds, DeviceDescriptor, PlacementConfig, ProfileTable};
use chainplace_placement::{ChainGraph, GraphSpec, PlacementEngine};

/// Load the config (defaults when the file is absent) and every input it
/// points at, and build an engine over `graph`.
pub(crate) fn load_engine(config: &str, graph: &str) -> anyhow::Result<(PlacementConfig, PlacementEngine)> {
    let config_path = Path::new(config);
    let config = if config_path.exists() {
        PlacementConfig::from_file(config_path)?
    } else {
        tracing::debug!(path = %config_path.display(), "config not found, using defaults");
        PlacementConfig::default()
    };
    let inputs = &config.inputs;

    let graph_content =
        std::fs::read_to_string(graph).with_context(|| format!("failed to read module graph {graph}"))?;
    let spec = GraphSpec::from_json(&graph_content).with_context(|| format!("invalid module graph {graph}"))?;
    let graph = ChainGraph::from_spec(&spec)?;

    let profile = ProfileTable::from_file(&inputs.profile)?;
    let bounds = read_rate_bounds(&inputs.rates)?;
    let descriptor = DeviceDescriptor::from_file(&inputs.device)?;
    let device = descriptor.device(config.engine.device_index)?.clone();

    let mut engine = PlacementEngine::new(graph, profile, bounds, device, config.engine.clone())?;
    if let Some(delay) = &inputs.delay {
        engine = engine.with_delay_budgets(read_delay_budgets(delay, config.engine.clock_hz)?)?;
    }
    Ok((config, engine))
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    /// Write a complete input set into `dir`; returns (config, graph) paths.
    pub(crate) fn write_inputs(dir: &Path, cores: u32) -> (String, String) {
        std::fs::write(
            dir.join("chainplace.toml"),
            "[engine]\nreserved_cores = 2\n\n[inputs]\nprofile = \"module_data.txt\"\nrates = \"chain_rate.txt\"\ndevice = \"device.json\"\nranking = \"pattern.txt\"\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("module_data.txt"),
            format!("cpu ACL 3000\ncpu NAT 20000\ncpu constraints {cores}\n"),
        )
        .unwrap();
        std::fs::write(dir.join("chain_rate.txt"), "500000000 5000000000\n").unwrap();
        std::fs::write(
            dir.join("device.json"),
            r#"{"nic": [{"name": "nic0", "ip": "10.0.0.1", "throughput": "40000", "core": "16", "pci": "5e:00.0", "driver": "igb_uio"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("graph.json"),
            r#"{"modules": [
                {"name": "acl", "class": "ACL", "capability": "dual", "chain": 0, "position": 0},
                {"name": "nat", "class": "NAT", "capability": "cpu_only", "chain": 0, "position": 1, "stateful": true},
                {"name": "out", "class": "Fwd", "capability": "switch_only", "chain": 0, "position": 2}
            ], "edges": [["acl", "nat"], ["nat", "out"]]}"#,
        )
        .unwrap();
        (
            dir.join("chainplace.toml").display().to_string(),
            dir.join("graph.json").display().to_string(),
        )
    }

    #[test]
    fn load_engine_resolves_inputs_next_to_config() {
        let dir = tempfile::tempdir().unwrap();
        let (config, graph) = write_inputs(dir.path(), 6);
        let (config, engine) = super::load_engine(&config, &graph).unwrap();
        assert_eq!(config.inputs.ranking, dir.path().join("pattern.txt"));
        assert_eq!(engine.graph().len(), 3);
        assert_eq!(engine.core_budget(), 6);
    }

    #[test]
    fn load_engine_reports_missing_graph() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = write_inputs(dir.path(), 6);
        let err = super::load_engine(&config, &dir.path().join("nope.json").display().to_string())
            .err()
            .expect("missing graph");
        assert!(err.to_string().contains("module graph"), "{err}");
    }
}
