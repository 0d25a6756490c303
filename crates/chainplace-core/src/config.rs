//! chainplace.toml configuration parser.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{InputError, InputResult};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub engine: EngineConfig,
    pub inputs: InputsConfig,
}

/// Knobs that used to be process-wide globals. Passed explicitly into
/// every engine entry point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// CPU clock in Hz.
    pub clock_hz: f64,
    /// Packet size in bits.
    pub packet_bits: f64,
    /// Multiplicative margin applied to every profiled cost.
    pub error_margin: f64,
    /// Cores withheld from the device core count.
    pub reserved_cores: u32,
    /// Cycles charged when consecutive modules sit on different substrates.
    pub bounce_cycles: f64,
    /// Synthetic per-module cost for the no-profile policy.
    pub uniform_cycle_cost: f64,
    /// Upper bound on dual-capable modules (the search visits 2^N patterns).
    pub max_dual_modules: usize,
    /// Which device descriptor record the CPU substrate is bound to.
    pub device_index: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            clock_hz: 1.7e9,
            packet_bits: 1500.0 * 8.0,
            error_margin: 0.0,
            reserved_cores: 2,
            bounce_cycles: 12.0 * 1700.0 / 2.0,
            uniform_cycle_cost: 20_000.0,
            max_dual_modules: 20,
            device_index: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub profile: PathBuf,
    pub rates: PathBuf,
    pub delay: Option<PathBuf>,
    pub device: PathBuf,
    pub ranking: PathBuf,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            profile: PathBuf::from("module_data.txt"),
            rates: PathBuf::from("chain_rate.txt"),
            delay: None,
            device: PathBuf::from("device.json"),
            ranking: PathBuf::from("pattern.txt"),
        }
    }
}

impl InputsConfig {
    /// Resolve relative paths against `base`.
    pub fn resolve(&self, base: &Path) -> InputsConfig {
        let join = |p: &Path| if p.is_absolute() { p.to_path_buf() } else { base.join(p) };
        InputsConfig {
            profile: join(&self.profile),
            rates: join(&self.rates),
            delay: self.delay.as_deref().map(join),
            device: join(&self.device),
            ranking: join(&self.ranking),
        }
    }
}

impl PlacementConfig {
    /// Parse a config file; input paths are resolved against its directory.
    pub fn from_file(path: &Path) -> InputResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        let mut config: PlacementConfig = toml::from_str(&content)?;
        if let Some(dir) = path.parent() {
            config.inputs = config.inputs.resolve(dir);
        }
        Ok(config)
    }

    pub fn to_toml_string(&self) -> InputResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a config with the given latency budget file.
    pub fn scaffold(delay: Option<&str>) -> Self {
        PlacementConfig {
            engine: EngineConfig::default(),
            inputs: InputsConfig {
                delay: delay.map(PathBuf::from),
                ..InputsConfig::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold() {
        let config = PlacementConfig::scaffold(Some("max_delay.txt"));
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("max_delay.txt"));
        assert!(toml_str.contains("reserved_cores = 2"));
    }

    #[test]
    fn test_parse_minimal() {
        let config: PlacementConfig = toml::from_str("").unwrap();
        assert_eq!(config, PlacementConfig::default());
        assert_eq!(config.engine.bounce_cycles, 10_200.0);
        assert_eq!(config.engine.packet_bits, 12_000.0);
    }

    #[test]
    fn test_parse_partial_engine() {
        let toml_str = r#"
[engine]
error_margin = 0.1
reserved_cores = 1
"#;
        let config: PlacementConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.error_margin, 0.1);
        assert_eq!(config.engine.reserved_cores, 1);
        assert_eq!(config.engine.clock_hz, 1.7e9);
    }

    #[test]
    fn from_file_resolves_relative_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chainplace.toml");
        std::fs::write(&path, "[inputs]\nprofile = \"prof.txt\"\nranking = \"/tmp/rank.txt\"\n").unwrap();

        let config = PlacementConfig::from_file(&path).unwrap();
        assert_eq!(config.inputs.profile, dir.path().join("prof.txt"));
        assert_eq!(config.inputs.ranking, PathBuf::from("/tmp/rank.txt"));
        assert!(config.inputs.delay.is_none());
    }
}
