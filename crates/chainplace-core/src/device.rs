//! Device descriptor: the NICs/servers the CPU substrate runs on.
//!
//! ```json
//! {"nic": [{"name": "intel_nic1", "ip": "204.57.7.12", "throughput": "40000",
//!           "core": "16", "pci": "5e:00.0", "driver": "igb_uio"}]}
//! ```
//!
//! Only `throughput` (Mbps) and `core` are consumed by the engine. Numeric
//! fields are accepted either as JSON numbers or as numeric strings.

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{InputError, InputResult};

/// One physical NIC/interface record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    #[serde(default)]
    pub ip: String,
    /// Ingress bandwidth in Mbps.
    #[serde(deserialize_with = "number_or_string")]
    pub throughput: f64,
    #[serde(alias = "core_count", deserialize_with = "count_or_string")]
    pub core: u32,
    #[serde(default, alias = "device_address")]
    pub pci: String,
    #[serde(default)]
    pub driver: String,
}

impl Device {
    /// Ingress capacity in bits per second.
    pub fn ingress_bps(&self) -> f64 {
        self.throughput * 1_000_000.0
    }
}

/// The full descriptor file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    pub nic: Vec<Device>,
}

impl DeviceDescriptor {
    pub fn from_file(path: &Path) -> InputResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> InputResult<Self> {
        serde_json::from_str(content).map_err(|e| InputError::Device(e.to_string()))
    }

    /// The device the engine budgets against.
    pub fn device(&self, index: usize) -> InputResult<&Device> {
        self.nic.get(index).ok_or(InputError::NoSuchDevice {
            index,
            available: self.nic.len(),
        })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

fn count_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number_or_string(deserializer)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(serde::de::Error::custom(format!("`{value}` is not a core count")));
    }
    Ok(value as u32)
}
