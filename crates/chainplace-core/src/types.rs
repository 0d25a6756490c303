//! Shared types used across chainplace crates.

use serde::{Deserialize, Serialize};

/// Where a module executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Substrate {
    /// Programmable-switch pipeline stage.
    Switch,
    /// General-purpose CPU core on the server.
    Cpu,
    /// SmartNIC offload engine. Never part of a CPU subgroup.
    SmartNic,
}

impl Substrate {
    pub fn is_cpu(self) -> bool {
        matches!(self, Substrate::Cpu)
    }

    pub fn label(self) -> &'static str {
        match self {
            Substrate::Switch => "switch",
            Substrate::Cpu => "cpu",
            Substrate::SmartNic => "smartnic",
        }
    }

    /// Inverse of [`Substrate::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "switch" => Some(Substrate::Switch),
            "cpu" => Some(Substrate::Cpu),
            "smartnic" => Some(Substrate::SmartNic),
            _ => None,
        }
    }
}

/// The set of substrates a module class can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    SwitchOnly,
    CpuOnly,
    /// Either substrate; the placement search decides.
    Dual,
    /// Neither substrate. Rejected when the graph is built.
    Invalid,
    SmartNicOnly,
}

impl Capability {
    pub fn is_dual(self) -> bool {
        matches!(self, Capability::Dual)
    }

    /// Whether `substrate` is a legal placement for this capability.
    pub fn allows(self, substrate: Substrate) -> bool {
        match self {
            Capability::SwitchOnly => substrate == Substrate::Switch,
            Capability::CpuOnly => substrate == Substrate::Cpu,
            Capability::Dual => matches!(substrate, Substrate::Switch | Substrate::Cpu),
            Capability::SmartNicOnly => substrate == Substrate::SmartNic,
            Capability::Invalid => false,
        }
    }

    /// Placement for non-dual capabilities, `None` for dual or invalid ones.
    pub fn fixed_substrate(self) -> Option<Substrate> {
        match self {
            Capability::SwitchOnly => Some(Substrate::Switch),
            Capability::CpuOnly => Some(Substrate::Cpu),
            Capability::SmartNicOnly => Some(Substrate::SmartNic),
            Capability::Dual | Capability::Invalid => None,
        }
    }
}

/// Per-chain throughput SLO in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateBounds {
    pub min: f64,
    pub max: f64,
}

impl RateBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// True when `rate` lies inside `[min, max]`.
    pub fn contains(&self, rate: f64) -> bool {
        rate >= self.min && rate <= self.max
    }
}
