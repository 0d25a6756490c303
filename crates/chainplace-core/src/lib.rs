//! chainplace-core: shared vocabulary and input files for the placement
//! engine: substrate and capability types, the TOML config, and parsers
//! for the profiling table, SLO files, and device descriptor.

pub mod config;
pub mod device;
pub mod error;
pub mod profile;
pub mod slo;
pub mod types;

pub use config::{EngineConfig, InputsConfig, PlacementConfig};
pub use device::{Device, DeviceDescriptor};
pub use error::{InputError, InputResult};
pub use profile::ProfileTable;
pub use slo::{parse_delay_budgets, parse_rate_bounds, read_delay_budgets, read_rate_bounds};
pub use types::*;
