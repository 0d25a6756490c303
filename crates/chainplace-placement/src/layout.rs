//! Per-module placement annotations.
//!
//! A [`Layout`] is the mutable half of the model: substrate, replica count,
//! core-group tag, and device binding for every module of a
//! [`crate::graph::ChainGraph`]. Each evaluated candidate gets
//! its own copy.

use serde::{Deserialize, Serialize};

use chainplace_core::Substrate;

use crate::graph::ModuleId;

/// Final per-module decision handed to the code generators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub substrate: Substrate,
    /// Device index for CPU-resident modules, `None` otherwise.
    pub device: Option<usize>,
    pub replicas: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleState {
    pub substrate: Substrate,
    pub replicas: u32,
    /// Sequential stages sharing a tag are costed as one pipeline stage.
    pub core_group: usize,
    pub device: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    states: Vec<ModuleState>,
}

impl Layout {
    /// One replica everywhere, CPU modules bound to `device`.
    pub fn from_placement(placement: &[Substrate], device: usize) -> Self {
        let states = placement
            .iter()
            .map(|&substrate| ModuleState {
                substrate,
                replicas: 1,
                core_group: 0,
                device: substrate.is_cpu().then_some(device),
            })
            .collect();
        Self { states }
    }

    /// Rebuild a layout from persisted assignments.
    pub fn from_assignments(assignments: &[Assignment]) -> Self {
        let states = assignments
            .iter()
            .map(|a| ModuleState {
                substrate: a.substrate,
                replicas: a.replicas,
                core_group: 0,
                device: a.device,
            })
            .collect();
        Self { states }
    }

    pub fn state(&self, id: ModuleId) -> &ModuleState {
        &self.states[id]
    }

    pub fn state_mut(&mut self, id: ModuleId) -> &mut ModuleState {
        &mut self.states[id]
    }

    pub fn substrate(&self, id: ModuleId) -> Substrate {
        self.states[id].substrate
    }

    pub fn is_cpu(&self, id: ModuleId) -> bool {
        self.states[id].substrate.is_cpu()
    }

    /// Set the replica count of every module in `members`.
    pub fn set_replicas(&mut self, members: &[ModuleId], replicas: u32) {
        for &id in members {
            self.states[id].replicas = replicas;
        }
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.states
            .iter()
            .map(|s| Assignment {
                substrate: s.substrate,
                device: s.device,
                replicas: s.replicas,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_placement_binds_cpu_modules() {
        let layout = Layout::from_placement(&[Substrate::Switch, Substrate::Cpu], 0);
        assert_eq!(layout.state(0).device, None);
        assert_eq!(layout.state(1).device, Some(0));
        assert_eq!(layout.state(1).replicas, 1);
    }

    #[test]
    fn assignments_round_trip() {
        let mut layout = Layout::from_placement(&[Substrate::Cpu, Substrate::Cpu, Substrate::SmartNic], 1);
        layout.set_replicas(&[0, 1], 3);
        let restored = Layout::from_assignments(&layout.assignments());
        assert_eq!(restored.assignments(), layout.assignments());
        assert_eq!(restored.state(1).replicas, 3);
    }
}
