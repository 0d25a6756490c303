//! Subgroup decomposition.
//!
//! A subgroup is a maximal connected run of CPU-resident modules. Within a
//! subgroup, purely sequential stages share a core-group tag and are costed
//! as one pipeline stage. Subgroups are recomputed for every placement
//! pattern since membership depends on placement.

use std::collections::VecDeque;

use crate::graph::{ChainGraph, ModuleId};
use crate::layout::Layout;

/// A connected set of CPU-resident modules, ids ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subgroup {
    pub members: Vec<ModuleId>,
}

impl Subgroup {
    /// Chain index of the subgroup's first module.
    pub fn chain_index(&self, graph: &ChainGraph) -> usize {
        graph.module(self.members[0]).chain_index
    }

    pub fn contains(&self, id: ModuleId) -> bool {
        self.members.binary_search(&id).is_ok()
    }

    /// Replica count shared by the members.
    pub fn replicas(&self, layout: &Layout) -> u32 {
        layout.state(self.members[0]).replicas
    }
}

/// Output of [`bfs_sort`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decomposition {
    /// Ordered by smallest member id.
    pub subgroups: Vec<Subgroup>,
    /// Switch- and SmartNIC-resident modules, in input order.
    pub off_cpu: Vec<ModuleId>,
}

/// Which subgroups may be replicated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DupSplit {
    /// Indices of duplicate-safe subgroups.
    pub replicable: Vec<usize>,
    /// Indices of subgroups holding a stateful, branch, or merge module.
    pub pinned: Vec<usize>,
}

/// Partition `modules` into CPU subgroups and the off-CPU remainder.
///
/// Flood-fills along edges in both directions, staying inside the given
/// module set and on CPU-resident modules. Every input module lands in
/// exactly one output list.
pub fn bfs_sort(graph: &ChainGraph, layout: &Layout, modules: Vec<ModuleId>) -> Decomposition {
    let mut in_set = vec![false; graph.len()];
    for &id in &modules {
        in_set[id] = true;
    }
    let mut assigned = vec![false; graph.len()];
    let mut out = Decomposition::default();

    for id in modules {
        if assigned[id] {
            continue;
        }
        assigned[id] = true;
        if !layout.is_cpu(id) {
            out.off_cpu.push(id);
            continue;
        }

        let mut members = Vec::new();
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            members.push(current);
            let m = graph.module(current);
            for &next in m.successors.iter().chain(&m.predecessors) {
                if in_set[next] && !assigned[next] && layout.is_cpu(next) {
                    assigned[next] = true;
                    queue.push_back(next);
                }
            }
        }
        members.sort_unstable();
        out.subgroups.push(Subgroup { members });
    }

    out.subgroups.sort_by_key(|s| s.members[0]);
    out
}

/// Tag each maximal run of purely sequential stages in `subgroup` with a
/// shared core-group id. A run only advances into successors with fewer
/// than two predecessors. Returns the number of core groups.
pub fn tag_core_index(graph: &ChainGraph, layout: &mut Layout, subgroup: &Subgroup) -> usize {
    let mut tagged = vec![false; graph.len()];
    let mut tag = 0;

    for &start in &subgroup.members {
        if tagged[start] {
            continue;
        }
        tagged[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            layout.state_mut(current).core_group = tag;
            for &next in &graph.module(current).successors {
                if !tagged[next] && subgroup.contains(next) && graph.module(next).predecessors.len() < 2 {
                    tagged[next] = true;
                    queue.push_back(next);
                }
            }
        }
        tag += 1;
    }
    tag
}

/// Split subgroups into replicable and pinned ones, binding every member
/// to `device` on the way.
pub fn count_dup(graph: &ChainGraph, layout: &mut Layout, subgroups: &[Subgroup], device: usize) -> DupSplit {
    let mut split = DupSplit::default();
    for (idx, group) in subgroups.iter().enumerate() {
        for &id in &group.members {
            layout.state_mut(id).device = Some(device);
        }
        if group.members.iter().all(|&id| graph.module(id).is_dup_safe()) {
            split.replicable.push(idx);
        } else {
            split.pinned.push(idx);
        }
    }
    split
}

/// Decompose the whole graph and tag core groups in every subgroup.
pub fn decompose(graph: &ChainGraph, layout: &mut Layout) -> Decomposition {
    let decomposition = bfs_sort(graph, layout, (0..graph.len()).collect());
    for group in &decomposition.subgroups {
        tag_core_index(graph, layout, group);
    }
    decomposition
}
