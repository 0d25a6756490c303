//! Placement patterns: one bit per dual-capable module.
//!
//! Bit `i` covers the `i`-th dual-capable module in traversal order; a set
//! bit places it on the CPU, a clear bit on the switch. Non-dual modules
//! take their fixed substrate when a pattern is decoded.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use chainplace_core::Substrate;

use crate::error::{PlacementError, PlacementResult};
use crate::graph::ChainGraph;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Pattern {
    bits: Vec<bool>,
}

impl Pattern {
    /// Pattern number `index` over `width` dual modules, least-significant
    /// bit on the first dual module.
    pub fn from_index(index: u64, width: usize) -> Self {
        let bits = (0..width).map(|i| (index >> i) & 1 == 1).collect();
        Self { bits }
    }

    /// Every dual module set to `substrate`.
    pub fn uniform(width: usize, substrate: Substrate) -> Self {
        Self {
            bits: vec![substrate.is_cpu(); width],
        }
    }

    pub fn index(&self) -> u64 {
        self.bits
            .iter()
            .enumerate()
            .fold(0, |acc, (i, &b)| acc | (u64::from(b) << i))
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    /// Full per-module placement.
    pub fn decode(&self, graph: &ChainGraph) -> Vec<Substrate> {
        let mut next_bit = self.bits.iter();
        graph
            .modules()
            .iter()
            .map(|m| match m.capability.fixed_substrate() {
                Some(s) => s,
                None => {
                    if next_bit.next().copied().unwrap_or(false) {
                        Substrate::Cpu
                    } else {
                        Substrate::Switch
                    }
                }
            })
            .collect()
    }

    /// Inverse of [`Pattern::decode`] over the dual-capable subset.
    pub fn encode(graph: &ChainGraph, placement: &[Substrate]) -> Self {
        let bits = graph
            .dual_modules()
            .iter()
            .map(|&id| placement[id].is_cpu())
            .collect();
        Self { bits }
    }
}

/// Rendered as a bit string, first dual module first. `-` when empty.
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.bits.is_empty() {
            return f.write_str("-");
        }
        for &b in &self.bits {
            f.write_str(if b { "1" } else { "0" })?;
        }
        Ok(())
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "-" {
            return Ok(Self { bits: Vec::new() });
        }
        s.chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(format!("invalid pattern bit `{other}`")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|bits| Self { bits })
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> String {
        p.to_string()
    }
}

impl TryFrom<String> for Pattern {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// All 2^N patterns for the graph's dual-capable modules, in index order.
/// A graph with no dual modules yields a single empty pattern.
pub fn enum_case(graph: &ChainGraph, max_dual: usize) -> PlacementResult<Vec<Pattern>> {
    let width = graph.dual_modules().len();
    if width > max_dual || width >= 64 {
        return Err(PlacementError::TooManyDualModules {
            count: width,
            limit: max_dual.min(63),
        });
    }
    Ok((0..1u64 << width).map(|i| Pattern::from_index(i, width)).collect())
}
