//! Per-chain SLO inputs: rate bounds and latency budgets.
//!
//! Both files carry one line per chain, in chain order. Blank lines are
//! skipped.

use std::path::Path;

use crate::error::{InputError, InputResult};
use crate::types::RateBounds;

/// Read `<min-rate> <max-rate>` lines.
pub fn read_rate_bounds(path: &Path) -> InputResult<Vec<RateBounds>> {
    let content = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
    parse_rate_bounds(&content, path)
}

pub fn parse_rate_bounds(content: &str, origin: &Path) -> InputResult<Vec<RateBounds>> {
    let mut bounds = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let [min, max] = fields.as_slice() else {
            return Err(InputError::malformed(
                origin,
                idx + 1,
                format!("expected `<min> <max>`, found {} fields", fields.len()),
            ));
        };
        let min = parse_number(min, origin, idx + 1)?;
        let max = parse_number(max, origin, idx + 1)?;
        if min > max {
            return Err(InputError::malformed(
                origin,
                idx + 1,
                format!("min rate {min} exceeds max rate {max}"),
            ));
        }
        bounds.push(RateBounds::new(min, max));
    }
    Ok(bounds)
}

/// Read per-chain latency budgets in seconds and convert them to cycles.
pub fn read_delay_budgets(path: &Path, clock_hz: f64) -> InputResult<Vec<f64>> {
    let content = std::fs::read_to_string(path).map_err(|e| InputError::io(path, e))?;
    parse_delay_budgets(&content, path, clock_hz)
}

pub fn parse_delay_budgets(content: &str, origin: &Path, clock_hz: f64) -> InputResult<Vec<f64>> {
    let mut budgets = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let seconds = parse_number(trimmed, origin, idx + 1)?;
        budgets.push(seconds * clock_hz);
    }
    Ok(budgets)
}

fn parse_number(field: &str, origin: &Path, line: usize) -> InputResult<f64> {
    match field.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(InputError::malformed(
            origin,
            line,
            format!("`{field}` is not a non-negative number"),
        )),
    }
}
