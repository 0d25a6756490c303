//! Throughput optimizer contract.
//!
//! Given per-chain `(min, max)` bounds and the system `A·t ≤ b`, a solver
//! returns the per-chain rate vector maximizing `Σt`, or all zeros when no
//! `t` within the bounds satisfies the system.

use chainplace_core::RateBounds;

use crate::capacity::ConstraintSystem;
use crate::error::SolverError;

/// Any LP backend able to honour the contract above.
pub trait ThroughputSolver {
    fn maximize(&self, bounds: &[RateBounds], system: &ConstraintSystem) -> Result<Vec<f64>, SolverError>;
}

impl<S: ThroughputSolver + ?Sized> ThroughputSolver for &S {
    fn maximize(&self, bounds: &[RateBounds], system: &ConstraintSystem) -> Result<Vec<f64>, SolverError> {
        (**self).maximize(bounds, system)
    }
}

/// Check the shape of a problem before solving it.
pub fn validate(bounds: &[RateBounds], system: &ConstraintSystem) -> Result<(), SolverError> {
    if system.rows.len() != system.capacities.len() {
        return Err(SolverError::RowMismatch {
            rows: system.rows.len(),
            capacities: system.capacities.len(),
        });
    }
    for (row, coefs) in system.rows.iter().enumerate() {
        if coefs.len() != bounds.len() {
            return Err(SolverError::ColumnMismatch {
                row,
                found: coefs.len(),
                expected: bounds.len(),
            });
        }
    }
    for (chain, b) in bounds.iter().enumerate() {
        if !b.min.is_finite() || b.max.is_nan() || b.min > b.max {
            return Err(SolverError::InvalidBounds {
                chain,
                min: b.min,
                max: b.max,
            });
        }
    }
    Ok(())
}

/// Achieved rate minus each chain's minimum SLO.
pub fn marginal_rate(bounds: &[RateBounds], rates: &[f64]) -> Vec<f64> {
    bounds.iter().zip(rates).map(|(b, t)| t - b.min).collect()
}

/// An all-zero vector is the solver's infeasibility signal.
pub fn is_infeasible(rates: &[f64]) -> bool {
    rates.iter().sum::<f64>() == 0.0
}

/// Every marginal rate sits inside `[0, max - min]`.
pub fn within_margin(bounds: &[RateBounds], marginal: &[f64]) -> bool {
    const SLACK: f64 = 1e-6;
    bounds.iter().zip(marginal).all(|(b, m)| {
        let tolerance = SLACK * b.max.abs().max(1.0);
        *m >= -tolerance && *m <= b.max - b.min + tolerance
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marginal_subtracts_minimum() {
        let b = vec![RateBounds::new(1.0, 4.0), RateBounds::new(2.0, 3.0)];
        assert_eq!(marginal_rate(&b, &[3.0, 2.0]), vec![2.0, 0.0]);
    }

    #[test]
    fn zero_vector_is_infeasible() {
        assert!(is_infeasible(&[0.0, 0.0]));
        assert!(!is_infeasible(&[0.0, 1.0]));
    }

    #[test]
    fn margin_check() {
        let b = vec![RateBounds::new(1.0, 4.0)];
        assert!(within_margin(&b, &[3.0]));
        assert!(!within_margin(&b, &[-1.0]));
        assert!(!within_margin(&b, &[3.5]));
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        let b = vec![RateBounds::new(5.0, 1.0)];
        assert!(matches!(
            validate(&b, &ConstraintSystem::default()),
            Err(SolverError::InvalidBounds { chain: 0, .. })
        ));
    }
}
