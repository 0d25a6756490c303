//! Built-in dense simplex solver.
//!
//! Two-phase tableau method with Bland's rule. Small problems only: one
//! column per chain and one row per CPU subgroup.

use chainplace_core::RateBounds;
use tracing::trace;

use crate::capacity::ConstraintSystem;
use crate::error::SolverError;
use crate::optimizer::{validate, ThroughputSolver};

const EPS: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SimplexSolver {
    pub max_pivots: usize,
}

impl Default for SimplexSolver {
    fn default() -> Self {
        Self { max_pivots: 10_000 }
    }
}

impl ThroughputSolver for SimplexSolver {
    fn maximize(&self, bounds: &[RateBounds], system: &ConstraintSystem) -> Result<Vec<f64>, SolverError> {
        validate(bounds, system)?;
        let n = bounds.len();
        if n == 0 {
            return Ok(Vec::new());
        }

        // Work in s = (t - min) / scale so the tableau stays near unit magnitude.
        let scale = bounds
            .iter()
            .flat_map(|b| [b.min, b.max])
            .chain(system.capacities.iter().copied())
            .filter(|v| v.is_finite())
            .fold(1.0_f64, |acc, v| acc.max(v.abs()));

        let mut rows: Vec<(Vec<f64>, f64)> = Vec::new();
        for (coefs, &cap) in system.rows.iter().zip(&system.capacities) {
            if cap == f64::INFINITY {
                continue;
            }
            let used: f64 = coefs.iter().zip(bounds).map(|(a, b)| a * b.min).sum();
            rows.push((coefs.clone(), (cap - used) / scale));
        }
        for (j, b) in bounds.iter().enumerate() {
            if b.max.is_finite() {
                let mut unit = vec![0.0; n];
                unit[j] = 1.0;
                rows.push((unit, (b.max - b.min) / scale));
            }
        }

        let objective = vec![1.0; n];
        match solve_lp(&objective, &rows, self.max_pivots)? {
            Some(s) => Ok(bounds
                .iter()
                .zip(s)
                .map(|(b, s)| (b.min + s * scale).clamp(b.min, b.max))
                .collect()),
            None => {
                trace!("throughput problem infeasible");
                Ok(vec![0.0; n])
            }
        }
    }
}

struct Tableau {
    /// Constraint rows; the last column is the right-hand side.
    rows: Vec<Vec<f64>>,
    /// Objective row in `z - c·x = 0` form; last column is `z`.
    obj: Vec<f64>,
    basis: Vec<usize>,
    pivots: usize,
    max_pivots: usize,
}

impl Tableau {
    fn rhs(&self, i: usize) -> f64 {
        self.rows[i][self.rows[i].len() - 1]
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c];
        for v in &mut self.rows[r] {
            *v /= p;
        }
        let pivot_row = self.rows[r].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[c];
            if f != 0.0 {
                for (v, pv) in row.iter_mut().zip(&pivot_row) {
                    *v -= f * pv;
                }
            }
        }
        let f = self.obj[c];
        if f != 0.0 {
            for (v, pv) in self.obj.iter_mut().zip(&pivot_row) {
                *v -= f * pv;
            }
        }
        self.basis[r] = c;
    }

    /// Run to optimality over columns `0..allowed`.
    fn optimize(&mut self, allowed: usize) -> Result<(), SolverError> {
        loop {
            let Some(enter) = (0..allowed).find(|&j| self.obj[j] < -EPS) else {
                return Ok(());
            };
            let mut leave: Option<(usize, f64)> = None;
            for i in 0..self.rows.len() {
                let a = self.rows[i][enter];
                if a <= EPS {
                    continue;
                }
                let ratio = self.rhs(i) / a;
                leave = match leave {
                    None => Some((i, ratio)),
                    Some((best, best_ratio)) => {
                        if ratio < best_ratio - EPS
                            || ((ratio - best_ratio).abs() <= EPS && self.basis[i] < self.basis[best])
                        {
                            Some((i, ratio))
                        } else {
                            Some((best, best_ratio))
                        }
                    }
                };
            }
            let Some((row, _)) = leave else {
                return Err(SolverError::Unbounded);
            };
            self.pivots += 1;
            if self.pivots > self.max_pivots {
                return Err(SolverError::IterationLimit(self.max_pivots));
            }
            self.pivot(row, enter);
        }
    }
}

/// Maximize `c·x` subject to `a_i·x ≤ b_i` and `x ≥ 0`.
/// `Ok(None)` when infeasible.
fn solve_lp(c: &[f64], constraints: &[(Vec<f64>, f64)], max_pivots: usize) -> Result<Option<Vec<f64>>, SolverError> {
    let n = c.len();
    let m = constraints.len();
    let artificial: Vec<usize> = (0..m).filter(|&i| constraints[i].1 < 0.0).collect();
    let cols = n + m + artificial.len();

    let mut rows = Vec::with_capacity(m);
    let mut basis = Vec::with_capacity(m);
    let mut next_artificial = n + m;
    for (i, (coefs, rhs)) in constraints.iter().enumerate() {
        let mut row = vec![0.0; cols + 1];
        let sign = if *rhs < 0.0 { -1.0 } else { 1.0 };
        for (j, a) in coefs.iter().enumerate() {
            row[j] = sign * a;
        }
        row[n + i] = sign;
        row[cols] = sign * rhs;
        if *rhs < 0.0 {
            row[next_artificial] = 1.0;
            basis.push(next_artificial);
            next_artificial += 1;
        } else {
            basis.push(n + i);
        }
        rows.push(row);
    }

    let mut tab = Tableau {
        rows,
        obj: vec![0.0; cols + 1],
        basis,
        pivots: 0,
        max_pivots,
    };

    if !artificial.is_empty() {
        // Phase 1: maximize -Σ artificials.
        for i in 0..tab.rows.len() {
            if tab.basis[i] >= n + m {
                for (o, v) in tab.obj.iter_mut().zip(&tab.rows[i]) {
                    *o -= v;
                }
            }
        }
        for j in n + m..cols {
            tab.obj[j] = 0.0;
        }
        tab.optimize(cols)?;
        if tab.obj[cols] < -EPS {
            return Ok(None);
        }

        // Drive zero-level artificials out of the basis; drop redundant rows.
        let mut i = 0;
        while i < tab.rows.len() {
            if tab.basis[i] >= n + m {
                match (0..n + m).find(|&j| tab.rows[i][j].abs() > EPS) {
                    Some(j) => tab.pivot(i, j),
                    None => {
                        tab.rows.remove(i);
                        tab.basis.remove(i);
                        continue;
                    }
                }
            }
            i += 1;
        }
    }

    // Phase 2.
    tab.obj = vec![0.0; cols + 1];
    for (j, cj) in c.iter().enumerate() {
        tab.obj[j] = -cj;
    }
    for i in 0..tab.rows.len() {
        let b = tab.basis[i];
        if b < n && c[b] != 0.0 {
            let cb = c[b];
            for (o, v) in tab.obj.iter_mut().zip(&tab.rows[i]) {
                *o += cb * v;
            }
        }
    }
    tab.optimize(n + m)?;

    let mut x = vec![0.0; n];
    for (i, &b) in tab.basis.iter().enumerate() {
        if b < n {
            x[b] = tab.rhs(i).max(0.0);
        }
    }
    Ok(Some(x))
}
