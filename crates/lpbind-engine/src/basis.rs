//! Basic solution recomputed from the stored basis.
//!
//! Variables are the auxiliary row variables `r_i` followed by the columns
//! `x_j`, tied together by `r - A x = 0`. Non-basic variables sit at the
//! bound their status names; the basic ones and the row multipliers come
//! from two dense solves against the basis matrix.

use crate::problem::{Direction, NativeProblem, SolutionState};
use crate::status::{Outcome, SolStatus, VarStatus};
use tracing::{debug, warn};

const PIVOT_TOL: f64 = 1e-12;
/// Largest-to-smallest pivot ratio beyond which the basis is ill-conditioned.
const COND_LIMIT: f64 = 1e14;
const FEAS_TOL: f64 = 1e-7;

/// Gaussian elimination with partial pivoting on a square system.
fn solve_dense(mut mat: Vec<Vec<f64>>, mut rhs: Vec<f64>) -> Result<Vec<f64>, Outcome> {
    let n = rhs.len();
    let scale = mat
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
        .max(1.0);
    let (mut max_piv, mut min_piv) = (0.0_f64, f64::INFINITY);
    for k in 0..n {
        let Some(p) = (k..n).max_by(|&a, &b| mat[a][k].abs().total_cmp(&mat[b][k].abs())) else {
            break;
        };
        let pivot = mat[p][k];
        if pivot.abs() <= PIVOT_TOL * scale {
            return Err(Outcome::Singular);
        }
        max_piv = max_piv.max(pivot.abs());
        min_piv = min_piv.min(pivot.abs());
        mat.swap(k, p);
        rhs.swap(k, p);
        for i in k + 1..n {
            let factor = mat[i][k] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in k..n {
                mat[i][j] -= factor * mat[k][j];
            }
            rhs[i] -= factor * rhs[k];
        }
    }
    if n > 0 && max_piv / min_piv > COND_LIMIT {
        return Err(Outcome::IllConditioned);
    }
    let mut x = vec![0.0; n];
    for k in (0..n).rev() {
        let tail: f64 = (k + 1..n).map(|j| mat[k][j] * x[j]).sum();
        x[k] = (rhs[k] - tail) / mat[k][k];
    }
    Ok(x)
}

fn nonbasic_value(stat: VarStatus, lower: f64, upper: f64) -> f64 {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
    match stat {
        VarStatus::Lower | VarStatus::Fixed => finite(lower),
        VarStatus::Upper => finite(upper),
        VarStatus::Free | VarStatus::Basic => 0.0,
    }
}

fn within(v: f64, lower: f64, upper: f64) -> bool {
    v >= lower - FEAS_TOL * (1.0 + lower.abs()) && v <= upper + FEAS_TOL * (1.0 + upper.abs())
}

/// Whether multiplier `d` has the sign a variable with status `stat` needs.
fn dual_ok(stat: VarStatus, d: f64, dir: Direction) -> bool {
    let d = match dir {
        Direction::Minimize => d,
        Direction::Maximize => -d,
    };
    match stat {
        VarStatus::Basic | VarStatus::Fixed => true,
        VarStatus::Lower => d >= -FEAS_TOL,
        VarStatus::Upper => d <= FEAS_TOL,
        VarStatus::Free => d.abs() <= FEAS_TOL,
    }
}

/// Recompute the basic solution from the current row and column statuses.
///
/// Returns [`Outcome::BadBasis`] unless exactly one variable per row is
/// basic, and [`Outcome::Singular`] or [`Outcome::IllConditioned`] when the
/// basis matrix cannot be used. The stored solution is left untouched on
/// failure.
pub fn warm_up(prob: &mut NativeProblem) -> Outcome {
    let m = prob.rows.len();
    let n = prob.cols.len();
    let stats: Vec<VarStatus> = prob
        .rows
        .iter()
        .map(|r| r.stat)
        .chain(prob.cols.iter().map(|c| c.entity.stat))
        .collect();
    let basic: Vec<usize> = (0..m + n).filter(|&k| stats[k] == VarStatus::Basic).collect();
    if basic.len() != m {
        warn!(
            component = "engine",
            operation = "warm_up",
            status = "error",
            num_basic = basic.len(),
            num_rows = m,
            "Basis has the wrong number of basic variables"
        );
        return Outcome::BadBasis;
    }

    // Column k of [I | -A], as (row, value) pairs.
    let mut columns: Vec<Vec<(usize, f64)>> = (0..m).map(|i| vec![(i, 1.0)]).collect();
    columns.extend((0..n).map(|_| Vec::new()));
    for (i, j, a) in prob.coef_iter() {
        columns[m + j - 1].push((i - 1, -a));
    }
    let bounds: Vec<(f64, f64)> = prob
        .rows
        .iter()
        .map(|r| (r.lower, r.upper))
        .chain(prob.cols.iter().map(|c| (c.entity.lower, c.entity.upper)))
        .collect();

    let mut z: Vec<f64> = (0..m + n)
        .map(|k| nonbasic_value(stats[k], bounds[k].0, bounds[k].1))
        .collect();
    let mut rhs = vec![0.0; m];
    for (k, col) in columns.iter().enumerate() {
        if stats[k] != VarStatus::Basic {
            for &(i, v) in col {
                rhs[i] -= v * z[k];
            }
        }
    }
    let mut b = vec![vec![0.0; m]; m];
    for (r, &k) in basic.iter().enumerate() {
        for &(i, v) in &columns[k] {
            b[i][r] = v;
        }
    }
    // Row multipliers: one equation per basic variable, zero reduced cost.
    let mut bt = vec![vec![0.0; m]; m];
    let mut cost = vec![0.0; m];
    for (r, &k) in basic.iter().enumerate() {
        if k < m {
            bt[r][k] = 1.0;
        } else {
            for &(i, v) in &columns[k] {
                bt[r][i] = -v;
            }
            cost[r] = prob.cols[k - m].obj;
        }
    }

    let solved = solve_dense(b, rhs).and_then(|zb| solve_dense(bt, cost).map(|y| (zb, y)));
    let (zb, duals) = match solved {
        Ok(values) => values,
        Err(outcome) => {
            warn!(
                component = "engine",
                operation = "warm_up",
                status = "error",
                outcome = %outcome,
                "Basis matrix rejected"
            );
            return outcome;
        }
    };
    for (&k, v) in basic.iter().zip(zb) {
        z[k] = v;
    }

    let dir = prob.obj_dir();
    let mut primal_ok = true;
    let mut dual_feasible = true;
    for (i, row) in prob.rows.iter_mut().enumerate() {
        row.prim = z[i];
        row.dual = if stats[i] == VarStatus::Basic { 0.0 } else { duals[i] };
        primal_ok &= within(row.prim, row.lower, row.upper);
        dual_feasible &= dual_ok(stats[i], row.dual, dir);
    }
    let mut reduced: Vec<f64> = prob.cols.iter().map(|c| c.obj).collect();
    for (i, j, a) in prob.coef_iter() {
        reduced[j - 1] -= a * duals[i - 1];
    }
    for (j, col) in prob.cols.iter_mut().enumerate() {
        let k = m + j;
        let entity = &mut col.entity;
        entity.prim = z[k];
        entity.dual = if stats[k] == VarStatus::Basic { 0.0 } else { reduced[j] };
        primal_ok &= within(entity.prim, entity.lower, entity.upper);
        dual_feasible &= dual_ok(stats[k], entity.dual, dir);
    }

    let x: Vec<f64> = z[m..].to_vec();
    let status = match (primal_ok, dual_feasible) {
        (true, true) => SolStatus::Optimal,
        (true, false) => SolStatus::Feasible,
        (false, _) => SolStatus::Infeasible,
    };
    let feasibility = |ok: bool| if ok { SolStatus::Feasible } else { SolStatus::Infeasible };
    prob.basic = SolutionState {
        status,
        obj: prob.objective_at(&x),
    };
    prob.prim_stat = feasibility(primal_ok);
    prob.dual_stat = feasibility(dual_feasible);
    prob.ray = 0;
    debug!(
        component = "engine",
        operation = "warm_up",
        status = "success",
        sol_status = %status,
        "Basic solution recomputed"
    );
    Outcome::Success
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SimplexParams;
    use crate::simplex::simplex;

    /// max x + y  s.t.  x + 2y <= 4, 3x + y <= 6, x, y >= 0.
    fn lp() -> NativeProblem {
        let mut p = NativeProblem::new();
        p.add_rows(2).unwrap();
        p.add_cols(2).unwrap();
        p.set_obj_dir(Direction::Maximize);
        for j in 1..=2 {
            p.set_obj_coef(j, 1.0).unwrap();
            p.set_col_bounds(j, 0.0, f64::INFINITY).unwrap();
        }
        p.set_row_bounds(1, f64::NEG_INFINITY, 4.0).unwrap();
        p.set_row_bounds(2, f64::NEG_INFINITY, 6.0).unwrap();
        p.load_matrix(&[(1, 1, 1.0), (1, 2, 2.0), (2, 1, 3.0), (2, 2, 1.0)])
            .unwrap();
        p
    }

    #[test]
    fn test_solve_dense_pivots() {
        let x = solve_dense(vec![vec![0.0, 2.0], vec![1.0, 1.0]], vec![4.0, 3.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 2.0).abs() < 1e-12);
        let singular = solve_dense(vec![vec![1.0, 1.0], vec![2.0, 2.0]], vec![1.0, 2.0]);
        assert_eq!(singular, Err(Outcome::Singular));
    }

    #[test]
    fn test_optimal_basis_reproduces_simplex() {
        let mut p = lp();
        p.set_row_stat(1, VarStatus::Upper).unwrap();
        p.set_row_stat(2, VarStatus::Upper).unwrap();
        p.set_col_stat(1, VarStatus::Basic).unwrap();
        p.set_col_stat(2, VarStatus::Basic).unwrap();
        assert_eq!(warm_up(&mut p), Outcome::Success);
        assert_eq!(p.status(), SolStatus::Optimal);
        assert!((p.obj_val() - 2.8).abs() < 1e-9);
        assert!((p.cols[0].entity.prim - 1.6).abs() < 1e-9);
        assert!((p.rows[0].dual - 0.4).abs() < 1e-9);

        let mut q = lp();
        simplex(&mut q, &SimplexParams::default());
        assert!((q.rows[0].dual - p.rows[0].dual).abs() < 1e-7);
        assert!((q.rows[1].dual - p.rows[1].dual).abs() < 1e-7);
    }

    #[test]
    fn test_standard_basis_is_primal_feasible_only() {
        let mut p = lp();
        p.std_basis();
        assert_eq!(warm_up(&mut p), Outcome::Success);
        assert_eq!(p.status(), SolStatus::Feasible);
        assert_eq!(p.prim_stat(), SolStatus::Feasible);
        assert_eq!(p.dual_stat(), SolStatus::Infeasible);
        assert_eq!(p.obj_val(), 0.0);
    }

    #[test]
    fn test_bad_and_singular_bases() {
        let mut p = lp();
        p.std_basis();
        p.set_col_stat(1, VarStatus::Basic).unwrap();
        assert_eq!(warm_up(&mut p), Outcome::BadBasis);
        assert_eq!(p.status(), SolStatus::Undefined);

        let mut q = NativeProblem::new();
        q.add_rows(2).unwrap();
        q.add_cols(2).unwrap();
        q.load_matrix(&[(1, 1, 1.0), (1, 2, 1.0), (2, 1, 1.0), (2, 2, 1.0)])
            .unwrap();
        for k in 1..=2 {
            q.set_row_stat(k, VarStatus::Free).unwrap();
            q.set_col_stat(k, VarStatus::Basic).unwrap();
        }
        assert_eq!(warm_up(&mut q), Outcome::Singular);
    }
}
