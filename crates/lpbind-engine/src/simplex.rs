//! LP solver entry points: simplex, exact simplex and interior point.

use crate::highs::{
    BASIS_BASIC, BASIS_LOWER, BASIS_UPPER, BASIS_ZERO, HighsLp, HighsOption, LpSolution, LpStatus,
};
use crate::params::{MsgLevel, Pricing, SimplexMethod, SimplexParams};
use crate::problem::{BoundType, Direction, NativeProblem, SolutionState};
use crate::status::{Outcome, SolStatus, VarStatus};
use crate::term;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const EXACT_TOLERANCE: f64 = 1e-9;

/// Solve the LP relaxation of `prob` with the simplex method and store the
/// basic solution.
pub fn simplex(prob: &mut NativeProblem, parm: &SimplexParams) -> Outcome {
    let started = Instant::now();
    if parm.msg_lev >= MsgLevel::All {
        term::print(&format!(
            "simplex: {} rows, {} columns, {} non-zeros",
            prob.num_rows(),
            prob.num_cols(),
            prob.nnz()
        ));
    }
    if prob.num_cols() == 0 {
        return trivial_basic(prob, parm.msg_lev);
    }

    let mut lp = HighsLp::relaxation(prob, None);
    configure_simplex(&mut lp, parm);
    let solution = lp.solve();
    let outcome = store_basic(prob, solution, parm, started);
    debug!(
        component = "engine",
        operation = "simplex",
        status = "success",
        outcome = %outcome,
        sol_status = %prob.status(),
        "Simplex finished"
    );
    outcome
}

/// Simplex with tolerances tightened to the exact-arithmetic regime.
pub fn exact(prob: &mut NativeProblem, parm: &SimplexParams) -> Outcome {
    let parm = SimplexParams {
        tol_bnd: parm.tol_bnd.min(EXACT_TOLERANCE),
        tol_dj: parm.tol_dj.min(EXACT_TOLERANCE),
        presolve: false,
        ..parm.clone()
    };
    simplex(prob, &parm)
}

/// Solve the LP relaxation with the interior-point method and store the
/// interior-point solution.
pub fn interior(prob: &mut NativeProblem, msg_lev: MsgLevel) -> Outcome {
    if prob.num_cols() == 0 {
        if msg_lev >= MsgLevel::Err {
            term::print("interior: problem has no columns");
        }
        return Outcome::Fault;
    }
    let mut lp = HighsLp::relaxation(prob, None);
    lp.set_option("solver", HighsOption::Str("ipm"));
    lp.set_option("presolve", HighsOption::Str("off"));
    let solution = lp.solve();

    let (status, outcome) = match solution.status {
        LpStatus::Optimal => (SolStatus::Optimal, Outcome::Success),
        LpStatus::Infeasible | LpStatus::Unbounded | LpStatus::UnboundedOrInfeasible => {
            (SolStatus::NoFeasible, Outcome::Success)
        }
        LpStatus::ReachedIterationLimit => (SolStatus::Undefined, Outcome::IterationLimit),
        LpStatus::ReachedTimeLimit => (SolStatus::Undefined, Outcome::TimeLimit),
        LpStatus::Unknown => (SolStatus::Undefined, Outcome::NoConvergence),
    };
    if status == SolStatus::Optimal {
        for (row, (&v, &d)) in prob
            .rows
            .iter_mut()
            .zip(solution.row_values.iter().zip(&solution.row_duals))
        {
            row.ipt_prim = v;
            row.ipt_dual = d;
        }
        for (col, (&v, &d)) in prob
            .cols
            .iter_mut()
            .zip(solution.col_values.iter().zip(&solution.col_duals))
        {
            col.entity.ipt_prim = v;
            col.entity.ipt_dual = d;
        }
    }
    prob.ipt = SolutionState {
        status,
        obj: if status == SolStatus::Optimal {
            solution.objective
        } else {
            0.0
        },
    };
    if msg_lev >= MsgLevel::On {
        term::print(&format!(
            "interior: {} iterations, status {}",
            solution.barrier_iterations, status
        ));
    }
    debug!(
        component = "engine",
        operation = "interior",
        status = "success",
        outcome = %outcome,
        ipt_status = %status,
        iterations = solution.barrier_iterations,
        "Interior point finished"
    );
    outcome
}

fn configure_simplex(lp: &mut HighsLp, parm: &SimplexParams) {
    lp.set_option("solver", HighsOption::Str("simplex"));
    lp.set_option(
        "presolve",
        HighsOption::Str(if parm.presolve { "on" } else { "off" }),
    );
    let strategy = match parm.meth {
        SimplexMethod::Primal => 4,
        SimplexMethod::Dual | SimplexMethod::DualPrimal => 1,
    };
    lp.set_option("simplex_strategy", HighsOption::Int(strategy));
    let (dual_weights, primal_weights) = match parm.pricing {
        Pricing::Standard => (0, 0),
        Pricing::SteepestEdge => (2, 1),
    };
    lp.set_option(
        "simplex_dual_edge_weight_strategy",
        HighsOption::Int(dual_weights),
    );
    lp.set_option(
        "simplex_primal_edge_weight_strategy",
        HighsOption::Int(primal_weights),
    );
    lp.set_option(
        "primal_feasibility_tolerance",
        HighsOption::Float(parm.tol_bnd),
    );
    lp.set_option("dual_feasibility_tolerance", HighsOption::Float(parm.tol_dj));
    if let Some(limit) = parm.it_lim {
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        lp.set_option("simplex_iteration_limit", HighsOption::Int(limit));
    }
    if let Some(ms) = parm.tm_lim {
        lp.set_option("time_limit", HighsOption::Float(f64::from(ms) / 1000.0));
    }
}

/// Problems without columns: every row activity is zero.
fn trivial_basic(prob: &mut NativeProblem, msg_lev: MsgLevel) -> Outcome {
    let feasible = prob.rows.iter().all(|r| r.lower <= 0.0 && 0.0 <= r.upper);
    for row in &mut prob.rows {
        row.prim = 0.0;
        row.dual = 0.0;
        row.stat = VarStatus::Basic;
    }
    let status = if feasible {
        SolStatus::Optimal
    } else {
        SolStatus::NoFeasible
    };
    prob.basic = SolutionState {
        status,
        obj: prob.obj_shift(),
    };
    prob.prim_stat = if feasible {
        SolStatus::Feasible
    } else {
        SolStatus::NoFeasible
    };
    prob.dual_stat = SolStatus::Feasible;
    prob.ray = 0;
    report(msg_lev, status);
    Outcome::Success
}

fn store_basic(
    prob: &mut NativeProblem,
    solution: LpSolution,
    parm: &SimplexParams,
    started: Instant,
) -> Outcome {
    let status = match solution.status {
        LpStatus::UnboundedOrInfeasible => classify(prob),
        other => other,
    };
    let (sol_status, prim_stat, dual_stat, mut outcome) = match status {
        LpStatus::Optimal => (
            SolStatus::Optimal,
            SolStatus::Feasible,
            SolStatus::Feasible,
            Outcome::Success,
        ),
        LpStatus::Infeasible => (
            SolStatus::NoFeasible,
            SolStatus::NoFeasible,
            SolStatus::Infeasible,
            Outcome::Success,
        ),
        LpStatus::Unbounded => (
            SolStatus::Unbounded,
            SolStatus::Feasible,
            SolStatus::NoFeasible,
            Outcome::Success,
        ),
        LpStatus::ReachedTimeLimit | LpStatus::ReachedIterationLimit => {
            let prim = if primal_feasible(prob, &solution, parm.tol_bnd) {
                SolStatus::Feasible
            } else {
                SolStatus::Infeasible
            };
            let outcome = if status == LpStatus::ReachedTimeLimit {
                Outcome::TimeLimit
            } else {
                Outcome::IterationLimit
            };
            (prim, prim, SolStatus::Infeasible, outcome)
        }
        LpStatus::UnboundedOrInfeasible | LpStatus::Unknown => {
            warn!(
                component = "engine",
                operation = "simplex",
                status = "error",
                "HiGHS returned no usable status"
            );
            if parm.msg_lev >= MsgLevel::Err {
                term::print("simplex: solver failure");
            }
            return Outcome::Fault;
        }
    };

    let (mut sol_status, mut prim_stat) = (sol_status, prim_stat);
    if sol_status == SolStatus::Optimal && parm.meth != SimplexMethod::Primal {
        // The dual simplex stops once the dual objective passes the limit.
        match prob.obj_dir() {
            Direction::Minimize if solution.objective > parm.obj_ul => {
                outcome = Outcome::ObjUpperLimit;
            }
            Direction::Maximize if solution.objective < parm.obj_ll => {
                outcome = Outcome::ObjLowerLimit;
            }
            _ => {}
        }
        if outcome != Outcome::Success {
            sol_status = SolStatus::Infeasible;
            prim_stat = SolStatus::Infeasible;
        }
    }

    let (col_basis, row_basis) = match solution.basis {
        Some((cols, rows)) => (Some(cols), Some(rows)),
        None => (None, None),
    };
    for (i, row) in prob.rows.iter_mut().enumerate() {
        row.prim = solution.row_values.get(i).copied().unwrap_or(0.0);
        row.dual = solution.row_duals.get(i).copied().unwrap_or(0.0);
        let code = row_basis.as_ref().and_then(|b| b.get(i)).copied();
        row.stat = basis_status(code, row.lower, row.upper, row.prim);
    }
    for (j, col) in prob.cols.iter_mut().enumerate() {
        let entity = &mut col.entity;
        entity.prim = solution.col_values.get(j).copied().unwrap_or(0.0);
        entity.dual = solution.col_duals.get(j).copied().unwrap_or(0.0);
        let code = col_basis.as_ref().and_then(|b| b.get(j)).copied();
        entity.stat = basis_status(code, entity.lower, entity.upper, entity.prim);
    }

    prob.basic = SolutionState {
        status: sol_status,
        obj: solution.objective,
    };
    prob.prim_stat = prim_stat;
    prob.dual_stat = dual_stat;
    prob.ray = if sol_status == SolStatus::Unbounded {
        unbounded_ray(prob, solution.primal_ray.as_deref())
    } else {
        0
    };
    // HiGHS runs the whole solve in one call, so only the last iteration
    // line is available; it is held back until `out_dly` has elapsed.
    let delayed = started.elapsed() < Duration::from_millis(u64::from(parm.out_dly));
    if parm.msg_lev >= MsgLevel::On && !delayed {
        term::print(&format!(
            "*{:>6}: obj = {:>17.9e}",
            solution.simplex_iterations, solution.objective
        ));
    }
    report(parm.msg_lev, sol_status);
    outcome
}

fn report(msg_lev: MsgLevel, status: SolStatus) {
    if msg_lev < MsgLevel::On {
        return;
    }
    let line = match status {
        SolStatus::Optimal => "OPTIMAL SOLUTION FOUND",
        SolStatus::NoFeasible => "PROBLEM HAS NO PRIMAL FEASIBLE SOLUTION",
        SolStatus::Unbounded => "PROBLEM HAS UNBOUNDED SOLUTION",
        SolStatus::Feasible | SolStatus::Infeasible => "SEARCH TERMINATED",
        SolStatus::Undefined => "SOLUTION UNDEFINED",
    };
    term::print(line);
}

/// Resolve "unbounded or infeasible" by checking feasibility alone.
fn classify(prob: &NativeProblem) -> LpStatus {
    let mut feasibility = prob.copy(false);
    for col in &mut feasibility.cols {
        col.obj = 0.0;
    }
    let mut lp = HighsLp::relaxation(&feasibility, None);
    lp.set_option("presolve", HighsOption::Str("off"));
    match lp.solve().status {
        LpStatus::Optimal => LpStatus::Unbounded,
        LpStatus::Infeasible => LpStatus::Infeasible,
        _ => LpStatus::Unknown,
    }
}

fn primal_feasible(prob: &NativeProblem, solution: &LpSolution, tol: f64) -> bool {
    let within = |v: f64, lower: f64, upper: f64| {
        v >= lower - tol * (1.0 + lower.abs()) && v <= upper + tol * (1.0 + upper.abs())
    };
    prob.rows
        .iter()
        .zip(&solution.row_values)
        .all(|(r, &v)| within(v, r.lower, r.upper))
        && prob
            .cols
            .iter()
            .zip(&solution.col_values)
            .all(|(c, &v)| within(v, c.entity.lower, c.entity.upper))
}

pub(crate) fn basis_status(code: Option<i64>, lower: f64, upper: f64, value: f64) -> VarStatus {
    let shape = BoundType::of(lower, upper);
    match code {
        Some(BASIS_BASIC) => VarStatus::Basic,
        Some(BASIS_LOWER) => shape.nonbasic_status(VarStatus::Lower),
        Some(BASIS_UPPER) => shape.nonbasic_status(VarStatus::Upper),
        Some(BASIS_ZERO) => shape.nonbasic_status(VarStatus::Free),
        _ => {
            let near = |bound: f64| (value - bound).abs() <= 1e-9 * (1.0 + bound.abs());
            match shape {
                BoundType::Fixed => VarStatus::Fixed,
                _ if lower.is_finite() && near(lower) => VarStatus::Lower,
                _ if upper.is_finite() && near(upper) => VarStatus::Upper,
                _ => VarStatus::Basic,
            }
        }
    }
}

/// Variable number (rows first, then columns) along which the objective is
/// unbounded, or 0 if none can be named.
fn unbounded_ray(prob: &NativeProblem, ray: Option<&[f64]>) -> usize {
    let m = prob.num_rows();
    if let Some(ray) = ray {
        let best = ray
            .iter()
            .enumerate()
            .filter(|(_, v)| v.abs() > 1e-9)
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()));
        if let Some((j, _)) = best {
            return m + j + 1;
        }
    }
    let sign = match prob.obj_dir() {
        Direction::Minimize => 1.0,
        Direction::Maximize => -1.0,
    };
    prob.cols
        .iter()
        .position(|c| {
            let d = sign * c.obj;
            (d < 0.0 && c.entity.upper.is_infinite()) || (d > 0.0 && c.entity.lower.is_infinite())
        })
        .map_or(0, |j| m + j + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::NativeProblem;

    fn bounded_lp() -> NativeProblem {
        // max x + y  s.t.  x + 2y <= 4, 3x + y <= 6, x, y >= 0
        let mut lp = NativeProblem::new();
        lp.add_rows(2).unwrap();
        lp.add_cols(2).unwrap();
        lp.set_obj_dir(Direction::Maximize);
        for j in 1..=2 {
            lp.set_col_bounds(j, 0.0, f64::INFINITY).unwrap();
            lp.set_obj_coef(j, 1.0).unwrap();
        }
        lp.set_row_bounds(1, f64::NEG_INFINITY, 4.0).unwrap();
        lp.set_row_bounds(2, f64::NEG_INFINITY, 6.0).unwrap();
        lp.load_matrix(&[(1, 1, 1.0), (1, 2, 2.0), (2, 1, 3.0), (2, 2, 1.0)])
            .unwrap();
        lp
    }

    #[test]
    fn test_simplex_optimal() {
        let mut lp = bounded_lp();
        let outcome = simplex(&mut lp, &SimplexParams::default());
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(lp.status(), SolStatus::Optimal);
        assert!((lp.obj_val() - 2.8).abs() < 1e-7);
        assert!((lp.col_prim(1).unwrap() - 1.6).abs() < 1e-7);
        assert!((lp.row_prim(1).unwrap() - 4.0).abs() < 1e-7);
    }

    #[test]
    fn test_simplex_infeasible() {
        let mut lp = bounded_lp();
        lp.set_row_bounds(1, 10.0, f64::INFINITY).unwrap();
        lp.set_col_bounds(1, 0.0, 1.0).unwrap();
        lp.set_col_bounds(2, 0.0, 1.0).unwrap();
        let outcome = simplex(&mut lp, &SimplexParams::default());
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(lp.status(), SolStatus::NoFeasible);
    }

    #[test]
    fn test_simplex_unbounded_names_a_ray() {
        let mut lp = NativeProblem::new();
        lp.add_cols(1).unwrap();
        lp.set_col_bounds(1, 0.0, f64::INFINITY).unwrap();
        lp.set_obj_coef(1, 1.0).unwrap();
        lp.set_obj_dir(Direction::Maximize);
        let outcome = simplex(&mut lp, &SimplexParams::default());
        assert_eq!(outcome, Outcome::Success);
        assert_eq!(lp.status(), SolStatus::Unbounded);
        assert_eq!(lp.unbnd_ray(), 1);
    }

    #[test]
    fn test_simplex_without_columns() {
        let mut lp = NativeProblem::new();
        lp.add_rows(1).unwrap();
        lp.set_obj_coef(0, 3.0).unwrap();
        assert_eq!(simplex(&mut lp, &SimplexParams::default()), Outcome::Success);
        assert_eq!(lp.status(), SolStatus::Optimal);
        assert_eq!(lp.obj_val(), 3.0);
    }

    #[test]
    fn test_interior_optimal() {
        let mut lp = bounded_lp();
        assert_eq!(interior(&mut lp, MsgLevel::Off), Outcome::Success);
        assert_eq!(lp.ipt_status(), SolStatus::Optimal);
        assert!((lp.ipt_obj_val() - 2.8).abs() < 1e-5);
    }

    #[test]
    fn test_interior_without_columns_fails() {
        let mut lp = NativeProblem::new();
        assert_eq!(interior(&mut lp, MsgLevel::Off), Outcome::Fault);
    }

    fn captured_lines(parm: &SimplexParams) -> Vec<String> {
        let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink = std::rc::Rc::clone(&seen);
        term::set_term_hook(Some(Box::new(move |s: &str| {
            sink.borrow_mut().push(s.to_string());
        })));
        let was_on = term::set_term_on(true);
        simplex(&mut bounded_lp(), parm);
        term::set_term_on(was_on);
        term::set_term_hook(None);
        seen.take()
    }

    #[test]
    fn test_output_delay_holds_back_iteration_line() {
        let prompt = SimplexParams {
            msg_lev: MsgLevel::On,
            ..SimplexParams::default()
        };
        let lines = captured_lines(&prompt);
        assert!(lines.iter().any(|l| l.starts_with('*') && l.contains("obj =")));
        assert!(lines.iter().any(|l| l == "OPTIMAL SOLUTION FOUND"));

        let delayed = SimplexParams {
            out_dly: 60_000,
            ..prompt
        };
        let lines = captured_lines(&delayed);
        assert!(!lines.iter().any(|l| l.contains("obj =")));
        assert!(lines.iter().any(|l| l == "OPTIMAL SOLUTION FOUND"));
    }

    #[test]
    fn test_scaling_keeps_optimum() {
        let mut lp = bounded_lp();
        lp.scale(crate::params::ScaleFlags::GM | crate::params::ScaleFlags::EQ);
        assert_eq!(simplex(&mut lp, &SimplexParams::default()), Outcome::Success);
        assert!((lp.obj_val() - 2.8).abs() < 1e-7);
        lp.unscale();
        assert_eq!(lp.scaling(), Some(crate::params::ScaleFlags::NONE));
        assert_eq!(simplex(&mut lp, &SimplexParams::default()), Outcome::Success);
        assert!((lp.obj_val() - 2.8).abs() < 1e-7);
    }

    #[test]
    fn test_basis_status_fallback() {
        assert_eq!(basis_status(None, 0.0, 0.0, 0.0), VarStatus::Fixed);
        assert_eq!(basis_status(None, 0.0, 5.0, 5.0), VarStatus::Upper);
        assert_eq!(basis_status(None, 0.0, 5.0, 2.0), VarStatus::Basic);
        assert_eq!(
            basis_status(Some(BASIS_ZERO), f64::NEG_INFINITY, f64::INFINITY, 0.0),
            VarStatus::Free
        );
    }
}
