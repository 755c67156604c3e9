//! FFI bridge to the HiGHS solver library.
//!
//! Every LP relaxation the engine needs is built fresh from a
//! [`NativeProblem`] snapshot and solved here.
#![allow(unsafe_code)]

use crate::problem::{Direction, NativeProblem};
use highs::{Col, HighsModelStatus, RowProblem, Sense as HighsSense, SolvedModel};
use std::ffi::{CStr, CString};
use std::fmt;
use tracing::{debug, trace, warn};

/// Outcome of a single HiGHS solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LpStatus {
    Optimal,
    Infeasible,
    Unbounded,
    /// Presolve could not tell which of the two holds.
    UnboundedOrInfeasible,
    ReachedTimeLimit,
    ReachedIterationLimit,
    Unknown,
}

/// Option value types for HiGHS solver configuration.
#[derive(Debug, Clone)]
pub(crate) enum HighsOption {
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(&'static str),
}

/// Values read back from a solved relaxation.
#[derive(Debug, Clone)]
pub(crate) struct LpSolution {
    pub(crate) status: LpStatus,
    pub(crate) objective: f64,
    pub(crate) col_values: Vec<f64>,
    pub(crate) col_duals: Vec<f64>,
    pub(crate) row_values: Vec<f64>,
    pub(crate) row_duals: Vec<f64>,
    pub(crate) simplex_iterations: u64,
    pub(crate) barrier_iterations: u64,
    /// Raw HiGHS basis codes for columns and rows, when a basis exists.
    pub(crate) basis: Option<(Vec<i64>, Vec<i64>)>,
    /// Primal ray over the columns, when HiGHS found one.
    pub(crate) primal_ray: Option<Vec<f64>>,
}

/// HiGHS basis status codes.
pub(crate) const BASIS_LOWER: i64 = 0;
pub(crate) const BASIS_BASIC: i64 = 1;
pub(crate) const BASIS_UPPER: i64 = 2;
pub(crate) const BASIS_ZERO: i64 = 3;

/// One LP relaxation ready to be handed to HiGHS.
pub(crate) struct HighsLp {
    problem: RowProblem,
    sense: Direction,
    shift: f64,
    options: Vec<(&'static str, HighsOption)>,
    log_to_console: bool,
}

impl HighsLp {
    /// Build the continuous relaxation of `prob`.
    ///
    /// `col_bounds`, when given, replaces the column bounds; the branch and
    /// bound driver uses it to impose node restrictions.
    pub(crate) fn relaxation(prob: &NativeProblem, col_bounds: Option<&[(f64, f64)]>) -> Self {
        let mut problem = RowProblem::default();
        let columns: Vec<Col> = prob
            .cols
            .iter()
            .enumerate()
            .map(|(k, col)| {
                let (lower, upper) = match col_bounds {
                    Some(bounds) => bounds[k],
                    None => (col.entity.lower, col.entity.upper),
                };
                problem.add_column(col.obj, lower..=upper)
            })
            .collect();

        let mut factors: Vec<Vec<(Col, f64)>> = vec![Vec::new(); prob.rows.len()];
        for (i, j, v) in prob.coef_iter() {
            factors[i - 1].push((columns[j - 1], v));
        }
        for (row, factors) in prob.rows.iter().zip(factors) {
            problem.add_row(row.lower..=row.upper, factors);
        }

        trace!(
            component = "engine",
            operation = "build_relaxation",
            status = "success",
            num_cols = problem.num_cols(),
            num_rows = problem.num_rows(),
            "Built LP relaxation"
        );

        let mut options = Vec::new();
        if let Some(flags) = prob.scaling() {
            options.push((
                "simplex_scale_strategy",
                HighsOption::Int(flags.highs_strategy()),
            ));
        }
        HighsLp {
            problem,
            sense: prob.obj_dir(),
            shift: prob.obj_shift(),
            options,
            log_to_console: false,
        }
    }

    pub(crate) fn set_option(&mut self, option: &'static str, value: HighsOption) {
        self.options.push((option, value));
    }

    pub(crate) fn set_log_to_console(&mut self, enabled: bool) {
        self.log_to_console = enabled;
    }

    pub(crate) fn solve(self) -> LpSolution {
        debug!(
            num_cols = self.problem.num_cols(),
            num_rows = self.problem.num_rows(),
            sense = ?self.sense,
            component = "engine",
            operation = "highs_solve",
            status = "success",
            "Solving LP relaxation"
        );
        let sense = match self.sense {
            Direction::Minimize => HighsSense::Minimise,
            Direction::Maximize => HighsSense::Maximise,
        };
        let num_cols = self.problem.num_cols();
        let num_rows = self.problem.num_rows();
        let mut model = self.problem.optimise(sense);
        if self.log_to_console {
            model.set_option("output_flag", true);
            model.set_option("log_to_console", true);
        } else {
            model.make_quiet();
        }
        for (option, value) in self.options {
            match value {
                HighsOption::Bool(val) => model.set_option(option, val),
                HighsOption::Int(val) => model.set_option(option, val),
                HighsOption::Float(val) => model.set_option(option, val),
                HighsOption::Str(val) => model.set_option(option, val),
            }
        }

        let solved = model.solve();
        let status = map_status(solved.status());
        let solution = solved.get_solution();
        let primal_ray = if status == LpStatus::Unbounded {
            primal_ray(&solved, num_cols)
        } else {
            None
        };
        let result = LpSolution {
            status,
            objective: solved.objective_value() + self.shift,
            col_values: solution.columns().to_vec(),
            col_duals: solution.dual_columns().to_vec(),
            row_values: solution.rows().to_vec(),
            row_duals: solution.dual_rows().to_vec(),
            simplex_iterations: int_info(&solved, "simplex_iteration_count").unwrap_or(0),
            barrier_iterations: int_info(&solved, "ipm_iteration_count").unwrap_or(0),
            basis: basis(&solved, num_cols, num_rows),
            primal_ray,
        };
        trace!(
            component = "engine",
            operation = "highs_solve",
            status = "success",
            lp_status = ?result.status,
            objective = result.objective,
            simplex_iterations = result.simplex_iterations,
            "Solution status received"
        );
        result
    }
}

impl fmt::Debug for HighsLp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HighsLp")
            .field("num_cols", &self.problem.num_cols())
            .field("num_rows", &self.problem.num_rows())
            .field("sense", &self.sense)
            .finish_non_exhaustive()
    }
}

fn int_info(solved: &SolvedModel, name: &str) -> Option<u64> {
    let c_name = CString::new(name).ok()?;
    let mut value: highs_sys::HighsInt = 0;
    let status = unsafe {
        highs_sys::Highs_getIntInfoValue(solved.as_ptr(), c_name.as_ptr(), &raw mut value)
    };
    if status != highs_sys::STATUS_OK {
        warn!(
            component = "engine",
            operation = "solve_info",
            status = "warn",
            info = name,
            status_code = status,
            "Failed to read HiGHS info value"
        );
        return None;
    }
    u64::try_from(value).ok()
}

fn basis(solved: &SolvedModel, num_cols: usize, num_rows: usize) -> Option<(Vec<i64>, Vec<i64>)> {
    let mut cols: Vec<highs_sys::HighsInt> = vec![0; num_cols];
    let mut rows: Vec<highs_sys::HighsInt> = vec![0; num_rows];
    let status = unsafe {
        highs_sys::Highs_getBasis(solved.as_ptr(), cols.as_mut_ptr(), rows.as_mut_ptr())
    };
    if status != highs_sys::STATUS_OK {
        debug!(
            component = "engine",
            operation = "solve_info",
            info = "basis",
            status_code = status,
            "Basis not available"
        );
        return None;
    }
    Some((
        cols.into_iter().map(i64::from).collect(),
        rows.into_iter().map(i64::from).collect(),
    ))
}

fn primal_ray(solved: &SolvedModel, num_cols: usize) -> Option<Vec<f64>> {
    let mut has_ray: highs_sys::HighsInt = 0;
    let mut values = vec![0.0; num_cols];
    let status = unsafe {
        highs_sys::Highs_getPrimalRay(solved.as_ptr(), &raw mut has_ray, values.as_mut_ptr())
    };
    (status == highs_sys::STATUS_OK && has_ray != 0).then_some(values)
}

/// Return the HiGHS solver version string, if available.
pub fn highs_version() -> Option<String> {
    unsafe {
        let ptr = highs_sys::Highs_version();
        if ptr.is_null() {
            None
        } else {
            CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
        }
    }
}

fn map_status(status: HighsModelStatus) -> LpStatus {
    match status {
        HighsModelStatus::Optimal => LpStatus::Optimal,
        HighsModelStatus::Infeasible => LpStatus::Infeasible,
        HighsModelStatus::Unbounded => LpStatus::Unbounded,
        HighsModelStatus::UnboundedOrInfeasible => LpStatus::UnboundedOrInfeasible,
        HighsModelStatus::ReachedTimeLimit => LpStatus::ReachedTimeLimit,
        HighsModelStatus::ReachedIterationLimit => LpStatus::ReachedIterationLimit,
        _ => LpStatus::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxation_respects_overrides() {
        let mut prob = NativeProblem::new();
        prob.add_cols(1).unwrap();
        prob.set_col_bounds(1, 0.0, 10.0).unwrap();
        prob.set_obj_coef(1, 1.0).unwrap();
        prob.set_obj_dir(Direction::Maximize);

        let lp = HighsLp::relaxation(&prob, Some(&[(0.0, 2.5)]));
        let result = lp.solve();
        assert_eq!(result.status, LpStatus::Optimal);
        assert!((result.col_values[0] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_shift_is_added_to_objective() {
        let mut prob = NativeProblem::new();
        prob.add_cols(1).unwrap();
        prob.set_col_bounds(1, 1.0, 4.0).unwrap();
        prob.set_obj_coef(1, 2.0).unwrap();
        prob.set_obj_coef(0, 10.0).unwrap();

        let result = HighsLp::relaxation(&prob, None).solve();
        assert_eq!(result.status, LpStatus::Optimal);
        assert!((result.objective - 12.0).abs() < 1e-9);
    }
}
