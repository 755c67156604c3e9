//! The problem object at the root of the binding's object graph.

use crate::bar::{Bar, BarKind, signed};
use crate::callback::{Bridge, Callback};
use crate::collection::BarCollection;
use crate::error::{Error, Result};
use crate::objective::Objective;
use crate::options::{IntegerOptions, SimplexOptions};
use lpbind_engine::{
    IosHandle, MsgLevel, NativeProblem, Outcome, ProbHandle, ScaleFlags, SolStatus, create_prob,
};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

/// Longest name accepted for problems, objectives, rows and columns.
pub const MAX_NAME_LEN: usize = 255;

pub(crate) fn check_name(name: Option<&str>) -> Result<()> {
    match name {
        Some(n) if n.chars().count() > MAX_NAME_LEN => Err(Error::NameTooLong),
        _ => Ok(()),
    }
}

/// Solver whose solution the unqualified accessors report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverKind {
    /// Simplex family; also the state before any solver ran.
    #[default]
    Simplex,
    Interior,
    Mip,
}

/// Whether a problem has integer columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    Continuous,
    MixedInteger,
}

/// Shared state behind every handle to one problem.
///
/// Each collection keeps a log holding, per deletion, the lowest index it
/// removed. A Bar created at log length `e` is stale once an entry at or
/// after `e` is not above its index.
pub(crate) struct ProblemCore {
    pub(crate) native: ProbHandle,
    last_solver: Cell<SolverKind>,
    row_deletions: RefCell<Vec<usize>>,
    col_deletions: RefCell<Vec<usize>>,
}

impl ProblemCore {
    fn new(native: ProbHandle, last_solver: SolverKind) -> Rc<Self> {
        Rc::new(Self {
            native,
            last_solver: Cell::new(last_solver),
            row_deletions: RefCell::new(Vec::new()),
            col_deletions: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn count(&self, kind: BarKind) -> usize {
        let prob = self.native.borrow();
        match kind {
            BarKind::Row => prob.num_rows(),
            BarKind::Col => prob.num_cols(),
        }
    }

    fn deletions(&self, kind: BarKind) -> &RefCell<Vec<usize>> {
        match kind {
            BarKind::Row => &self.row_deletions,
            BarKind::Col => &self.col_deletions,
        }
    }

    pub(crate) fn epoch(&self, kind: BarKind) -> usize {
        self.deletions(kind).borrow().len()
    }

    pub(crate) fn record_deletion(&self, kind: BarKind, lowest: usize) {
        self.deletions(kind).borrow_mut().push(lowest);
    }

    pub(crate) fn shifted_since(&self, kind: BarKind, epoch: usize, index: usize) -> bool {
        self.deletions(kind)
            .borrow()
            .get(epoch..)
            .is_some_and(|log| log.iter().any(|&lowest| lowest <= index))
    }

    pub(crate) fn last_solver(&self) -> SolverKind {
        self.last_solver.get()
    }
}

/// An LP/MIP problem.
///
/// Cloning yields another handle to the same problem; use [`Problem::copy`]
/// for an independent duplicate. The engine instance is released when the
/// last handle is dropped.
#[derive(Clone)]
pub struct Problem {
    pub(crate) core: Rc<ProblemCore>,
}

impl Default for Problem {
    fn default() -> Self {
        Self::new()
    }
}

impl Problem {
    /// Create an empty problem.
    pub fn new() -> Self {
        Self::from_native(create_prob())
    }

    pub(crate) fn from_native(native: ProbHandle) -> Self {
        Self {
            core: ProblemCore::new(native, SolverKind::default()),
        }
    }

    pub(crate) fn from_engine(prob: NativeProblem) -> Self {
        Self::from_native(Rc::new(RefCell::new(prob)))
    }

    pub(crate) fn shares_native(&self, native: &ProbHandle) -> bool {
        Rc::ptr_eq(&self.core.native, native)
    }

    pub fn rows(&self) -> BarCollection {
        BarCollection::new(Rc::clone(&self.core), BarKind::Row)
    }

    pub fn cols(&self) -> BarCollection {
        BarCollection::new(Rc::clone(&self.core), BarKind::Col)
    }

    pub fn obj(&self) -> Objective {
        Objective::new(Rc::clone(&self.core))
    }

    pub fn name(&self) -> Option<String> {
        self.core.native.borrow().name().map(str::to_string)
    }

    /// Set or clear the problem name; an empty name clears it.
    pub fn set_name(&self, name: Option<&str>) -> Result<()> {
        check_name(name)?;
        self.core.native.borrow_mut().set_name(name);
        Ok(())
    }

    /// Number of nonzero constraint coefficients.
    pub fn nnz(&self) -> usize {
        self.core.native.borrow().nnz()
    }

    /// Nonzero coefficients as `(row, col, value)`, 0-based, sorted by row
    /// then column.
    pub fn matrix(&self) -> Vec<(usize, usize, f64)> {
        self.core
            .native
            .borrow()
            .matrix()
            .into_iter()
            .map(|(i, j, v)| (i - 1, j - 1, v))
            .collect()
    }

    /// Replace the whole constraint matrix. Zero values are dropped.
    pub fn set_matrix(&self, entries: &[(usize, usize, f64)]) -> Result<()> {
        let (rows, cols) = (self.core.count(BarKind::Row), self.core.count(BarKind::Col));
        let mut seen = HashSet::with_capacity(entries.len());
        let mut native = Vec::with_capacity(entries.len());
        for &(i, j, v) in entries {
            for (kind, k, len) in [(BarKind::Row, i, rows), (BarKind::Col, j, cols)] {
                if k >= len {
                    return Err(Error::IndexOutOfRange {
                        kind,
                        index: signed(k),
                        len,
                    });
                }
            }
            if !seen.insert((i, j)) {
                return Err(Error::DuplicateIndex);
            }
            native.push((i + 1, j + 1, v));
        }
        self.core.native.borrow_mut().load_matrix(&native)?;
        Ok(())
    }

    /// Remove all rows, columns and names. Every existing Bar becomes stale.
    pub fn erase(&self) {
        self.core.native.borrow_mut().erase();
        self.core.record_deletion(BarKind::Row, 0);
        self.core.record_deletion(BarKind::Col, 0);
        self.core.last_solver.set(SolverKind::default());
    }

    /// Independent duplicate of this problem, optionally without names.
    pub fn copy(&self, names: bool) -> Problem {
        let copy = self.core.native.borrow().copy(names);
        Problem {
            core: ProblemCore::new(Rc::new(RefCell::new(copy)), self.core.last_solver()),
        }
    }

    pub fn kind(&self) -> ProblemKind {
        if self.num_int() > 0 {
            ProblemKind::MixedInteger
        } else {
            ProblemKind::Continuous
        }
    }

    /// Number of integer columns, binary ones included.
    pub fn num_int(&self) -> usize {
        self.core.native.borrow().num_int()
    }

    pub fn num_bin(&self) -> usize {
        self.core.native.borrow().num_bin()
    }

    /// Solver whose results `status`, `primal` and `value` report.
    pub fn last_solver(&self) -> SolverKind {
        self.core.last_solver()
    }

    /// Status of the solution from the solver used last.
    pub fn status(&self) -> SolStatus {
        match self.core.last_solver() {
            SolverKind::Simplex => self.status_s(),
            SolverKind::Interior => self.status_i(),
            SolverKind::Mip => self.status_m(),
        }
    }

    pub fn status_s(&self) -> SolStatus {
        self.core.native.borrow().status()
    }

    pub fn status_i(&self) -> SolStatus {
        self.core.native.borrow().ipt_status()
    }

    pub fn status_m(&self) -> SolStatus {
        self.core.native.borrow().mip_status()
    }

    pub fn status_primal(&self) -> SolStatus {
        self.core.native.borrow().prim_stat()
    }

    pub fn status_dual(&self) -> SolStatus {
        self.core.native.borrow().dual_stat()
    }

    /// Row or column along which the basic solution is unbounded, when the
    /// simplex solver found one.
    pub fn ray(&self) -> Option<Bar> {
        let (k, m) = {
            let prob = self.core.native.borrow();
            (prob.unbnd_ray(), prob.num_rows())
        };
        match k {
            0 => None,
            k if k <= m => Some(Bar::new(&self.core, BarKind::Row, k - 1)),
            k => Some(Bar::new(&self.core, BarKind::Col, k - m - 1)),
        }
    }

    /// Make every row basic and every column non-basic.
    pub fn std_basis(&self) {
        self.core.native.borrow_mut().std_basis();
    }

    /// Request scaling for later LP solves. The stored data is unchanged.
    pub fn scale(&self, flags: ScaleFlags) {
        self.core.native.borrow_mut().scale(flags);
    }

    /// Turn scaling off for later LP solves.
    pub fn unscale(&self) {
        self.core.native.borrow_mut().unscale();
    }

    /// Recompute the basic solution from the current row and column
    /// statuses without running the simplex method.
    pub fn warm_up(&self) -> Outcome {
        let outcome = lpbind_engine::warm_up(&mut self.core.native.borrow_mut());
        self.finish_solve("warm_up", outcome, None);
        outcome
    }

    fn finish_solve(&self, operation: &'static str, outcome: Outcome, solver: Option<SolverKind>) {
        if let Some(solver) = solver {
            self.core.last_solver.set(solver);
        }
        if outcome.is_basis_failure() {
            warn!(
                component = "binding",
                operation,
                status = "error",
                outcome = %outcome,
                "Solver failed before producing a solution"
            );
        } else {
            debug!(
                component = "binding",
                operation,
                status = "success",
                outcome = %outcome,
                "Solver finished"
            );
        }
    }

    /// Solve the LP relaxation with the simplex method.
    pub fn simplex(&self, options: &SimplexOptions) -> Result<Outcome> {
        let params = options.to_params()?;
        let outcome = lpbind_engine::simplex(&mut self.core.native.borrow_mut(), &params);
        let solver = (!outcome.is_basis_failure()).then_some(SolverKind::Simplex);
        self.finish_solve("simplex", outcome, solver);
        Ok(outcome)
    }

    /// Simplex with tightened tolerances, for a verified basic solution.
    pub fn exact(&self, options: &SimplexOptions) -> Result<Outcome> {
        let params = options.to_params()?;
        let outcome = lpbind_engine::exact(&mut self.core.native.borrow_mut(), &params);
        let solver = outcome.is_success().then_some(SolverKind::Simplex);
        self.finish_solve("exact", outcome, solver);
        Ok(outcome)
    }

    /// Solve the LP relaxation with the interior-point method.
    pub fn interior(&self) -> Result<Outcome> {
        let outcome = lpbind_engine::interior(&mut self.core.native.borrow_mut(), MsgLevel::Off);
        let solver = outcome.is_success().then_some(SolverKind::Interior);
        self.finish_solve("interior", outcome, solver);
        Ok(outcome)
    }

    /// Run branch-and-bound. Without presolve the problem needs an optimal
    /// basic solution first.
    pub fn integer(&self, options: &IntegerOptions) -> Result<Outcome> {
        self.run_integer(options, None, false)
    }

    /// Run branch-and-bound, reporting each decision point to `callback`.
    ///
    /// An error returned by the callback stops the search and is returned
    /// here.
    pub fn integer_with_callback(
        &self,
        options: &IntegerOptions,
        callback: &mut dyn Callback,
    ) -> Result<Outcome> {
        self.run_integer(options, Some(callback), false)
    }

    /// Branch-and-bound with presolve always on.
    pub fn intopt(&self, options: &IntegerOptions) -> Result<Outcome> {
        self.run_integer(options, None, true)
    }

    fn run_integer(
        &self,
        options: &IntegerOptions,
        callback: Option<&mut dyn Callback>,
        force_presolve: bool,
    ) -> Result<Outcome> {
        let presolve = force_presolve || options.presolve.unwrap_or(false);
        if !presolve && self.status_s() != SolStatus::Optimal {
            warn!(
                component = "binding",
                operation = "integer",
                status = "error",
                "Integer solver called without an optimal basis"
            );
            return Err(Error::NoOptimalBasis);
        }
        let mut params = options.to_params()?;
        params.presolve = presolve;

        let native = Rc::clone(&self.core.native);
        let outcome = match callback {
            None => lpbind_engine::intopt(&native, &params, None),
            Some(callback) => {
                let mut bridge = Bridge::new(self.clone(), callback);
                let outcome = lpbind_engine::intopt(
                    &native,
                    &params,
                    Some(&mut |handle: &IosHandle| bridge.dispatch(handle)),
                );
                if let Some(err) = bridge.take_error() {
                    warn!(
                        component = "binding",
                        operation = "integer",
                        status = "error",
                        code = err.code(),
                        "Search callback failed"
                    );
                    return Err(err);
                }
                outcome
            }
        };

        let updates = if force_presolve {
            outcome.is_success()
        } else {
            !outcome.is_basis_failure()
        };
        let operation = if force_presolve { "intopt" } else { "integer" };
        self.finish_solve(operation, outcome, updates.then_some(SolverKind::Mip));
        Ok(outcome)
    }
}

impl PartialEq for Problem {
    /// Handles are equal when they refer to the same problem.
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.core, &other.core)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prob = self.core.native.borrow();
        write!(f, "Problem, {}-by-{}", prob.num_rows(), prob.num_cols())
    }
}

impl fmt::Debug for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prob = self.core.native.borrow();
        f.debug_struct("Problem")
            .field("name", &prob.name())
            .field("rows", &prob.num_rows())
            .field("cols", &prob.num_cols())
            .field("last_solver", &self.core.last_solver())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_problem_is_empty() {
        let p = Problem::new();
        assert_eq!(p.rows().len(), 0);
        assert_eq!(p.cols().len(), 0);
        assert_eq!(p.kind(), ProblemKind::Continuous);
        assert_eq!(p.status(), SolStatus::Undefined);
        assert!(p.ray().is_none());
        assert_eq!(p.to_string(), "Problem, 0-by-0");
    }

    #[test]
    fn test_name_length_limit() {
        let p = Problem::new();
        p.set_name(Some("diet")).unwrap();
        assert_eq!(p.name().as_deref(), Some("diet"));
        let long = "n".repeat(MAX_NAME_LEN + 1);
        assert!(matches!(p.set_name(Some(&long)), Err(Error::NameTooLong)));
        p.set_name(None).unwrap();
        assert!(p.name().is_none());
    }

    #[test]
    fn test_matrix_roundtrip_and_duplicates() {
        let p = Problem::new();
        p.rows().insert(2).unwrap();
        p.cols().insert(3).unwrap();
        p.set_matrix(&[(1, 0, 4.0), (0, 2, 1.5), (0, 0, 0.0)]).unwrap();
        assert_eq!(p.matrix(), vec![(0, 2, 1.5), (1, 0, 4.0)]);
        assert_eq!(p.nnz(), 2);

        let err = p.set_matrix(&[(0, 1, 1.0), (0, 1, 2.0)]).unwrap_err();
        assert!(matches!(err, Error::DuplicateIndex));
        let err = p.set_matrix(&[(2, 0, 1.0)]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { kind: BarKind::Row, .. }));
    }

    #[test]
    fn test_deletion_log() {
        let p = Problem::new();
        let core = &p.core;
        let epoch = core.epoch(BarKind::Row);
        core.record_deletion(BarKind::Row, 3);
        assert!(!core.shifted_since(BarKind::Row, epoch, 2));
        assert!(core.shifted_since(BarKind::Row, epoch, 3));
        assert!(!core.shifted_since(BarKind::Row, epoch + 1, 3));
        assert!(!core.shifted_since(BarKind::Col, 0, 0));
    }

    #[test]
    fn test_copy_is_independent() {
        let p = Problem::new();
        p.cols().insert(2).unwrap();
        p.cols().get(0).unwrap().set_name(Some("x")).unwrap();
        let named = p.copy(true);
        let unnamed = p.copy(false);
        p.cols().insert(1).unwrap();
        assert_eq!(named.cols().len(), 2);
        assert_ne!(named, p);
        assert_eq!(named.cols().get("x").unwrap().index(), 0);
        assert!(unnamed.cols().get(0).unwrap().name().unwrap().is_none());
    }

    #[test]
    fn test_erase_invalidates_bars() {
        let p = Problem::new();
        p.rows().insert(2).unwrap();
        let bar = p.rows().get(1).unwrap();
        p.erase();
        p.rows().insert(3).unwrap();
        assert!(!bar.is_valid());
        assert!(matches!(bar.name(), Err(Error::StaleEntity { .. })));
    }

    #[test]
    fn test_integer_requires_optimal_basis() {
        let p = Problem::new();
        p.cols().insert(1).unwrap();
        let err = p.integer(&IntegerOptions::new()).unwrap_err();
        assert!(matches!(err, Error::NoOptimalBasis));
        assert!(err.to_string().contains("requires existing optimal basic solution"));
    }
}
