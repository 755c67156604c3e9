//! Index-addressed problem store.
//!
//! Rows and columns are numbered from 1; a number of 0 is reserved for
//! "nothing" (and for the constant term in objective calls). Every call that
//! takes a number validates it and returns [`EngineError`] on failure.

use crate::error::EngineError;
use crate::params::ScaleFlags;
use crate::status::{SolStatus, VarStatus};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;
use tracing::{debug, trace};

/// Shared handle to a problem instance.
///
/// The engine never keeps a borrow alive across a user callback, so the same
/// handle can be read and mutated from inside one.
pub type ProbHandle = Rc<RefCell<NativeProblem>>;

/// Create a new empty shared problem.
pub fn create_prob() -> ProbHandle {
    Rc::new(RefCell::new(NativeProblem::new()))
}

/// Optimization direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

/// Column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColKind {
    #[default]
    Continuous,
    Integer,
}

/// Shape of a bound pair, derived from which sides are finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundType {
    Free,
    Lower,
    Upper,
    Double,
    Fixed,
}

impl BoundType {
    pub fn of(lower: f64, upper: f64) -> Self {
        match (lower.is_finite(), upper.is_finite()) {
            (false, false) => BoundType::Free,
            (true, false) => BoundType::Lower,
            (false, true) => BoundType::Upper,
            (true, true) if lower == upper => BoundType::Fixed,
            (true, true) => BoundType::Double,
        }
    }

    /// The non-basic status a variable of this shape may legally take.
    pub(crate) fn nonbasic_status(self, requested: VarStatus) -> VarStatus {
        match self {
            BoundType::Free => VarStatus::Free,
            BoundType::Lower => VarStatus::Lower,
            BoundType::Upper => VarStatus::Upper,
            BoundType::Fixed => VarStatus::Fixed,
            BoundType::Double if requested == VarStatus::Upper => VarStatus::Upper,
            BoundType::Double => VarStatus::Lower,
        }
    }
}

/// Per-entity data shared by rows and columns.
#[derive(Debug, Clone)]
pub(crate) struct Entity {
    pub(crate) name: Option<String>,
    pub(crate) lower: f64,
    pub(crate) upper: f64,
    pub(crate) stat: VarStatus,
    pub(crate) prim: f64,
    pub(crate) dual: f64,
    pub(crate) ipt_prim: f64,
    pub(crate) ipt_dual: f64,
    pub(crate) mip: f64,
}

impl Entity {
    fn free_row() -> Self {
        Self {
            name: None,
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            stat: VarStatus::Basic,
            prim: 0.0,
            dual: 0.0,
            ipt_prim: 0.0,
            ipt_dual: 0.0,
            mip: 0.0,
        }
    }

    fn fixed_col() -> Self {
        Self {
            lower: 0.0,
            upper: 0.0,
            stat: VarStatus::Fixed,
            ..Self::free_row()
        }
    }

    fn set_bounds(&mut self, lower: f64, upper: f64) {
        self.lower = lower;
        self.upper = upper;
        if self.stat != VarStatus::Basic {
            self.stat = BoundType::of(lower, upper).nonbasic_status(self.stat);
        }
    }

    fn set_stat(&mut self, stat: VarStatus) {
        self.stat = if stat == VarStatus::Basic {
            stat
        } else {
            BoundType::of(self.lower, self.upper).nonbasic_status(stat)
        };
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Column {
    pub(crate) entity: Entity,
    pub(crate) kind: ColKind,
    pub(crate) obj: f64,
}

/// Status block of one solution kind.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SolutionState {
    pub(crate) status: SolStatus,
    pub(crate) obj: f64,
}

/// A problem instance addressed by 1-based row and column numbers.
#[derive(Debug, Clone, Default)]
pub struct NativeProblem {
    name: Option<String>,
    obj_name: Option<String>,
    dir: Direction,
    shift: f64,
    pub(crate) rows: Vec<Entity>,
    pub(crate) cols: Vec<Column>,
    // Keyed by (row, col), both 1-based; zero entries are never stored.
    coefs: BTreeMap<(usize, usize), f64>,
    pub(crate) basic: SolutionState,
    pub(crate) prim_stat: SolStatus,
    pub(crate) dual_stat: SolStatus,
    pub(crate) ipt: SolutionState,
    pub(crate) mip: SolutionState,
    pub(crate) ray: usize,
    /// Scaling requested for solves; `None` keeps the backend default.
    scaling: Option<ScaleFlags>,
}

fn normalize_name(name: Option<&str>) -> Option<String> {
    name.filter(|s| !s.is_empty()).map(str::to_string)
}

impl NativeProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the empty problem.
    pub fn erase(&mut self) {
        debug!(
            component = "engine",
            operation = "erase",
            status = "success",
            num_rows = self.rows.len(),
            num_cols = self.cols.len(),
            "Erasing problem"
        );
        *self = Self::new();
    }

    /// Copy of this problem, optionally dropping all symbolic names.
    pub fn copy(&self, names: bool) -> Self {
        let mut copy = self.clone();
        if !names {
            copy.name = None;
            copy.obj_name = None;
            for row in &mut copy.rows {
                row.name = None;
            }
            for col in &mut copy.cols {
                col.entity.name = None;
            }
        }
        copy
    }

    fn check_row(&self, i: usize) -> Result<(), EngineError> {
        if i == 0 || i > self.rows.len() {
            return Err(EngineError::RowOutOfRange {
                row: i,
                count: self.rows.len(),
            });
        }
        Ok(())
    }

    fn check_col(&self, j: usize) -> Result<(), EngineError> {
        if j == 0 || j > self.cols.len() {
            return Err(EngineError::ColOutOfRange {
                col: j,
                count: self.cols.len(),
            });
        }
        Ok(())
    }

    fn invalidate_solutions(&mut self) {
        self.basic.status = SolStatus::Undefined;
        self.prim_stat = SolStatus::Undefined;
        self.dual_stat = SolStatus::Undefined;
        self.ipt.status = SolStatus::Undefined;
        self.mip.status = SolStatus::Undefined;
        self.ray = 0;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = normalize_name(name);
    }

    pub fn obj_name(&self) -> Option<&str> {
        self.obj_name.as_deref()
    }

    pub fn set_obj_name(&mut self, name: Option<&str>) {
        self.obj_name = normalize_name(name);
    }

    pub fn obj_dir(&self) -> Direction {
        self.dir
    }

    pub fn set_obj_dir(&mut self, dir: Direction) {
        self.dir = dir;
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    /// Append `count` free rows, returning the number of the first one.
    pub fn add_rows(&mut self, count: usize) -> Result<usize, EngineError> {
        if count == 0 {
            return Err(EngineError::ZeroCount);
        }
        let first = self.rows.len() + 1;
        self.rows
            .extend(std::iter::repeat_with(Entity::free_row).take(count));
        self.invalidate_solutions();
        trace!(
            component = "engine",
            operation = "add_rows",
            status = "success",
            count,
            first,
            "Added rows"
        );
        Ok(first)
    }

    /// Append `count` continuous columns fixed at zero, returning the number
    /// of the first one.
    pub fn add_cols(&mut self, count: usize) -> Result<usize, EngineError> {
        if count == 0 {
            return Err(EngineError::ZeroCount);
        }
        let first = self.cols.len() + 1;
        self.cols.extend(
            std::iter::repeat_with(|| Column {
                entity: Entity::fixed_col(),
                kind: ColKind::Continuous,
                obj: 0.0,
            })
            .take(count),
        );
        self.invalidate_solutions();
        trace!(
            component = "engine",
            operation = "add_cols",
            status = "success",
            count,
            first,
            "Added columns"
        );
        Ok(first)
    }

    fn sorted_unique(numbers: &[usize]) -> Result<Vec<usize>, EngineError> {
        let mut seen = BTreeSet::new();
        for &k in numbers {
            if !seen.insert(k) {
                return Err(EngineError::DuplicateIndex { index: k });
            }
        }
        Ok(seen.into_iter().collect())
    }

    /// Delete the listed rows; remaining rows are renumbered densely.
    pub fn del_rows(&mut self, rows: &[usize]) -> Result<(), EngineError> {
        for &i in rows {
            self.check_row(i)?;
        }
        let doomed = Self::sorted_unique(rows)?;
        let remap = renumber(self.rows.len(), &doomed);
        let mut k = 0;
        self.rows.retain(|_| {
            k += 1;
            remap[k] != 0
        });
        self.coefs = std::mem::take(&mut self.coefs)
            .into_iter()
            .filter_map(|((i, j), v)| (remap[i] != 0).then_some(((remap[i], j), v)))
            .collect();
        self.invalidate_solutions();
        debug!(
            component = "engine",
            operation = "del_rows",
            status = "success",
            deleted = doomed.len(),
            num_rows = self.rows.len(),
            "Deleted rows"
        );
        Ok(())
    }

    /// Delete the listed columns; remaining columns are renumbered densely.
    pub fn del_cols(&mut self, cols: &[usize]) -> Result<(), EngineError> {
        for &j in cols {
            self.check_col(j)?;
        }
        let doomed = Self::sorted_unique(cols)?;
        let remap = renumber(self.cols.len(), &doomed);
        let mut k = 0;
        self.cols.retain(|_| {
            k += 1;
            remap[k] != 0
        });
        self.coefs = std::mem::take(&mut self.coefs)
            .into_iter()
            .filter_map(|((i, j), v)| (remap[j] != 0).then_some(((i, remap[j]), v)))
            .collect();
        self.invalidate_solutions();
        debug!(
            component = "engine",
            operation = "del_cols",
            status = "success",
            deleted = doomed.len(),
            num_cols = self.cols.len(),
            "Deleted columns"
        );
        Ok(())
    }

    pub fn row_name(&self, i: usize) -> Result<Option<&str>, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].name.as_deref())
    }

    pub fn set_row_name(&mut self, i: usize, name: Option<&str>) -> Result<(), EngineError> {
        self.check_row(i)?;
        self.rows[i - 1].name = normalize_name(name);
        Ok(())
    }

    pub fn col_name(&self, j: usize) -> Result<Option<&str>, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.name.as_deref())
    }

    pub fn set_col_name(&mut self, j: usize, name: Option<&str>) -> Result<(), EngineError> {
        self.check_col(j)?;
        self.cols[j - 1].entity.name = normalize_name(name);
        Ok(())
    }

    /// Numbers of all rows carrying exactly this name.
    pub fn find_rows(&self, name: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.name.as_deref() == Some(name))
            .map(|(k, _)| k + 1)
            .collect()
    }

    /// Numbers of all columns carrying exactly this name.
    pub fn find_cols(&self, name: &str) -> Vec<usize> {
        self.cols
            .iter()
            .enumerate()
            .filter(|(_, col)| col.entity.name.as_deref() == Some(name))
            .map(|(k, _)| k + 1)
            .collect()
    }

    /// Bounds of row `i`; an infinite side means unbounded.
    pub fn row_bounds(&self, i: usize) -> Result<(f64, f64), EngineError> {
        self.check_row(i)?;
        let row = &self.rows[i - 1];
        Ok((row.lower, row.upper))
    }

    pub fn set_row_bounds(&mut self, i: usize, lower: f64, upper: f64) -> Result<(), EngineError> {
        self.check_row(i)?;
        check_bounds(lower, upper)?;
        self.rows[i - 1].set_bounds(lower, upper);
        Ok(())
    }

    pub fn col_bounds(&self, j: usize) -> Result<(f64, f64), EngineError> {
        self.check_col(j)?;
        let col = &self.cols[j - 1].entity;
        Ok((col.lower, col.upper))
    }

    pub fn set_col_bounds(&mut self, j: usize, lower: f64, upper: f64) -> Result<(), EngineError> {
        self.check_col(j)?;
        check_bounds(lower, upper)?;
        self.cols[j - 1].entity.set_bounds(lower, upper);
        Ok(())
    }

    /// Constant term of the objective.
    pub fn obj_shift(&self) -> f64 {
        self.shift
    }

    pub fn set_obj_shift(&mut self, value: f64) {
        self.shift = value;
    }

    /// Objective coefficient of column `j`, or the constant term for `j == 0`.
    pub fn obj_coef(&self, j: usize) -> Result<f64, EngineError> {
        if j == 0 {
            return Ok(self.shift);
        }
        self.check_col(j)?;
        Ok(self.cols[j - 1].obj)
    }

    pub fn set_obj_coef(&mut self, j: usize, value: f64) -> Result<(), EngineError> {
        if j == 0 {
            self.shift = value;
            return Ok(());
        }
        self.check_col(j)?;
        self.cols[j - 1].obj = value;
        Ok(())
    }

    pub fn col_kind(&self, j: usize) -> Result<ColKind, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].kind)
    }

    pub fn set_col_kind(&mut self, j: usize, kind: ColKind) -> Result<(), EngineError> {
        self.check_col(j)?;
        self.cols[j - 1].kind = kind;
        Ok(())
    }

    /// Mark column `j` integer with bounds `[0, 1]`.
    pub fn set_col_binary(&mut self, j: usize) -> Result<(), EngineError> {
        self.set_col_kind(j, ColKind::Integer)?;
        self.set_col_bounds(j, 0.0, 1.0)
    }

    /// True when column `j` is integer with bounds exactly `[0, 1]`.
    pub fn is_binary(&self, j: usize) -> Result<bool, EngineError> {
        self.check_col(j)?;
        let col = &self.cols[j - 1];
        Ok(col.kind == ColKind::Integer && col.entity.lower == 0.0 && col.entity.upper == 1.0)
    }

    pub fn num_int(&self) -> usize {
        self.cols
            .iter()
            .filter(|c| c.kind == ColKind::Integer)
            .count()
    }

    pub fn num_bin(&self) -> usize {
        self.cols
            .iter()
            .filter(|c| {
                c.kind == ColKind::Integer && c.entity.lower == 0.0 && c.entity.upper == 1.0
            })
            .count()
    }

    pub fn nnz(&self) -> usize {
        self.coefs.len()
    }

    /// Row `i` of the constraint matrix as `(col, value)` pairs sorted by column.
    pub fn mat_row(&self, i: usize) -> Result<Vec<(usize, f64)>, EngineError> {
        self.check_row(i)?;
        Ok(self
            .coefs
            .range((i, 0)..(i + 1, 0))
            .map(|(&(_, j), &v)| (j, v))
            .collect())
    }

    /// Column `j` of the constraint matrix as `(row, value)` pairs sorted by row.
    pub fn mat_col(&self, j: usize) -> Result<Vec<(usize, f64)>, EngineError> {
        self.check_col(j)?;
        Ok(self
            .coefs
            .iter()
            .filter(|&(&(_, col), _)| col == j)
            .map(|(&(i, _), &v)| (i, v))
            .collect())
    }

    /// Replace row `i` with the given `(col, value)` pairs.
    pub fn set_mat_row(&mut self, i: usize, entries: &[(usize, f64)]) -> Result<(), EngineError> {
        self.check_row(i)?;
        let mut seen = BTreeSet::new();
        for &(j, _) in entries {
            self.check_col(j)?;
            if !seen.insert(j) {
                return Err(EngineError::DuplicateIndex { index: j });
            }
        }
        self.coefs.retain(|&(row, _), _| row != i);
        for &(j, v) in entries {
            if v != 0.0 {
                self.coefs.insert((i, j), v);
            }
        }
        Ok(())
    }

    /// Replace column `j` with the given `(row, value)` pairs.
    pub fn set_mat_col(&mut self, j: usize, entries: &[(usize, f64)]) -> Result<(), EngineError> {
        self.check_col(j)?;
        let mut seen = BTreeSet::new();
        for &(i, _) in entries {
            self.check_row(i)?;
            if !seen.insert(i) {
                return Err(EngineError::DuplicateIndex { index: i });
            }
        }
        self.coefs.retain(|&(_, col), _| col != j);
        for &(i, v) in entries {
            if v != 0.0 {
                self.coefs.insert((i, j), v);
            }
        }
        Ok(())
    }

    /// Replace the whole constraint matrix with `(row, col, value)` triples.
    pub fn load_matrix(&mut self, entries: &[(usize, usize, f64)]) -> Result<(), EngineError> {
        let mut loaded = BTreeMap::new();
        for &(i, j, v) in entries {
            self.check_row(i)?;
            self.check_col(j)?;
            if loaded.insert((i, j), v).is_some() {
                return Err(EngineError::DuplicateIndex {
                    index: (i - 1) * self.cols.len() + j,
                });
            }
        }
        loaded.retain(|_, v| *v != 0.0);
        self.coefs = loaded;
        Ok(())
    }

    /// All matrix entries as `(row, col, value)` triples sorted by row, then column.
    pub fn matrix(&self) -> Vec<(usize, usize, f64)> {
        self.coefs.iter().map(|(&(i, j), &v)| (i, j, v)).collect()
    }

    pub fn row_stat(&self, i: usize) -> Result<VarStatus, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].stat)
    }

    /// Set the basis status of row `i`; a non-basic status inconsistent with
    /// the row's bounds is replaced by the consistent one.
    pub fn set_row_stat(&mut self, i: usize, stat: VarStatus) -> Result<(), EngineError> {
        self.check_row(i)?;
        self.rows[i - 1].set_stat(stat);
        Ok(())
    }

    pub fn col_stat(&self, j: usize) -> Result<VarStatus, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.stat)
    }

    pub fn set_col_stat(&mut self, j: usize, stat: VarStatus) -> Result<(), EngineError> {
        self.check_col(j)?;
        self.cols[j - 1].entity.set_stat(stat);
        Ok(())
    }

    /// Request scaling of the problem data for later solves. Stored
    /// coefficients are unchanged.
    pub fn scale(&mut self, flags: ScaleFlags) {
        debug!(
            component = "engine",
            operation = "scale",
            status = "success",
            flags = flags.bits(),
            "Scaling requested"
        );
        self.scaling = Some(flags);
    }

    /// Drop all scaling: every scale factor becomes 1.
    pub fn unscale(&mut self) {
        self.scaling = Some(ScaleFlags::NONE);
    }

    pub fn scaling(&self) -> Option<ScaleFlags> {
        self.scaling
    }

    /// Trivial basis: every row basic, every column non-basic.
    pub fn std_basis(&mut self) {
        for row in &mut self.rows {
            row.stat = VarStatus::Basic;
        }
        for col in &mut self.cols {
            let entity = &mut col.entity;
            entity.stat = BoundType::of(entity.lower, entity.upper).nonbasic_status(VarStatus::Lower);
        }
    }

    pub fn status(&self) -> SolStatus {
        self.basic.status
    }

    pub fn prim_stat(&self) -> SolStatus {
        self.prim_stat
    }

    pub fn dual_stat(&self) -> SolStatus {
        self.dual_stat
    }

    pub fn obj_val(&self) -> f64 {
        self.basic.obj
    }

    pub fn row_prim(&self, i: usize) -> Result<f64, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].prim)
    }

    pub fn row_dual(&self, i: usize) -> Result<f64, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].dual)
    }

    pub fn col_prim(&self, j: usize) -> Result<f64, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.prim)
    }

    pub fn col_dual(&self, j: usize) -> Result<f64, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.dual)
    }

    /// Number of the variable causing unboundedness: rows are `1..=m`,
    /// columns `m+1..=m+n`, 0 when unknown.
    pub fn unbnd_ray(&self) -> usize {
        self.ray
    }

    pub fn ipt_status(&self) -> SolStatus {
        self.ipt.status
    }

    pub fn ipt_obj_val(&self) -> f64 {
        self.ipt.obj
    }

    pub fn ipt_row_prim(&self, i: usize) -> Result<f64, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].ipt_prim)
    }

    pub fn ipt_row_dual(&self, i: usize) -> Result<f64, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].ipt_dual)
    }

    pub fn ipt_col_prim(&self, j: usize) -> Result<f64, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.ipt_prim)
    }

    pub fn ipt_col_dual(&self, j: usize) -> Result<f64, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.ipt_dual)
    }

    pub fn mip_status(&self) -> SolStatus {
        self.mip.status
    }

    pub fn mip_obj_val(&self) -> f64 {
        self.mip.obj
    }

    pub fn mip_row_val(&self, i: usize) -> Result<f64, EngineError> {
        self.check_row(i)?;
        Ok(self.rows[i - 1].mip)
    }

    pub fn mip_col_val(&self, j: usize) -> Result<f64, EngineError> {
        self.check_col(j)?;
        Ok(self.cols[j - 1].entity.mip)
    }

    /// Objective value of a column assignment, constant term included.
    pub(crate) fn objective_at(&self, x: &[f64]) -> f64 {
        self.shift
            + self
                .cols
                .iter()
                .zip(x)
                .map(|(col, v)| col.obj * v)
                .sum::<f64>()
    }

    /// Row activities `A x` for a column assignment.
    pub(crate) fn row_activity(&self, x: &[f64]) -> Vec<f64> {
        let mut act = vec![0.0; self.rows.len()];
        for (&(i, j), &v) in &self.coefs {
            act[i - 1] += v * x[j - 1];
        }
        act
    }

    /// Entries `(row, col, value)` iterated in row-major order.
    pub(crate) fn coef_iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.coefs.iter().map(|(&(i, j), &v)| (i, j, v))
    }

    /// Store an integer-feasible assignment as the MIP solution.
    pub(crate) fn store_mip(&mut self, status: SolStatus, x: &[f64]) {
        let act = self.row_activity(x);
        for (row, v) in self.rows.iter_mut().zip(act) {
            row.mip = v;
        }
        for (col, &v) in self.cols.iter_mut().zip(x) {
            col.entity.mip = v;
        }
        self.mip = SolutionState {
            status,
            obj: self.objective_at(x),
        };
    }
}

fn check_bounds(lower: f64, upper: f64) -> Result<(), EngineError> {
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(EngineError::InvalidBounds { lower, upper });
    }
    Ok(())
}

/// Map old 1-based numbers to new ones after deleting `doomed` (sorted).
/// Index 0 of the result is unused; deleted entries map to 0.
fn renumber(count: usize, doomed: &[usize]) -> Vec<usize> {
    let mut remap = vec![0; count + 1];
    let mut next = 1;
    let mut doomed = doomed.iter().peekable();
    for (old, slot) in remap.iter_mut().enumerate().skip(1) {
        if doomed.peek() == Some(&&old) {
            doomed.next();
            continue;
        }
        *slot = next;
        next += 1;
    }
    remap
}
