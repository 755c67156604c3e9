//! Handles for single rows and columns.

use crate::error::{Error, Result};
use crate::problem::{ProblemCore, SolverKind, check_name};
use lpbind_engine::{ColKind, EngineError, NativeProblem, VarStatus};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::rc::{Rc, Weak};

/// Which collection a Bar or BarCollection belongs to. Rows sort first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarKind {
    Row,
    Col,
}

impl BarKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BarKind::Row => "row",
            BarKind::Col => "col",
        }
    }

    pub fn plural(self) -> &'static str {
        match self {
            BarKind::Row => "rows",
            BarKind::Col => "cols",
        }
    }

    /// The collection a matrix vector of this kind is indexed by.
    pub fn other(self) -> Self {
        match self {
            BarKind::Row => BarKind::Col,
            BarKind::Col => BarKind::Row,
        }
    }
}

impl fmt::Display for BarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower and upper bound of a row or column; `None` is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    pub fn free() -> Self {
        Self::default()
    }

    pub fn fixed(value: f64) -> Self {
        Self::new(Some(value), Some(value))
    }

    pub fn is_fixed(&self) -> bool {
        matches!((self.lower, self.upper), (Some(lo), Some(hi)) if lo == hi)
    }

    fn from_native(lower: f64, upper: f64) -> Self {
        Self {
            lower: lower.is_finite().then_some(lower),
            upper: upper.is_finite().then_some(upper),
        }
    }

    fn to_native(self) -> Result<(f64, f64)> {
        let lower = self.lower.unwrap_or(f64::NEG_INFINITY);
        let upper = self.upper.unwrap_or(f64::INFINITY);
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(Error::InvalidBounds { lower, upper });
        }
        Ok((lower, upper))
    }
}

impl From<(Option<f64>, Option<f64>)> for Bounds {
    fn from((lower, upper): (Option<f64>, Option<f64>)) -> Self {
        Self::new(lower, upper)
    }
}

impl From<(f64, f64)> for Bounds {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self::new(Some(lower), Some(upper))
    }
}

impl From<f64> for Bounds {
    fn from(value: f64) -> Self {
        Self::fixed(value)
    }
}

/// Variable kind of a row or column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarKind {
    #[default]
    Continuous,
    Integer,
    /// Integer with bounds `[0, 1]`.
    Binary,
}

/// Parse a two-letter basis status code.
pub fn parse_status(code: &str) -> Result<VarStatus> {
    if code.chars().count() != 2 {
        return Err(Error::InvalidStatus(
            "status strings must be length 2".to_string(),
        ));
    }
    VarStatus::from_code(code)
        .ok_or_else(|| Error::InvalidStatus(format!("status string value '{code}' unrecognized")))
}

pub(crate) fn signed(index: usize) -> isize {
    isize::try_from(index).unwrap_or(isize::MAX)
}

/// A handle for one row or one column.
///
/// A Bar refers to its entity by position. It is re-checked before every
/// use: once a deletion removes or shifts the entity, every accessor fails
/// instead of reading a neighbour.
#[derive(Clone)]
pub struct Bar {
    core: Weak<ProblemCore>,
    kind: BarKind,
    index: usize,
    epoch: usize,
}

impl Bar {
    pub(crate) fn new(core: &Rc<ProblemCore>, kind: BarKind, index: usize) -> Self {
        Self {
            core: Rc::downgrade(core),
            kind,
            index,
            epoch: core.epoch(kind),
        }
    }

    /// 0-based position at creation.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> BarKind {
        self.kind
    }

    pub fn is_row(&self) -> bool {
        self.kind == BarKind::Row
    }

    pub fn is_col(&self) -> bool {
        self.kind == BarKind::Col
    }

    /// Whether the entity this Bar was created for still sits at its index.
    pub fn is_valid(&self) -> bool {
        self.live().is_ok()
    }

    pub(crate) fn belongs_to(&self, core: &Rc<ProblemCore>, kind: BarKind) -> bool {
        self.kind == kind && std::ptr::eq(self.core.as_ptr(), Rc::as_ptr(core))
    }

    /// Owning problem and the 1-based engine number, after validation.
    pub(crate) fn live(&self) -> Result<(Rc<ProblemCore>, usize)> {
        let stale = || Error::StaleEntity {
            kind: self.kind,
            index: self.index,
        };
        let core = self.core.upgrade().ok_or_else(stale)?;
        let len = core.count(self.kind);
        if self.index >= len {
            return Err(Error::IndexOutOfRange {
                kind: self.kind,
                index: signed(self.index),
                len,
            });
        }
        if core.shifted_since(self.kind, self.epoch, self.index) {
            return Err(stale());
        }
        Ok((core, self.index + 1))
    }

    fn read<T>(
        &self,
        f: impl FnOnce(&NativeProblem, usize) -> std::result::Result<T, EngineError>,
    ) -> Result<T> {
        let (core, n) = self.live()?;
        let prob = core.native.borrow();
        Ok(f(&prob, n)?)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut NativeProblem, usize) -> std::result::Result<T, EngineError>,
    ) -> Result<T> {
        let (core, n) = self.live()?;
        let mut prob = core.native.borrow_mut();
        Ok(f(&mut prob, n)?)
    }

    pub fn name(&self) -> Result<Option<String>> {
        let kind = self.kind;
        self.read(|p, n| {
            let name = match kind {
                BarKind::Row => p.row_name(n)?,
                BarKind::Col => p.col_name(n)?,
            };
            Ok(name.map(str::to_string))
        })
    }

    /// Set or clear the name; an empty name clears it.
    pub fn set_name(&self, name: Option<&str>) -> Result<()> {
        check_name(name)?;
        let kind = self.kind;
        self.write(|p, n| match kind {
            BarKind::Row => p.set_row_name(n, name),
            BarKind::Col => p.set_col_name(n, name),
        })
    }

    pub fn bounds(&self) -> Result<Bounds> {
        let kind = self.kind;
        let (lower, upper) = self.read(|p, n| match kind {
            BarKind::Row => p.row_bounds(n),
            BarKind::Col => p.col_bounds(n),
        })?;
        Ok(Bounds::from_native(lower, upper))
    }

    pub fn set_bounds(&self, bounds: impl Into<Bounds>) -> Result<()> {
        let (lower, upper) = bounds.into().to_native()?;
        let kind = self.kind;
        self.write(|p, n| match kind {
            BarKind::Row => p.set_row_bounds(n, lower, upper),
            BarKind::Col => p.set_col_bounds(n, lower, upper),
        })
    }

    pub fn status(&self) -> Result<VarStatus> {
        let kind = self.kind;
        self.read(|p, n| match kind {
            BarKind::Row => p.row_stat(n),
            BarKind::Col => p.col_stat(n),
        })
    }

    pub fn set_status(&self, status: VarStatus) -> Result<()> {
        let kind = self.kind;
        self.write(|p, n| match kind {
            BarKind::Row => p.set_row_stat(n, status),
            BarKind::Col => p.set_col_stat(n, status),
        })
    }

    /// Set the status from its two-letter code (`bs`, `nl`, `nu`, `nf`, `ns`).
    pub fn set_status_str(&self, code: &str) -> Result<()> {
        self.set_status(parse_status(code)?)
    }

    pub fn var_kind(&self) -> Result<VarKind> {
        match self.kind {
            BarKind::Row => {
                self.live()?;
                Ok(VarKind::Continuous)
            }
            BarKind::Col => self.read(|p, n| {
                Ok(match p.col_kind(n)? {
                    ColKind::Continuous => VarKind::Continuous,
                    ColKind::Integer if p.is_binary(n)? => VarKind::Binary,
                    ColKind::Integer => VarKind::Integer,
                })
            }),
        }
    }

    /// Change the kind. Binary also sets the bounds to `[0, 1]`.
    pub fn set_var_kind(&self, kind: VarKind) -> Result<()> {
        match (self.kind, kind) {
            (BarKind::Row, VarKind::Continuous) => self.live().map(|_| ()),
            (BarKind::Row, VarKind::Integer) => Err(Error::RowKind("integer")),
            (BarKind::Row, VarKind::Binary) => Err(Error::RowKind("binary")),
            (BarKind::Col, VarKind::Continuous) => {
                self.write(|p, n| p.set_col_kind(n, ColKind::Continuous))
            }
            (BarKind::Col, VarKind::Integer) => self.write(|p, n| p.set_col_kind(n, ColKind::Integer)),
            (BarKind::Col, VarKind::Binary) => self.write(|p, n| p.set_col_binary(n)),
        }
    }

    /// Nonzero entries of this row or column as `(index, value)` pairs, the
    /// index being 0-based in the other collection.
    pub fn matrix(&self) -> Result<Vec<(usize, f64)>> {
        let kind = self.kind;
        let entries = self.read(|p, n| match kind {
            BarKind::Row => p.mat_row(n),
            BarKind::Col => p.mat_col(n),
        })?;
        Ok(entries.into_iter().map(|(k, v)| (k - 1, v)).collect())
    }

    /// Replace the vector from `(index, value)` pairs. Zero values are dropped.
    pub fn set_matrix(&self, entries: &[(usize, f64)]) -> Result<()> {
        let (core, n) = self.live()?;
        let other = self.kind.other();
        let len = core.count(other);
        let mut seen = vec![false; len];
        let mut native = Vec::with_capacity(entries.len());
        for &(k, v) in entries {
            if k >= len {
                return Err(Error::IndexOutOfRange {
                    kind: other,
                    index: signed(k),
                    len,
                });
            }
            if std::mem::replace(&mut seen[k], true) {
                return Err(Error::DuplicateIndex);
            }
            native.push((k + 1, v));
        }
        let mut prob = core.native.borrow_mut();
        match self.kind {
            BarKind::Row => prob.set_mat_row(n, &native)?,
            BarKind::Col => prob.set_mat_col(n, &native)?,
        }
        Ok(())
    }

    /// Replace the vector from dense values over the leading entries of the
    /// other collection.
    pub fn set_matrix_dense(&self, values: &[f64]) -> Result<()> {
        let (core, _) = self.live()?;
        let len = core.count(self.kind.other());
        if values.len() > len {
            return Err(Error::LengthMismatch {
                expected: len,
                found: values.len(),
            });
        }
        let entries: Vec<(usize, f64)> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(k, &v)| (k, v))
            .collect();
        self.set_matrix(&entries)
    }

    /// Number of nonzero entries in this row or column.
    pub fn nnz(&self) -> Result<usize> {
        Ok(self.matrix()?.len())
    }

    /// Primal value from the solver used last.
    pub fn primal(&self) -> Result<f64> {
        let (core, _) = self.live()?;
        match core.last_solver() {
            SolverKind::Simplex => self.primal_s(),
            SolverKind::Interior => self.primal_i(),
            SolverKind::Mip => self.primal_m(),
        }
    }

    /// Dual value from the solver used last. MIP solutions carry no duals,
    /// so the basic solution is reported after the integer solver.
    pub fn dual(&self) -> Result<f64> {
        let (core, _) = self.live()?;
        match core.last_solver() {
            SolverKind::Simplex | SolverKind::Mip => self.dual_s(),
            SolverKind::Interior => self.dual_i(),
        }
    }

    pub fn primal_s(&self) -> Result<f64> {
        let kind = self.kind;
        self.read(|p, n| match kind {
            BarKind::Row => p.row_prim(n),
            BarKind::Col => p.col_prim(n),
        })
    }

    pub fn primal_i(&self) -> Result<f64> {
        let kind = self.kind;
        self.read(|p, n| match kind {
            BarKind::Row => p.ipt_row_prim(n),
            BarKind::Col => p.ipt_col_prim(n),
        })
    }

    pub fn primal_m(&self) -> Result<f64> {
        let (core, n) = self.live()?;
        let prob = core.native.borrow();
        if prob.num_int() == 0 {
            return Err(Error::NotMip);
        }
        let value = match self.kind {
            BarKind::Row => prob.mip_row_val(n)?,
            BarKind::Col => prob.mip_col_val(n)?,
        };
        Ok(value)
    }

    pub fn dual_s(&self) -> Result<f64> {
        let kind = self.kind;
        self.read(|p, n| match kind {
            BarKind::Row => p.row_dual(n),
            BarKind::Col => p.col_dual(n),
        })
    }

    pub fn dual_i(&self) -> Result<f64> {
        let kind = self.kind;
        self.read(|p, n| match kind {
            BarKind::Row => p.ipt_row_dual(n),
            BarKind::Col => p.ipt_col_dual(n),
        })
    }
}

impl PartialEq for Bar {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.index == other.index && Weak::ptr_eq(&self.core, &other.core)
    }
}

impl PartialOrd for Bar {
    /// Bars are ordered by index within one collection and unordered across
    /// collections.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.kind == other.kind && Weak::ptr_eq(&self.core, &other.core) {
            Some(self.index.cmp(&other.index))
        } else {
            None
        }
    }
}

impl fmt::Display for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bar, {} {} of Problem {:p}",
            self.kind,
            self.index,
            self.core.as_ptr()
        )
    }
}

impl fmt::Debug for Bar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bar")
            .field("kind", &self.kind)
            .field("index", &self.index)
            .field("valid", &self.is_valid())
            .finish()
    }
}
