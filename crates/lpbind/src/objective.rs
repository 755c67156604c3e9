//! The objective function: per-column coefficients plus a constant shift.

use crate::bar::BarKind;
use crate::collection::{BarCollection, Selection};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::problem::{ProblemCore, SolverKind, check_name};
use lpbind_engine::Direction;
use std::fmt;
use std::rc::Rc;

/// Value assigned through [`Objective::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// One number; broadcast over a multi-entry key.
    Scalar(f64),
    /// One number per selected entry, in key order.
    Seq(Vec<f64>),
}

impl From<f64> for Assign {
    fn from(value: f64) -> Self {
        Assign::Scalar(value)
    }
}

impl From<Vec<f64>> for Assign {
    fn from(values: Vec<f64>) -> Self {
        Assign::Seq(values)
    }
}

impl From<&[f64]> for Assign {
    fn from(values: &[f64]) -> Self {
        Assign::Seq(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Assign {
    fn from(values: [f64; N]) -> Self {
        Assign::Seq(values.to_vec())
    }
}

/// One addressable objective entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Coef(usize),
    Shift,
}

enum Entries {
    One(Entry),
    Many(Vec<Entry>),
}

/// View of a problem's objective.
///
/// Keys address columns the way [`BarCollection`] does; [`Key::Shift`]
/// addresses the constant term.
#[derive(Clone)]
pub struct Objective {
    core: Rc<ProblemCore>,
}

impl Objective {
    pub(crate) fn new(core: Rc<ProblemCore>) -> Self {
        Self { core }
    }

    fn cols(&self) -> BarCollection {
        BarCollection::new(Rc::clone(&self.core), BarKind::Col)
    }

    /// Number of coefficients, equal to the column count.
    pub fn len(&self) -> usize {
        self.core.count(BarKind::Col)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn coef(&self, k: usize) -> Result<f64> {
        Ok(self.core.native.borrow().obj_coef(k + 1)?)
    }

    fn set_coef(&self, k: usize, value: f64) -> Result<()> {
        self.core.native.borrow_mut().set_obj_coef(k + 1, value)?;
        Ok(())
    }

    fn entry(&self, entry: Entry) -> Result<f64> {
        match entry {
            Entry::Shift => Ok(self.shift()),
            Entry::Coef(k) => self.coef(k),
        }
    }

    fn set_entry(&self, entry: Entry, value: f64) -> Result<()> {
        match entry {
            Entry::Shift => {
                self.set_shift(value);
                Ok(())
            }
            Entry::Coef(k) => self.set_coef(k, value),
        }
    }

    /// Entries a key addresses. [`Key::Shift`] may stand in for an index,
    /// alone or inside a multi-key.
    fn resolve(&self, key: &Key) -> Result<Entries> {
        let cols = self.cols();
        match key {
            Key::Shift => Ok(Entries::One(Entry::Shift)),
            Key::Many(keys) => keys
                .iter()
                .map(|key| match key {
                    Key::Shift => Ok(Entry::Shift),
                    key => cols.resolve_single(key).map(Entry::Coef),
                })
                .collect::<Result<Vec<_>>>()
                .map(Entries::Many),
            key => Ok(match cols.resolve(key)? {
                Selection::One(k) => Entries::One(Entry::Coef(k)),
                Selection::Many(ks) => Entries::Many(ks.into_iter().map(Entry::Coef).collect()),
            }),
        }
    }

    /// Coefficient for a single-entry key.
    pub fn get(&self, key: impl Into<Key>) -> Result<f64> {
        match self.resolve(&key.into())? {
            Entries::One(entry) => self.entry(entry),
            Entries::Many(_) => Err(Error::BadKey(
                "key selects several entries; use get_many".to_string(),
            )),
        }
    }

    /// Coefficients for any key, in key order.
    pub fn get_many(&self, key: impl Into<Key>) -> Result<Vec<f64>> {
        match self.resolve(&key.into())? {
            Entries::One(entry) => Ok(vec![self.entry(entry)?]),
            Entries::Many(entries) => entries.into_iter().map(|e| self.entry(e)).collect(),
        }
    }

    /// Assign coefficients. A scalar on a multi-entry key is copied to every
    /// entry; a sequence must match the selection length.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Assign>) -> Result<()> {
        match (self.resolve(&key.into())?, value.into()) {
            (Entries::One(entry), Assign::Scalar(v)) => self.set_entry(entry, v),
            (Entries::One(_), Assign::Seq(_)) => Err(Error::InvalidArgument(
                "a single objective entry requires a single number".to_string(),
            )),
            (Entries::Many(entries), Assign::Scalar(v)) => {
                entries.into_iter().try_for_each(|e| self.set_entry(e, v))
            }
            (Entries::Many(entries), Assign::Seq(values)) => {
                if entries.len() != values.len() {
                    return Err(Error::LengthMismatch {
                        expected: entries.len(),
                        found: values.len(),
                    });
                }
                entries
                    .into_iter()
                    .zip(values)
                    .try_for_each(|(e, v)| self.set_entry(e, v))
            }
        }
    }

    /// Constant term.
    pub fn shift(&self) -> f64 {
        self.core.native.borrow().obj_shift()
    }

    pub fn set_shift(&self, value: f64) {
        self.core.native.borrow_mut().set_obj_shift(value);
    }

    pub fn name(&self) -> Option<String> {
        self.core.native.borrow().obj_name().map(str::to_string)
    }

    pub fn set_name(&self, name: Option<&str>) -> Result<()> {
        check_name(name)?;
        self.core.native.borrow_mut().set_obj_name(name);
        Ok(())
    }

    pub fn maximize(&self) -> bool {
        self.core.native.borrow().obj_dir() == Direction::Maximize
    }

    pub fn set_maximize(&self, maximize: bool) {
        let dir = if maximize {
            Direction::Maximize
        } else {
            Direction::Minimize
        };
        self.core.native.borrow_mut().set_obj_dir(dir);
    }

    /// Objective value from the solver used last.
    pub fn value(&self) -> f64 {
        match self.core.last_solver() {
            SolverKind::Simplex => self.value_s(),
            SolverKind::Interior => self.value_i(),
            SolverKind::Mip => self.value_m(),
        }
    }

    pub fn value_s(&self) -> f64 {
        self.core.native.borrow().obj_val()
    }

    pub fn value_i(&self) -> f64 {
        self.core.native.borrow().ipt_obj_val()
    }

    pub fn value_m(&self) -> f64 {
        self.core.native.borrow().mip_obj_val()
    }

    /// Iterate over the coefficients, re-reading the column count each step.
    pub fn iter(&self) -> ObjectiveIter {
        ObjectiveIter {
            objective: self.clone(),
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a Objective {
    type Item = f64;
    type IntoIter = ObjectiveIter;

    fn into_iter(self) -> ObjectiveIter {
        self.iter()
    }
}

pub struct ObjectiveIter {
    objective: Objective,
    next: usize,
}

impl Iterator for ObjectiveIter {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        let value = self.objective.coef(self.next).ok()?;
        self.next += 1;
        Some(value)
    }
}

impl fmt::Debug for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Objective")
            .field("maximize", &self.maximize())
            .field("shift", &self.shift())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Slice;
    use crate::problem::Problem;

    fn three_cols() -> Problem {
        let p = Problem::new();
        p.cols().insert(3).unwrap();
        p
    }

    #[test]
    fn test_scalar_broadcasts_over_slice() {
        let p = three_cols();
        let obj = p.obj();
        obj.set(Slice::new(Some(1), None), 2.5).unwrap();
        assert_eq!(obj.get_many(..).unwrap(), vec![0.0, 2.5, 2.5]);
    }

    #[test]
    fn test_sequence_keeps_key_order() {
        let p = three_cols();
        let obj = p.obj();
        obj.set(Slice::all().with_step(-1), [1.0, 2.0, 3.0]).unwrap();
        assert_eq!(obj.iter().collect::<Vec<_>>(), vec![3.0, 2.0, 1.0]);
        let err = obj.set(0..2, vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_single_key_requires_scalar() {
        let p = three_cols();
        let obj = p.obj();
        obj.set(-1, 7.0).unwrap();
        assert_eq!(obj.get(2).unwrap(), 7.0);
        assert!(matches!(obj.set(0, [1.0]), Err(Error::InvalidArgument(_))));
        assert!(matches!(obj.get(0..2), Err(Error::BadKey(_))));
    }

    #[test]
    fn test_shift_sentinel() {
        let p = Problem::new();
        let obj = p.obj();
        obj.set(Key::Shift, -4.0).unwrap();
        assert_eq!(obj.get(Key::Shift).unwrap(), -4.0);
        assert_eq!(obj.shift(), -4.0);
        assert!(obj.is_empty());
        assert!(obj.set(Key::Shift, [1.0]).is_err());
    }

    #[test]
    fn test_shift_inside_multi_key() {
        let p = three_cols();
        let obj = p.obj();
        obj.set(0, 1.5).unwrap();
        obj.set_shift(-2.0);
        let key = Key::Many(vec![Key::Shift, Key::Index(0)]);
        assert_eq!(obj.get_many(key.clone()).unwrap(), vec![-2.0, 1.5]);
        assert!(matches!(obj.get(key.clone()), Err(Error::BadKey(_))));

        obj.set(key.clone(), [4.0, 5.0]).unwrap();
        assert_eq!(obj.shift(), 4.0);
        assert_eq!(obj.get(0).unwrap(), 5.0);

        obj.set(Key::Many(vec![Key::Index(2), Key::Shift]), 0.5).unwrap();
        assert_eq!(obj.get_many(..).unwrap(), vec![5.0, 0.0, 0.5]);
        assert_eq!(obj.shift(), 0.5);

        let err = obj.set(key, vec![1.0]).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch { expected: 2, found: 1 }));
    }

    #[test]
    fn test_collections_reject_shift() {
        let p = three_cols();
        let key = Key::Many(vec![Key::Shift, Key::Index(0)]);
        assert!(matches!(p.cols().select(key), Err(Error::BadKey(_))));
        assert!(matches!(p.cols().get(Key::Shift), Err(Error::BadKey(_))));
    }

    #[test]
    fn test_direction_and_name() {
        let p = Problem::new();
        let obj = p.obj();
        assert!(!obj.maximize());
        obj.set_maximize(true);
        assert!(obj.maximize());
        obj.set_name(Some("profit")).unwrap();
        assert_eq!(obj.name().as_deref(), Some("profit"));
        assert!(obj.set_name(Some(&"p".repeat(256))).is_err());
    }

    #[test]
    fn test_name_keys_address_columns() {
        let p = three_cols();
        p.cols().get(1).unwrap().set_name(Some("y")).unwrap();
        p.obj().set("y", 9.0).unwrap();
        assert_eq!(p.obj().get_many(Key::many(["y", "y"])).unwrap(), vec![9.0, 9.0]);
    }
}
