//! Row and column collections.

use crate::bar::{Bar, BarKind, signed};
use crate::error::{Error, Result};
use crate::key::Key;
use crate::problem::{Problem, ProblemCore};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Positions picked out by a key, 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selection {
    One(usize),
    Many(Vec<usize>),
}

impl Selection {
    pub(crate) fn into_vec(self) -> Vec<usize> {
        match self {
            Selection::One(k) => vec![k],
            Selection::Many(ks) => ks,
        }
    }
}

/// All rows or all columns of one problem.
///
/// The size is read from the engine on every call, so a collection never
/// goes out of date.
#[derive(Clone)]
pub struct BarCollection {
    core: Rc<ProblemCore>,
    kind: BarKind,
}

impl BarCollection {
    pub(crate) fn new(core: Rc<ProblemCore>, kind: BarKind) -> Self {
        Self { core, kind }
    }

    pub fn kind(&self) -> BarKind {
        self.kind
    }

    pub fn problem(&self) -> Problem {
        Problem {
            core: Rc::clone(&self.core),
        }
    }

    pub fn len(&self) -> usize {
        self.core.count(self.kind)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn bad_key(&self) -> Error {
        Error::BadKey(format!("bad index type for {} collection", self.kind))
    }

    fn find_name(&self, name: &str) -> Vec<usize> {
        let prob = self.core.native.borrow();
        match self.kind {
            BarKind::Row => prob.find_rows(name),
            BarKind::Col => prob.find_cols(name),
        }
    }

    pub(crate) fn resolve_single(&self, key: &Key) -> Result<usize> {
        match key {
            Key::Index(i) => {
                let len = self.len();
                let index = if *i < 0 { *i + signed(len) } else { *i };
                match usize::try_from(index) {
                    Ok(k) if k < len => Ok(k),
                    _ => Err(Error::IndexOutOfRange {
                        kind: self.kind,
                        index: *i,
                        len,
                    }),
                }
            }
            Key::Name(name) => match self.find_name(name).as_slice() {
                [] => Err(Error::NotFound {
                    kind: self.kind,
                    name: name.clone(),
                }),
                [n] => Ok(n - 1),
                _ => Err(Error::Ambiguous {
                    kind: self.kind,
                    name: name.clone(),
                }),
            },
            Key::Bar(bar) => {
                if !bar.belongs_to(&self.core, self.kind) {
                    return Err(Error::BadKey(format!(
                        "Bar is not a member of this {} collection",
                        self.kind
                    )));
                }
                let (_, n) = bar.live()?;
                Ok(n - 1)
            }
            Key::Slice(_) | Key::Many(_) | Key::Shift => Err(self.bad_key()),
        }
    }

    pub(crate) fn resolve(&self, key: &Key) -> Result<Selection> {
        match key {
            Key::Slice(slice) => Ok(Selection::Many(slice.indices(self.len())?)),
            Key::Many(keys) => keys
                .iter()
                .map(|k| self.resolve_single(k))
                .collect::<Result<Vec<_>>>()
                .map(Selection::Many),
            Key::Shift => Err(self.bad_key()),
            single => self.resolve_single(single).map(Selection::One),
        }
    }

    /// The single Bar a key names.
    pub fn get(&self, key: impl Into<Key>) -> Result<Bar> {
        let key = key.into();
        if key.is_multi() {
            return Err(Error::BadKey(
                "key selects several entities; use select".to_string(),
            ));
        }
        let k = self.resolve_single(&key)?;
        Ok(Bar::new(&self.core, self.kind, k))
    }

    /// Bars for every position a key names, in key order.
    pub fn select(&self, key: impl Into<Key>) -> Result<Vec<Bar>> {
        let selection = self.resolve(&key.into())?;
        Ok(selection
            .into_vec()
            .into_iter()
            .map(|k| Bar::new(&self.core, self.kind, k))
            .collect())
    }

    /// Whether a key names a live entity of this collection.
    pub fn contains(&self, key: impl Into<Key>) -> bool {
        match key.into() {
            Key::Name(name) => !self.find_name(&name).is_empty(),
            key => self.resolve(&key).is_ok(),
        }
    }

    /// Append `count` entities; returns the index of the first one.
    pub fn insert(&self, count: usize) -> Result<usize> {
        let first = {
            let mut prob = self.core.native.borrow_mut();
            match self.kind {
                BarKind::Row => prob.add_rows(count)?,
                BarKind::Col => prob.add_cols(count)?,
            }
        };
        debug!(
            component = "binding",
            operation = "insert",
            status = "success",
            kind = self.kind.as_str(),
            count,
            "Inserted entities"
        );
        Ok(first - 1)
    }

    /// Delete the selected entities. Later entities move down to close the
    /// gaps, and Bars at or after the first deleted index become stale.
    pub fn delete(&self, key: impl Into<Key>) -> Result<()> {
        let mut indices = self.resolve(&key.into())?.into_vec();
        indices.sort_unstable();
        if indices.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::DuplicateIndex);
        }
        let Some(&lowest) = indices.first() else {
            return Ok(());
        };
        let native: Vec<usize> = indices.iter().map(|k| k + 1).collect();
        {
            let mut prob = self.core.native.borrow_mut();
            match self.kind {
                BarKind::Row => prob.del_rows(&native)?,
                BarKind::Col => prob.del_cols(&native)?,
            }
        }
        self.core.record_deletion(self.kind, lowest);
        debug!(
            component = "binding",
            operation = "delete",
            status = "success",
            kind = self.kind.as_str(),
            count = native.len(),
            "Deleted entities"
        );
        Ok(())
    }

    /// Replace the matrix vector of the entity a single key names.
    pub fn set_matrix(&self, key: impl Into<Key>, entries: &[(usize, f64)]) -> Result<()> {
        self.get(key)?.set_matrix(entries)
    }

    pub fn iter(&self) -> BarIter {
        BarIter {
            collection: self.clone(),
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a BarCollection {
    type Item = Bar;
    type IntoIter = BarIter;

    fn into_iter(self) -> BarIter {
        self.iter()
    }
}

/// Iterator over the Bars of a collection; stops at the live size.
pub struct BarIter {
    collection: BarCollection,
    next: usize,
}

impl Iterator for BarIter {
    type Item = Bar;

    fn next(&mut self) -> Option<Bar> {
        if self.next >= self.collection.len() {
            return None;
        }
        let bar = Bar::new(&self.collection.core, self.collection.kind, self.next);
        self.next += 1;
        Some(bar)
    }
}

impl PartialEq for BarCollection {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && Rc::ptr_eq(&self.core, &other.core)
    }
}

impl PartialOrd for BarCollection {
    /// Rows come before columns of the same problem.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Rc::ptr_eq(&self.core, &other.core).then(|| self.kind.cmp(&other.kind))
    }
}

impl fmt::Display for BarCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BarCollection, {} of Problem {:p}",
            self.kind.plural(),
            Rc::as_ptr(&self.core)
        )
    }
}

impl fmt::Debug for BarCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BarCollection")
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Slice;

    fn named_cols(names: &[&str]) -> Problem {
        let p = Problem::new();
        p.cols().insert(names.len()).unwrap();
        for (bar, name) in p.cols().iter().zip(names) {
            bar.set_name(Some(name)).unwrap();
        }
        p
    }

    #[test]
    fn test_negative_index_counts_from_end() {
        let p = named_cols(&["a", "b", "c"]);
        assert_eq!(p.cols().get(-1).unwrap().index(), 2);
        let err = p.cols().get(-4).unwrap_err();
        assert!(err.to_string().contains("index -4 out of bound for 3 cols"));
        assert!(p.cols().get(3).is_err());
    }

    #[test]
    fn test_name_lookup_is_exact_and_unambiguous() {
        let p = named_cols(&["a", "b", "a"]);
        assert_eq!(p.cols().get("b").unwrap().index(), 1);
        assert!(matches!(p.cols().get("a"), Err(Error::Ambiguous { .. })));
        assert!(matches!(p.cols().get("B"), Err(Error::NotFound { .. })));
        assert!(p.cols().contains("a"));
        assert!(!p.cols().contains("z"));
    }

    #[test]
    fn test_select_slice_and_tuple() {
        let p = named_cols(&["a", "b", "c", "d"]);
        let picked: Vec<usize> = p
            .cols()
            .select(Slice::all().with_step(-2))
            .unwrap()
            .iter()
            .map(Bar::index)
            .collect();
        assert_eq!(picked, vec![3, 1]);
        let bar = p.cols().get(0).unwrap();
        let keys = Key::Many(vec![Key::from("c"), Key::from(&bar), Key::from(-1)]);
        let picked: Vec<usize> = p.cols().select(keys).unwrap().iter().map(Bar::index).collect();
        assert_eq!(picked, vec![2, 0, 3]);
    }

    #[test]
    fn test_nested_keys_are_rejected() {
        let p = named_cols(&["a", "b"]);
        let nested = Key::Many(vec![Key::from(0), Key::from(0..1)]);
        let err = p.cols().select(nested).unwrap_err();
        assert!(err.to_string().contains("bad index type for col collection"));
        assert!(p.cols().get(0..2).is_err());
        assert!(p.cols().select(Key::Shift).is_err());
    }

    #[test]
    fn test_bar_from_other_collection_is_rejected() {
        let p = Problem::new();
        p.rows().insert(1).unwrap();
        p.cols().insert(1).unwrap();
        let row = p.rows().get(0).unwrap();
        assert!(matches!(p.cols().get(&row), Err(Error::BadKey(_))));
        assert!(!p.cols().contains(&row));
        assert!(p.rows().contains(&row));
    }

    #[test]
    fn test_delete_renumbers_and_marks_stale() {
        let p = named_cols(&["a", "b", "c", "d"]);
        let before: Vec<Bar> = p.cols().iter().collect();
        p.cols().delete(1).unwrap();
        assert_eq!(p.cols().len(), 3);
        assert!(before[0].is_valid());
        assert!(!before[1].is_valid());
        assert!(!before[2].is_valid());
        assert!(matches!(before[3].name(), Err(Error::IndexOutOfRange { .. })));
        assert_eq!(p.cols().get("c").unwrap().index(), 1);
        assert_eq!(p.cols().get(0).unwrap().name().unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_delete_rejects_duplicates_and_unknown_names() {
        let p = named_cols(&["a", "b"]);
        let err = p.cols().delete(Key::many([0, -2])).unwrap_err();
        assert!(err.to_string().contains("duplicate index detected"));
        let err = p.cols().delete("x").unwrap_err();
        assert!(err.to_string().contains("col named 'x' does not exist"));
        assert_eq!(p.cols().len(), 2);
    }

    #[test]
    fn test_iteration_follows_live_size() {
        let p = named_cols(&["a", "b", "c"]);
        let mut iter = p.cols().iter();
        assert_eq!(iter.next().unwrap().index(), 0);
        p.cols().delete(Key::many([1, 2])).unwrap();
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_collection_identity_and_display() {
        let p = Problem::new();
        assert!(p.rows() == p.rows());
        assert!(p.rows() != p.cols());
        assert!(p.rows() < p.cols());
        assert!(Problem::new().rows().partial_cmp(&p.cols()).is_none());
        assert!(p.cols().to_string().starts_with("BarCollection, cols of Problem 0x"));
    }
}
