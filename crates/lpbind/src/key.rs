//! Key forms accepted by row/column collections and the objective.

use crate::bar::Bar;
use crate::error::{Error, Result};
use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

/// Half-open selection with optional step, following sequence slicing rules:
/// negative bounds count from the end, out-of-range bounds are clamped and a
/// negative step walks backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// Every element in order.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Concrete indices selected from a sequence of `len` elements.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(Error::BadKey("slice step cannot be zero".to_string()));
        }
        let len = isize::try_from(len)
            .map_err(|_| Error::BadKey("collection too large to slice".to_string()))?;
        let adjust = |v: isize, lo: isize, hi: isize| {
            let v = if v < 0 { v.saturating_add(len) } else { v };
            v.clamp(lo, hi)
        };
        let (start, stop) = if step > 0 {
            (
                self.start.map_or(0, |s| adjust(s, 0, len)),
                self.stop.map_or(len, |s| adjust(s, 0, len)),
            )
        } else {
            (
                self.start.map_or(len - 1, |s| adjust(s, -1, len - 1)),
                self.stop.map_or(-1, |s| adjust(s, -1, len - 1)),
            )
        };

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            // i is within [0, len) on every pass.
            out.push(i.unsigned_abs());
            i += step;
        }
        Ok(out)
    }
}

/// A way of addressing rows, columns or objective entries.
#[derive(Debug, Clone)]
pub enum Key {
    /// Position; negative values count from the end.
    Index(isize),
    /// Exact, unambiguous entity name.
    Name(String),
    /// An existing Bar of the same collection.
    Bar(Bar),
    Slice(Slice),
    /// Several single keys; nested multi-keys are rejected.
    Many(Vec<Key>),
    /// The objective's constant term.
    Shift,
}

impl Key {
    /// Build a multi-key from anything convertible to single keys.
    pub fn many<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Key::Many(keys.into_iter().map(Into::into).collect())
    }

    /// True when the key can select more than one entity.
    pub fn is_multi(&self) -> bool {
        matches!(self, Key::Slice(_) | Key::Many(_))
    }
}

impl From<isize> for Key {
    fn from(index: isize) -> Self {
        Key::Index(index)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        // isize is at least 32 bits on every supported target.
        Key::Index(index as isize)
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        Key::Index(isize::try_from(index).unwrap_or(isize::MAX))
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::Name(name)
    }
}

impl From<Bar> for Key {
    fn from(bar: Bar) -> Self {
        Key::Bar(bar)
    }
}

impl From<&Bar> for Key {
    fn from(bar: &Bar) -> Self {
        Key::Bar(bar.clone())
    }
}

impl From<Slice> for Key {
    fn from(slice: Slice) -> Self {
        Key::Slice(slice)
    }
}

impl From<Range<isize>> for Key {
    fn from(range: Range<isize>) -> Self {
        Key::Slice(Slice::new(Some(range.start), Some(range.end)))
    }
}

impl From<RangeFrom<isize>> for Key {
    fn from(range: RangeFrom<isize>) -> Self {
        Key::Slice(Slice::new(Some(range.start), None))
    }
}

impl From<RangeTo<isize>> for Key {
    fn from(range: RangeTo<isize>) -> Self {
        Key::Slice(Slice::new(None, Some(range.end)))
    }
}

impl From<RangeFull> for Key {
    fn from(_: RangeFull) -> Self {
        Key::Slice(Slice::all())
    }
}

impl<K: Into<Key>> From<Vec<K>> for Key {
    fn from(keys: Vec<K>) -> Self {
        Key::many(keys)
    }
}

impl<K: Into<Key>, const N: usize> From<[K; N]> for Key {
    fn from(keys: [K; N]) -> Self {
        Key::many(keys)
    }
}
