use std::ops::Range;
use std::sync::Arc;

/// Names which offsets of some buffer make up the logical rows of a batch.
///
/// A selector never owns the buffer it addresses. Logical row `i` maps to the
/// buffer offset `index(i)`; three addressing modes exist:
///
/// - range: rows are the contiguous offsets `[start, end)`;
/// - indices: rows are listed explicitly, in any order, duplicates allowed;
/// - single value: every row maps to the same offset (broadcast).
///
/// Index arrays are shared through an `Arc`, so cloning a selector is O(1).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    repr: Repr,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Repr {
    Range {
        start: usize,
        end: usize,
    },
    /// Row `i` maps to `base + indices[start + i]`.
    Indices {
        indices: Arc<Vec<u32>>,
        start: usize,
        end: usize,
        base: usize,
    },
    Single {
        index: usize,
        count: usize,
    },
}

impl Selector {
    /// Zero rows.
    pub fn empty() -> Self {
        Self::range(0..0)
    }

    /// The first `count` offsets of a buffer.
    pub fn all(count: usize) -> Self {
        Self::range(0..count)
    }

    pub fn range(range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end, "inverted range {range:?}");
        Self {
            repr: Repr::Range {
                start: range.start,
                end: range.end.max(range.start),
            },
        }
    }

    /// Every entry of `indices` is one row.
    pub fn indices(indices: Vec<u32>) -> Self {
        let end = indices.len();
        Self::indices_in(Arc::new(indices), 0..end)
    }

    /// Rows are `indices[window]`.
    pub fn indices_in(indices: Arc<Vec<u32>>, window: Range<usize>) -> Self {
        debug_assert!(window.start <= window.end && window.end <= indices.len());
        Self {
            repr: Repr::Indices {
                indices,
                start: window.start,
                end: window.end,
                base: 0,
            },
        }
    }

    /// `count` rows that all read offset `index`.
    pub fn single(index: usize, count: usize) -> Self {
        Self {
            repr: Repr::Single { index, count },
        }
    }

    /// Number of logical rows.
    pub fn count(&self) -> usize {
        match &self.repr {
            Repr::Range { start, end } => end - start,
            Repr::Indices { start, end, .. } => end - start,
            Repr::Single { count, .. } => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_single_value(&self) -> bool {
        matches!(self.repr, Repr::Single { .. })
    }

    /// The offsets as a contiguous range, when the selector is one.
    pub fn as_range(&self) -> Option<Range<usize>> {
        match &self.repr {
            Repr::Range { start, end } => Some(*start..*end),
            _ => None,
        }
    }

    /// Buffer offset of logical row `i`.
    #[inline]
    pub fn index(&self, i: usize) -> usize {
        debug_assert!(i < self.count(), "row {i} out of {} rows", self.count());
        match &self.repr {
            Repr::Range { start, .. } => start + i,
            Repr::Indices {
                indices,
                start,
                base,
                ..
            } => base + indices[start + i] as usize,
            Repr::Single { index, .. } => *index,
        }
    }

    /// Buffer offsets of every logical row, in row order.
    pub fn offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.count()).map(move |i| self.index(i))
    }

    /// Compose with a selector over this selector's rows.
    ///
    /// `outer.reselect(&inner).index(i) == outer.index(inner.index(i))`. Only
    /// indices-over-indices allocates; every other pairing is O(1).
    pub fn reselect(&self, inner: &Selector) -> Selector {
        if self.is_empty() || inner.is_empty() {
            return Selector::empty();
        }

        match (&self.repr, &inner.repr) {
            (_, Repr::Single { index, count }) => Selector::single(self.index(*index), *count),
            (Repr::Single { index, .. }, _) => Selector::single(*index, inner.count()),
            (Repr::Range { start, .. }, Repr::Range { start: s, end: e }) => {
                Selector::range(start + s..start + e)
            }
            (
                Repr::Range { start: outer, .. },
                Repr::Indices {
                    indices,
                    start,
                    end,
                    base,
                },
            ) => Selector {
                repr: Repr::Indices {
                    indices: Arc::clone(indices),
                    start: *start,
                    end: *end,
                    base: base + outer,
                },
            },
            (
                Repr::Indices {
                    indices,
                    start,
                    base,
                    ..
                },
                Repr::Range { start: s, end: e },
            ) => Selector {
                repr: Repr::Indices {
                    indices: Arc::clone(indices),
                    start: start + s,
                    end: start + e,
                    base: *base,
                },
            },
            (
                Repr::Indices {
                    indices,
                    start,
                    base,
                    ..
                },
                Repr::Indices { .. },
            ) => {
                let mapped: Vec<u32> = inner.offsets().map(|i| indices[start + i]).collect();
                let count = mapped.len();
                Selector {
                    repr: Repr::Indices {
                        indices: Arc::new(mapped),
                        start: 0,
                        end: count,
                        base: *base,
                    },
                }
            }
        }
    }
}

impl Default for Selector {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offsets(selector: &Selector) -> Vec<usize> {
        selector.offsets().collect()
    }

    #[test]
    fn test_range_index() {
        let s = Selector::range(3..6);
        assert_eq!(s.count(), 3);
        assert_eq!(offsets(&s), vec![3, 4, 5]);
        assert!(!s.is_single_value());
        assert_eq!(s.as_range(), Some(3..6));
    }

    #[test]
    fn test_indices_allow_duplicates_and_any_order() {
        let s = Selector::indices(vec![4, 0, 4, 2]);
        assert_eq!(offsets(&s), vec![4, 0, 4, 2]);
        assert_eq!(s.as_range(), None);
    }

    #[test]
    fn test_single_broadcasts() {
        let s = Selector::single(7, 4);
        assert!(s.is_single_value());
        assert_eq!(offsets(&s), vec![7, 7, 7, 7]);
    }

    #[test]
    fn test_range_over_indices_shares_index_array() {
        let inner = Selector::indices(vec![2, 0, 1]);
        let composed = Selector::range(10..13).reselect(&inner);
        assert_eq!(offsets(&composed), vec![12, 10, 11]);
        match (&composed.repr, &inner.repr) {
            (Repr::Indices { indices: a, .. }, Repr::Indices { indices: b, .. }) => {
                assert!(Arc::ptr_eq(a, b))
            }
            _ => panic!("expected indices selector"),
        }
    }

    #[test]
    fn test_indices_over_range_slices_window() {
        let outer = Selector::indices(vec![9, 8, 7, 6, 5]);
        let composed = outer.reselect(&Selector::range(1..4));
        assert_eq!(offsets(&composed), vec![8, 7, 6]);
    }

    #[test]
    fn test_indices_over_indices() {
        let outer = Selector::range(100..110).reselect(&Selector::indices(vec![5, 6, 7]));
        let composed = outer.reselect(&Selector::indices(vec![2, 2, 0]));
        assert_eq!(offsets(&composed), vec![107, 107, 105]);
    }

    #[test]
    fn test_single_dominates_composition() {
        let outer = Selector::indices(vec![3, 1, 2]);
        assert_eq!(outer.reselect(&Selector::single(1, 5)), Selector::single(1, 5));
        assert_eq!(
            Selector::single(4, 2).reselect(&Selector::indices(vec![0, 1, 1])),
            Selector::single(4, 3)
        );
    }

    #[test]
    fn test_empty_composes_to_empty() {
        let empty = Selector::empty();
        assert!(empty.reselect(&Selector::indices(vec![0, 1])).is_empty());
        assert!(empty.reselect(&Selector::single(0, 3)).is_empty());
        assert!(Selector::all(4).reselect(&Selector::indices(Vec::new())).is_empty());
        assert!(Selector::indices(Vec::new()).reselect(&Selector::range(0..0)).is_empty());
    }
}
