use std::any::Any;
use std::fmt;
use std::sync::Arc;

use arrow::array::ArrayRef;

use crate::batch::{NullBitmap, Selector};
use crate::core::{ColflowError, DType, Element, Result};

/// A read-only, zero-copy view over a column value buffer.
///
/// The buffer is opaque here (any `Vec<T>` of an [`Element`] type); typed
/// access goes through [`ColumnBatch::values`]. The selector names the logical
/// rows and the optional null bitmap is indexed by *buffer offset*, so row `i`
/// is null when `nulls[selector.index(i)]` is.
///
/// A batch handed out by a column getter is only meaningful until the next
/// call to that getter or the next `next`/`reset` on the owning table. Holding
/// one longer is memory-safe (the buffer is reference counted) but makes the
/// producer allocate a new buffer for its next batch.
#[derive(Clone)]
pub struct ColumnBatch {
    values: Arc<dyn Any + Send + Sync>,
    dtype: DType,
    selector: Selector,
    nulls: Option<Arc<NullBitmap>>,
}

impl ColumnBatch {
    pub fn new<T: Element>(
        values: Arc<Vec<T>>,
        selector: Selector,
        nulls: Option<Arc<NullBitmap>>,
    ) -> Self {
        debug_assert!(
            selector.as_range().is_none_or(|r| r.end <= values.len()),
            "selector {selector:?} exceeds {} values",
            values.len()
        );
        Self {
            values,
            dtype: T::DTYPE,
            selector,
            nulls,
        }
    }

    /// The first `count` slots of `values`.
    pub fn all<T: Element>(
        values: Arc<Vec<T>>,
        count: usize,
        nulls: Option<Arc<NullBitmap>>,
    ) -> Self {
        Self::new(values, Selector::all(count), nulls)
    }

    /// `count` rows that all read `values[0]`.
    pub fn single<T: Element>(
        values: Arc<Vec<T>>,
        count: usize,
        nulls: Option<Arc<NullBitmap>>,
    ) -> Self {
        Self::new(values, Selector::single(0, count), nulls)
    }

    /// Own `values` as a dense, null-free batch.
    pub fn from_values<T: Element>(values: Vec<T>) -> Self {
        let count = values.len();
        Self::all(Arc::new(values), count, None)
    }

    /// Dense batch from optional values; `None` rows hold the type's default.
    pub fn from_options<T: Element>(values: Vec<Option<T>>) -> Self {
        let nulls = NullBitmap::from_fn(values.len(), |i| values[i].is_none()).map(Arc::new);
        let count = values.len();
        let values: Vec<T> = values.into_iter().map(Option::unwrap_or_default).collect();
        Self::all(Arc::new(values), count, nulls)
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn nulls(&self) -> Option<&NullBitmap> {
        self.nulls.as_deref()
    }

    /// Number of logical rows.
    pub fn count(&self) -> usize {
        self.selector.count()
    }

    pub fn is_empty(&self) -> bool {
        self.selector.is_empty()
    }

    /// Buffer offset of logical row `i`.
    #[inline]
    pub fn index(&self, i: usize) -> usize {
        self.selector.index(i)
    }

    /// Whether logical row `i` is null.
    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        self.nulls
            .as_ref()
            .is_some_and(|nulls| nulls.is_null(self.selector.index(i)))
    }

    /// The whole backing buffer, typed. Address it through [`ColumnBatch::index`].
    pub fn values<T: Element>(&self) -> Result<&[T]> {
        self.values
            .downcast_ref::<Vec<T>>()
            .map(Vec::as_slice)
            .ok_or_else(|| self.mismatch(T::DTYPE))
    }

    /// Shared handle to the backing buffer.
    pub fn values_arc<T: Element>(&self) -> Result<Arc<Vec<T>>> {
        Arc::clone(&self.values)
            .downcast::<Vec<T>>()
            .map_err(|_| self.mismatch(T::DTYPE))
    }

    /// Value of logical row `i`, `None` when the row is null.
    pub fn get<T: Element>(&self, i: usize) -> Result<Option<&T>> {
        let values = self.values::<T>()?;
        if self.is_null(i) {
            return Ok(None);
        }
        Ok(Some(&values[self.selector.index(i)]))
    }

    /// The same buffer and nulls seen through `inner`, a selector over this batch's rows.
    pub fn reselect(&self, inner: &Selector) -> ColumnBatch {
        ColumnBatch {
            values: Arc::clone(&self.values),
            dtype: self.dtype,
            selector: self.selector.reselect(inner),
            nulls: self.nulls.clone(),
        }
    }

    /// Whether both batches view the same buffer, rows and nulls.
    pub fn same_view(&self, other: &ColumnBatch) -> bool {
        let same_nulls = match (&self.nulls, &other.nulls) {
            (None, None) => true,
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        };
        std::ptr::addr_eq(Arc::as_ptr(&self.values), Arc::as_ptr(&other.values))
            && same_nulls
            && self.selector == other.selector
    }

    /// Interpret a `u32` batch as row offsets into another batch.
    ///
    /// Dense index batches share their buffer with the returned selector; only
    /// a batch that is itself selected through indices is gathered.
    pub fn to_index_selector(&self) -> Result<Selector> {
        if self.nulls.is_some() {
            return Err(ColflowError::InvalidBatch(
                "index batches must not carry nulls".to_string(),
            ));
        }
        let indices = self.values_arc::<u32>()?;
        if self.selector.is_single_value() {
            let index = if self.selector.is_empty() {
                0
            } else {
                indices[self.selector.index(0)] as usize
            };
            return Ok(Selector::single(index, self.count()));
        }
        if let Some(window) = self.selector.as_range() {
            return Ok(Selector::indices_in(indices, window));
        }
        Ok(Selector::indices(
            self.selector.offsets().map(|i| indices[i]).collect(),
        ))
    }

    /// Copy the logical rows out.
    pub fn to_options<T: Element>(&self) -> Result<Vec<Option<T>>> {
        let values = self.values::<T>()?;
        Ok((0..self.count())
            .map(|i| {
                if self.is_null(i) {
                    None
                } else {
                    Some(values[self.selector.index(i)].clone())
                }
            })
            .collect())
    }

    /// Materialize the logical rows as an Arrow array.
    pub fn to_arrow<T: Element>(&self) -> Result<ArrayRef> {
        Ok(T::to_arrow(self.to_options::<T>()?))
    }

    fn mismatch(&self, expected: DType) -> ColflowError {
        ColflowError::TypeMismatch {
            expected: expected.to_string(),
            actual: self.dtype.to_string(),
        }
    }
}

impl fmt::Debug for ColumnBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnBatch")
            .field("dtype", &self.dtype)
            .field("selector", &self.selector)
            .field("nulls", &self.nulls)
            .finish_non_exhaustive()
    }
}
