use crate::batch::{ColumnBatch, Selector};
use crate::core::{DType, Result};

/// Returns the batch for whatever the owning table currently has selected.
pub type CurrentGetter = Box<dyn FnMut() -> Result<ColumnBatch>>;

/// Returns the batch for exactly the given rows, independent of the table position.
pub type SeekGetter = Box<dyn FnMut(&Selector) -> Result<ColumnBatch>>;

/// Returns the whole distinct value set backing a column.
pub type ValuesGetter = Box<dyn FnMut() -> Result<ColumnBatch>>;

/// Returns `u32` offsets into the value set for the given rows.
pub type IndicesGetter = Box<dyn FnMut(&Selector) -> Result<ColumnBatch>>;

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDetails {
    pub name: String,
    pub dtype: DType,
    pub nullable: bool,
}

impl ColumnDetails {
    pub fn new(name: impl Into<String>, dtype: DType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            dtype,
            nullable,
        }
    }

    /// Same column, different element type.
    pub fn with_type(&self, dtype: DType) -> Self {
        Self {
            dtype,
            ..self.clone()
        }
    }
}

/// Access contract of one column of a [`Table`](crate::table::Table).
///
/// Only `current_getter` is mandatory. The other getters return `None` when the
/// column cannot support them, and callers fall back to the generic path.
/// A column with an `indices_getter` must also have a `values_getter`.
///
/// Getters are created once, before iteration, and called per batch.
pub trait Column {
    fn details(&self) -> &ColumnDetails;

    /// Rows the owning table has selected for the current batch.
    fn current_selector(&self) -> Selector;

    fn current_getter(&self) -> CurrentGetter;

    fn seek_getter(&self) -> Option<SeekGetter> {
        None
    }

    fn values_getter(&self) -> Option<ValuesGetter> {
        None
    }

    fn indices_getter(&self) -> Option<IndicesGetter> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_type_keeps_name_and_nullability() {
        let details = ColumnDetails::new("score", DType::Int32, true);
        let changed = details.with_type(DType::Utf8);
        assert_eq!(changed, ColumnDetails::new("score", DType::Utf8, true));
    }
}
