use std::rc::Rc;
use std::sync::Arc;

use crate::batch::{ColumnBatch, NullBitmap, Selector};
use crate::core::Element;
use crate::table::{
    Column, ColumnDetails, CurrentGetter, CursorHandle, IndicesGetter, SeekGetter, ValuesGetter,
};

/// A column whose every row holds the same value.
///
/// Batches use a single-value selector, and the column is a dictionary of one
/// entry, so transforms over it call their function once.
pub struct ConstantColumn {
    details: ColumnDetails,
    cursor: CursorHandle,
    value: ColumnBatch,
    index: Arc<Vec<u32>>,
}

impl ConstantColumn {
    pub fn new<T: Element>(name: &str, value: Option<T>, cursor: CursorHandle) -> Self {
        let nulls = value
            .is_none()
            .then(|| Arc::new(NullBitmap::from_nulls(&[true]).unwrap_or_default()));
        Self {
            details: ColumnDetails::new(name, T::DTYPE, value.is_none()),
            cursor,
            value: ColumnBatch::all(Arc::new(vec![value.unwrap_or_default()]), 1, nulls),
            index: Arc::new(vec![0]),
        }
    }
}

impl Column for ConstantColumn {
    fn details(&self) -> &ColumnDetails {
        &self.details
    }

    fn current_selector(&self) -> Selector {
        self.cursor.borrow().current_selector()
    }

    fn current_getter(&self) -> CurrentGetter {
        let cursor = Rc::clone(&self.cursor);
        let value = self.value.clone();
        Box::new(move || {
            let count = cursor.borrow().current_row_count();
            Ok(value.reselect(&Selector::single(0, count)))
        })
    }

    fn seek_getter(&self) -> Option<SeekGetter> {
        let value = self.value.clone();
        Some(Box::new(move |selector: &Selector| {
            Ok(value.reselect(&Selector::single(0, selector.count())))
        }))
    }

    fn values_getter(&self) -> Option<ValuesGetter> {
        let value = self.value.clone();
        Some(Box::new(move || Ok(value.clone())))
    }

    fn indices_getter(&self) -> Option<IndicesGetter> {
        let index = Arc::clone(&self.index);
        Some(Box::new(move |selector: &Selector| {
            Ok(ColumnBatch::single(Arc::clone(&index), selector.count(), None))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DType;
    use crate::table::BatchCursor;

    #[test]
    fn test_broadcasts_to_current_row_count() {
        let cursor = BatchCursor::shared(7);
        let column = ConstantColumn::new("flag", Some(true), Rc::clone(&cursor));
        let mut getter = column.current_getter();

        cursor.borrow_mut().advance(5).unwrap();
        let batch = getter().unwrap();
        assert!(batch.selector().is_single_value());
        assert_eq!(batch.to_options::<bool>().unwrap(), vec![Some(true); 5]);

        cursor.borrow_mut().advance(5).unwrap();
        assert_eq!(getter().unwrap().count(), 2);
    }

    #[test]
    fn test_null_constant() {
        let cursor = BatchCursor::shared(3);
        let column = ConstantColumn::new::<i64>("missing", None, cursor);
        assert_eq!(column.details().dtype, DType::Int64);
        assert!(column.details().nullable);

        let mut seek = column.seek_getter().unwrap();
        let batch = seek(&Selector::all(3)).unwrap();
        assert_eq!(batch.to_options::<i64>().unwrap(), vec![None, None, None]);
    }

    #[test]
    fn test_dictionary_of_one() {
        let column = ConstantColumn::new("c", Some(9u16), BatchCursor::shared(4));
        let values = (column.values_getter().unwrap())().unwrap();
        assert_eq!(values.count(), 1);
        let indices = (column.indices_getter().unwrap())(&Selector::range(1..4)).unwrap();
        assert_eq!(indices.to_index_selector().unwrap(), Selector::single(0, 3));
    }
}
