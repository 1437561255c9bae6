use std::rc::Rc;
use std::sync::Arc;

use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use log::debug;

use crate::batch::{ColumnBatch, NullBitmap, Selector};
use crate::core::{ColflowError, DType, Element, Result, dispatch_element};
use crate::table::{
    BatchCursor, Column, ColumnDetails, ConstantColumn, CurrentGetter, CursorHandle,
    IndicesGetter, SeekGetter, Table, ValuesGetter,
};

/// A [`Table`] over one Arrow record batch.
///
/// Column data is imported once into owned buffers; every batch after that is a
/// zero-copy reselection. Dictionary-encoded Arrow columns keep their encoding
/// and expose `values_getter`/`indices_getter`.
pub struct ArrowTable {
    cursor: CursorHandle,
    columns: Vec<Rc<dyn Column>>,
}

impl ArrowTable {
    pub fn try_new(batch: &RecordBatch) -> Result<Self> {
        let cursor = BatchCursor::shared(batch.num_rows());
        let schema = batch.schema();

        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .map(|(field, array)| -> Result<Rc<dyn Column>> {
                let dtype = DType::from_arrow(field.data_type()).ok_or_else(|| {
                    ColflowError::UnsupportedOperation(format!(
                        "column '{}' has unsupported type {}",
                        field.name(),
                        field.data_type()
                    ))
                })?;
                let details = ColumnDetails::new(field.name(), dtype, field.is_nullable());
                let column: Rc<dyn Column> = match array.data_type() {
                    DataType::Dictionary(_, _) => Rc::new(DictionaryColumn::import(
                        details,
                        Rc::clone(&cursor),
                        array.as_ref(),
                    )?),
                    _ => Rc::new(PlainColumn {
                        all: dispatch_element!(dtype, import_plain(array.as_ref()))?,
                        details,
                        cursor: Rc::clone(&cursor),
                    }),
                };
                Ok(column)
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "imported arrow batch with {} rows and {} columns",
            batch.num_rows(),
            columns.len()
        );

        Ok(Self { cursor, columns })
    }

    /// Append a column broadcasting `value` to every row.
    pub fn with_constant<T: Element>(mut self, name: &str, value: Option<T>) -> Self {
        let column = ConstantColumn::new(name, value, Rc::clone(&self.cursor));
        self.columns.push(Rc::new(column));
        self
    }

    pub fn row_count(&self) -> usize {
        self.cursor.borrow().total()
    }
}

impl Table for ArrowTable {
    fn columns(&self) -> &[Rc<dyn Column>] {
        &self.columns
    }

    fn next(&mut self, desired_count: usize) -> Result<usize> {
        self.cursor.borrow_mut().advance(desired_count)
    }

    fn reset(&mut self) {
        self.cursor.borrow_mut().reset();
    }

    fn current_row_count(&self) -> usize {
        self.cursor.borrow().current_row_count()
    }

    fn current_selector(&self) -> Selector {
        self.cursor.borrow().current_selector()
    }
}

fn import_plain<T: Element>(array: &dyn Array) -> Result<ColumnBatch> {
    let nulls = NullBitmap::from_fn(array.len(), |i| array.is_null(i)).map(Arc::new);
    Ok(ColumnBatch::all(
        Arc::new(T::from_arrow(array)?),
        array.len(),
        nulls,
    ))
}

/// Import dictionary values and keys. Null keys are redirected to an extra
/// null slot appended to the values, so the index batch never carries nulls.
fn import_dictionary<T: Element>(array: &dyn Array) -> Result<(ColumnBatch, ColumnBatch)> {
    let dictionary = array.as_any_dictionary_opt().ok_or_else(|| {
        ColflowError::InvalidBatch(format!("expected dictionary array, got {}", array.data_type()))
    })?;
    let values_array = dictionary.values();
    let keys_array = dictionary.keys();

    let mut values = T::from_arrow(values_array.as_ref())?;
    let null_slot = values.len();
    let has_null_keys = keys_array.null_count() > 0;
    if has_null_keys {
        values.push(T::default());
    }

    let keys: Vec<u32> = dictionary
        .normalized_keys()
        .into_iter()
        .enumerate()
        .map(|(i, key)| {
            if keys_array.is_null(i) {
                null_slot as u32
            } else {
                key as u32
            }
        })
        .collect();

    let nulls = NullBitmap::from_fn(values.len(), |i| {
        (has_null_keys && i == null_slot) || (i < null_slot && values_array.is_null(i))
    })
    .map(Arc::new);
    let count = values.len();

    Ok((
        ColumnBatch::all(Arc::new(values), count, nulls),
        ColumnBatch::from_values(keys),
    ))
}

struct PlainColumn {
    details: ColumnDetails,
    cursor: CursorHandle,
    all: ColumnBatch,
}

impl Column for PlainColumn {
    fn details(&self) -> &ColumnDetails {
        &self.details
    }

    fn current_selector(&self) -> Selector {
        self.cursor.borrow().current_selector()
    }

    fn current_getter(&self) -> CurrentGetter {
        let cursor = Rc::clone(&self.cursor);
        let all = self.all.clone();
        Box::new(move || Ok(all.reselect(&cursor.borrow().current_selector())))
    }

    fn seek_getter(&self) -> Option<SeekGetter> {
        let all = self.all.clone();
        Some(Box::new(move |selector: &Selector| Ok(all.reselect(selector))))
    }
}

struct DictionaryColumn {
    details: ColumnDetails,
    cursor: CursorHandle,
    values: ColumnBatch,
    indices: ColumnBatch,
}

impl DictionaryColumn {
    fn import(details: ColumnDetails, cursor: CursorHandle, array: &dyn Array) -> Result<Self> {
        let (values, indices) = dispatch_element!(details.dtype, import_dictionary(array))?;
        debug!(
            "column '{}' is dictionary encoded with {} distinct values",
            details.name,
            values.count()
        );
        Ok(Self {
            details,
            cursor,
            values,
            indices,
        })
    }
}

impl Column for DictionaryColumn {
    fn details(&self) -> &ColumnDetails {
        &self.details
    }

    fn current_selector(&self) -> Selector {
        self.cursor.borrow().current_selector()
    }

    fn current_getter(&self) -> CurrentGetter {
        let cursor = Rc::clone(&self.cursor);
        let values = self.values.clone();
        let indices = self.indices.clone();
        Box::new(move || {
            let rows = indices
                .reselect(&cursor.borrow().current_selector())
                .to_index_selector()?;
            Ok(values.reselect(&rows))
        })
    }

    fn seek_getter(&self) -> Option<SeekGetter> {
        let values = self.values.clone();
        let indices = self.indices.clone();
        Some(Box::new(move |selector: &Selector| {
            let rows = indices.reselect(selector).to_index_selector()?;
            Ok(values.reselect(&rows))
        }))
    }

    fn values_getter(&self) -> Option<ValuesGetter> {
        let values = self.values.clone();
        Some(Box::new(move || Ok(values.clone())))
    }

    fn indices_getter(&self) -> Option<IndicesGetter> {
        let indices = self.indices.clone();
        Some(Box::new(move |selector: &Selector| Ok(indices.reselect(selector))))
    }
}
