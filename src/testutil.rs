//! Test and benchmark utilities.
//!
//! This module is only available when the `testutil` feature is enabled.

use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use arrow::array::{DictionaryArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::record_batch::RecordBatch;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

use crate::batch::Selector;
use crate::core::{Element, Result};
use crate::io::write_ipc_file;
use crate::table::{Column, Table};

/// Single nullable int64 column named `name`.
pub fn int64_batch(name: &str, values: Vec<Option<i64>>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Int64, true)]));
    RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(values))])
        .expect("valid int64 batch")
}

/// Single nullable utf8 column named `name`.
pub fn utf8_batch(name: &str, values: Vec<Option<&str>>) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![Field::new(name, DataType::Utf8, true)]));
    RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(values))])
        .expect("valid utf8 batch")
}

/// Single dictionary-encoded utf8 column. `keys` index into `values`.
pub fn dictionary_batch(name: &str, values: &[&str], keys: Vec<Option<i32>>) -> RecordBatch {
    let keys = arrow::array::Int32Array::from(keys);
    let values = Arc::new(StringArray::from(values.to_vec()));
    let array = DictionaryArray::<Int32Type>::try_new(keys, values).expect("valid dictionary");
    let schema = Arc::new(Schema::new(vec![Field::new(
        name,
        DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
        true,
    )]));
    RecordBatch::try_new(schema, vec![Arc::new(array)]).expect("valid dictionary batch")
}

/// Deterministic batch of `rows` rows: an int64 column `id` with every
/// seventh row null, and a dictionary column `tag` over `cardinality` words.
pub fn generate_batch(rows: usize, cardinality: usize, seed: u64) -> RecordBatch {
    let mut rng = StdRng::seed_from_u64(seed);
    let ids: Int64Array = (0..rows)
        .map(|i| (i % 7 != 3).then_some(i as i64))
        .collect();
    let words: Vec<String> = (0..cardinality.max(1)).map(|i| format!("tag_{i}")).collect();
    let keys: Vec<Option<i32>> = (0..rows)
        .map(|_| Some(rng.gen_range(0..words.len()) as i32))
        .collect();
    let tags = DictionaryArray::<Int32Type>::try_new(
        arrow::array::Int32Array::from(keys),
        Arc::new(StringArray::from(words)),
    )
    .expect("valid dictionary");

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new(
            "tag",
            DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8)),
            false,
        ),
    ]));
    RecordBatch::try_new(schema, vec![Arc::new(ids), Arc::new(tags)]).expect("valid batch")
}

/// Write `batches` to an IPC file inside a fresh temporary directory.
/// The directory is removed when the returned guard drops.
pub fn temp_ipc_file(batches: &[RecordBatch]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("data.arrow");
    write_ipc_file(&path, batches).expect("write ipc file");
    (dir, path)
}

/// Random selector addressing offsets below `bound`, of any shape.
pub fn random_selector(rng: &mut StdRng, bound: usize) -> Selector {
    if bound == 0 {
        return Selector::empty();
    }
    match rng.gen_range(0..3) {
        0 => {
            let start = rng.gen_range(0..bound);
            let end = rng.gen_range(start..=bound);
            Selector::range(start..end)
        }
        1 => {
            let count = rng.gen_range(0..=bound);
            Selector::indices((0..count).map(|_| rng.gen_range(0..bound) as u32).collect())
        }
        _ => Selector::single(rng.gen_range(0..bound), rng.gen_range(0..=bound)),
    }
}

/// Drive `table` to exhaustion and collect every row `column` produced.
pub fn drain_column<T: Element>(
    table: &mut dyn Table,
    column: &dyn Column,
    batch_size: usize,
) -> Result<Vec<Option<T>>> {
    let mut getter = column.current_getter();
    let mut rows = Vec::new();
    while table.next(batch_size)? > 0 {
        rows.extend(getter()?.to_options::<T>()?);
    }
    Ok(rows)
}

/// Wrap `function` so the returned counter tracks how often it was called.
pub fn counted<T: 'static, U: 'static>(
    mut function: impl FnMut(&T) -> U + 'static,
) -> (impl FnMut(&T) -> U + 'static, Rc<Cell<usize>>) {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let wrapped = move |value: &T| {
        counter.set(counter.get() + 1);
        function(value)
    };
    (wrapped, calls)
}
