use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, warn};

use crate::batch::{ColumnBatch, NullBitmap, Selector, allocate_to_size};
use crate::core::{ColflowError, Element, Result};
use crate::table::{
    Column, ColumnDetails, CurrentGetter, IndicesGetter, SeekGetter, ValuesGetter,
};

type ElementFn<T, U> = Box<dyn FnMut(&T) -> Result<U>>;
type BeforeBatch = Box<dyn FnMut()>;

/// Turns a per-value function `T -> U` into a [`Column`] of `U` over a column of `T`.
///
/// The function is never called for null rows; those rows come out null and
/// hold `U::default()`. A single-value batch calls the function once. When the
/// source column is dictionary encoded, the function runs once per distinct
/// value and every batch is an index lookup into the converted dictionary.
///
/// Output batches borrow a buffer owned by the transform and are invalidated
/// by the next call to the same getter.
pub struct ElementwiseTransform<T: Element, U: Element> {
    name: String,
    column: Rc<dyn Column>,
    details: ColumnDetails,
    state: Rc<RefCell<TransformState<T, U>>>,
}

struct TransformState<T, U> {
    function: ElementFn<T, U>,
    before_batch: Option<BeforeBatch>,
    buffer: Arc<Vec<U>>,
    nulls: Arc<NullBitmap>,
    dictionary: Option<ConvertedDictionary>,
    _input: PhantomData<fn(&T)>,
}

/// Converted dictionary and the source value set it was converted from.
struct ConvertedDictionary {
    source: ColumnBatch,
    converted: ColumnBatch,
}

impl<T: Element, U: Element> ElementwiseTransform<T, U> {
    /// Bind `function` to `column`. Fails with `TypeMismatch` unless the column
    /// holds values of type `T`.
    pub fn build(
        name: &str,
        column: Rc<dyn Column>,
        mut function: impl FnMut(&T) -> U + 'static,
    ) -> Result<Self> {
        Self::bind(name, column, Box::new(move |value| Ok(function(value))), None)
    }

    /// Like [`ElementwiseTransform::build`], with a hook run before each batch is
    /// converted (for example to clear scratch storage the function writes into).
    pub fn build_with_hook(
        name: &str,
        column: Rc<dyn Column>,
        mut function: impl FnMut(&T) -> U + 'static,
        before_batch: impl FnMut() + 'static,
    ) -> Result<Self> {
        Self::bind(
            name,
            column,
            Box::new(move |value| Ok(function(value))),
            Some(Box::new(before_batch)),
        )
    }

    /// Bind a fallible function. An error aborts the batch being converted.
    pub fn try_build(
        name: &str,
        column: Rc<dyn Column>,
        function: impl FnMut(&T) -> Result<U> + 'static,
    ) -> Result<Self> {
        Self::bind(name, column, Box::new(function), None)
    }

    fn bind(
        name: &str,
        column: Rc<dyn Column>,
        function: ElementFn<T, U>,
        before_batch: Option<BeforeBatch>,
    ) -> Result<Self> {
        let source = column.details();
        if source.dtype != T::DTYPE {
            return Err(ColflowError::TypeMismatch {
                expected: T::DTYPE.to_string(),
                actual: source.dtype.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            details: source.with_type(U::DTYPE),
            column,
            state: Rc::new(RefCell::new(TransformState {
                function,
                before_batch,
                buffer: Arc::default(),
                nulls: Arc::default(),
                dictionary: None,
                _input: PhantomData,
            })),
        })
    }

    /// Source indices and values getters, when the source is dictionary encoded.
    fn dictionary_getters(&self) -> Option<(IndicesGetter, ValuesGetter)> {
        match (self.column.indices_getter(), self.column.values_getter()) {
            (Some(indices), Some(values)) => Some((indices, values)),
            (Some(_), None) => {
                warn!(
                    "column '{}' has indices but no values, converting row by row",
                    self.column.details().name
                );
                None
            }
            _ => None,
        }
    }
}

impl<T: Element, U: Element> TransformState<T, U> {
    fn convert_batch(&mut self, batch: &ColumnBatch) -> Result<ColumnBatch> {
        convert_into(&mut self.function, &mut self.buffer, &mut self.nulls, batch)
    }

    fn run_before_batch(&mut self) {
        if let Some(hook) = self.before_batch.as_mut() {
            hook();
        }
    }

    /// Converted form of `source`, a dictionary value set. Only converts when
    /// `source` differs from the dictionary converted last time.
    fn dictionary(&mut self, source: ColumnBatch) -> Result<ColumnBatch> {
        if let Some(cached) = &self.dictionary {
            if cached.source.same_view(&source) {
                return Ok(cached.converted.clone());
            }
        }

        debug!("converting dictionary of {} values", source.count());
        let converted = convert_into(
            &mut self.function,
            &mut Arc::default(),
            &mut Arc::default(),
            &source,
        )?;
        self.dictionary = Some(ConvertedDictionary {
            source,
            converted: converted.clone(),
        });
        Ok(converted)
    }
}

/// Apply `function` to every non-null row of `batch`, writing into `buffer`.
fn convert_into<T: Element, U: Element>(
    function: &mut ElementFn<T, U>,
    buffer: &mut Arc<Vec<U>>,
    nulls: &mut Arc<NullBitmap>,
    batch: &ColumnBatch,
) -> Result<ColumnBatch> {
    let values = batch.values::<T>()?;
    let count = batch.count();

    if count == 0 {
        return Ok(ColumnBatch::new(Arc::clone(buffer), Selector::empty(), None));
    }

    // A single value only needs converting once.
    if batch.selector().is_single_value() {
        let is_null = batch.is_null(0);
        let output = allocate_to_size(buffer, 1);
        output[0] = if is_null {
            U::default()
        } else {
            function(&values[batch.index(0)])?
        };
        let nulls = if is_null {
            allocate_to_size(nulls, 1).set_null(0, true);
            Some(Arc::clone(nulls))
        } else {
            None
        };
        return Ok(ColumnBatch::single(Arc::clone(buffer), count, nulls));
    }

    let output = allocate_to_size(buffer, count);
    for (i, slot) in output.iter_mut().take(count).enumerate() {
        *slot = if batch.is_null(i) {
            U::default()
        } else {
            function(&values[batch.index(i)])?
        };
    }

    let nulls = project_nulls(nulls, batch);
    Ok(ColumnBatch::all(Arc::clone(buffer), count, nulls))
}

/// Re-index the null bitmap of `batch` by logical row into `nulls`.
/// Returns `None` when no row is null.
fn project_nulls(nulls: &mut Arc<NullBitmap>, batch: &ColumnBatch) -> Option<Arc<NullBitmap>> {
    batch.nulls()?;

    let count = batch.count();
    let projected = allocate_to_size(nulls, count);
    let mut any_null = false;
    for i in 0..count {
        let is_null = batch.is_null(i);
        projected.set_null(i, is_null);
        any_null |= is_null;
    }
    any_null.then(|| Arc::clone(nulls))
}

impl<T: Element, U: Element> Column for ElementwiseTransform<T, U> {
    fn details(&self) -> &ColumnDetails {
        &self.details
    }

    fn current_selector(&self) -> Selector {
        self.column.current_selector()
    }

    fn current_getter(&self) -> CurrentGetter {
        let state = Rc::clone(&self.state);

        if let Some((mut indices, mut values)) = self.dictionary_getters() {
            let column = Rc::clone(&self.column);
            return Box::new(move || {
                let dictionary = state.borrow_mut().dictionary(values()?)?;
                let rows = indices(&column.current_selector())?.to_index_selector()?;
                Ok(dictionary.reselect(&rows))
            });
        }

        let mut source = self.column.current_getter();
        Box::new(move || {
            let mut state = state.borrow_mut();
            state.run_before_batch();
            let batch = source()?;
            state.convert_batch(&batch)
        })
    }

    fn seek_getter(&self) -> Option<SeekGetter> {
        let state = Rc::clone(&self.state);

        if let Some((mut indices, mut values)) = self.dictionary_getters() {
            return Some(Box::new(move |selector: &Selector| {
                let dictionary = state.borrow_mut().dictionary(values()?)?;
                let rows = indices(selector)?.to_index_selector()?;
                Ok(dictionary.reselect(&rows))
            }));
        }

        let mut source = self.column.seek_getter()?;
        Some(Box::new(move |selector: &Selector| {
            let mut state = state.borrow_mut();
            state.run_before_batch();
            let batch = source(selector)?;
            state.convert_batch(&batch)
        }))
    }

    fn values_getter(&self) -> Option<ValuesGetter> {
        let mut values = self.column.values_getter()?;
        let state = Rc::clone(&self.state);
        Some(Box::new(move || state.borrow_mut().dictionary(values()?)))
    }

    fn indices_getter(&self) -> Option<IndicesGetter> {
        self.column.indices_getter()
    }
}

impl<T: Element, U: Element> fmt::Display for ElementwiseTransform<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.column.details().name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serves a fixed batch through every getter path.
    struct FixedColumn {
        details: ColumnDetails,
        batch: ColumnBatch,
    }

    impl FixedColumn {
        fn new<T: Element>(batch: ColumnBatch) -> Rc<dyn Column> {
            Rc::new(Self {
                details: ColumnDetails::new("fixed", T::DTYPE, true),
                batch,
            })
        }
    }

    impl Column for FixedColumn {
        fn details(&self) -> &ColumnDetails {
            &self.details
        }

        fn current_selector(&self) -> Selector {
            Selector::all(self.batch.count())
        }

        fn current_getter(&self) -> CurrentGetter {
            let batch = self.batch.clone();
            Box::new(move || Ok(batch.clone()))
        }
    }

    #[test]
    fn test_type_mismatch_at_build() {
        let column = FixedColumn::new::<String>(ColumnBatch::from_values(vec!["a".to_string()]));
        let err = ElementwiseTransform::<i32, i32>::build("double", column, |x| x * 2)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ColflowError::TypeMismatch {
                expected: "int32".to_string(),
                actual: "utf8".to_string()
            }
        );
    }

    #[test]
    fn test_details_take_output_type() {
        let column = FixedColumn::new::<i32>(ColumnBatch::from_values(vec![1]));
        let transform =
            ElementwiseTransform::build("to_string", column, |x: &i32| x.to_string()).unwrap();
        assert_eq!(transform.details().dtype, crate::core::DType::Utf8);
        assert_eq!(transform.details().name, "fixed");
        assert_eq!(transform.to_string(), "to_string(fixed)");
    }

    #[test]
    fn test_output_buffer_reused_when_released() {
        let column = FixedColumn::new::<i64>(ColumnBatch::from_values(vec![1i64, 2, 3]));
        let transform = ElementwiseTransform::build("neg", column, |x: &i64| -x).unwrap();
        let mut getter = transform.current_getter();

        let first = getter().unwrap().values_arc::<i64>().unwrap();
        let first_ptr = first.as_ptr();
        drop(first);
        let second = getter().unwrap();
        assert_eq!(second.values::<i64>().unwrap().as_ptr(), first_ptr);
    }

    #[test]
    fn test_retained_batch_is_not_overwritten() {
        let column = FixedColumn::new::<i64>(ColumnBatch::from_values(vec![1i64, 2]));
        let mut calls = 0;
        let transform = ElementwiseTransform::build("count", column, move |x: &i64| {
            calls += 1;
            x + calls
        })
        .unwrap();
        let mut getter = transform.current_getter();

        let first = getter().unwrap();
        let second = getter().unwrap();
        assert_eq!(first.to_options::<i64>().unwrap(), vec![Some(2), Some(4)]);
        assert_eq!(second.to_options::<i64>().unwrap(), vec![Some(4), Some(6)]);
    }

    #[test]
    fn test_single_null_value_broadcasts_null() {
        let source = ColumnBatch::from_options::<i32>(vec![None]).reselect(&Selector::single(0, 4));
        let column = FixedColumn::new::<i32>(source);
        let transform =
            ElementwiseTransform::build("inc", column, |_: &i32| -> i32 { panic!("called on null") })
                .unwrap();
        let batch = (transform.current_getter())().unwrap();
        assert!(batch.selector().is_single_value());
        assert_eq!(batch.to_options::<i32>().unwrap(), vec![None; 4]);
    }

    #[test]
    fn test_empty_batch_calls_nothing() {
        let column = FixedColumn::new::<i32>(ColumnBatch::from_values(Vec::<i32>::new()));
        let transform =
            ElementwiseTransform::build("f", column, |_: &i32| -> i32 { panic!("called on empty") })
                .unwrap();
        let batch = (transform.current_getter())().unwrap();
        assert!(batch.is_empty());
        assert_eq!(batch.dtype(), crate::core::DType::Int32);
    }

    #[test]
    fn test_plain_source_has_no_values_getter() {
        let column = FixedColumn::new::<i32>(ColumnBatch::from_values(vec![1]));
        let transform = ElementwiseTransform::build("id", column, |x: &i32| *x).unwrap();
        assert!(transform.values_getter().is_none());
        assert!(transform.indices_getter().is_none());
        assert!(transform.seek_getter().is_none());
    }
}
