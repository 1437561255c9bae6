use std::cell::RefCell;
use std::rc::Rc;

use log::debug;

use crate::batch::Selector;
use crate::core::{ColflowError, Result};
use crate::table::Column;

/// Batch iteration protocol implemented by every pipeline stage.
///
/// A consumer calls [`Table::next`] until it returns 0, and after each call
/// reads the current batch of every column it needs through the getters of
/// [`Table::columns`]. Calling a getter before the first `next` is undefined.
pub trait Table {
    /// Columns of the table, fixed for its lifetime.
    fn columns(&self) -> &[Rc<dyn Column>];

    /// Advance to the next batch of up to `desired_count` rows (more or fewer
    /// may be returned). Returns 0 once the data is exhausted, and keeps
    /// returning 0 until [`Table::reset`].
    fn next(&mut self, desired_count: usize) -> Result<usize>;

    /// Return to the initial, un-iterated state.
    fn reset(&mut self);

    fn current_row_count(&self) -> usize;

    fn current_selector(&self) -> Selector;

    fn column(&self, name: &str) -> Result<Rc<dyn Column>> {
        self.columns()
            .iter()
            .find(|column| column.details().name == name)
            .cloned()
            .ok_or_else(|| ColflowError::InvalidArgument(format!("column '{name}' not found")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    Unstarted,
    Iterating,
    Exhausted,
}

/// Position of a table over a fixed number of rows, shared with its columns.
#[derive(Debug, Clone)]
pub struct BatchCursor {
    total: usize,
    position: usize,
    state: TableState,
    selector: Selector,
}

pub type CursorHandle = Rc<RefCell<BatchCursor>>;

impl BatchCursor {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            position: 0,
            state: TableState::Unstarted,
            selector: Selector::empty(),
        }
    }

    pub fn shared(total: usize) -> CursorHandle {
        Rc::new(RefCell::new(Self::new(total)))
    }

    /// Select the next range of up to `desired_count` rows.
    pub fn advance(&mut self, desired_count: usize) -> Result<usize> {
        if desired_count == 0 {
            return Err(ColflowError::InvalidArgument(
                "desired row count must be greater than zero".to_string(),
            ));
        }
        if self.state == TableState::Exhausted {
            return Ok(0);
        }

        let end = self.total.min(self.position.saturating_add(desired_count));
        let count = end - self.position;
        self.selector = Selector::range(self.position..end);
        self.position = end;

        if count == 0 {
            debug!("cursor exhausted after {} rows", self.total);
            self.state = TableState::Exhausted;
        } else {
            self.state = TableState::Iterating;
        }
        Ok(count)
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.state = TableState::Unstarted;
        self.selector = Selector::empty();
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn current_selector(&self) -> Selector {
        self.selector.clone()
    }

    pub fn current_row_count(&self) -> usize {
        self.selector.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_state_machine() {
        let mut cursor = BatchCursor::new(5);
        assert_eq!(cursor.state(), TableState::Unstarted);
        assert_eq!(cursor.current_row_count(), 0);

        assert_eq!(cursor.advance(3), Ok(3));
        assert_eq!(cursor.state(), TableState::Iterating);
        assert_eq!(cursor.current_selector(), Selector::range(0..3));

        assert_eq!(cursor.advance(3), Ok(2));
        assert_eq!(cursor.current_selector(), Selector::range(3..5));

        assert_eq!(cursor.advance(3), Ok(0));
        assert_eq!(cursor.state(), TableState::Exhausted);
        assert_eq!(cursor.current_row_count(), 0);
        assert_eq!(cursor.advance(100), Ok(0));

        cursor.reset();
        assert_eq!(cursor.state(), TableState::Unstarted);
        assert_eq!(cursor.advance(10), Ok(5));
    }

    #[test]
    fn test_zero_request_rejected() {
        let mut cursor = BatchCursor::new(5);
        assert!(matches!(
            cursor.advance(0),
            Err(ColflowError::InvalidArgument(_))
        ));
        assert_eq!(cursor.state(), TableState::Unstarted);
    }

    #[test]
    fn test_unbounded_request_takes_the_rest() {
        let mut cursor = BatchCursor::new(3);
        assert_eq!(cursor.advance(1), Ok(1));
        assert_eq!(cursor.advance(usize::MAX), Ok(2));
        assert_eq!(cursor.current_selector(), Selector::range(1..3));
        assert_eq!(cursor.advance(usize::MAX), Ok(0));
    }

    #[test]
    fn test_empty_table_exhausts_immediately() {
        let mut cursor = BatchCursor::new(0);
        assert_eq!(cursor.advance(1), Ok(0));
        assert_eq!(cursor.state(), TableState::Exhausted);
    }
}
