use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::batch::Selector;
use crate::core::{ColflowError, Result};
use crate::table::{Column, Table};

/// Shared flag that asks a running pipeline to stop. Cloning shares the flag,
/// so another thread can cancel a pipeline driven elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Wraps a table so every `next` first checks a [`CancellationToken`].
///
/// Cancellation is only observed between batches; a `next` already running
/// inside the inner table completes normally.
pub struct CancellableTable<T: Table> {
    inner: T,
    token: CancellationToken,
}

impl<T: Table> CancellableTable<T> {
    pub fn new(inner: T, token: CancellationToken) -> Self {
        Self { inner, token }
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Table> Table for CancellableTable<T> {
    fn columns(&self) -> &[Rc<dyn Column>] {
        self.inner.columns()
    }

    fn next(&mut self, desired_count: usize) -> Result<usize> {
        if self.token.is_cancelled() {
            info!("pipeline cancelled, refusing next batch");
            return Err(ColflowError::Cancelled);
        }
        self.inner.next(desired_count)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn current_row_count(&self) -> usize {
        self.inner.current_row_count()
    }

    fn current_selector(&self) -> Selector {
        self.inner.current_selector()
    }
}
