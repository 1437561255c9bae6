//! Zero-copy batch primitives: row selectors, null bitmaps and column batches.

pub mod alloc;
mod bitmap;
mod column_batch;
mod selector;

pub use alloc::allocate_to_size;
pub use bitmap::NullBitmap;
pub use column_batch::ColumnBatch;
pub use selector::Selector;
