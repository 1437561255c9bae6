mod arrow_table;
mod cancel;
pub mod column;
mod constant;
mod scan;
mod table;

pub use arrow_table::ArrowTable;
pub use cancel::{CancellableTable, CancellationToken};
pub use column::{
    Column, ColumnDetails, CurrentGetter, IndicesGetter, SeekGetter, ValuesGetter,
};
pub use constant::ConstantColumn;
pub use scan::{ColumnSummary, ScanSummary, scan};
pub use table::{BatchCursor, CursorHandle, Table, TableState};
