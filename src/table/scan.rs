use log::info;

use crate::conf::PipelineConfig;
use crate::core::{ColflowError, DType, Result};
use crate::table::{CurrentGetter, Table};

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: DType,
    pub rows: usize,
    pub nulls: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    pub batches: usize,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

/// Drive `table` to exhaustion, reading every column of every batch.
pub fn scan(table: &mut dyn Table, config: &PipelineConfig) -> Result<ScanSummary> {
    let mut getters: Vec<CurrentGetter> = table
        .columns()
        .iter()
        .map(|column| column.current_getter())
        .collect();
    let mut summary = ScanSummary {
        columns: table
            .columns()
            .iter()
            .map(|column| ColumnSummary {
                name: column.details().name.clone(),
                dtype: column.details().dtype,
                rows: 0,
                nulls: 0,
            })
            .collect(),
        ..Default::default()
    };

    loop {
        let count = table.next(config.batch_size)?;
        if count == 0 {
            break;
        }
        summary.batches += 1;
        summary.rows += count;

        for (getter, column) in getters.iter_mut().zip(summary.columns.iter_mut()) {
            let batch = getter()?;
            if batch.count() != count {
                return Err(ColflowError::InvalidBatch(format!(
                    "column '{}' returned {} rows for a batch of {}",
                    column.name,
                    batch.count(),
                    count
                )));
            }
            column.rows += count;
            column.nulls += (0..count).filter(|&i| batch.is_null(i)).count();
        }

        if config.log_batches {
            info!("batch {}: {} rows", summary.batches, count);
        }
    }

    Ok(summary)
}
