use std::path::Path;

use clap::Parser;
use colflow::conf::Config;
use colflow::core::{CliArgs, setup_logging};
use colflow::io::read_ipc_file;
use colflow::table::{ArrowTable, scan};
use log::info;

fn main() -> anyhow::Result<()> {
    setup_logging();
    let args = CliArgs::parse();
    info!(args = args; "colflow started");

    let config = match &args.config {
        Some(path) => Config::from_file(Path::new(path))?,
        None => Config::from_str("")?,
    };
    info!(
        "batch size {}, logging batches: {}",
        config.pipeline.batch_size, config.pipeline.log_batches
    );

    let batch = read_ipc_file(&args.input)?;
    let mut table = ArrowTable::try_new(&batch)?;

    let summary = scan(&mut table, &config.pipeline)?;
    info!(
        "scanned {} rows in {} batches",
        summary.rows, summary.batches
    );
    for column in &summary.columns {
        info!(
            "column '{}' ({}): {} rows, {} nulls",
            column.name, column.dtype, column.rows, column.nulls
        );
    }
    Ok(())
}
