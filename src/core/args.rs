use std::path::PathBuf;

use clap::Parser;
use log::kv::{ToValue, Value};

#[derive(Parser, Debug, PartialEq)]
#[command(version, about = "Scan an Arrow IPC file through the colflow batch pipeline")]
pub struct CliArgs {
    #[arg(short, long)]
    pub config: Option<String>,

    /// Arrow IPC file to scan.
    pub input: PathBuf,
}

impl ToValue for CliArgs {
    fn to_value(&self) -> Value<'_> {
        Value::from_debug(self)
    }
}
