mod args;
mod dtype;
mod error;
mod logger;

pub use args::CliArgs;
pub(crate) use dtype::dispatch_element;
pub use dtype::{DType, Element};
pub use error::{ColflowError, Result};
pub use logger::setup_logging;
