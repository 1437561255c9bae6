use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ColflowError {
    #[error("Expected type {expected}, found {actual}")]
    TypeMismatch { expected: String, actual: String },
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Invalid batch: {0}")]
    InvalidBatch(String),
    #[error("Pipeline cancelled")]
    Cancelled,
    #[error("Function error: {0}")]
    Function(String),
    #[error("Source error: {0}")]
    Source(String),
    #[error("Arrow error: {0}")]
    ArrowError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Cannot parse config: {0}")]
    ConfigParsingError(String),
}

pub type Result<T> = std::result::Result<T, ColflowError>;

impl From<std::io::Error> for ColflowError {
    fn from(err: std::io::Error) -> Self {
        ColflowError::IoError(err.to_string())
    }
}

impl From<arrow::error::ArrowError> for ColflowError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ColflowError::ArrowError(err.to_string())
    }
}
