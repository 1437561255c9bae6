use serde::{Deserialize, Serialize};

use crate::core::ColflowError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    /// Rows requested from the source on every `next` call.
    #[serde(default = "PipelineConfig::default_batch_size")]
    pub batch_size: usize,
    /// Log one line per batch pulled by the driver.
    #[serde(default)]
    pub log_batches: bool,
}

impl PipelineConfig {
    fn default_batch_size() -> usize {
        10240
    }

    pub fn validate(&self) -> Result<(), ColflowError> {
        if self.batch_size == 0 {
            return Err(ColflowError::ConfigParsingError(
                "pipeline.batch_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: Self::default_batch_size(),
            log_batches: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_default() {
        let pipeline = PipelineConfig::default();
        assert_eq!(pipeline.batch_size, 10240);
        assert!(!pipeline.log_batches);
        assert!(pipeline.validate().is_ok());
    }
}
