use std::path::Path;

use crate::{
    conf::PipelineConfig,
    core::ColflowError::{self, ConfigParsingError},
};
use config::{Config as CConfig, ConfigBuilder, Environment, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_str(toml_str: &str) -> Result<Config, ColflowError> {
        Self::build(
            CConfig::builder().add_source(config::File::from_str(toml_str, FileFormat::Toml)),
        )
    }

    pub fn from_file(path: &Path) -> Result<Config, ColflowError> {
        Self::build(
            CConfig::builder().add_source(config::File::from(path).format(FileFormat::Toml)),
        )
    }

    /// Environment variables like `COLFLOW_PIPELINE__BATCH_SIZE` override file values.
    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Config, ColflowError> {
        let config = builder
            .add_source(
                Environment::with_prefix("COLFLOW")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigParsingError(e.to_string()))?
            .try_deserialize::<Config>()
            .map_err(|e| ConfigParsingError(e.to_string()))?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_correct_toml() {
        let toml = r#"
        [pipeline]
        batch_size = 512
        log_batches = true
        "#;
        let conf = Config::from_str(toml);
        assert_eq!(
            conf,
            Ok(Config {
                pipeline: PipelineConfig {
                    batch_size: 512,
                    log_batches: true,
                }
            })
        );
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let conf = Config::from_str("").unwrap();
        assert_eq!(conf, Config::default());
    }

    #[test]
    fn unknown_field_rejected() {
        let toml = r#"
        [pipeline]
        batch_sise = 10
        "#;
        assert!(matches!(Config::from_str(toml), Err(ConfigParsingError(_))));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let toml = r#"
        [pipeline]
        batch_size = 0
        "#;
        assert!(matches!(Config::from_str(toml), Err(ConfigParsingError(_))));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colflow.toml");
        std::fs::write(&path, "[pipeline]\nbatch_size = 64\n").unwrap();
        let conf = Config::from_file(&path).unwrap();
        assert_eq!(conf.pipeline.batch_size, 64);
        assert!(!conf.pipeline.log_batches);
    }
}
