mod config;
mod pipeline;

pub use config::Config;
pub use pipeline::PipelineConfig;
