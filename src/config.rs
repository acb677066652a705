use std::fs;

use serde::Deserialize;

use crate::error::{LoaderError, Result};
use crate::parser::MalformedPolicy;
use crate::ports::TableIdentifier;

/// Runtime configuration, loaded once at startup and handed to collaborators
/// at construction time. Database credentials deliberately live outside this
/// file: they come from `DATABASE_URL` in the environment.
#[derive(Debug, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub sink: SinkConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_on_malformed")]
    pub on_malformed: MalformedPolicy,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct SinkConfig {
    pub table: String,
    pub schema: Option<String>,
}

fn default_timeout_seconds() -> u64 {
    300
}

fn default_on_malformed() -> MalformedPolicy {
    MalformedPolicy::Skip
}

fn default_output_dir() -> String {
    "output".to_string()
}

impl Config {
    pub fn load_from(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            LoaderError::Config(format!("Failed to read config file '{path}': {e}"))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn table(&self) -> TableIdentifier {
        TableIdentifier::new(self.sink.schema.clone(), self.sink.table.clone())
    }

    /// Connection string for the PostgreSQL sink, from the environment.
    pub fn database_url() -> Result<String> {
        Ok(std::env::var("DATABASE_URL")?)
    }
}
