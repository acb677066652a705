use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("schema mismatch: schema declares {expected} columns but the header has {found} fields")]
    SchemaMismatch { expected: usize, found: usize },

    #[error("malformed record at line {line}: expected {expected} fields, found {found}")]
    MalformedRecord {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("sink write failed: {message}")]
    SinkWriteFailure { message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Environment variable error: {0}")]
    Env(#[from] std::env::VarError),

    #[cfg(feature = "db")]
    #[error("Database error: {message}")]
    Database { message: String },
}

pub type Result<T> = std::result::Result<T, LoaderError>;
