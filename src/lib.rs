pub mod cleaner;
pub mod config;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod ports;
pub mod schema;

// Infrastructure adapters behind the ports
pub mod infra;
