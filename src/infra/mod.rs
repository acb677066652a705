pub mod fetch;
pub mod memory_sink;
#[cfg(feature = "db")]
pub mod postgres_sink;

pub use fetch::{FileFetcher, HttpFetcher};
pub use memory_sink::MemorySink;
#[cfg(feature = "db")]
pub use postgres_sink::PostgresSink;
