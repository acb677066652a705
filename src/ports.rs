use async_trait::async_trait;

use crate::cleaner::Dataset;
use crate::error::Result;

/// Acquisition collaborator: produces the raw bytes for a locator. Adapters
/// own retry, authentication, and error translation; the pipeline only
/// requires the bytes and sees `SourceUnavailable` when none are produced.
#[async_trait]
pub trait FetchPort: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>>;
}

/// Destination table, optionally qualified by a database schema.
#[derive(Debug, Clone)]
pub struct TableIdentifier {
    pub schema: Option<String>,
    pub name: String,
}

impl TableIdentifier {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self { schema, name: name.into() }
    }

    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// How a write treats the destination's prior contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the table's prior contents in full. Callers relying on
    /// historical accumulation must not use this mode.
    Overwrite,
    /// Add to whatever is already there.
    Append,
}

/// Load collaborator: performs the single bulk write of a cleaned dataset.
/// Returns the number of rows written; failures surface as
/// `SinkWriteFailure` with no partial-success state.
#[async_trait]
pub trait LoadSink: Send + Sync {
    async fn write(
        &self,
        dataset: &Dataset,
        table: &TableIdentifier,
        mode: WriteMode,
    ) -> Result<u64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_identifier_qualifies_with_schema() {
        let bare = TableIdentifier::new(None, "real_estate_sales");
        assert_eq!(bare.qualified(), "real_estate_sales");
        let qualified = TableIdentifier::new(Some("cne_dev".to_string()), "real_estate_sales");
        assert_eq!(qualified.qualified(), "cne_dev.real_estate_sales");
    }
}
