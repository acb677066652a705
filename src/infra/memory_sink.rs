use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::cleaner::{CleanedRow, Dataset};
use crate::error::Result;
use crate::ports::{LoadSink, TableIdentifier, WriteMode};

/// In-memory load sink for development and testing. Tables are keyed by
/// their qualified name.
#[derive(Clone, Default)]
pub struct MemorySink {
    tables: Arc<Mutex<HashMap<String, Vec<CleanedRow>>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a table's rows, for assertions.
    pub fn rows(&self, table: &TableIdentifier) -> Vec<CleanedRow> {
        let tables = self.tables.lock().unwrap();
        tables.get(&table.qualified()).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LoadSink for MemorySink {
    async fn write(
        &self,
        dataset: &Dataset,
        table: &TableIdentifier,
        mode: WriteMode,
    ) -> Result<u64> {
        let mut tables = self.tables.lock().unwrap();
        let slot = tables.entry(table.qualified()).or_default();
        if mode == WriteMode::Overwrite {
            slot.clear();
        }
        slot.extend(dataset.rows.iter().cloned());
        debug!(table = %table.qualified(), rows = dataset.len(), "memory sink write");
        Ok(dataset.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::clean;
    use crate::parser::RawRow;
    use crate::schema::{ColumnSpec, Schema, SemanticType};

    fn dataset_with_notes(notes: &[&str]) -> Dataset {
        let schema = Schema::new(vec![ColumnSpec::new("note", SemanticType::FreeText)]);
        let mut dataset = Dataset::new(schema);
        for note in notes {
            let mut row = RawRow::new();
            row.insert("note", note.to_string());
            dataset.rows.push(clean(&row, &dataset.schema).row);
        }
        dataset
    }

    #[tokio::test]
    async fn overwrite_replaces_prior_contents_in_full() {
        let sink = MemorySink::new();
        let table = TableIdentifier::new(None, "t");

        sink.write(&dataset_with_notes(&["a", "b"]), &table, WriteMode::Overwrite)
            .await
            .unwrap();
        sink.write(&dataset_with_notes(&["c"]), &table, WriteMode::Overwrite)
            .await
            .unwrap();

        assert_eq!(sink.rows(&table).len(), 1);
    }

    #[tokio::test]
    async fn append_accumulates() {
        let sink = MemorySink::new();
        let table = TableIdentifier::new(None, "t");

        sink.write(&dataset_with_notes(&["a"]), &table, WriteMode::Append)
            .await
            .unwrap();
        let written = sink
            .write(&dataset_with_notes(&["b"]), &table, WriteMode::Append)
            .await
            .unwrap();

        assert_eq!(written, 1);
        assert_eq!(sink.rows(&table).len(), 2);
    }
}
