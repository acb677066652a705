use std::collections::HashMap;
use std::io::Read;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{LoaderError, Result};
use crate::schema::Schema;

/// One line of input as raw text fields, keyed by schema column name.
/// Created once per line and discarded after normalization.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    fields: HashMap<&'static str, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: &'static str, raw: String) {
        self.fields.insert(column, raw);
    }

    /// Raw value for a column, or `None` when the field is absent.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

/// What to do with a body row whose field count does not match the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedPolicy {
    /// Skip the row, count it, and keep going.
    Skip,
    /// Fail the run at the offending line.
    Abort,
}

/// Single-pass reader over delimited text whose first line is a header.
///
/// The declared schema overrides whatever header is physically present: the
/// header line is consumed, its field count is checked against the schema,
/// and it is then discarded. Field naming always comes from the schema, so a
/// source that silently reorders its columns will not be detected here; that
/// is why the schema is treated as authoritative configuration.
pub struct RecordParser<R: Read> {
    records: csv::StringRecordsIntoIter<R>,
    schema: Schema,
    policy: MalformedPolicy,
    skipped: u64,
    line: u64,
}

impl<R: Read> RecordParser<R> {
    /// Consumes and validates the header line. Fails with `SchemaMismatch`
    /// when the header's field count differs from the schema's column count,
    /// before any row is emitted.
    pub fn new(reader: R, schema: Schema, policy: MalformedPolicy) -> Result<Self> {
        let rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        let mut records = rdr.into_records();

        let header = match records.next() {
            Some(record) => record?,
            None => {
                return Err(LoaderError::SchemaMismatch {
                    expected: schema.len(),
                    found: 0,
                })
            }
        };
        if header.len() != schema.len() {
            return Err(LoaderError::SchemaMismatch {
                expected: schema.len(),
                found: header.len(),
            });
        }
        debug!("header consumed and discarded; schema names {} columns", schema.len());

        Ok(Self {
            records,
            schema,
            policy,
            skipped: 0,
            line: 1,
        })
    }

    /// Drains the parser into a row list. Under `Abort` the first malformed
    /// row fails the whole read; under `Skip` it is counted and dropped.
    pub fn read_all(mut self) -> Result<ParseOutcome> {
        let mut rows = Vec::new();
        for row in &mut self {
            rows.push(row?);
        }
        Ok(ParseOutcome {
            rows,
            skipped: self.skipped,
        })
    }
}

impl<R: Read> Iterator for RecordParser<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(e) => return Some(Err(e.into())),
            };
            self.line = record
                .position()
                .map(|p| p.line())
                .unwrap_or(self.line + 1);

            if record.len() != self.schema.len() {
                match self.policy {
                    MalformedPolicy::Abort => {
                        return Some(Err(LoaderError::MalformedRecord {
                            line: self.line,
                            expected: self.schema.len(),
                            found: record.len(),
                        }));
                    }
                    MalformedPolicy::Skip => {
                        self.skipped += 1;
                        warn!(
                            line = self.line,
                            expected = self.schema.len(),
                            found = record.len(),
                            "skipping malformed record"
                        );
                        continue;
                    }
                }
            }

            let mut row = RawRow::new();
            for (spec, field) in self.schema.columns().iter().zip(record.iter()) {
                row.insert(spec.name, field.to_string());
            }
            return Some(Ok(row));
        }
    }
}

/// Everything a full parse produced: the rows plus the malformed-row count.
#[derive(Debug)]
pub struct ParseOutcome {
    pub rows: Vec<RawRow>,
    pub skipped: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnSpec, Schema, SemanticType};

    fn two_column_schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::new("id", SemanticType::FreeText),
            ColumnSpec::new("amount", SemanticType::CurrencyAmount),
        ])
    }

    #[test]
    fn header_is_discarded_in_favor_of_schema_names() {
        // The physical header names differ; fields are still keyed by schema.
        let input = "wrong_a,wrong_b\n1,100\n";
        let parser =
            RecordParser::new(input.as_bytes(), two_column_schema(), MalformedPolicy::Abort)
                .unwrap();
        let outcome = parser.read_all().unwrap();
        assert_eq!(outcome.rows.len(), 1);
        assert_eq!(outcome.rows[0].get("id"), Some("1"));
        assert_eq!(outcome.rows[0].get("amount"), Some("100"));
        assert_eq!(outcome.rows[0].get("wrong_a"), None);
    }

    #[test]
    fn header_field_count_mismatch_is_fatal_before_any_row() {
        let input = "only_one_column\n1,100\n";
        let err = RecordParser::new(input.as_bytes(), two_column_schema(), MalformedPolicy::Skip)
            .err()
            .expect("mismatched header must fail");
        match err {
            LoaderError::SchemaMismatch { expected, found } => {
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_is_a_schema_mismatch() {
        let err = RecordParser::new("".as_bytes(), two_column_schema(), MalformedPolicy::Skip)
            .err()
            .expect("empty input must fail");
        assert!(matches!(
            err,
            LoaderError::SchemaMismatch { expected: 2, found: 0 }
        ));
    }

    #[test]
    fn skip_policy_counts_malformed_rows_and_keeps_going() {
        let input = "a,b\n1,100\n2,200,extra\n3,300\n";
        let parser =
            RecordParser::new(input.as_bytes(), two_column_schema(), MalformedPolicy::Skip)
                .unwrap();
        let outcome = parser.read_all().unwrap();
        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.rows[1].get("id"), Some("3"));
    }

    #[test]
    fn abort_policy_fails_at_the_offending_line() {
        let input = "a,b\n1,100\n2\n";
        let parser =
            RecordParser::new(input.as_bytes(), two_column_schema(), MalformedPolicy::Abort)
                .unwrap();
        let err = parser.read_all().err().expect("short row must fail");
        match err {
            LoaderError::MalformedRecord { line, expected, found } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
    }

    #[test]
    fn quoted_fields_with_embedded_commas_parse_as_one_field() {
        let input = "a,b\n\"1, Main St\",100\n";
        let parser =
            RecordParser::new(input.as_bytes(), two_column_schema(), MalformedPolicy::Abort)
                .unwrap();
        let outcome = parser.read_all().unwrap();
        assert_eq!(outcome.rows[0].get("id"), Some("1, Main St"));
    }
}
