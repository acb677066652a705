use serde_json::{Map, Value};

use crate::normalize::{normalize, FieldValue};
use crate::parser::RawRow;
use crate::schema::Schema;

/// A fully normalized row. Values are stored in schema order, one entry per
/// schema column, so lookups go through the schema's column index.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    values: Vec<FieldValue>,
}

impl CleanedRow {
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn get<'a>(&'a self, schema: &Schema, column: &str) -> Option<&'a FieldValue> {
        schema.index_of(column).and_then(|i| self.values.get(i))
    }

    /// Renders the row as a JSON object keyed by column name.
    pub fn to_json(&self, schema: &Schema) -> Value {
        let mut object = Map::new();
        for (spec, value) in schema.columns().iter().zip(&self.values) {
            let json = serde_json::to_value(value).unwrap_or(Value::Null);
            object.insert(spec.name.to_string(), json);
        }
        Value::Object(object)
    }
}

/// Output of cleaning one row: the row itself plus which columns degraded to
/// their empty marker, for auditing.
#[derive(Debug, Clone)]
pub struct CleanReport {
    pub row: CleanedRow,
    pub defaulted_columns: Vec<&'static str>,
}

/// Applies the per-type normalizer across every schema column of a raw row.
///
/// Pure and total: a row is never dropped. Invalid cells degrade to the empty
/// marker and are reported in `defaulted_columns`; absent columns are treated
/// as null input. Partial validity is deliberately preferred over row
/// rejection.
pub fn clean(raw: &RawRow, schema: &Schema) -> CleanReport {
    let mut values = Vec::with_capacity(schema.len());
    let mut defaulted_columns = Vec::new();
    for spec in schema.columns() {
        let outcome = normalize(spec.semantic_type, raw.get(spec.name));
        if outcome.defaulted {
            defaulted_columns.push(spec.name);
        }
        values.push(outcome.value);
    }
    CleanReport {
        row: CleanedRow { values },
        defaulted_columns,
    }
}

/// The cleaned record set together with the schema it satisfies. Owned by the
/// pipeline driver until handed to the load sink.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    pub rows: Vec<CleanedRow>,
}

impl Dataset {
    pub fn new(schema: Schema) -> Self {
        Self { schema, rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_json(&self) -> Value {
        Value::Array(self.rows.iter().map(|r| r.to_json(&self.schema)).collect())
    }
}
