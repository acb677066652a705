use once_cell::sync::Lazy;

/// The validated target type a raw text column is normalized into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    /// A 4-digit integer field (the listing year).
    Integer,
    /// A numeric amount stored as text with a leading `$` marker.
    CurrencyAmount,
    /// A numeric ratio stored as text, no marker.
    DecimalRatio,
    /// Free-form text, passed through unchanged.
    FreeText,
}

/// A single expected column: its name and how its raw values are normalized.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub semantic_type: SemanticType,
}

impl ColumnSpec {
    pub const fn new(name: &'static str, semantic_type: SemanticType) -> Self {
        Self { name, semantic_type }
    }
}

/// Ordered column definition for a source file. The order matches the
/// expected header order of the source exactly; names are unique.
///
/// The schema is authoritative configuration: field naming never comes from
/// the file's physical header row (see the record parser).
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        debug_assert!(
            {
                let mut names: Vec<_> = columns.iter().map(|c| c.name).collect();
                names.sort_unstable();
                names.windows(2).all(|w| w[0] != w[1])
            },
            "schema column names must be unique"
        );
        Self { columns }
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Column layout of the Connecticut real estate sales extract. The file's
/// own header text is ignored; this list is what names and types the fields.
pub static REAL_ESTATE_SALES: Lazy<Schema> = Lazy::new(|| {
    use SemanticType::*;
    Schema::new(vec![
        ColumnSpec::new("Serial Number", FreeText),
        ColumnSpec::new("List Year", Integer),
        ColumnSpec::new("Date Recorded", FreeText),
        ColumnSpec::new("Town", FreeText),
        ColumnSpec::new("Address", FreeText),
        ColumnSpec::new("Assessed Value", FreeText),
        ColumnSpec::new("Sale Amount", CurrencyAmount),
        ColumnSpec::new("Sales Ratio", DecimalRatio),
        ColumnSpec::new("Property Type", FreeText),
        ColumnSpec::new("Residential Type", FreeText),
        ColumnSpec::new("Non Use Code", FreeText),
        ColumnSpec::new("Assessor Remarks", FreeText),
        ColumnSpec::new("OPM remarks", FreeText),
        ColumnSpec::new("Location", FreeText),
    ])
});
