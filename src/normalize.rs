use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::schema::SemanticType;

/// A cleaned cell value. Text columns always hold `Text`; the integer column
/// degrades to `Null` when the raw value is unusable.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
    Null,
}

impl FieldValue {
    pub fn empty_text() -> Self {
        FieldValue::Text(String::new())
    }
}

/// Result of normalizing one cell. `defaulted` distinguishes a cell that was
/// replaced by the empty marker from one that legitimately carried its value,
/// so callers can audit degraded cells separately.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    pub value: FieldValue,
    pub defaulted: bool,
}

impl CellOutcome {
    fn valid(value: FieldValue) -> Self {
        Self { value, defaulted: false }
    }

    fn defaulted(value: FieldValue) -> Self {
        Self { value, defaulted: true }
    }
}

static FOUR_DIGIT_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));

/// Dispatch to the normalizer for a column's semantic type. Total: invalid
/// input degrades to the type's empty marker, it never fails the row.
pub fn normalize(semantic_type: SemanticType, raw: Option<&str>) -> CellOutcome {
    match semantic_type {
        SemanticType::Integer => normalize_integer(raw),
        SemanticType::CurrencyAmount => normalize_currency(raw),
        SemanticType::DecimalRatio => normalize_ratio(raw),
        SemanticType::FreeText => normalize_free_text(raw),
    }
}

/// Strips `,` thousands separators and accepts exactly 4-digit years.
/// Anything else becomes `Null`.
pub fn normalize_integer(raw: Option<&str>) -> CellOutcome {
    let Some(raw) = raw else {
        return CellOutcome::defaulted(FieldValue::Null);
    };
    let cleaned = raw.replace(',', "");
    if !FOUR_DIGIT_YEAR.is_match(&cleaned) {
        return CellOutcome::defaulted(FieldValue::Null);
    }
    match cleaned.parse::<i64>() {
        Ok(year) => CellOutcome::valid(FieldValue::Int(year)),
        Err(_) => CellOutcome::defaulted(FieldValue::Null),
    }
}

/// Numeric-shaped amounts get a `$` prefix; everything else becomes the
/// empty string.
///
/// The prefix is applied to the raw text as-is, so this is a single-pass
/// contract: an already-prefixed value is no longer numeric-shaped and
/// degrades to empty if normalized again.
pub fn normalize_currency(raw: Option<&str>) -> CellOutcome {
    match raw {
        Some(s) if numeric_shaped(s) => CellOutcome::valid(FieldValue::Text(format!("${s}"))),
        _ => CellOutcome::defaulted(FieldValue::empty_text()),
    }
}

/// Numeric-shaped ratios pass through unchanged; everything else becomes the
/// empty string. Idempotent on numeric-shaped input.
pub fn normalize_ratio(raw: Option<&str>) -> CellOutcome {
    match raw {
        Some(s) if numeric_shaped(s) => CellOutcome::valid(FieldValue::Text(s.to_string())),
        _ => CellOutcome::defaulted(FieldValue::empty_text()),
    }
}

/// Missing values become the empty string; present values pass through with
/// no escaping or sanitization.
pub fn normalize_free_text(raw: Option<&str>) -> CellOutcome {
    match raw {
        Some(s) => CellOutcome::valid(FieldValue::Text(s.to_string())),
        None => CellOutcome::defaulted(FieldValue::empty_text()),
    }
}

/// A string is numeric-shaped if, after removing at most one decimal point,
/// all remaining characters are decimal digits (and there is at least one).
fn numeric_shaped(raw: &str) -> bool {
    let cleaned = raw.replacen('.', "", 1);
    !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_strips_thousands_separators() {
        assert_eq!(
            normalize_integer(Some("2,020")),
            CellOutcome::valid(FieldValue::Int(2020))
        );
        assert_eq!(
            normalize_integer(Some("1999")),
            CellOutcome::valid(FieldValue::Int(1999))
        );
    }

    #[test]
    fn integer_rejects_wrong_lengths_and_garbage() {
        for raw in ["20", "20200", "19x9", "none", "", "20.20"] {
            let outcome = normalize_integer(Some(raw));
            assert_eq!(outcome.value, FieldValue::Null, "raw={raw:?}");
            assert!(outcome.defaulted, "raw={raw:?}");
        }
        assert_eq!(normalize_integer(None).value, FieldValue::Null);
    }

    #[test]
    fn currency_prefixes_numeric_shaped_amounts() {
        assert_eq!(
            normalize_currency(Some("150000.50")).value,
            FieldValue::Text("$150000.50".to_string())
        );
        assert_eq!(
            normalize_currency(Some("100000")).value,
            FieldValue::Text("$100000".to_string())
        );
    }

    #[test]
    fn currency_degrades_non_numeric_to_empty() {
        for raw in ["N/A", "1.2.3", "-5", "12a", ""] {
            let outcome = normalize_currency(Some(raw));
            assert_eq!(outcome.value, FieldValue::empty_text(), "raw={raw:?}");
            assert!(outcome.defaulted, "raw={raw:?}");
        }
        assert!(normalize_currency(None).defaulted);
    }

    #[test]
    fn currency_is_single_pass_only() {
        // Re-normalizing an already-cleaned value loses it: "$100" is not
        // numeric-shaped.
        let first = normalize_currency(Some("100"));
        assert_eq!(first.value, FieldValue::Text("$100".to_string()));
        let again = normalize_currency(Some("$100"));
        assert_eq!(again.value, FieldValue::empty_text());
        assert!(again.defaulted);
    }

    #[test]
    fn ratio_passes_numeric_shaped_through_unchanged() {
        assert_eq!(
            normalize_ratio(Some("1.5")).value,
            FieldValue::Text("1.5".to_string())
        );
        assert_eq!(
            normalize_ratio(Some("0.8812")).value,
            FieldValue::Text("0.8812".to_string())
        );
        assert!(normalize_ratio(Some("n/a")).defaulted);
    }

    #[test]
    fn ratio_is_idempotent_on_numeric_shaped_input() {
        for raw in ["1.5", "42", "0.001"] {
            let once = normalize_ratio(Some(raw));
            let FieldValue::Text(ref text) = once.value else {
                panic!("ratio should normalize to text");
            };
            let twice = normalize_ratio(Some(text));
            assert_eq!(once.value, twice.value, "raw={raw:?}");
        }
    }

    #[test]
    fn free_text_defaults_only_when_absent() {
        assert_eq!(
            normalize_free_text(Some("Hartford")).value,
            FieldValue::Text("Hartford".to_string())
        );
        // A present empty string is legitimate input, not a defaulted cell.
        let present_empty = normalize_free_text(Some(""));
        assert_eq!(present_empty.value, FieldValue::empty_text());
        assert!(!present_empty.defaulted);

        let absent = normalize_free_text(None);
        assert_eq!(absent.value, FieldValue::empty_text());
        assert!(absent.defaulted);
    }

    #[test]
    fn numeric_shape_allows_at_most_one_decimal_point() {
        assert!(numeric_shaped("123"));
        assert!(numeric_shaped("123.45"));
        assert!(numeric_shaped("1."));
        assert!(!numeric_shaped("1.2.3"));
        assert!(!numeric_shaped("."));
        assert!(!numeric_shaped(""));
        assert!(!numeric_shaped("$12"));
    }
}
