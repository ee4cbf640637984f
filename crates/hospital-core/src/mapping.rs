//! Row-to-record coercion.
//!
//! Each target field type has exactly one coercion function on
//! [`RowReader`]. Structural mismatches (a text value where a date is
//! required) fail with [`StorageError::Decode`]. Unparsable decimals do not
//! fail: they become `0` and leave a [`DecodeWarning`] behind.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use hospital_storage::{DATE_FORMAT, Row, SqlValue, StorageError, StorageResult, TIME_FORMAT};

use crate::error::{ServiceError, ServiceResult};

/// Rendered in place of a missing or zero resignation date.
pub const NOT_RESIGNED: &str = "Not resigned yet";

/// A value that could not be decoded and was replaced by a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeWarning {
    /// Column the value came from.
    pub column: String,
    /// The offending value as text.
    pub value: String,
    /// What went wrong.
    pub message: String,
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: '{}' {}", self.column, self.value, self.message)
    }
}

/// Reads typed fields out of one result row, collecting decode warnings.
#[derive(Debug)]
pub struct RowReader<'r> {
    row: &'r Row,
    warnings: Vec<DecodeWarning>,
}

impl<'r> RowReader<'r> {
    /// Starts reading `row`.
    #[must_use]
    pub fn new(row: &'r Row) -> Self {
        Self {
            row,
            warnings: Vec::new(),
        }
    }

    /// Any column rendered as text; `NULL` and missing columns are empty.
    #[must_use]
    pub fn text(&self, column: &str) -> String {
        self.row.value(column).render_text()
    }

    /// Integer column. `NULL` reads as 0; integral text is accepted.
    pub fn integer(&self, column: &str) -> StorageResult<i64> {
        match self.row.value(column) {
            SqlValue::Null => Ok(0),
            SqlValue::Integer(i) => Ok(*i),
            other @ (SqlValue::Text(_) | SqlValue::Decimal(_) | SqlValue::Bytes(_)) => {
                let text = other.render_text();
                text.trim()
                    .parse::<i64>()
                    .map_err(|_| StorageError::decode(column, format!("'{text}' is not an integer")))
            }
            other => Err(mismatch(column, "an integer", other)),
        }
    }

    /// Required date formatted `YYYY-MM-DD`. Timestamps contribute their
    /// date part.
    pub fn date(&self, column: &str) -> StorageResult<String> {
        match self.row.value(column) {
            SqlValue::Date(d) => Ok(d.format(DATE_FORMAT).to_string()),
            SqlValue::Timestamp(ts) => Ok(ts.date().format(DATE_FORMAT).to_string()),
            other => Err(mismatch(column, "a date", other)),
        }
    }

    /// Nullable date: `NULL`, a missing column or the zero date
    /// 0001-01-01 read as `None`.
    pub fn optional_date(&self, column: &str) -> StorageResult<Option<String>> {
        let date = match self.row.value(column) {
            SqlValue::Null => return Ok(None),
            SqlValue::Date(d) => *d,
            SqlValue::Timestamp(ts) => ts.date(),
            other => return Err(mismatch(column, "a date", other)),
        };
        if is_zero_date(date) {
            Ok(None)
        } else {
            Ok(Some(date.format(DATE_FORMAT).to_string()))
        }
    }

    /// Required time of day formatted `HH:MM:SS`. Timestamps contribute
    /// their time part.
    pub fn time(&self, column: &str) -> StorageResult<String> {
        match self.row.value(column) {
            SqlValue::Time(t) => Ok(t.format(TIME_FORMAT).to_string()),
            SqlValue::Timestamp(ts) => Ok(ts.time().format(TIME_FORMAT).to_string()),
            other => Err(mismatch(column, "a time", other)),
        }
    }

    /// Decimal column as `f64`. Anything that does not parse becomes `0`
    /// and records a warning.
    pub fn decimal(&mut self, column: &str) -> f64 {
        let row = self.row;
        let value = row.value(column);
        let parsed = match value {
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Decimal(s) | SqlValue::Text(s) => s.trim().parse::<f64>().ok(),
            SqlValue::Bytes(_) => value.render_text().trim().parse::<f64>().ok(),
            _ => None,
        }
        .filter(|f| f.is_finite());

        parsed.unwrap_or_else(|| {
            let warning = DecodeWarning {
                column: column.to_string(),
                value: value.render_text(),
                message: "is not a decimal, using 0".to_string(),
            };
            tracing::warn!(
                column = %warning.column,
                value = %warning.value,
                "failed to parse decimal column"
            );
            self.warnings.push(warning);
            0.0
        })
    }

    /// Warnings recorded so far.
    #[must_use]
    pub fn warnings(&self) -> &[DecodeWarning] {
        &self.warnings
    }

    /// Consumes the reader, returning its warnings.
    #[must_use]
    pub fn into_warnings(self) -> Vec<DecodeWarning> {
        self.warnings
    }
}

/// Renders a resignation date, substituting [`NOT_RESIGNED`] when absent.
#[must_use]
pub fn resignation_text(date: Option<String>) -> String {
    date.unwrap_or_else(|| NOT_RESIGNED.to_string())
}

fn is_zero_date(date: NaiveDate) -> bool {
    NaiveDate::from_ymd_opt(1, 1, 1) == Some(date)
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> StorageError {
    StorageError::decode(
        column,
        format!("expected {expected}, found {}", found.type_name()),
    )
}

// =============================================================================
// Input coercion
// =============================================================================

/// Parses a submitted `YYYY-MM-DD` date, the same form dates are read back in.
pub fn parse_date(field: &str, value: &str) -> ServiceResult<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ServiceError::validation(format!("{field} '{value}' is not a valid date")))
}

/// Parses a submitted time of day. Accepts `HH:MM:SS` and `HH:MM`.
pub fn parse_time(field: &str, value: &str) -> ServiceResult<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|_| ServiceError::validation(format!("{field} '{value}' is not a valid time")))
}

/// Fails with `Validation` when `value` is blank.
pub fn require(field: &str, value: &str) -> ServiceResult<()> {
    if value.trim().is_empty() {
        Err(ServiceError::validation(format!("missing {field}")))
    } else {
        Ok(())
    }
}

/// A usable link id: not blank and not the literal `undefined` or `null`.
#[must_use]
pub fn is_valid_link_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && !id.eq_ignore_ascii_case("undefined") && !id.eq_ignore_ascii_case("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn resignation_sentinels_read_as_not_resigned() {
        let row = Row::new()
            .with("zero", date(1, 1, 1))
            .with("null", SqlValue::Null)
            .with("real", date(2023, 6, 30));
        let reader = RowReader::new(&row);

        assert_eq!(resignation_text(reader.optional_date("zero").unwrap()), NOT_RESIGNED);
        assert_eq!(resignation_text(reader.optional_date("null").unwrap()), NOT_RESIGNED);
        assert_eq!(resignation_text(reader.optional_date("missing").unwrap()), NOT_RESIGNED);
        assert_eq!(resignation_text(reader.optional_date("real").unwrap()), "2023-06-30");
    }

    #[test]
    fn zero_timestamp_is_also_a_sentinel() {
        let row = Row::new().with("d", date(1, 1, 1).and_hms_opt(0, 0, 0).unwrap());
        assert_eq!(RowReader::new(&row).optional_date("d").unwrap(), None);
    }

    #[test]
    fn decimal_parses_or_warns() {
        let row = Row::new()
            .with("good", SqlValue::Decimal("52000.00".into()))
            .with("bytes", SqlValue::Bytes(b"1250.5".to_vec()))
            .with("bad", SqlValue::Decimal("n/a".into()));
        let mut reader = RowReader::new(&row);

        assert_eq!(reader.decimal("good"), 52000.0);
        assert_eq!(reader.decimal("bytes"), 1250.5);
        assert!(reader.warnings().is_empty());

        assert_eq!(reader.decimal("bad"), 0.0);
        let warnings = reader.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].column, "bad");
        assert_eq!(warnings[0].value, "n/a");
    }

    #[test]
    fn non_finite_decimals_fall_back_to_zero() {
        let row = Row::new()
            .with("nan", SqlValue::Text("NaN".into()))
            .with("inf", SqlValue::Text("-Infinity".into()));
        let mut reader = RowReader::new(&row);

        assert_eq!(reader.decimal("nan"), 0.0);
        assert_eq!(reader.decimal("inf"), 0.0);
        let warnings = reader.into_warnings();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].value, "NaN");
    }

    #[test]
    fn text_renders_every_variant() {
        let row = Row::new()
            .with("id", 42_i64)
            .with("gender", SqlValue::Bytes(b"F".to_vec()))
            .with("blood", SqlValue::Bytes(b"AB ".to_vec()));
        let reader = RowReader::new(&row);

        assert_eq!(reader.text("id"), "42");
        assert_eq!(reader.text("gender"), "F");
        assert_eq!(reader.text("blood"), "AB");
        assert_eq!(reader.text("missing"), "");
    }

    #[test]
    fn dates_and_times_format_fixed_width() {
        let row = Row::new()
            .with("date", date(2024, 3, 9))
            .with("time", NaiveTime::from_hms_opt(8, 5, 0).unwrap())
            .with("stamp", date(2024, 3, 9).and_hms_opt(14, 30, 15).unwrap());
        let reader = RowReader::new(&row);

        assert_eq!(reader.date("date").unwrap(), "2024-03-09");
        assert_eq!(reader.time("time").unwrap(), "08:05:00");
        assert_eq!(reader.date("stamp").unwrap(), "2024-03-09");
        assert_eq!(reader.time("stamp").unwrap(), "14:30:15");
    }

    #[test]
    fn structural_mismatch_is_decode_error() {
        let row = Row::new().with("hire_date", "yesterday").with("age", true);
        let reader = RowReader::new(&row);

        assert!(reader.date("hire_date").unwrap_err().is_decode());
        assert!(reader.integer("age").unwrap_err().is_decode());
    }

    #[test]
    fn input_dates_are_iso_only() {
        assert_eq!(parse_date("date_of_birth", "1990-05-01").unwrap(), date(1990, 5, 1));
        assert!(parse_date("date_of_birth", "01-05-1990").unwrap_err().is_validation());
        assert!(parse_date("date_of_birth", "May 1st").unwrap_err().is_validation());
        assert_eq!(
            parse_time("time", "09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
    }

    #[test]
    fn link_id_filter() {
        assert!(is_valid_link_id("D1"));
        assert!(!is_valid_link_id("   "));
        assert!(!is_valid_link_id("undefined"));
        assert!(!is_valid_link_id(" NULL "));
    }
}
