//! Tagged values exchanged with record store backends.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date format used for every rendered date.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Time format used for every rendered time of day.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// A single column value or bound statement parameter.
///
/// Backends decode result columns into this type and bind statement
/// parameters from it, so the rest of the service never inspects
/// driver-specific types.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// SQL `NULL`.
    Null,
    /// Variable-length text.
    Text(String),
    /// Any integer column, widened to 64 bits.
    Integer(i64),
    /// Exact numeric column kept in its textual form (e.g. `"52000.00"`).
    Decimal(String),
    /// Boolean column.
    Bool(bool),
    /// Calendar date without time zone.
    Date(NaiveDate),
    /// Time of day without time zone.
    Time(NaiveTime),
    /// Date and time without time zone.
    Timestamp(NaiveDateTime),
    /// Raw bytes: enum labels, fixed-width `CHAR(n)` and `BYTEA` columns.
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Returns `true` for SQL `NULL`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short name of the variant, used in decode error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Decimal(_) => "decimal",
            Self::Bool(_) => "bool",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::Bytes(_) => "bytes",
        }
    }

    /// Borrowed text for `Text` and `Decimal` values.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Renders any value as text.
    ///
    /// Integers become their decimal string, dates `YYYY-MM-DD`, times
    /// `HH:MM:SS`, bytes are decoded as UTF-8 with fixed-width padding
    /// stripped, and `NULL` becomes the empty string.
    #[must_use]
    pub fn render_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Text(s) | Self::Decimal(s) => s.clone(),
            Self::Integer(i) => i.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Date(d) => d.format(DATE_FORMAT).to_string(),
            Self::Time(t) => t.format(TIME_FORMAT).to_string(),
            Self::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
            Self::Bytes(bytes) => String::from_utf8_lossy(bytes).trim_end().to_string(),
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.render_text()),
        }
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for SqlValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(value: NaiveDate) -> Self {
        Self::Date(value)
    }
}

impl From<NaiveTime> for SqlValue {
    fn from(value: NaiveTime) -> Self {
        Self::Time(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
