//! Result rows.

use indexmap::IndexMap;

use crate::value::SqlValue;

/// One result row: column name to value, in select-list order.
///
/// Column names are stored lower-cased because SQL folds unquoted
/// identifiers, so `row.get("First_Name")` and `row.get("first_name")`
/// address the same column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: IndexMap<String, SqlValue>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style column insertion.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<SqlValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Sets a column, replacing any previous value.
    pub fn insert(&mut self, column: &str, value: impl Into<SqlValue>) {
        self.columns.insert(column.to_ascii_lowercase(), value.into());
    }

    /// Returns the value of a column, if the row has it.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns.get(&column.to_ascii_lowercase())
    }

    /// Returns the value of a column, treating a missing column as `NULL`.
    #[must_use]
    pub fn value(&self, column: &str) -> &SqlValue {
        const NULL: SqlValue = SqlValue::Null;
        self.get(column).unwrap_or(&NULL)
    }

    /// Returns `true` if the row has the column (even when it is `NULL`).
    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(&column.to_ascii_lowercase())
    }

    /// Iterates over `(column, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(&column, value);
        }
        row
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_case_insensitive() {
        let row = Row::new().with("First_Name", "Jane").with("age", 34_i64);

        assert_eq!(row.get("first_name"), Some(&SqlValue::Text("Jane".into())));
        assert_eq!(row.get("FIRST_NAME"), Some(&SqlValue::Text("Jane".into())));
        assert_eq!(row.value("age"), &SqlValue::Integer(34));
    }

    #[test]
    fn missing_column_reads_as_null() {
        let row = Row::new().with("patient_id", "P1");
        assert!(row.get("email").is_none());
        assert!(row.value("email").is_null());
        assert!(!row.contains("email"));
    }

    #[test]
    fn preserves_insertion_order() {
        let row = Row::new().with("b", 1_i64).with("a", 2_i64);
        let names: Vec<&str> = row.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
    }
}
