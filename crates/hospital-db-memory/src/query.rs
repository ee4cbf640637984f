//! Statement evaluation over in-memory tables.
//!
//! Statements are still compiled first so that identifier validation and
//! the empty-SET / unguarded-DELETE rules behave exactly as they do against
//! PostgreSQL.

use std::cmp::Ordering;
use std::collections::HashMap;

use hospital_storage::query::unqualified;
use hospital_storage::{
    Delete, Filter, Insert, Row, Select, SqlValue, StorageError, StorageResult, Update,
};

/// One table: its rows plus the column sets that must stay unique.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    pub(crate) rows: Vec<Row>,
    pub(crate) unique_keys: Vec<Vec<String>>,
}

/// Everything a store or a transaction reads and writes.
#[derive(Debug, Clone, Default)]
pub(crate) struct State {
    pub(crate) tables: HashMap<String, Table>,
    pub(crate) failing_inserts: Vec<String>,
}

/// A joined tuple: `(lower-cased table name, row)` per joined table.
type Tuple<'a> = Vec<(String, &'a Row)>;

impl State {
    fn table(&self, name: &str) -> StorageResult<&Table> {
        self.tables
            .get(&name.to_ascii_lowercase())
            .ok_or_else(|| missing_relation(name))
    }

    fn table_mut(&mut self, name: &str) -> StorageResult<&mut Table> {
        self.tables
            .get_mut(&name.to_ascii_lowercase())
            .ok_or_else(|| missing_relation(name))
    }

    pub(crate) fn select(&self, query: &Select) -> StorageResult<Vec<Row>> {
        query.compile()?;

        let main = query.table().to_ascii_lowercase();
        let mut tuples: Vec<Tuple<'_>> = self
            .table(query.table())?
            .rows
            .iter()
            .map(|row| vec![(main.clone(), row)])
            .collect();

        for join in query.joins() {
            let joined_name = join.table.to_ascii_lowercase();
            let joined = self.table(&join.table)?;
            let mut next = Vec::new();
            for tuple in &tuples {
                for row in &joined.rows {
                    let mut candidate = tuple.clone();
                    candidate.push((joined_name.clone(), row));
                    if loose_eq(resolve(&candidate, &join.left), resolve(&candidate, &join.right)) {
                        next.push(candidate);
                    }
                }
            }
            tuples = next;
        }

        tuples.retain(|tuple| query.filters().iter().all(|f| matches(tuple, f)));

        if !query.ordering().is_empty() {
            tuples.sort_by(|a, b| {
                for key in query.ordering() {
                    let ordering = compare(resolve(a, &key.column), resolve(b, &key.column));
                    let ordering = if key.descending {
                        ordering.reverse()
                    } else {
                        ordering
                    };
                    if ordering != Ordering::Equal {
                        return ordering;
                    }
                }
                Ordering::Equal
            });
        }

        if let Some(limit) = query.row_limit() {
            tuples.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }

        Ok(tuples
            .iter()
            .map(|tuple| project(tuple, query.selected_columns()))
            .collect())
    }

    pub(crate) fn insert(&mut self, statement: &Insert) -> StorageResult<u64> {
        statement.compile()?;

        let name = statement.table().to_ascii_lowercase();
        if self.failing_inserts.contains(&name) {
            return Err(StorageError::query(format!(
                "insert into {} rejected by injected failure",
                statement.table()
            )));
        }

        let row: Row = statement
            .values()
            .iter()
            .map(|(column, value)| (column.clone(), value.clone()))
            .collect();

        let table = self.table_mut(statement.table())?;
        for key in &table.unique_keys {
            let duplicate = table.rows.iter().any(|existing| {
                key.iter()
                    .all(|column| loose_eq(existing.value(column), row.value(column)))
            });
            if duplicate {
                return Err(StorageError::unique_violation(format!(
                    "duplicate key value violates unique constraint \"{name}_{}_key\"",
                    key.join("_")
                )));
            }
        }

        table.rows.push(row);
        Ok(1)
    }

    pub(crate) fn update(&mut self, statement: &Update) -> StorageResult<u64> {
        statement.compile()?;

        let name = statement.target().to_ascii_lowercase();
        let table = self.table_mut(statement.target())?;
        let mut affected = 0;
        for row in &mut table.rows {
            let hit = {
                let tuple = vec![(name.clone(), &*row)];
                statement.filters().iter().all(|f| matches(&tuple, f))
            };
            if hit {
                for (column, value) in statement.values() {
                    row.insert(column, value.clone());
                }
                affected += 1;
            }
        }
        Ok(affected)
    }

    pub(crate) fn delete(&mut self, statement: &Delete) -> StorageResult<u64> {
        statement.compile()?;

        let name = statement.table().to_ascii_lowercase();
        let table = self.table_mut(statement.table())?;
        let before = table.rows.len();
        table.rows.retain(|row| {
            let tuple = vec![(name.clone(), row)];
            !statement.filters().iter().all(|f| matches(&tuple, f))
        });
        Ok((before - table.rows.len()) as u64)
    }
}

fn missing_relation(name: &str) -> StorageError {
    StorageError::query(format!("relation \"{name}\" does not exist"))
}

/// Looks a column up in a joined tuple. `table.column` addresses one table;
/// a bare name resolves to the first table that has it. Unknown columns
/// read as `NULL`.
fn resolve<'a>(tuple: &[(String, &'a Row)], column: &str) -> &'a SqlValue {
    const NULL: SqlValue = SqlValue::Null;

    if let Some((table, name)) = column.split_once('.') {
        let table = table.to_ascii_lowercase();
        return tuple
            .iter()
            .find(|(t, _)| *t == table)
            .and_then(|(_, row)| row.get(name))
            .unwrap_or(&NULL);
    }

    tuple
        .iter()
        .find_map(|(_, row)| row.get(column))
        .unwrap_or(&NULL)
}

fn matches(tuple: &[(String, &Row)], filter: &Filter) -> bool {
    let actual = resolve(tuple, filter.column());
    match filter {
        Filter::Eq { value, .. } => loose_eq(actual, value),
        Filter::OptionalEq { value, .. } => {
            value.is_empty() || loose_eq(actual, &SqlValue::Text(value.clone()))
        }
        Filter::OptionalContains { value, .. } => {
            value.is_empty()
                || (!actual.is_null()
                    && actual
                        .render_text()
                        .to_lowercase()
                        .contains(&value.to_lowercase()))
        }
    }
}

/// SQL-ish equality: `NULL` never matches, different variants compare by
/// their rendered text.
fn loose_eq(a: &SqlValue, b: &SqlValue) -> bool {
    match (a, b) {
        (SqlValue::Null, _) | (_, SqlValue::Null) => false,
        (SqlValue::Text(x), SqlValue::Text(y)) => x == y,
        (SqlValue::Integer(x), SqlValue::Integer(y)) => x == y,
        (SqlValue::Bool(x), SqlValue::Bool(y)) => x == y,
        (SqlValue::Date(x), SqlValue::Date(y)) => x == y,
        (SqlValue::Time(x), SqlValue::Time(y)) => x == y,
        (SqlValue::Timestamp(x), SqlValue::Timestamp(y)) => x == y,
        _ => a.render_text() == b.render_text(),
    }
}

/// Ordering with `NULL` sorting after every value, as PostgreSQL does for
/// ascending keys.
fn compare(a: &SqlValue, b: &SqlValue) -> Ordering {
    match (a, b) {
        (SqlValue::Null, SqlValue::Null) => Ordering::Equal,
        (SqlValue::Null, _) => Ordering::Greater,
        (_, SqlValue::Null) => Ordering::Less,
        (SqlValue::Integer(x), SqlValue::Integer(y)) => x.cmp(y),
        (SqlValue::Bool(x), SqlValue::Bool(y)) => x.cmp(y),
        (SqlValue::Date(x), SqlValue::Date(y)) => x.cmp(y),
        (SqlValue::Time(x), SqlValue::Time(y)) => x.cmp(y),
        (SqlValue::Timestamp(x), SqlValue::Timestamp(y)) => x.cmp(y),
        (SqlValue::Decimal(x), SqlValue::Decimal(y)) => {
            match (x.parse::<f64>(), y.parse::<f64>()) {
                (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => x.cmp(y),
            }
        }
        _ => a.render_text().cmp(&b.render_text()),
    }
}

/// Builds an output row named by unqualified column names. An empty select
/// list or `*` yields the main table's columns.
fn project(tuple: &[(String, &Row)], columns: &[String]) -> Row {
    let mut out = Row::new();
    let main = tuple.first().map(|(_, row)| *row);

    if columns.is_empty() {
        return main.cloned().unwrap_or_default();
    }

    for column in columns {
        if column == "*" {
            if let Some(row) = main {
                for (name, value) in row.iter() {
                    out.insert(name, value.clone());
                }
            }
        } else {
            out.insert(unqualified(column), resolve(tuple, column).clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hospital_storage::Join;

    fn state() -> State {
        let mut state = State::default();
        state.tables.insert(
            "employee".into(),
            Table {
                rows: vec![
                    Row::new()
                        .with("employee_id", "E1")
                        .with("first_name", "Ana")
                        .with("position_id", "P1"),
                    Row::new()
                        .with("employee_id", "E2")
                        .with("first_name", "Bob")
                        .with("position_id", "P2"),
                ],
                unique_keys: vec![vec!["employee_id".into()]],
            },
        );
        state.tables.insert(
            "position".into(),
            Table {
                rows: vec![
                    Row::new().with("position_id", "P1").with("position_name", "Nurse"),
                    Row::new().with("position_id", "P2").with("position_name", "Surgeon"),
                ],
                unique_keys: Vec::new(),
            },
        );
        state
    }

    #[test]
    fn join_filter_and_projection() {
        let rows = state()
            .select(
                &Select::from("Employee")
                    .columns(["Employee.employee_id", "Position.position_name"])
                    .join(Join::new("Position", "Employee.position_id", "Position.position_id"))
                    .filter(Filter::optional_contains("first_name", "BO"))
                    .order_by_desc("employee_id"),
            )
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value("employee_id"), &SqlValue::Text("E2".into()));
        assert_eq!(rows[0].value("position_name"), &SqlValue::Text("Surgeon".into()));
    }

    #[test]
    fn empty_optional_filters_match_everything() {
        let rows = state()
            .select(
                &Select::from("Employee")
                    .filter(Filter::optional_eq("employee_id", ""))
                    .filter(Filter::optional_contains("first_name", ""))
                    .order_by_desc("employee_id"),
            )
            .unwrap();
        let ids: Vec<String> = rows.iter().map(|r| r.value("employee_id").render_text()).collect();
        assert_eq!(ids, vec!["E2", "E1"]);
    }

    #[test]
    fn contains_treats_wildcards_as_text() {
        let mut state = state();
        state
            .insert(
                &Insert::into("Employee")
                    .value("employee_id", "E3")
                    .value("first_name", "Mary_Ann"),
            )
            .unwrap();

        let names = |needle: &str| -> Vec<String> {
            state
                .select(
                    &Select::from("Employee")
                        .filter(Filter::optional_contains("first_name", needle))
                        .order_by_desc("employee_id"),
                )
                .unwrap()
                .iter()
                .map(|r| r.value("first_name").render_text())
                .collect()
        };
        assert_eq!(names("_"), vec!["Mary_Ann"]);
        assert!(names("%").is_empty());
        assert_eq!(names("y_a"), vec!["Mary_Ann"]);
    }

    #[test]
    fn unique_key_rejects_duplicate() {
        let mut state = state();
        let err = state
            .insert(&Insert::into("Employee").value("employee_id", "E1"))
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[test]
    fn unknown_table_is_a_query_error() {
        let err = state().select(&Select::from("Ward")).unwrap_err();
        assert_eq!(err.to_string(), "Query error: relation \"Ward\" does not exist");
    }

    #[test]
    fn update_and_delete_count_rows() {
        let mut state = state();
        let changed = state
            .update(
                &Update::table("Employee")
                    .set("first_name", "Anna")
                    .filter(Filter::eq("employee_id", "E1")),
            )
            .unwrap();
        assert_eq!(changed, 1);

        let removed = state
            .delete(&Delete::from("Position").filter(Filter::eq("position_id", "P9")))
            .unwrap();
        assert_eq!(removed, 0);
    }
}
