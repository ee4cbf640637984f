//! Typed statement descriptions and their compilation to parameterized SQL.
//!
//! Every statement compiles to a [`CompiledQuery`]: SQL text with `$1`, `$2`,
//! ... placeholders plus the values to bind, in placeholder order. Caller
//! input only ever reaches the database as a bound parameter; table and
//! column names are checked to be plain identifiers.
//!
//! The optional-filter convention is kept verbatim: an optional predicate
//! compiles to `($n = '' OR <predicate on $n>)`, so binding the empty string
//! disables that filter.

use std::collections::BTreeMap;

use crate::error::StorageError;
use crate::value::SqlValue;
use crate::StorageResult;

/// A statement compiled to SQL text and positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text using `$n` placeholders.
    pub sql: String,
    /// Values bound to `$1..$n`, in order.
    pub params: Vec<SqlValue>,
}

// =============================================================================
// Filters, joins, ordering
// =============================================================================

/// A single WHERE predicate. Multiple filters are joined with `AND`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = $n`
    Eq {
        /// Column, optionally qualified as `table.column`.
        column: String,
        /// Value to compare against.
        value: SqlValue,
    },
    /// `($n = '' OR column = $n)`: exact match unless the value is empty.
    OptionalEq {
        /// Column, optionally qualified as `table.column`.
        column: String,
        /// Value to compare against; empty disables the filter.
        value: String,
    },
    /// `($n = '' OR column ILIKE '%' || $n || '%' ESCAPE '\')`:
    /// case-insensitive literal substring match unless the value is empty.
    /// `%`, `_` and `\` in the value are escaped when bound.
    OptionalContains {
        /// Column, optionally qualified as `table.column`.
        column: String,
        /// Substring to look for; empty disables the filter.
        value: String,
    },
}

impl Filter {
    /// Creates an equality filter.
    #[must_use]
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Creates an optional equality filter.
    #[must_use]
    pub fn optional_eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::OptionalEq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Creates an optional case-insensitive substring filter.
    #[must_use]
    pub fn optional_contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::OptionalContains {
            column: column.into(),
            value: value.into(),
        }
    }

    /// The column this filter tests.
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. }
            | Self::OptionalEq { column, .. }
            | Self::OptionalContains { column, .. } => column,
        }
    }

    /// The parameter this filter binds.
    #[must_use]
    pub fn param(&self) -> SqlValue {
        match self {
            Self::Eq { value, .. } => value.clone(),
            Self::OptionalEq { value, .. } => SqlValue::Text(value.clone()),
            Self::OptionalContains { value, .. } => SqlValue::Text(escape_like(value)),
        }
    }

    fn to_sql(&self, placeholder: usize) -> String {
        let column = self.column();
        match self {
            Self::Eq { .. } => format!("{column} = ${placeholder}"),
            Self::OptionalEq { .. } => {
                format!("(${placeholder} = '' OR {column} = ${placeholder})")
            }
            Self::OptionalContains { .. } => format!(
                "(${placeholder} = '' OR {column} ILIKE '%' || ${placeholder} || '%' ESCAPE '\\')"
            ),
        }
    }
}

/// Escapes the `LIKE` wildcards so the value matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// An inner join: `JOIN table ON left = right`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Table being joined.
    pub table: String,
    /// Left side of the join condition, usually `main_table.column`.
    pub left: String,
    /// Right side of the join condition, usually `table.column`.
    pub right: String,
}

impl Join {
    /// Creates a join on `left = right`.
    #[must_use]
    pub fn new(table: impl Into<String>, left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            left: left.into(),
            right: right.into(),
        }
    }
}

/// One `ORDER BY` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Column to sort by.
    pub column: String,
    /// Sort descending when `true`.
    pub descending: bool,
}

// =============================================================================
// SELECT
// =============================================================================

/// A SELECT statement over one table with optional joins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Select {
    table: String,
    columns: Vec<String>,
    joins: Vec<Join>,
    filters: Vec<Filter>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
}

impl Select {
    /// Starts a SELECT from `table`. Without explicit columns it selects `*`.
    #[must_use]
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Replaces the select list.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a join. Joins compile in the order they are added.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Adds an ascending sort key.
    #[must_use]
    pub fn order_by_asc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            descending: false,
        });
        self
    }

    /// Adds a descending sort key.
    #[must_use]
    pub fn order_by_desc(mut self, column: impl Into<String>) -> Self {
        self.order_by.push(OrderBy {
            column: column.into(),
            descending: true,
        });
        self
    }

    /// Limits the number of returned rows.
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Main table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Select list; empty means `*`.
    #[must_use]
    pub fn selected_columns(&self) -> &[String] {
        &self.columns
    }

    /// Joins in declaration order.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// WHERE predicates.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Sort keys.
    #[must_use]
    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Row limit, if any.
    #[must_use]
    pub fn row_limit(&self) -> Option<u64> {
        self.limit
    }

    /// Compiles the statement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` if any table or column name is
    /// not a plain identifier.
    pub fn compile(&self) -> StorageResult<CompiledQuery> {
        check_identifier(&self.table, false)?;

        let select_list = if self.columns.is_empty() {
            "*".to_string()
        } else {
            for column in &self.columns {
                if column != "*" {
                    check_identifier(column, true)?;
                }
            }
            self.columns.join(", ")
        };

        let mut sql = format!("SELECT {select_list} FROM {}", self.table);

        for join in &self.joins {
            check_identifier(&join.table, false)?;
            check_identifier(&join.left, true)?;
            check_identifier(&join.right, true)?;
            sql.push_str(&format!(
                " JOIN {} ON {} = {}",
                join.table, join.left, join.right
            ));
        }

        let mut params = Vec::with_capacity(self.filters.len());
        push_where(&mut sql, &mut params, &self.filters)?;

        if !self.order_by.is_empty() {
            let mut keys = Vec::with_capacity(self.order_by.len());
            for key in &self.order_by {
                check_identifier(&key.column, true)?;
                let direction = if key.descending { "DESC" } else { "ASC" };
                keys.push(format!("{} {direction}", key.column));
            }
            sql.push_str(" ORDER BY ");
            sql.push_str(&keys.join(", "));
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok(CompiledQuery { sql, params })
    }
}

// =============================================================================
// INSERT / UPDATE / DELETE
// =============================================================================

/// An INSERT of a single row.
///
/// Values are kept sorted by column name, so the compiled statement does not
/// depend on the order in which they were supplied.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Insert {
    table: String,
    values: BTreeMap<String, SqlValue>,
}

impl Insert {
    /// Starts an INSERT into `table`.
    #[must_use]
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            values: BTreeMap::new(),
        }
    }

    /// Sets one column value.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Column values, sorted by column name.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, SqlValue> {
        &self.values
    }

    /// Compiles the statement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` for an empty column list or a
    /// bad identifier.
    pub fn compile(&self) -> StorageResult<CompiledQuery> {
        check_identifier(&self.table, false)?;
        if self.values.is_empty() {
            return Err(StorageError::invalid_query(format!(
                "INSERT into {} has no columns",
                self.table
            )));
        }

        let mut columns = Vec::with_capacity(self.values.len());
        let mut placeholders = Vec::with_capacity(self.values.len());
        let mut params = Vec::with_capacity(self.values.len());
        for (column, value) in &self.values {
            check_identifier(column, false)?;
            columns.push(column.as_str());
            placeholders.push(placeholder(&mut params, value));
        }

        Ok(CompiledQuery {
            sql: format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            ),
            params,
        })
    }
}

/// An UPDATE of the rows matching its filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    table: String,
    values: BTreeMap<String, SqlValue>,
    filters: Vec<Filter>,
}

impl Update {
    /// Starts an UPDATE of `table`.
    #[must_use]
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Sets one column value.
    #[must_use]
    pub fn set(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Target table.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.table
    }

    /// Column values, sorted by column name.
    #[must_use]
    pub fn values(&self) -> &BTreeMap<String, SqlValue> {
        &self.values
    }

    /// WHERE predicates.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns `true` when no column would be written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compiles the statement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` when there is nothing to set,
    /// when there is no WHERE predicate, or for a bad identifier.
    pub fn compile(&self) -> StorageResult<CompiledQuery> {
        check_identifier(&self.table, false)?;
        if self.values.is_empty() {
            return Err(StorageError::invalid_query(format!(
                "UPDATE of {} has no columns to set",
                self.table
            )));
        }
        if self.filters.is_empty() {
            return Err(StorageError::invalid_query(format!(
                "UPDATE of {} requires a WHERE predicate",
                self.table
            )));
        }

        let mut assignments = Vec::with_capacity(self.values.len());
        let mut params = Vec::with_capacity(self.values.len() + self.filters.len());
        for (column, value) in &self.values {
            check_identifier(column, false)?;
            assignments.push(format!("{column} = {}", placeholder(&mut params, value)));
        }

        let mut sql = format!("UPDATE {} SET {}", self.table, assignments.join(", "));
        push_where(&mut sql, &mut params, &self.filters)?;

        Ok(CompiledQuery { sql, params })
    }
}

/// A DELETE of the rows matching its filters.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Delete {
    table: String,
    filters: Vec<Filter>,
}

impl Delete {
    /// Starts a DELETE from `table`.
    #[must_use]
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filters: Vec::new(),
        }
    }

    /// Adds a WHERE predicate.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// WHERE predicates.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Compiles the statement.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` without a WHERE predicate or for
    /// a bad identifier.
    pub fn compile(&self) -> StorageResult<CompiledQuery> {
        check_identifier(&self.table, false)?;
        if self.filters.is_empty() {
            return Err(StorageError::invalid_query(format!(
                "DELETE from {} requires a WHERE predicate",
                self.table
            )));
        }

        let mut sql = format!("DELETE FROM {}", self.table);
        let mut params = Vec::with_capacity(self.filters.len());
        push_where(&mut sql, &mut params, &self.filters)?;

        Ok(CompiledQuery { sql, params })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Binds `value` as the next parameter and returns its placeholder.
///
/// `NULL` is written as a literal instead: an untyped NULL parameter would
/// otherwise be sent as text and rejected by non-text columns.
fn placeholder(params: &mut Vec<SqlValue>, value: &SqlValue) -> String {
    if value.is_null() {
        return "NULL".to_string();
    }
    params.push(value.clone());
    format!("${}", params.len())
}

/// Appends ` WHERE a AND b ...`, numbering placeholders after `params`.
fn push_where(sql: &mut String, params: &mut Vec<SqlValue>, filters: &[Filter]) -> StorageResult<()> {
    if filters.is_empty() {
        return Ok(());
    }

    let mut predicates = Vec::with_capacity(filters.len());
    for filter in filters {
        check_identifier(filter.column(), true)?;
        params.push(filter.param());
        predicates.push(filter.to_sql(params.len()));
    }
    sql.push_str(" WHERE ");
    sql.push_str(&predicates.join(" AND "));
    Ok(())
}

/// Accepts `name` or, when `qualified` is allowed, `table.name`, where each
/// part is `[A-Za-z_][A-Za-z0-9_]*`.
fn check_identifier(name: &str, qualified: bool) -> StorageResult<()> {
    let mut parts = name.split('.');
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let ok = match (parts.next(), parts.next(), parts.next()) {
        (Some(single), None, _) => valid_part(single),
        (Some(table), Some(column), None) if qualified => valid_part(table) && valid_part(column),
        _ => false,
    };

    if ok {
        Ok(())
    } else {
        Err(StorageError::invalid_query(format!(
            "'{name}' is not a valid identifier"
        )))
    }
}

/// Unqualified part of a possibly `table.column` name.
#[must_use]
pub fn unqualified(column: &str) -> &str {
    column.rsplit('.').next().unwrap_or(column)
}
