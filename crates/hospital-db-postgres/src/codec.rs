//! Conversion between `SqlValue` and PostgreSQL wire values.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use hospital_storage::{Row, SqlValue, StorageError, StorageResult};
use sqlx_core::column::Column;
use sqlx_core::decode::Decode;
use sqlx_core::query::Query;
use sqlx_core::row::Row as _;
use sqlx_core::type_info::TypeInfo;
use sqlx_core::value::ValueRef;
use sqlx_postgres::{PgArguments, PgRow, PgValueFormat, PgValueRef, Postgres};

pub(crate) type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Binds parameters in placeholder order.
pub(crate) fn bind_params<'q>(
    mut query: PgQuery<'q>,
    params: &[SqlValue],
) -> StorageResult<PgQuery<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s.clone()),
            SqlValue::Integer(i) => query.bind(*i),
            SqlValue::Decimal(s) => {
                let decimal = BigDecimal::from_str(s).map_err(|e| {
                    StorageError::invalid_query(format!("'{s}' is not a decimal: {e}"))
                })?;
                query.bind(decimal)
            }
            SqlValue::Bool(b) => query.bind(*b),
            SqlValue::Date(d) => query.bind(*d),
            SqlValue::Time(t) => query.bind(*t),
            SqlValue::Timestamp(ts) => query.bind(*ts),
            SqlValue::Bytes(bytes) => query.bind(bytes.clone()),
        };
    }
    Ok(query)
}

/// Decodes every column of a result row.
pub(crate) fn decode_row(row: &PgRow) -> StorageResult<Row> {
    let mut out = Row::new();
    for (index, column) in row.columns().iter().enumerate() {
        let raw = row
            .try_get_raw(index)
            .map_err(|e| StorageError::decode(column.name(), e.to_string()))?;
        out.insert(column.name(), decode_value(column.name(), raw)?);
    }
    Ok(out)
}

fn decode_value(column: &str, raw: PgValueRef<'_>) -> StorageResult<SqlValue> {
    if raw.is_null() {
        return Ok(SqlValue::Null);
    }

    let type_name = raw.type_info().name().to_string();
    let value = match type_name.as_str() {
        "TEXT" | "VARCHAR" | "NAME" => SqlValue::Text(decode::<String>(column, raw)?),
        "INT2" => SqlValue::Integer(i64::from(decode::<i16>(column, raw)?)),
        "INT4" => SqlValue::Integer(i64::from(decode::<i32>(column, raw)?)),
        "INT8" => SqlValue::Integer(decode::<i64>(column, raw)?),
        "NUMERIC" => decode_numeric(column, raw)?,
        "FLOAT4" => SqlValue::Decimal(decode::<f32>(column, raw)?.to_string()),
        "FLOAT8" => SqlValue::Decimal(decode::<f64>(column, raw)?.to_string()),
        "BOOL" => SqlValue::Bool(decode::<bool>(column, raw)?),
        "DATE" => SqlValue::Date(decode::<NaiveDate>(column, raw)?),
        "TIME" => SqlValue::Time(decode::<NaiveTime>(column, raw)?),
        "TIMESTAMP" => SqlValue::Timestamp(decode::<NaiveDateTime>(column, raw)?),
        "TIMESTAMPTZ" => SqlValue::Timestamp(decode::<DateTime<Utc>>(column, raw)?.naive_utc()),
        "BYTEA" => SqlValue::Bytes(decode::<Vec<u8>>(column, raw)?),
        // CHAR(n), enum labels and anything else arrive as their raw text.
        _ => SqlValue::Bytes(
            raw.as_bytes()
                .map_err(|e| StorageError::decode(column, e.to_string()))?
                .to_vec(),
        ),
    };
    Ok(value)
}

/// `NaN` and the infinities have no `BigDecimal` form. They come back as
/// text so the row mapper can apply its own fallback.
fn decode_numeric(column: &str, raw: PgValueRef<'_>) -> StorageResult<SqlValue> {
    let format = raw.format();
    match BigDecimal::decode(raw.clone()) {
        Ok(decimal) => Ok(SqlValue::Decimal(decimal.to_string())),
        Err(err) => {
            let special = match format {
                PgValueFormat::Text => raw.as_str().ok().map(str::to_string),
                PgValueFormat::Binary => raw
                    .as_bytes()
                    .ok()
                    .and_then(special_numeric)
                    .map(str::to_string),
            };
            match special {
                Some(text) => {
                    tracing::debug!(column, value = %text, "non-finite NUMERIC kept as text");
                    Ok(SqlValue::Text(text))
                }
                None => Err(StorageError::decode(column, err.to_string())),
            }
        }
    }
}

/// Names the special value of a binary NUMERIC, read from its sign word.
fn special_numeric(bytes: &[u8]) -> Option<&'static str> {
    let sign = u16::from_be_bytes([*bytes.get(4)?, *bytes.get(5)?]);
    match sign {
        0xC000 => Some("NaN"),
        0xD000 => Some("Infinity"),
        0xF000 => Some("-Infinity"),
        _ => None,
    }
}

fn decode<'r, T: Decode<'r, Postgres>>(column: &str, raw: PgValueRef<'r>) -> StorageResult<T> {
    T::decode(raw).map_err(|e| StorageError::decode(column, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_header(sign: u16) -> Vec<u8> {
        // ndigits, weight, sign, dscale
        let mut bytes = vec![0, 0, 0, 0];
        bytes.extend_from_slice(&sign.to_be_bytes());
        bytes.extend_from_slice(&[0, 0]);
        bytes
    }

    #[test]
    fn special_numerics_are_named() {
        assert_eq!(special_numeric(&numeric_header(0xC000)), Some("NaN"));
        assert_eq!(special_numeric(&numeric_header(0xD000)), Some("Infinity"));
        assert_eq!(special_numeric(&numeric_header(0xF000)), Some("-Infinity"));
    }

    #[test]
    fn ordinary_or_truncated_numerics_are_not_special() {
        assert_eq!(special_numeric(&numeric_header(0x0000)), None);
        assert_eq!(special_numeric(&numeric_header(0x4000)), None);
        assert_eq!(special_numeric(&[0, 1, 0]), None);
    }
}
