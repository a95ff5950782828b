//! Conversions at the sqlx boundary: field values onto query binds, and
//! Postgres rows back into field maps.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::types::BigDecimal;
use sqlx::{Column, Row, TypeInfo};
use uuid::Uuid;

use crate::database::value::{FieldMap, FieldValue};

/// Bind one field value as the next query parameter.
pub fn bind_value<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q FieldValue,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        // Omitted values never survive fragment building; treat a stray
        // one like an explicit null rather than panicking mid-query.
        FieldValue::Null | FieldValue::Omitted => {
            let none: Option<String> = None;
            q.bind(none)
        }
        FieldValue::Bool(b) => q.bind(*b),
        FieldValue::Int(i) => q.bind(*i),
        FieldValue::Float(f) => q.bind(*f),
        FieldValue::Text(s) => q.bind(s),
        FieldValue::Bytes(b) => q.bind(b),
        FieldValue::Json(v) => q.bind(v), // JSONB
    }
}

/// Decode a full row into an ordered field map, column by column.
pub fn row_to_field_map(row: &PgRow) -> FieldMap {
    let mut fields = FieldMap::new();
    for (i, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, i, column.type_info().name());
        fields.set(column.name(), value);
    }
    fields
}

/// Decode one column by its Postgres type name. Rows come from dozens of
/// hand-grown tables, so this covers the types that actually occur and
/// degrades to null (with a warning) for anything new.
fn decode_column(row: &PgRow, index: usize, type_name: &str) -> FieldValue {
    match type_name {
        "UUID" => match row.try_get::<Option<Uuid>, _>(index) {
            Ok(v) => v.map(|u| FieldValue::Text(u.to_string())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            match row.try_get::<Option<String>, _>(index) {
                Ok(v) => v.map(FieldValue::Text).unwrap_or(FieldValue::Null),
                Err(_) => FieldValue::Null,
            }
        }
        "INT2" => match row.try_get::<Option<i16>, _>(index) {
            Ok(v) => v.map(|i| FieldValue::Int(i64::from(i))).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "INT4" => match row.try_get::<Option<i32>, _>(index) {
            Ok(v) => v.map(|i| FieldValue::Int(i64::from(i))).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "INT8" => match row.try_get::<Option<i64>, _>(index) {
            Ok(v) => v.map(FieldValue::Int).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "FLOAT4" | "FLOAT8" => match row.try_get::<Option<f64>, _>(index) {
            Ok(v) => v.map(FieldValue::Float).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        // Money columns keep their exact digits by travelling as text,
        // the same shape the previous driver handed to API clients.
        "NUMERIC" => match row.try_get::<Option<BigDecimal>, _>(index) {
            Ok(v) => v.map(|d| FieldValue::Text(d.to_string())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "BOOL" => match row.try_get::<Option<bool>, _>(index) {
            Ok(v) => v.map(FieldValue::Bool).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "BYTEA" => match row.try_get::<Option<Vec<u8>>, _>(index) {
            Ok(v) => v.map(FieldValue::Bytes).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "JSON" | "JSONB" => match row.try_get::<Option<serde_json::Value>, _>(index) {
            Ok(v) => v.map(FieldValue::Json).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "TIMESTAMPTZ" => match row.try_get::<Option<DateTime<Utc>>, _>(index) {
            Ok(v) => v.map(|t| FieldValue::Text(t.to_rfc3339())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "TIMESTAMP" => match row.try_get::<Option<NaiveDateTime>, _>(index) {
            Ok(v) => v.map(|t| FieldValue::Text(t.to_string())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "DATE" => match row.try_get::<Option<NaiveDate>, _>(index) {
            Ok(v) => v.map(|d| FieldValue::Text(d.to_string())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        "TIME" => match row.try_get::<Option<NaiveTime>, _>(index) {
            Ok(v) => v.map(|t| FieldValue::Text(t.to_string())).unwrap_or(FieldValue::Null),
            Err(_) => FieldValue::Null,
        },
        other => {
            tracing::warn!("Unhandled PostgreSQL type: {}, decoding as null", other);
            FieldValue::Null
        }
    }
}
