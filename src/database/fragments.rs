//! INSERT and UPDATE fragment builders.
//!
//! Entities here are wide (forty-plus nullable columns on some tables)
//! and callers send only the fields they mean to touch. These builders
//! turn an ordered [`FieldMap`] into the column list, placeholder list
//! and bind vector for a statement, skipping omitted keys while keeping
//! explicit nulls so a caller can blank a column on update.

use crate::database::error::QueryError;
use crate::database::ident::{quote_identifier, validate_identifier};
use crate::database::value::{FieldMap, FieldValue};

/// Aligned fragments for `INSERT INTO t (columns) VALUES (placeholders)`.
/// `columns`, `placeholders` and `values` share length and order.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertFragments {
    pub columns: Vec<String>,
    pub placeholders: Vec<String>,
    pub values: Vec<FieldValue>,
}

impl InsertFragments {
    /// Quoted, comma-joined column list.
    pub fn columns_sql(&self) -> String {
        self.columns.iter().map(|c| quote_identifier(c)).collect::<Vec<_>>().join(", ")
    }

    /// Comma-joined placeholder list, `$1, $2, ...`.
    pub fn placeholders_sql(&self) -> String {
        self.placeholders.join(", ")
    }
}

/// `SET` clause and bind values for an UPDATE statement. Placeholders
/// run `$1..$k`, so the row selector appended by the caller starts at
/// `$k+1` (`values.len() + 1`).
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateFragments {
    pub set_clause: String,
    pub values: Vec<FieldValue>,
}

/// Build INSERT fragments from the non-omitted fields, in insertion
/// order. Explicit nulls are kept and become SQL NULL.
pub fn build_insert_fragments(fields: &FieldMap) -> Result<InsertFragments, QueryError> {
    let mut columns = Vec::new();
    let mut placeholders = Vec::new();
    let mut values = Vec::new();

    for (key, value) in fields.iter() {
        if value.is_omitted() {
            continue;
        }
        validate_identifier(key)?;
        columns.push(key.to_string());
        placeholders.push(format!("${}", values.len() + 1));
        values.push(value.clone());
    }

    if columns.is_empty() {
        return Err(QueryError::EmptyFieldMap);
    }

    Ok(InsertFragments { columns, placeholders, values })
}

/// Build the `SET` clause for an UPDATE from the non-omitted fields,
/// excluding the primary-key column (the row selector travels in the
/// WHERE clause, not the SET list).
pub fn build_update_fragments(
    fields: &FieldMap,
    primary_key: &str,
) -> Result<UpdateFragments, QueryError> {
    let mut assignments = Vec::new();
    let mut values = Vec::new();

    for (key, value) in fields.iter() {
        if value.is_omitted() || key == primary_key {
            continue;
        }
        validate_identifier(key)?;
        assignments.push(format!("{} = ${}", quote_identifier(key), values.len() + 1));
        values.push(value.clone());
    }

    if assignments.is_empty() {
        return Err(QueryError::EmptyFieldMap);
    }

    Ok(UpdateFragments { set_clause: assignments.join(", "), values })
}
