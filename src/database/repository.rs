//! Generic tenant-scoped CRUD over one entity table.
//!
//! Every entity in the platform (employees, audits, assistance records,
//! meetings, tickets, ...) shares the same access pattern; the
//! differences fit in a small static [`EntityConfig`]. One repository
//! instance serves one entity against an injected pool.

use sqlx::PgPool;
use tracing::debug;

use crate::attachment::codec::{decode_attachment, normalize_attachment, normalize_attachments};
use crate::attachment::{AttachmentColumns, AttachmentError, AttachmentRecord};
use crate::database::bind::{bind_value, row_to_field_map};
use crate::database::error::{QueryError, RepositoryError, RepositoryErrorKind};
use crate::database::fragments::{build_insert_fragments, build_update_fragments};
use crate::database::ident::{quote_identifier, validate_identifier};
use crate::database::scope::{scope_query, ScopeOptions, ScopedQuery, TenantContext};
use crate::database::value::{FieldMap, FieldValue};

/// Static description of one entity table. Every identifier in here is
/// written as a literal in source; no name is ever assembled from
/// request input, which is what makes interpolating them into SQL safe.
#[derive(Debug, Clone, Copy)]
pub struct EntityConfig {
    pub table: &'static str,
    pub tenant_column: &'static str,
    /// Listing order: `get_all` sorts by this column, newest first.
    pub order_column: &'static str,
    pub primary_key: &'static str,
    pub attachment: Option<AttachmentColumns>,
}

impl EntityConfig {
    /// Config with the platform defaults: tenant column `center_id`,
    /// primary key `id`, no attachment family.
    pub const fn new(table: &'static str, order_column: &'static str) -> Self {
        Self {
            table,
            tenant_column: "center_id",
            order_column,
            primary_key: "id",
            attachment: None,
        }
    }

    pub const fn with_tenant_column(mut self, column: &'static str) -> Self {
        self.tenant_column = column;
        self
    }

    pub const fn with_primary_key(mut self, column: &'static str) -> Self {
        self.primary_key = column;
        self
    }

    pub const fn with_attachment(mut self, columns: AttachmentColumns) -> Self {
        self.attachment = Some(columns);
        self
    }
}

/// The attachment columns of one row, exactly as stored. Produced by
/// [`Repository::get_raw_attachment`], which deliberately skips list
/// normalization so the payload can be decoded and served.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAttachment {
    pub payload: FieldValue,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
}

impl RawAttachment {
    /// Whether any payload is stored at all. Serving endpoints answer
    /// not-found when this is false.
    pub fn has_payload(&self) -> bool {
        match &self.payload {
            FieldValue::Bytes(_) => true,
            FieldValue::Text(text) => !text.is_empty(),
            _ => false,
        }
    }

    /// Decode the stored payload and attach serving metadata.
    pub fn into_record(self) -> Result<AttachmentRecord, AttachmentError> {
        let payload = decode_attachment(&self.payload)?;
        Ok(AttachmentRecord::new(payload, self.filename, self.mime_type))
    }
}

/// CRUD for one entity. Rows travel as [`FieldMap`]s; the column set is
/// whatever the table has, which is how dozens of hand-grown tables
/// share one implementation.
///
/// Missing rows are `Ok(None)` everywhere, including rows that exist but
/// belong to another center; callers cannot tell the two apart.
#[derive(Clone)]
pub struct Repository {
    config: EntityConfig,
    pool: PgPool,
}

impl Repository {
    /// Validates every configured identifier up front so a bad config
    /// fails at construction, not mid-request.
    pub fn new(config: EntityConfig, pool: PgPool) -> Result<Self, QueryError> {
        validate_identifier(config.table)?;
        validate_identifier(config.tenant_column)?;
        validate_identifier(config.order_column)?;
        validate_identifier(config.primary_key)?;
        if let Some(columns) = &config.attachment {
            validate_identifier(columns.payload)?;
            validate_identifier(columns.filename)?;
            validate_identifier(columns.mime)?;
            validate_identifier(columns.size)?;
        }
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EntityConfig {
        &self.config
    }

    /// All rows visible to the session, newest first by the configured
    /// order column, attachment payloads normalized for listing.
    pub async fn get_all(&self, ctx: &TenantContext) -> Result<Vec<FieldMap>, RepositoryError> {
        const OP: &str = "get_all";
        let base = format!(
            "SELECT * FROM {} ORDER BY {} DESC",
            quote_identifier(self.config.table),
            quote_identifier(self.config.order_column)
        );
        let query = scope_query(base, ctx, self.scope_options()).map_err(|e| self.error(OP, e))?;
        let rows = self.fetch_all(OP, query).await?;
        Ok(self.normalize_rows(rows))
    }

    /// One row by primary key, or `Ok(None)` if absent or out of scope.
    pub async fn get_by_id(
        &self,
        id: i64,
        ctx: &TenantContext,
    ) -> Result<Option<FieldMap>, RepositoryError> {
        const OP: &str = "get_by_id";
        let base = ScopedQuery::new(
            format!(
                "SELECT * FROM {} WHERE {} = $1",
                quote_identifier(self.config.table),
                quote_identifier(self.config.primary_key)
            ),
            vec![FieldValue::Int(id)],
        );
        let query = scope_query(base, ctx, self.scope_options()).map_err(|e| self.error(OP, e))?;
        let row = self.fetch_optional(OP, query).await?;
        Ok(row.map(|row| self.normalize_row(row)))
    }

    /// Insert the non-omitted fields and return the stored row. Not
    /// scoped: the tenant column arrives as an ordinary field, already
    /// stamped by the caller.
    pub async fn create(&self, fields: &FieldMap) -> Result<FieldMap, RepositoryError> {
        const OP: &str = "create";
        let fragments = build_insert_fragments(fields).map_err(|e| self.error(OP, e))?;
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            quote_identifier(self.config.table),
            fragments.columns_sql(),
            fragments.placeholders_sql()
        );
        let row = self.fetch_one(OP, ScopedQuery::new(sql, fragments.values)).await?;
        Ok(self.normalize_row(row))
    }

    /// Update the non-omitted fields of one row and return it, or
    /// `Ok(None)` if the row is absent or out of scope.
    ///
    /// The scoped existence check and the UPDATE are two statements with
    /// no transaction around them; a row deleted in between comes back
    /// as `Ok(None)` from the second step.
    pub async fn update(
        &self,
        id: i64,
        fields: &FieldMap,
        ctx: &TenantContext,
    ) -> Result<Option<FieldMap>, RepositoryError> {
        const OP: &str = "update";
        if self.get_by_id(id, ctx).await?.is_none() {
            return Ok(None);
        }

        let fragments = build_update_fragments(fields, self.config.primary_key)
            .map_err(|e| self.error(OP, e))?;
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${} RETURNING *",
            quote_identifier(self.config.table),
            fragments.set_clause,
            quote_identifier(self.config.primary_key),
            fragments.values.len() + 1
        );
        let mut values = fragments.values;
        values.push(FieldValue::Int(id));

        let row = self.fetch_optional(OP, ScopedQuery::new(sql, values)).await?;
        Ok(row.map(|row| self.normalize_row(row)))
    }

    /// Delete one row and return it, or `Ok(None)` if absent or out of
    /// scope. Same two-step shape as [`Repository::update`].
    pub async fn delete(
        &self,
        id: i64,
        ctx: &TenantContext,
    ) -> Result<Option<FieldMap>, RepositoryError> {
        const OP: &str = "delete";
        if self.get_by_id(id, ctx).await?.is_none() {
            return Ok(None);
        }

        let sql = format!(
            "DELETE FROM {} WHERE {} = $1 RETURNING *",
            quote_identifier(self.config.table),
            quote_identifier(self.config.primary_key)
        );
        let row =
            self.fetch_optional(OP, ScopedQuery::new(sql, vec![FieldValue::Int(id)])).await?;
        Ok(row.map(|row| self.normalize_row(row)))
    }

    /// The attachment columns of one row without normalization, for the
    /// serving endpoints. `Ok(None)` if the row is absent or out of
    /// scope; an error if this entity has no attachment family.
    pub async fn get_raw_attachment(
        &self,
        id: i64,
        ctx: &TenantContext,
    ) -> Result<Option<RawAttachment>, RepositoryError> {
        const OP: &str = "get_raw_attachment";
        let Some(columns) = self.config.attachment else {
            return Err(self.error(OP, RepositoryErrorKind::NoAttachmentColumns));
        };

        let base = ScopedQuery::new(
            format!(
                "SELECT {}, {}, {}, {} FROM {} WHERE {} = $1",
                quote_identifier(columns.payload),
                quote_identifier(columns.filename),
                quote_identifier(columns.mime),
                quote_identifier(columns.size),
                quote_identifier(self.config.table),
                quote_identifier(self.config.primary_key)
            ),
            vec![FieldValue::Int(id)],
        );
        let query = scope_query(base, ctx, self.scope_options()).map_err(|e| self.error(OP, e))?;

        let Some(mut row) = self.fetch_optional(OP, query).await? else {
            return Ok(None);
        };
        Ok(Some(RawAttachment {
            payload: row.remove(columns.payload).unwrap_or(FieldValue::Null),
            filename: take_text(&mut row, columns.filename),
            mime_type: take_text(&mut row, columns.mime),
            size_bytes: take_int(&mut row, columns.size),
        }))
    }

    fn scope_options(&self) -> ScopeOptions {
        ScopeOptions::for_column(self.config.tenant_column)
    }

    fn error(
        &self,
        operation: &'static str,
        source: impl Into<RepositoryErrorKind>,
    ) -> RepositoryError {
        RepositoryError::new(self.config.table, operation, source)
    }

    fn normalize_row(&self, row: FieldMap) -> FieldMap {
        match &self.config.attachment {
            Some(columns) => normalize_attachment(row, columns),
            None => row,
        }
    }

    fn normalize_rows(&self, rows: Vec<FieldMap>) -> Vec<FieldMap> {
        match &self.config.attachment {
            Some(columns) => normalize_attachments(rows, columns),
            None => rows,
        }
    }

    async fn fetch_all(
        &self,
        operation: &'static str,
        query: ScopedQuery,
    ) -> Result<Vec<FieldMap>, RepositoryError> {
        self.log(operation, &query);
        let mut q = sqlx::query(&query.text);
        for value in &query.values {
            q = bind_value(q, value);
        }
        let rows = q.fetch_all(&self.pool).await.map_err(|e| self.error(operation, e))?;
        Ok(rows.iter().map(row_to_field_map).collect())
    }

    async fn fetch_optional(
        &self,
        operation: &'static str,
        query: ScopedQuery,
    ) -> Result<Option<FieldMap>, RepositoryError> {
        self.log(operation, &query);
        let mut q = sqlx::query(&query.text);
        for value in &query.values {
            q = bind_value(q, value);
        }
        let row = q.fetch_optional(&self.pool).await.map_err(|e| self.error(operation, e))?;
        Ok(row.as_ref().map(row_to_field_map))
    }

    async fn fetch_one(
        &self,
        operation: &'static str,
        query: ScopedQuery,
    ) -> Result<FieldMap, RepositoryError> {
        self.log(operation, &query);
        let mut q = sqlx::query(&query.text);
        for value in &query.values {
            q = bind_value(q, value);
        }
        let row = q.fetch_one(&self.pool).await.map_err(|e| self.error(operation, e))?;
        Ok(row_to_field_map(&row))
    }

    fn log(&self, operation: &'static str, query: &ScopedQuery) {
        debug!(
            "{}.{}: {} ({} binds)",
            self.config.table,
            operation,
            query.text,
            query.values.len()
        );
    }
}

fn take_text(row: &mut FieldMap, key: &str) -> Option<String> {
    match row.remove(key) {
        Some(FieldValue::Text(text)) => Some(text),
        _ => None,
    }
}

fn take_int(row: &mut FieldMap, key: &str) -> Option<i64> {
    match row.remove(key) {
        Some(FieldValue::Int(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_attachment_presence_follows_payload_shape() {
        let raw = RawAttachment {
            payload: FieldValue::Bytes(vec![1]),
            filename: None,
            mime_type: None,
            size_bytes: None,
        };
        assert!(raw.has_payload());

        let absent = RawAttachment {
            payload: FieldValue::Null,
            filename: Some("ghost.pdf".into()),
            mime_type: None,
            size_bytes: None,
        };
        assert!(!absent.has_payload());

        let blank_text = RawAttachment {
            payload: FieldValue::Text(String::new()),
            filename: None,
            mime_type: None,
            size_bytes: None,
        };
        assert!(!blank_text.has_payload());
    }

    #[test]
    fn raw_attachment_decodes_into_serveable_record() {
        let raw = RawAttachment {
            payload: FieldValue::Text("\\x48656c6c6f".into()),
            filename: Some("greeting.txt".into()),
            mime_type: Some("text/plain".into()),
            size_bytes: Some(5),
        };
        let record = raw.into_record().unwrap();
        assert_eq!(record.payload(), b"Hello");
        assert_eq!(record.filename(), "greeting.txt");
        assert_eq!(record.content_type(), "text/plain");
    }

    #[test]
    fn entity_config_builder_is_const_friendly() {
        const AUDITS: EntityConfig = EntityConfig::new("center_audits", "audit_date")
            .with_attachment(AttachmentColumns::ATTACHMENTS);
        assert_eq!(AUDITS.tenant_column, "center_id");
        assert_eq!(AUDITS.primary_key, "id");
        assert_eq!(AUDITS.attachment.unwrap().payload, "attachments");
    }
}
