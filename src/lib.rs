//! Data-access core for a multi-center administrative platform.
//!
//! Entities live one-per-table in PostgreSQL and share one CRUD shape:
//! listed newest first, isolated per center for restricted sessions, and
//! optionally carrying an inline binary attachment with its metadata
//! columns. [`Repository`] implements that shape generically over a
//! static [`EntityConfig`]; the supporting pieces (tenant scoping,
//! fragment building, the attachment codec) are usable on their own for
//! the queries that fall outside it.

pub mod attachment;
pub mod config;
pub mod database;

pub use attachment::{
    AttachmentColumns, AttachmentError, AttachmentRecord, ServeMode, ATTACHMENT_SENTINEL,
};
pub use database::{
    scope_query, EntityConfig, FieldMap, FieldValue, QueryError, RawAttachment, Repository,
    RepositoryError, RepositoryErrorKind, ScopeOptions, ScopedQuery, TenantContext,
};
