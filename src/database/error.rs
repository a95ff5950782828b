use thiserror::Error;

/// Errors from query assembly (scoping and fragment building).
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Invalid JSON input: {0}")]
    InvalidJson(String),

    #[error("No assignable columns in field map")]
    EmptyFieldMap,

    #[error("Query references {placeholders} placeholders but carries {values} values")]
    PlaceholderMismatch { placeholders: usize, values: usize },
}

/// A repository failure, tagged with the entity and operation that hit it.
///
/// Missing rows are not errors; repository methods return `Ok(None)` for
/// those. This type only carries genuine failures.
#[derive(Error, Debug)]
#[error("{operation} on {entity}: {source}")]
pub struct RepositoryError {
    pub entity: &'static str,
    pub operation: &'static str,
    #[source]
    pub source: RepositoryErrorKind,
}

#[derive(Error, Debug)]
pub enum RepositoryErrorKind {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("No attachment columns configured for this entity")]
    NoAttachmentColumns,
}

impl RepositoryError {
    pub fn new(
        entity: &'static str,
        operation: &'static str,
        source: impl Into<RepositoryErrorKind>,
    ) -> Self {
        Self { entity, operation, source: source.into() }
    }
}
