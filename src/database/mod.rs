pub mod bind;
pub mod error;
pub mod fragments;
pub mod ident;
pub mod pool;
pub mod repository;
pub mod scope;
pub mod value;

pub use error::{QueryError, RepositoryError, RepositoryErrorKind};
pub use fragments::{
    build_insert_fragments, build_update_fragments, InsertFragments, UpdateFragments,
};
pub use pool::PoolError;
pub use repository::{EntityConfig, RawAttachment, Repository};
pub use scope::{scope_query, ScopeOptions, ScopedQuery, TenantContext};
pub use value::{FieldMap, FieldValue};
