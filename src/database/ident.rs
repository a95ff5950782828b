//! SQL identifier validation and quoting.
//!
//! Every table, column and alias name that reaches SQL text goes through
//! here. Names come either from static entity configuration or from the
//! keys of request-derived field maps, so they are validated to the safe
//! subset and double-quoted; values never pass through this module, they
//! are always bound as parameters.

use crate::database::error::QueryError;

/// Accepts `[A-Za-z0-9_]+` with a leading alphabetic or underscore.
pub fn validate_identifier(name: &str) -> Result<(), QueryError> {
    if name.is_empty() {
        return Err(QueryError::InvalidIdentifier("identifier cannot be empty".to_string()));
    }
    let mut chars = name.chars();
    let first = chars.next().unwrap_or('_');
    if !first.is_ascii_alphabetic() && first != '_' {
        return Err(QueryError::InvalidIdentifier(name.to_string()));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(QueryError::InvalidIdentifier(name.to_string()));
    }
    Ok(())
}

/// Quote an identifier for Postgres, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Validate then quote in one step.
pub fn quoted(name: &str) -> Result<String, QueryError> {
    validate_identifier(name)?;
    Ok(quote_identifier(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_identifier("center_id").is_ok());
        assert!(validate_identifier("_internal").is_ok());
        assert!(validate_identifier("attachments_filename").is_ok());
        assert!(validate_identifier("t2").is_ok());
    }

    #[test]
    fn rejects_hostile_names() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("1st_column").is_err());
        assert!(validate_identifier("name; DROP TABLE employees").is_err());
        assert!(validate_identifier("name\"").is_err());
        assert!(validate_identifier("na me").is_err());
    }

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote_identifier("employees"), "\"employees\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
