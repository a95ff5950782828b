//! Tenant isolation by predicate injection.
//!
//! Center-bound sessions may only see rows belonging to their own center.
//! Instead of trusting every call site to remember the filter, queries
//! pass through [`scope_query`] which appends `center_id = $n` to the
//! statement text and pushes the session's center onto the bind list.
//! Sessions with multi-center access pass through untouched.

use crate::database::error::QueryError;
use crate::database::ident::quoted;
use crate::database::value::FieldValue;

/// SQL text plus its ordered bind values, using Postgres `$1..$n`
/// placeholders. Invariant: the highest placeholder number referenced in
/// the text equals `values.len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedQuery {
    pub text: String,
    pub values: Vec<FieldValue>,
}

impl ScopedQuery {
    pub fn new(text: impl Into<String>, values: Vec<FieldValue>) -> Self {
        Self { text: text.into(), values }
    }
}

impl From<&str> for ScopedQuery {
    fn from(text: &str) -> Self {
        Self { text: text.to_string(), values: Vec::new() }
    }
}

impl From<String> for ScopedQuery {
    fn from(text: String) -> Self {
        Self { text, values: Vec::new() }
    }
}

/// The caller's tenancy, decided by the authentication layer once per
/// session. `center_id` is the center the session is bound to;
/// `is_multi_center` marks roles (platform admins, regional managers)
/// that legitimately see every center.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext {
    pub center_id: Option<i32>,
    pub is_multi_center: bool,
}

impl TenantContext {
    /// A session restricted to one center.
    pub fn for_center(center_id: i32) -> Self {
        Self { center_id: Some(center_id), is_multi_center: false }
    }

    /// A session that sees all centers; scoping becomes a no-op.
    pub fn multi_center() -> Self {
        Self { center_id: None, is_multi_center: true }
    }

    /// Whether queries for this session must carry the tenant predicate.
    /// A restricted session with no known center cannot be filtered, so
    /// it also passes through unchanged rather than failing the request.
    pub fn enforce(&self) -> bool {
        self.center_id.is_some() && !self.is_multi_center
    }
}

/// Options for [`scope_query`]. Identifier fields are `'static` on
/// purpose: they come from entity configuration written in source, never
/// from request input.
#[derive(Debug, Clone, Copy)]
pub struct ScopeOptions {
    pub column: &'static str,
    /// Table alias to qualify the column with, for joined queries.
    pub alias: Option<&'static str>,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self { column: "center_id", alias: None }
    }
}

impl ScopeOptions {
    pub fn for_column(column: &'static str) -> Self {
        Self { column, alias: None }
    }

    pub fn with_alias(mut self, alias: &'static str) -> Self {
        self.alias = Some(alias);
        self
    }
}

/// Append the tenant predicate to a query when the session requires it.
///
/// The predicate lands before any trailing `ORDER BY`, `GROUP BY` or
/// `LIMIT` clause, joined with `AND` when the statement already has a
/// `WHERE` and introduced with `WHERE` otherwise. The WHERE detection is
/// a case-insensitive word scan over the whole text, so a `where` inside
/// a subquery counts; scoped base queries are expected to be simple
/// single-table statements.
///
/// Pure function: the input is consumed and a new query returned, no I/O.
pub fn scope_query(
    base: impl Into<ScopedQuery>,
    ctx: &TenantContext,
    opts: ScopeOptions,
) -> Result<ScopedQuery, QueryError> {
    let base = base.into();

    let declared = max_placeholder(&base.text);
    if declared != base.values.len() {
        return Err(QueryError::PlaceholderMismatch {
            placeholders: declared,
            values: base.values.len(),
        });
    }

    let center_id = match (ctx.enforce(), ctx.center_id) {
        (true, Some(id)) => id,
        _ => return Ok(base),
    };

    let column_ref = match opts.alias {
        Some(alias) => format!("{}.{}", quoted(alias)?, quoted(opts.column)?),
        None => quoted(opts.column)?,
    };

    let ScopedQuery { text, mut values } = base;
    let placeholder = values.len() + 1;

    let has_where = find_clause(&text, &["where"]).is_some();
    let connector = if has_where { "AND" } else { "WHERE" };

    // Trailing clauses stay trailing: the predicate is spliced in ahead
    // of the first ORDER BY / GROUP BY / LIMIT keyword.
    let split_at = [
        find_clause(&text, &["order", "by"]),
        find_clause(&text, &["group", "by"]),
        find_clause(&text, &["limit"]),
    ]
    .into_iter()
    .flatten()
    .min()
    .unwrap_or(text.len());

    let (before, after) = text.split_at(split_at);
    let mut scoped = format!("{} {} {} = ${}", before.trim(), connector, column_ref, placeholder);
    if !after.is_empty() {
        scoped.push(' ');
        scoped.push_str(after);
    }

    values.push(FieldValue::Int(center_id as i64));
    Ok(ScopedQuery { text: scoped, values })
}

/// Highest `$n` placeholder number referenced in the text.
fn max_placeholder(text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut max = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > start {
                if let Ok(n) = text[start..end].parse::<usize>() {
                    max = max.max(n);
                }
            }
            i = end;
        } else {
            i += 1;
        }
    }
    max
}

fn is_word_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Byte offset of the first case-insensitive occurrence of `words`
/// (given lowercase, separated by arbitrary whitespace) delimited by
/// word boundaries on both sides.
fn find_clause(text: &str, words: &[&str]) -> Option<usize> {
    let bytes = text.as_bytes();
    for i in 0..bytes.len() {
        if is_word_char(bytes[i]) && (i == 0 || !is_word_char(bytes[i - 1])) {
            if let Some(end) = match_words_at(bytes, i, words) {
                if end == bytes.len() || !is_word_char(bytes[end]) {
                    return Some(i);
                }
            }
        }
    }
    None
}

fn match_words_at(bytes: &[u8], start: usize, words: &[&str]) -> Option<usize> {
    let mut pos = start;
    for (idx, word) in words.iter().enumerate() {
        if idx > 0 {
            let ws_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            if pos == ws_start {
                return None;
            }
        }
        let word = word.as_bytes();
        if pos + word.len() > bytes.len() {
            return None;
        }
        for (i, &expected) in word.iter().enumerate() {
            if bytes[pos + i].to_ascii_lowercase() != expected {
                return None;
            }
        }
        pos += word.len();
    }
    Some(pos)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restricted(center: i32) -> TenantContext {
        TenantContext::for_center(center)
    }

    #[test]
    fn introduces_where_when_absent() {
        let q = scope_query("SELECT * FROM employees", &restricted(5), ScopeOptions::default())
            .unwrap();
        assert_eq!(q.text, "SELECT * FROM employees WHERE \"center_id\" = $1");
        assert_eq!(q.values, vec![FieldValue::Int(5)]);
    }

    #[test]
    fn joins_with_and_when_where_present() {
        let base = ScopedQuery::new(
            "SELECT * FROM employees WHERE active = $1",
            vec![FieldValue::Bool(true)],
        );
        let q = scope_query(base, &restricted(5), ScopeOptions::default()).unwrap();
        assert_eq!(q.text, "SELECT * FROM employees WHERE active = $1 AND \"center_id\" = $2");
        assert_eq!(q.values, vec![FieldValue::Bool(true), FieldValue::Int(5)]);
    }

    #[test]
    fn predicate_lands_before_order_by() {
        let q = scope_query(
            "SELECT * FROM audits ORDER BY audit_date DESC",
            &restricted(3),
            ScopeOptions::default(),
        )
        .unwrap();
        assert_eq!(
            q.text,
            "SELECT * FROM audits WHERE \"center_id\" = $1 ORDER BY audit_date DESC"
        );
    }

    #[test]
    fn predicate_lands_before_earliest_trailing_clause() {
        let q = scope_query(
            "SELECT * FROM audits GROUP BY status ORDER BY status LIMIT 10",
            &restricted(3),
            ScopeOptions::default(),
        )
        .unwrap();
        assert!(q.text.starts_with("SELECT * FROM audits WHERE \"center_id\" = $1 GROUP BY"));
    }

    #[test]
    fn where_detection_is_case_insensitive() {
        let base =
            ScopedQuery::new("select * from meetings where id = $1", vec![FieldValue::Int(9)]);
        let q = scope_query(base, &restricted(2), ScopeOptions::default()).unwrap();
        assert!(q.text.ends_with("AND \"center_id\" = $2"));
    }

    #[test]
    fn wherehouse_is_not_a_where() {
        let q = scope_query(
            "SELECT * FROM wherehouse_stock",
            &restricted(1),
            ScopeOptions::default(),
        )
        .unwrap();
        assert!(q.text.contains("WHERE \"center_id\" = $1"));
        assert!(!q.text.contains("AND"));
    }

    #[test]
    fn multi_center_session_passes_through() {
        let q = scope_query(
            "SELECT * FROM employees",
            &TenantContext::multi_center(),
            ScopeOptions::default(),
        )
        .unwrap();
        assert_eq!(q.text, "SELECT * FROM employees");
        assert!(q.values.is_empty());
    }

    #[test]
    fn unknown_center_passes_through() {
        let ctx = TenantContext { center_id: None, is_multi_center: false };
        let q = scope_query("SELECT * FROM employees", &ctx, ScopeOptions::default()).unwrap();
        assert_eq!(q.text, "SELECT * FROM employees");
    }

    #[test]
    fn alias_qualifies_the_column() {
        let opts = ScopeOptions::default().with_alias("e");
        let q = scope_query("SELECT e.* FROM employees e", &restricted(4), opts).unwrap();
        assert!(q.text.ends_with("WHERE \"e\".\"center_id\" = $1"));
    }

    #[test]
    fn custom_column_is_used() {
        let q = scope_query(
            "SELECT * FROM tickets",
            &restricted(8),
            ScopeOptions::for_column("owning_center"),
        )
        .unwrap();
        assert!(q.text.ends_with("WHERE \"owning_center\" = $1"));
    }

    #[test]
    fn rejects_placeholder_value_mismatch() {
        let base = ScopedQuery::new("SELECT * FROM employees WHERE id = $1", vec![]);
        let err = scope_query(base, &restricted(1), ScopeOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            QueryError::PlaceholderMismatch { placeholders: 1, values: 0 }
        ));
    }

    #[test]
    fn mismatch_is_rejected_even_without_enforcement() {
        let base = ScopedQuery::new("SELECT * FROM employees WHERE id = $2", vec![]);
        let err =
            scope_query(base, &TenantContext::multi_center(), ScopeOptions::default()).unwrap_err();
        assert!(matches!(err, QueryError::PlaceholderMismatch { .. }));
    }

    #[test]
    fn placeholder_numbering_continues_from_existing_values() {
        let base = ScopedQuery::new(
            "SELECT * FROM audits WHERE status = $1 AND grade >= $2",
            vec![FieldValue::Text("open".into()), FieldValue::Int(3)],
        );
        let q = scope_query(base, &restricted(6), ScopeOptions::default()).unwrap();
        assert!(q.text.ends_with("AND \"center_id\" = $3"));
        assert_eq!(q.values.len(), 3);
    }
}
