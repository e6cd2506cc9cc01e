//! Typed `table.column` references.
//!
//! Plans may only use fully-qualified references; a bare column name is a
//! parse failure. Both identifiers must match `[A-Za-z_][A-Za-z0-9_]*`.

use std::fmt;

/// A parsed, fully-qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    /// Table (or alias / CTE) qualifier.
    pub table: String,
    /// Column name.
    pub column: String,
}

impl ColumnRef {
    /// Creates a reference from its parts.
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Parses a `"table.column"` string, or returns `None` when the input
    /// does not match `IDENT "." IDENT`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (table, column) = raw.split_once('.')?;
        if !is_identifier(table) || !is_identifier(column) {
            return None;
        }
        Some(Self::new(table, column))
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// True for `[A-Za-z_][A-Za-z0-9_]*`.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified_reference() {
        let cr = ColumnRef::parse("employees.first_name").unwrap();
        assert_eq!(cr.table, "employees");
        assert_eq!(cr.column, "first_name");
        assert_eq!(cr.to_string(), "employees.first_name");
    }

    #[test]
    fn test_bare_column_rejected() {
        assert!(ColumnRef::parse("first_name").is_none());
    }

    #[test]
    fn test_malformed_references_rejected() {
        assert!(ColumnRef::parse("a.b.c").is_none());
        assert!(ColumnRef::parse(".column").is_none());
        assert!(ColumnRef::parse("table.").is_none());
        assert!(ColumnRef::parse("ta ble.col").is_none());
        assert!(ColumnRef::parse("1table.col").is_none());
        assert!(ColumnRef::parse("t;drop.col").is_none());
    }

    #[test]
    fn test_underscore_identifiers_allowed() {
        assert!(ColumnRef::parse("_t._c").is_some());
    }
}
