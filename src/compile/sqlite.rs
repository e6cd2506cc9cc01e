//! SQLite dialect compiler.

use crate::plan::MatchOp;

use super::compiler::SqlCompiler;

/// Compiles to SQLite-flavoured parameterized SQL.
///
/// Parameter style is `:name`. SQLite has no ILIKE; case-insensitive
/// matches are emitted as a lowercased LIKE comparison.
pub struct SqliteCompiler;

impl SqlCompiler for SqliteCompiler {
    fn dialect_name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, name: &str) -> String {
        format!(":{name}")
    }

    fn like_operator(&self, op: MatchOp) -> &'static str {
        let _ = op;
        "LIKE"
    }

    fn build_like(&self, left: &str, op: MatchOp, right: &str) -> String {
        match op {
            MatchOp::Like => format!("{left} LIKE {right}"),
            MatchOp::Ilike => format!("LOWER({left}) LIKE LOWER({right})"),
        }
    }
}
