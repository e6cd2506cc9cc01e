//! MySQL dialect compiler.

use crate::plan::{MatchOp, Operand};

use super::compiler::SqlCompiler;
use super::errors::CompileResult;
use super::postgres::default_func_call;

/// Compiles to MySQL-flavoured parameterized SQL.
///
/// Parameter style is `%(name)s`; identifiers are quoted with backticks.
/// MySQL has no ILIKE and no `DATE_PART`; the former becomes a lowercased
/// LIKE, the latter is rewritten to `EXTRACT(unit FROM expr)`.
pub struct MySqlCompiler;

impl SqlCompiler for MySqlCompiler {
    fn dialect_name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn param_placeholder(&self, name: &str) -> String {
        format!("%({name})s")
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

    fn build_func_call(
        &self,
        name: &str,
        args: &[Operand],
        render_arg: &mut dyn FnMut(&Operand) -> CompileResult<String>,
    ) -> CompileResult<String> {
        if name.eq_ignore_ascii_case("DATE_PART") {
            if let Some(sql) = build_extract(args, render_arg)? {
                return Ok(sql);
            }
        }
        default_func_call(name, args, render_arg)
    }
}

/// Rewrites `DATE_PART(unit, expr)` to `EXTRACT(UNIT FROM expr)`. The unit
/// must be a plain alphabetic literal (YEAR, MONTH, DAY, ...); anything
/// else falls back to the default rendering.
fn build_extract(
    args: &[Operand],
    render_arg: &mut dyn FnMut(&Operand) -> CompileResult<String>,
) -> CompileResult<Option<String>> {
    let [unit_arg, source_arg] = args else {
        return Ok(None);
    };
    let Operand::Value(v) = unit_arg else {
        return Ok(None);
    };
    let Some(unit) = v.as_str() else {
        return Ok(None);
    };
    if unit.is_empty() || !unit.chars().all(|c| c.is_ascii_alphabetic() || c == '_') {
        return Ok(None);
    }
    let source = render_arg(source_arg)?;
    Ok(Some(format!(
        "EXTRACT({} FROM {source})",
        unit.to_uppercase()
    )))
}
