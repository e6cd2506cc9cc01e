//! PostgreSQL dialect compiler.

use crate::plan::{MatchOp, Operand};

use super::compiler::SqlCompiler;
use super::errors::CompileResult;

/// Compiles to PostgreSQL-flavoured parameterized SQL.
///
/// Parameter style is `%(name)s`, the named-parameter convention of the
/// common Postgres drivers.
pub struct PostgresCompiler;

impl SqlCompiler for PostgresCompiler {
    fn dialect_name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn param_placeholder(&self, name: &str) -> String {
        format!("%({name})s")
    }

    fn like_operator(&self, op: MatchOp) -> &'static str {
        // Postgres supports ILIKE natively.
        match op {
            MatchOp::Like => "LIKE",
            MatchOp::Ilike => "ILIKE",
        }
    }

    fn build_func_call(
        &self,
        name: &str,
        args: &[Operand],
        render_arg: &mut dyn FnMut(&Operand) -> CompileResult<String>,
    ) -> CompileResult<String> {
        if name.eq_ignore_ascii_case("DATE_PART") {
            return build_date_part(args, render_arg);
        }
        default_func_call(name, args, render_arg)
    }
}

pub(super) fn default_func_call(
    name: &str,
    args: &[Operand],
    render_arg: &mut dyn FnMut(&Operand) -> CompileResult<String>,
) -> CompileResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for arg in args {
        parts.push(render_arg(arg)?);
    }
    Ok(format!("{}({})", name.to_uppercase(), parts.join(", ")))
}

/// `DATE_PART` needs two adjustments on Postgres: the field name must be an
/// inline string literal (a bound parameter has type `unknown` and cannot
/// select an overload), and the source expression gets a `::TIMESTAMP`
/// cast so TEXT-stored timestamps still resolve.
fn build_date_part(
    args: &[Operand],
    render_arg: &mut dyn FnMut(&Operand) -> CompileResult<String>,
) -> CompileResult<String> {
    let mut parts = Vec::with_capacity(args.len());
    for (i, arg) in args.iter().enumerate() {
        match arg {
            Operand::Value(v) if i == 0 && v.is_string() => {
                let field = v.as_str().expect("checked is_string");
                parts.push(format!("'{}'", field.replace('\'', "''")));
            }
            _ if i == 1 => parts.push(format!("{}::TIMESTAMP", render_arg(arg)?)),
            _ => parts.push(render_arg(arg)?),
        }
    }
    Ok(format!("DATE_PART({})", parts.join(", ")))
}
