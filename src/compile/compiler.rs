//! The dialect compiler interface and the compilation result.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::plan::{MatchOp, Operand};

use super::errors::{CompilationError, CompileResult};

/// Dialect-specific rendering hooks.
///
/// The query builder drives clause assembly; everything a backend can
/// disagree about — identifier quoting, parameter placeholders, ILIKE
/// strategy, function spellings — goes through this trait.
pub trait SqlCompiler {
    /// Canonical target name (`"postgres"`, `"sqlite"`, `"mysql"`, ...).
    fn dialect_name(&self) -> &'static str;

    /// Quotes an identifier for this dialect.
    fn quote_identifier(&self, name: &str) -> String;

    /// Renders the placeholder for a named parameter. The external params
    /// map is always keyed by the logical name, whatever this returns.
    fn param_placeholder(&self, name: &str) -> String;

    /// The keyword used for a pattern operator (`ILIKE` maps to `LIKE` on
    /// engines without it).
    fn like_operator(&self, op: MatchOp) -> &'static str;

    /// Renders a full pattern comparison. Dialects without native ILIKE
    /// override this to emit a lowercased comparison.
    fn build_like(&self, left: &str, op: MatchOp, right: &str) -> String {
        format!("{left} {} {right}", self.like_operator(op))
    }

    /// Renders a function call. The default emits `NAME(arg0, arg1, ...)`;
    /// dialects override to rewrite spellings (e.g. `DATE_PART`).
    fn build_func_call(
        &self,
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
}

/// The output of a successful compilation.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSQL {
    /// SQL string with named placeholders.
    pub sql: String,
    /// Values bound from `{"value": ...}` operands (and literal LIMIT /
    /// OFFSET bounds), keyed by generated `param_{n}` names.
    pub params: BTreeMap<String, Value>,
    /// Logical names the caller must supply at execution time.
    pub required_params: BTreeSet<String>,
    /// The target the SQL was compiled for.
    pub dialect: String,
}

impl CompiledSQL {
    /// Merges caller-supplied runtime parameters with the compiler-bound
    /// ones, producing the final map for the database driver.
    ///
    /// # Errors
    ///
    /// - `runtime.param_collision` — a runtime key shadows a compiler
    ///   binding
    /// - `runtime.missing_param` — a required parameter is absent
    pub fn merge_runtime_params(
        &self,
        runtime: BTreeMap<String, Value>,
    ) -> CompileResult<BTreeMap<String, Value>> {
        for key in runtime.keys() {
            if self.params.contains_key(key) {
                return Err(CompilationError::param_collision(key));
            }
        }
        let mut merged = self.params.clone();
        merged.extend(runtime);

        let missing: Vec<String> = self
            .required_params
            .iter()
            .filter(|name| !merged.contains_key(*name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(CompilationError::missing_runtime_params(missing));
        }
        Ok(merged)
    }
}
