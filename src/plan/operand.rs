//! Scalar expression nodes and the expression vocabulary.
//!
//! Operands are discriminated in JSON by a single lowercase tag:
//! `col`, `value`, `param`, `func`, `case`. A nested subquery is accepted
//! structurally wherever an operand may appear so the validator can reject
//! it with a precise error instead of a parse failure.

use serde_json::Value;

use super::column_ref::ColumnRef;
use super::predicate::Predicate;
use super::query_plan::QueryPlan;

/// Built-in aggregate functions, always valid once aggregations are enabled.
pub const AGGREGATE_FUNCTIONS: &[&str] = &["COUNT", "SUM", "AVG", "MIN", "MAX"];

/// Window-only ranking / navigation functions.
pub const WINDOW_FUNCTIONS: &[&str] = &[
    "ROW_NUMBER",
    "RANK",
    "DENSE_RANK",
    "NTILE",
    "LAG",
    "LEAD",
    "FIRST_VALUE",
    "LAST_VALUE",
    "NTH_VALUE",
];

/// True when `name` is a built-in aggregate function.
pub fn is_aggregate_function(name: &str) -> bool {
    AGGREGATE_FUNCTIONS.contains(&name)
}

/// True when `name` is a window-only function.
pub fn is_window_function(name: &str) -> bool {
    WINDOW_FUNCTIONS.contains(&name)
}

/// A single `WHEN <cond> THEN <result>` branch of a CASE expression.
///
/// The condition is a predicate tree, not an operand; the distinction is
/// enforced at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseWhen {
    /// Branch condition.
    pub cond: Predicate,
    /// Result when the condition holds.
    pub then: Operand,
}

/// A scalar expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// Bound column reference: `{"col": "table.column"}`.
    Column(ColumnRef),
    /// Literal value, always compiled to a bound parameter:
    /// `{"value": 42}`.
    Value(Value),
    /// Runtime-supplied parameter: `{"param": "TENANT"}`.
    Param(String),
    /// Function call: `{"func": "COUNT", "args": [...]}`.
    Func {
        /// Function name; checked against the dialect allowlist.
        name: String,
        /// Argument expressions.
        args: Vec<Operand>,
    },
    /// Conditional expression:
    /// `{"case": {"when": [{"cond": ..., "then": ...}], "else": ...}}`.
    Case {
        /// Ordered WHEN branches.
        when: Vec<CaseWhen>,
        /// Optional ELSE result.
        else_value: Option<Box<Operand>>,
    },
    /// A nested SELECT in scalar position. Parses, but validation rejects
    /// it everywhere except EXISTS / IN, which carry their own plan.
    Subquery(Box<QueryPlan>),
}

impl Operand {
    /// Shorthand for a column operand; panics on a malformed reference, so
    /// only use with trusted input (tests, policy injection).
    pub fn column(raw: &str) -> Self {
        Operand::Column(ColumnRef::parse(raw).expect("malformed column reference"))
    }

    /// Shorthand for a param operand.
    pub fn param(name: impl Into<String>) -> Self {
        Operand::Param(name.into())
    }

    /// Shorthand for a literal operand.
    pub fn value(value: impl Into<Value>) -> Self {
        Operand::Value(value.into())
    }

    /// True when this is an aggregate function call.
    pub fn is_aggregate_call(&self) -> bool {
        matches!(self, Operand::Func { name, .. } if is_aggregate_function(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_vocabulary() {
        assert!(is_aggregate_function("COUNT"));
        assert!(!is_aggregate_function("ROW_NUMBER"));
        assert!(is_window_function("ROW_NUMBER"));
        assert!(!is_window_function("SUM"));
    }

    #[test]
    fn test_aggregate_call_detection() {
        let agg = Operand::Func {
            name: "COUNT".to_string(),
            args: vec![Operand::column("t.id")],
        };
        assert!(agg.is_aggregate_call());
        assert!(!Operand::column("t.id").is_aggregate_call());
    }
}
