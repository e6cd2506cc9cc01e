//! Boolean expression nodes.
//!
//! Predicates are discriminated in JSON by a single uppercase operator key
//! whose value is the argument list. Built-in operators are enum arms
//! matched exhaustively; operators outside the built-in set parse into
//! [`Predicate::Extension`] and are rendered through the operator registry.

use super::operand::Operand;
use super::query_plan::QueryPlan;

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    /// The JSON operator key.
    pub fn key(&self) -> &'static str {
        match self {
            CompareOp::Eq => "EQ",
            CompareOp::Neq => "NEQ",
            CompareOp::Lt => "LT",
            CompareOp::Lte => "LTE",
            CompareOp::Gt => "GT",
            CompareOp::Gte => "GTE",
        }
    }

    /// The SQL comparison symbol.
    pub fn sql(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Neq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }

    /// Parses an operator key.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "EQ" => CompareOp::Eq,
            "NEQ" => CompareOp::Neq,
            "LT" => CompareOp::Lt,
            "LTE" => CompareOp::Lte,
            "GT" => CompareOp::Gt,
            "GTE" => CompareOp::Gte,
            _ => return None,
        })
    }
}

/// Pattern-match operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    Like,
    /// Case-insensitive LIKE; rewritten on dialects without native support.
    Ilike,
}

impl MatchOp {
    /// The JSON operator key.
    pub fn key(&self) -> &'static str {
        match self {
            MatchOp::Like => "LIKE",
            MatchOp::Ilike => "ILIKE",
        }
    }
}

/// The right-hand side of IN / NOT_IN.
#[derive(Debug, Clone, PartialEq)]
pub enum InMembers {
    /// Explicit non-empty value list.
    List(Vec<Operand>),
    /// Subquery producing the member set.
    Subquery(Box<QueryPlan>),
}

/// A boolean expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `{"EQ": [left, right]}` and friends.
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    /// `{"IS_NULL": operand}` / `{"IS_NOT_NULL": operand}`.
    NullCheck { negated: bool, operand: Operand },
    /// `{"LIKE": [expr, pattern]}` / `{"ILIKE": [expr, pattern]}`.
    Match {
        op: MatchOp,
        expr: Operand,
        pattern: Operand,
    },
    /// `{"IN": [expr, ...members-or-subquery]}` / `NOT_IN`.
    InSet {
        negated: bool,
        expr: Operand,
        members: InMembers,
    },
    /// `{"BETWEEN": [expr, low, high]}`.
    Between {
        expr: Operand,
        low: Operand,
        high: Operand,
    },
    /// `{"AND": [p1, p2, ...]}`, two or more branches.
    And(Vec<Predicate>),
    /// `{"OR": [p1, p2, ...]}`, two or more branches.
    Or(Vec<Predicate>),
    /// `{"NOT": p}`.
    Not(Box<Predicate>),
    /// `{"EXISTS": subplan}` / `{"NOT_EXISTS": subplan}`.
    Exists { negated: bool, plan: Box<QueryPlan> },
    /// An operator outside the built-in set, rendered via the registry.
    Extension { op: String, args: Vec<Operand> },
}

impl Predicate {
    /// The JSON operator key for this node.
    pub fn operator_key(&self) -> &str {
        match self {
            Predicate::Compare { op, .. } => op.key(),
            Predicate::NullCheck { negated: false, .. } => "IS_NULL",
            Predicate::NullCheck { negated: true, .. } => "IS_NOT_NULL",
            Predicate::Match { op, .. } => op.key(),
            Predicate::InSet { negated: false, .. } => "IN",
            Predicate::InSet { negated: true, .. } => "NOT_IN",
            Predicate::Between { .. } => "BETWEEN",
            Predicate::And(_) => "AND",
            Predicate::Or(_) => "OR",
            Predicate::Not(_) => "NOT",
            Predicate::Exists { negated: false, .. } => "EXISTS",
            Predicate::Exists { negated: true, .. } => "NOT_EXISTS",
            Predicate::Extension { op, .. } => op,
        }
    }

    /// Shorthand for an equality between a column and a named parameter —
    /// the shape required by param-bound policy columns.
    pub fn column_eq_param(table: &str, column: &str, param: &str) -> Self {
        Predicate::Compare {
            op: CompareOp::Eq,
            left: Operand::Column(crate::plan::ColumnRef::new(table, column)),
            right: Operand::Param(param.to_string()),
        }
    }
}
