//! The typed QueryPlan tree.
//!
//! A plan mirrors the SELECT grammar: optional CTE list, projection, source,
//! joins, filters, grouping, named windows, ordering, paging, and an
//! optional set operation. Plans are created by the parser, possibly
//! mutated once by the policy engine, then consumed by the compiler; they
//! are never retained.

use std::collections::BTreeSet;

use super::column_ref::ColumnRef;
use super::operand::Operand;
use super::predicate::{InMembers, Predicate};

/// A single CTE definition (`WITH name AS (...)`).
#[derive(Debug, Clone, PartialEq)]
pub struct CteClause {
    /// Name referenced by the main query.
    pub name: String,
    /// CTE body.
    pub plan: Box<QueryPlan>,
    /// Emit `WITH RECURSIVE`; requires both ctes and subqueries.
    pub recursive: bool,
}

/// The projection list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectClause {
    /// `"SELECT": "*"`.
    Wildcard,
    /// Non-empty list of projected expressions.
    Items(Vec<SelectItem>),
}

impl SelectClause {
    /// Number of projected columns, or `None` for the wildcard.
    pub fn arity(&self) -> Option<usize> {
        match self {
            SelectClause::Wildcard => None,
            SelectClause::Items(items) => Some(items.len()),
        }
    }
}

/// A single projected expression.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// The projected expression.
    pub expr: Operand,
    /// Optional output alias; aliases are unique within a plan.
    pub alias: Option<String>,
    /// Optional named window (declared in the WINDOW clause) the
    /// expression runs over.
    pub over: Option<String>,
}

/// The row source.
#[derive(Debug, Clone, PartialEq)]
pub enum FromClause {
    /// A named table.
    Table { table: String },
    /// An inline derived table; requires subqueries.
    Subquery { plan: Box<QueryPlan>, alias: String },
}

/// SQL join types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    /// The JSON / SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }

    /// Parses the JSON keyword.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "INNER" => JoinType::Inner,
            "LEFT" => JoinType::Left,
            "RIGHT" => JoinType::Right,
            "FULL" => JoinType::Full,
            _ => return None,
        })
    }
}

/// A single relationship-based join. Plans never carry ad-hoc ON clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinClause {
    /// Named relationship key from the schema snapshot.
    pub rel: String,
    /// Join type.
    pub join_type: JoinType,
    /// Optional alias for the joined table.
    pub alias: Option<String>,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    /// The JSON / SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A single ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    /// Expression to order by.
    pub expr: Operand,
    /// Sort direction.
    pub dir: SortDirection,
}

/// LIMIT / OFFSET bound: a literal (compiled to a bound parameter) or a
/// runtime parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum RowBound {
    /// `{"value": n}` with `n >= 0`.
    Value(i64),
    /// `{"param": "NAME"}`.
    Param(String),
}

/// Window frame type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Rows,
    Range,
}

impl FrameType {
    /// The JSON / SQL keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Rows => "ROWS",
            FrameType::Range => "RANGE",
        }
    }
}

/// ROWS / RANGE frame of a window specification.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowFrame {
    pub frame_type: FrameType,
    /// Frame start boundary keyword (e.g. `"UNBOUNDED PRECEDING"`).
    pub start: String,
    /// Frame end boundary keyword (e.g. `"CURRENT ROW"`).
    pub end: String,
}

impl Default for WindowFrame {
    fn default() -> Self {
        Self {
            frame_type: FrameType::Rows,
            start: "UNBOUNDED PRECEDING".to_string(),
            end: "CURRENT ROW".to_string(),
        }
    }
}

/// A named window specification, referenced by select items via `over`.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDef {
    /// Window name.
    pub name: String,
    /// PARTITION BY expressions.
    pub partition_by: Vec<Operand>,
    /// Window ordering.
    pub order_by: Vec<OrderByItem>,
    /// Optional frame clause.
    pub frame: Option<WindowFrame>,
}

/// Set operations applied to the main query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    Except,
}

impl SetOp {
    /// The JSON keyword.
    pub fn key(&self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION_ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        }
    }

    /// The SQL keyword.
    pub fn sql(&self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::Except => "EXCEPT",
        }
    }

    /// Parses the JSON keyword.
    pub fn from_key(key: &str) -> Option<Self> {
        Some(match key {
            "UNION" => SetOp::Union,
            "UNION_ALL" => SetOp::UnionAll,
            "INTERSECT" => SetOp::Intersect,
            "EXCEPT" => SetOp::Except,
            _ => return None,
        })
    }
}

/// A set operation and its right-hand query.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOpClause {
    pub op: SetOp,
    pub right: Box<QueryPlan>,
}

/// Top-level QueryPlan as output by the untrusted planner.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// `WITH` — ordered CTE definitions.
    pub ctes: Vec<CteClause>,
    /// `SELECT` — projection.
    pub select: SelectClause,
    /// `FROM` — row source.
    pub from: Option<FromClause>,
    /// `JOIN` — relationship joins, in declared order.
    pub joins: Vec<JoinClause>,
    /// `WHERE` — filter predicate.
    pub where_clause: Option<Predicate>,
    /// `GROUP_BY` — grouping expressions.
    pub group_by: Vec<Operand>,
    /// `HAVING` — aggregate filter; requires non-empty GROUP_BY.
    pub having: Option<Predicate>,
    /// `WINDOW` — named window specifications.
    pub windows: Vec<WindowDef>,
    /// `ORDER_BY` — result ordering.
    pub order_by: Vec<OrderByItem>,
    /// `LIMIT` — row cap.
    pub limit: Option<RowBound>,
    /// `OFFSET` — rows to skip.
    pub offset: Option<RowBound>,
    /// `SET_OP` — set operation applied to the main query.
    pub set_op: Option<SetOpClause>,
}

impl QueryPlan {
    /// An empty plan projecting everything; useful as a building base.
    pub fn select_all() -> Self {
        Self {
            ctes: Vec::new(),
            select: SelectClause::Wildcard,
            from: None,
            joins: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            windows: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            set_op: None,
        }
    }

    /// The FROM table name, when the source is a plain table.
    pub fn base_table(&self) -> Option<&str> {
        match &self.from {
            Some(FromClause::Table { table }) => Some(table),
            _ => None,
        }
    }

    /// Every column reference in the plan, including nested plans
    /// (CTE bodies, derived tables, subquery predicates, set-op branches).
    pub fn referenced_columns(&self) -> Vec<ColumnRef> {
        let mut out = Vec::new();
        collect_plan_columns(self, &mut out);
        out
    }

    /// Every plain FROM table name in the plan, including nested plans.
    pub fn referenced_tables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_plan_tables(self, &mut out);
        out
    }
}

fn collect_plan_columns(plan: &QueryPlan, out: &mut Vec<ColumnRef>) {
    for cte in &plan.ctes {
        collect_plan_columns(&cte.plan, out);
    }
    if let SelectClause::Items(items) = &plan.select {
        for item in items {
            collect_operand_columns(&item.expr, out);
        }
    }
    if let Some(FromClause::Subquery { plan: sub, .. }) = &plan.from {
        collect_plan_columns(sub, out);
    }
    if let Some(pred) = &plan.where_clause {
        collect_predicate_columns(pred, out);
    }
    for expr in &plan.group_by {
        collect_operand_columns(expr, out);
    }
    if let Some(pred) = &plan.having {
        collect_predicate_columns(pred, out);
    }
    for window in &plan.windows {
        for expr in &window.partition_by {
            collect_operand_columns(expr, out);
        }
        for item in &window.order_by {
            collect_operand_columns(&item.expr, out);
        }
    }
    for item in &plan.order_by {
        collect_operand_columns(&item.expr, out);
    }
    if let Some(set_op) = &plan.set_op {
        collect_plan_columns(&set_op.right, out);
    }
}

fn collect_operand_columns(operand: &Operand, out: &mut Vec<ColumnRef>) {
    match operand {
        Operand::Column(cr) => out.push(cr.clone()),
        Operand::Value(_) | Operand::Param(_) => {}
        Operand::Func { args, .. } => {
            for arg in args {
                collect_operand_columns(arg, out);
            }
        }
        Operand::Case { when, else_value } => {
            for branch in when {
                collect_predicate_columns(&branch.cond, out);
                collect_operand_columns(&branch.then, out);
            }
            if let Some(e) = else_value {
                collect_operand_columns(e, out);
            }
        }
        Operand::Subquery(plan) => collect_plan_columns(plan, out),
    }
}

fn collect_predicate_columns(pred: &Predicate, out: &mut Vec<ColumnRef>) {
    match pred {
        Predicate::Compare { left, right, .. } => {
            collect_operand_columns(left, out);
            collect_operand_columns(right, out);
        }
        Predicate::NullCheck { operand, .. } => collect_operand_columns(operand, out),
        Predicate::Match { expr, pattern, .. } => {
            collect_operand_columns(expr, out);
            collect_operand_columns(pattern, out);
        }
        Predicate::InSet { expr, members, .. } => {
            collect_operand_columns(expr, out);
            match members {
                InMembers::List(items) => {
                    for item in items {
                        collect_operand_columns(item, out);
                    }
                }
                InMembers::Subquery(plan) => collect_plan_columns(plan, out),
            }
        }
        Predicate::Between { expr, low, high } => {
            collect_operand_columns(expr, out);
            collect_operand_columns(low, out);
            collect_operand_columns(high, out);
        }
        Predicate::And(branches) | Predicate::Or(branches) => {
            for branch in branches {
                collect_predicate_columns(branch, out);
            }
        }
        Predicate::Not(inner) => collect_predicate_columns(inner, out),
        Predicate::Exists { plan, .. } => collect_plan_columns(plan, out),
        Predicate::Extension { args, .. } => {
            for arg in args {
                collect_operand_columns(arg, out);
            }
        }
    }
}

fn collect_plan_tables(plan: &QueryPlan, out: &mut BTreeSet<String>) {
    for cte in &plan.ctes {
        collect_plan_tables(&cte.plan, out);
    }
    match &plan.from {
        Some(FromClause::Table { table }) => {
            out.insert(table.clone());
        }
        Some(FromClause::Subquery { plan: sub, .. }) => collect_plan_tables(sub, out),
        None => {}
    }
    if let Some(set_op) = &plan.set_op {
        collect_plan_tables(&set_op.right, out);
    }
}
