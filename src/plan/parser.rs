//! JSON → typed QueryPlan parsing.
//!
//! The parser is strict: unknown keys at any level, missing required
//! fields, wrong tags, and wrong arities for built-in operators all fail
//! with a [`ParseError`] carrying a jq-style path. The parser does not
//! consult the schema — existence checks belong to the validator.
//!
//! Hard bounds: input size and nesting depth are capped so a hostile plan
//! cannot exhaust the process.

use serde_json::Value;

use super::column_ref::{is_identifier, ColumnRef};
use super::errors::{ParseError, ParseResult};
use super::operand::{CaseWhen, Operand};
use super::predicate::{CompareOp, InMembers, MatchOp, Predicate};
use super::query_plan::{
    CteClause, FrameType, FromClause, JoinClause, JoinType, OrderByItem, QueryPlan, RowBound,
    SelectClause, SelectItem, SetOp, SetOpClause, SortDirection, WindowDef, WindowFrame,
};

/// Maximum accepted plan size in bytes.
pub const MAX_PLAN_BYTES: usize = 256 * 1024;

/// Maximum accepted nesting depth (plans, predicates, operands combined).
pub const MAX_PLAN_DEPTH: usize = 32;

const CLAUSE_KEYS: &[&str] = &[
    "WITH", "SELECT", "FROM", "JOIN", "WHERE", "GROUP_BY", "HAVING", "WINDOW", "ORDER_BY",
    "LIMIT", "OFFSET", "SET_OP",
];

/// Parses a QueryPlan from raw JSON text.
pub fn parse_plan(input: &str) -> ParseResult<QueryPlan> {
    if input.len() > MAX_PLAN_BYTES {
        return Err(ParseError::too_large(input.len(), MAX_PLAN_BYTES));
    }
    let value: Value = serde_json::from_str(input).map_err(|e| ParseError::invalid_json(&e))?;
    plan_from_value(&value)
}

/// Parses a QueryPlan from an already-decoded JSON value.
pub fn plan_from_value(value: &Value) -> ParseResult<QueryPlan> {
    parse_plan_node(value, "", 0)
}

/// True when the object looks like a nested plan (carries a clause key).
pub(crate) fn is_plan_object(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|obj| obj.keys().any(|k| CLAUSE_KEYS.contains(&k.as_str())))
}

fn parse_plan_node(value: &Value, path: &str, depth: usize) -> ParseResult<QueryPlan> {
    let depth = depth + 1;
    if depth > MAX_PLAN_DEPTH {
        return Err(ParseError::depth_exceeded(MAX_PLAN_DEPTH));
    }
    let obj = as_object(value, path)?;

    for key in obj.keys() {
        if !CLAUSE_KEYS.contains(&key.as_str()) {
            return Err(ParseError::unknown_clause(display(path), key, CLAUSE_KEYS));
        }
    }

    let select_value = obj
        .get("SELECT")
        .ok_or_else(|| ParseError::missing_field(display(path), "SELECT"))?;

    let mut plan = QueryPlan::select_all();
    plan.select = parse_select(select_value, &seg(path, "SELECT"), depth)?;

    if let Some(v) = obj.get("WITH") {
        plan.ctes = parse_with(v, &seg(path, "WITH"), depth)?;
    }
    if let Some(v) = obj.get("FROM") {
        plan.from = Some(parse_from(v, &seg(path, "FROM"), depth)?);
    }
    if let Some(v) = obj.get("JOIN") {
        plan.joins = parse_joins(v, &seg(path, "JOIN"))?;
    }
    if let Some(v) = obj.get("WHERE") {
        plan.where_clause = Some(parse_predicate(v, &seg(path, "WHERE"), depth)?);
    }
    if let Some(v) = obj.get("GROUP_BY") {
        let p = seg(path, "GROUP_BY");
        let arr = as_array(v, &p)?;
        plan.group_by = arr
            .iter()
            .enumerate()
            .map(|(i, item)| parse_operand(item, &idx(&p, i), depth))
            .collect::<ParseResult<_>>()?;
    }
    if let Some(v) = obj.get("HAVING") {
        plan.having = Some(parse_predicate(v, &seg(path, "HAVING"), depth)?);
    }
    if let Some(v) = obj.get("WINDOW") {
        plan.windows = parse_windows(v, &seg(path, "WINDOW"), depth)?;
    }
    if let Some(v) = obj.get("ORDER_BY") {
        let p = seg(path, "ORDER_BY");
        let arr = as_array(v, &p)?;
        plan.order_by = arr
            .iter()
            .enumerate()
            .map(|(i, item)| parse_order_item(item, &idx(&p, i), depth))
            .collect::<ParseResult<_>>()?;
    }
    if let Some(v) = obj.get("LIMIT") {
        plan.limit = Some(parse_row_bound(v, &seg(path, "LIMIT"))?);
    }
    if let Some(v) = obj.get("OFFSET") {
        plan.offset = Some(parse_row_bound(v, &seg(path, "OFFSET"))?);
    }
    if let Some(v) = obj.get("SET_OP") {
        plan.set_op = Some(parse_set_op(v, &seg(path, "SET_OP"), depth)?);
    }

    Ok(plan)
}

fn parse_with(value: &Value, path: &str, depth: usize) -> ParseResult<Vec<CteClause>> {
    let arr = as_array(value, path)?;
    let mut ctes = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let p = idx(path, i);
        let obj = as_object(item, &p)?;
        check_keys(obj, &p, &["name", "plan", "recursive"])?;
        let name = require_identifier(obj.get("name"), &seg(&p, "name"), &p, "name")?;
        let plan_value = obj
            .get("plan")
            .ok_or_else(|| ParseError::missing_field(&p, "plan"))?;
        let plan = parse_plan_node(plan_value, &seg(&p, "plan"), depth)?;
        let recursive = match obj.get("recursive") {
            None => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => return Err(ParseError::bad_type(&seg(&p, "recursive"), "bool", other)),
        };
        ctes.push(CteClause {
            name,
            plan: Box::new(plan),
            recursive,
        });
    }
    Ok(ctes)
}

fn parse_select(value: &Value, path: &str, depth: usize) -> ParseResult<SelectClause> {
    match value {
        Value::String(s) if s == "*" => Ok(SelectClause::Wildcard),
        Value::String(_) => Err(ParseError::bad_value(path, "\"*\" or an item list", value.clone())),
        Value::Array(items) => {
            if items.is_empty() {
                return Err(ParseError::bad_value(path, "a non-empty item list", value.clone()));
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let p = idx(path, i);
                let obj = as_object(item, &p)?;
                check_keys(obj, &p, &["expr", "alias", "over"])?;
                let expr_value = obj
                    .get("expr")
                    .ok_or_else(|| ParseError::missing_field(&p, "expr"))?;
                let expr = parse_operand(expr_value, &seg(&p, "expr"), depth)?;
                let alias = optional_identifier(obj.get("alias"), &seg(&p, "alias"))?;
                let over = optional_identifier(obj.get("over"), &seg(&p, "over"))?;
                out.push(SelectItem { expr, alias, over });
            }
            Ok(SelectClause::Items(out))
        }
        other => Err(ParseError::bad_type(path, "array or \"*\"", other)),
    }
}

fn parse_from(value: &Value, path: &str, depth: usize) -> ParseResult<FromClause> {
    let obj = as_object(value, path)?;
    if obj.contains_key("table") {
        check_keys(obj, path, &["table"])?;
        let table = require_identifier(obj.get("table"), &seg(path, "table"), path, "table")?;
        return Ok(FromClause::Table { table });
    }
    if obj.contains_key("subquery") {
        check_keys(obj, path, &["subquery", "alias"])?;
        let plan = parse_plan_node(&obj["subquery"], &seg(path, "subquery"), depth)?;
        let alias = require_identifier(obj.get("alias"), &seg(path, "alias"), path, "alias")?;
        return Ok(FromClause::Subquery {
            plan: Box::new(plan),
            alias,
        });
    }
    Err(ParseError::missing_field(path, "table or subquery"))
}

fn parse_joins(value: &Value, path: &str) -> ParseResult<Vec<JoinClause>> {
    let arr = as_array(value, path)?;
    let mut joins = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let p = idx(path, i);
        let obj = as_object(item, &p)?;
        check_keys(obj, &p, &["rel", "type", "alias"])?;
        let rel = match obj.get("rel") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) => {
                return Err(ParseError::bad_type(&seg(&p, "rel"), "string", other));
            }
            None => return Err(ParseError::missing_field(&p, "rel")),
        };
        let join_type = match obj.get("type") {
            None => JoinType::Inner,
            Some(Value::String(s)) => JoinType::from_key(s).ok_or_else(|| {
                ParseError::bad_value(&seg(&p, "type"), "INNER, LEFT, RIGHT, or FULL", s.clone())
            })?,
            Some(other) => return Err(ParseError::bad_type(&seg(&p, "type"), "string", other)),
        };
        let alias = optional_identifier(obj.get("alias"), &seg(&p, "alias"))?;
        joins.push(JoinClause {
            rel,
            join_type,
            alias,
        });
    }
    Ok(joins)
}

fn parse_windows(value: &Value, path: &str, depth: usize) -> ParseResult<Vec<WindowDef>> {
    let arr = as_array(value, path)?;
    let mut windows = Vec::with_capacity(arr.len());
    for (i, item) in arr.iter().enumerate() {
        let p = idx(path, i);
        let obj = as_object(item, &p)?;
        check_keys(obj, &p, &["name", "partition_by", "order_by", "frame"])?;
        let name = require_identifier(obj.get("name"), &seg(&p, "name"), &p, "name")?;
        let partition_by = match obj.get("partition_by") {
            None => Vec::new(),
            Some(v) => {
                let pp = seg(&p, "partition_by");
                as_array(v, &pp)?
                    .iter()
                    .enumerate()
                    .map(|(j, e)| parse_operand(e, &idx(&pp, j), depth))
                    .collect::<ParseResult<_>>()?
            }
        };
        let order_by = match obj.get("order_by") {
            None => Vec::new(),
            Some(v) => {
                let pp = seg(&p, "order_by");
                as_array(v, &pp)?
                    .iter()
                    .enumerate()
                    .map(|(j, e)| parse_order_item(e, &idx(&pp, j), depth))
                    .collect::<ParseResult<_>>()?
            }
        };
        let frame = match obj.get("frame") {
            None => None,
            Some(v) => Some(parse_frame(v, &seg(&p, "frame"))?),
        };
        windows.push(WindowDef {
            name,
            partition_by,
            order_by,
            frame,
        });
    }
    Ok(windows)
}

fn parse_frame(value: &Value, path: &str) -> ParseResult<WindowFrame> {
    let obj = as_object(value, path)?;
    check_keys(obj, path, &["type", "start", "end"])?;
    let mut frame = WindowFrame::default();
    if let Some(v) = obj.get("type") {
        let p = seg(path, "type");
        frame.frame_type = match as_str(v, &p)? {
            "ROWS" => FrameType::Rows,
            "RANGE" => FrameType::Range,
            other => {
                return Err(ParseError::bad_value(&p, "ROWS or RANGE", other.to_string()));
            }
        };
    }
    if let Some(v) = obj.get("start") {
        let p = seg(path, "start");
        frame.start = require_frame_boundary(as_str(v, &p)?, &p)?;
    }
    if let Some(v) = obj.get("end") {
        let p = seg(path, "end");
        frame.end = require_frame_boundary(as_str(v, &p)?, &p)?;
    }
    Ok(frame)
}

/// Frame boundaries are emitted verbatim into SQL, so only a closed
/// vocabulary is accepted: the standard keywords or `<n> PRECEDING` /
/// `<n> FOLLOWING` with an unsigned integer.
fn require_frame_boundary(raw: &str, path: &str) -> ParseResult<String> {
    let ok = matches!(raw, "UNBOUNDED PRECEDING" | "UNBOUNDED FOLLOWING" | "CURRENT ROW")
        || raw
            .strip_suffix(" PRECEDING")
            .or_else(|| raw.strip_suffix(" FOLLOWING"))
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()));
    if ok {
        Ok(raw.to_string())
    } else {
        Err(ParseError::bad_value(
            path,
            "a frame boundary (UNBOUNDED PRECEDING, CURRENT ROW, <n> PRECEDING, ...)",
            raw.to_string(),
        ))
    }
}

fn parse_order_item(value: &Value, path: &str, depth: usize) -> ParseResult<OrderByItem> {
    let obj = as_object(value, path)?;
    check_keys(obj, path, &["expr", "dir"])?;
    let expr_value = obj
        .get("expr")
        .ok_or_else(|| ParseError::missing_field(path, "expr"))?;
    let expr = parse_operand(expr_value, &seg(path, "expr"), depth)?;
    let dir = match obj.get("dir") {
        None => SortDirection::Asc,
        Some(Value::String(s)) if s == "ASC" => SortDirection::Asc,
        Some(Value::String(s)) if s == "DESC" => SortDirection::Desc,
        Some(other) => {
            return Err(ParseError::bad_value(
                &seg(path, "dir"),
                "ASC or DESC",
                other.clone(),
            ));
        }
    };
    Ok(OrderByItem { expr, dir })
}

fn parse_row_bound(value: &Value, path: &str) -> ParseResult<RowBound> {
    let obj = as_object(value, path)?;
    if obj.contains_key("value") {
        check_keys(obj, path, &["value"])?;
        let v = &obj["value"];
        let n = v
            .as_i64()
            .ok_or_else(|| ParseError::bad_type(&seg(path, "value"), "non-negative integer", v))?;
        if n < 0 {
            return Err(ParseError::bad_value(
                &seg(path, "value"),
                "non-negative integer",
                v.clone(),
            ));
        }
        return Ok(RowBound::Value(n));
    }
    if obj.contains_key("param") {
        check_keys(obj, path, &["param"])?;
        let name = require_identifier(obj.get("param"), &seg(path, "param"), path, "param")?;
        return Ok(RowBound::Param(name));
    }
    Err(ParseError::missing_field(path, "value or param"))
}

fn parse_set_op(value: &Value, path: &str, depth: usize) -> ParseResult<SetOpClause> {
    let obj = as_object(value, path)?;
    check_keys(obj, path, &["op", "right"])?;
    let op = match obj.get("op") {
        Some(Value::String(s)) => SetOp::from_key(s).ok_or_else(|| {
            ParseError::bad_value(
                &seg(path, "op"),
                "UNION, UNION_ALL, INTERSECT, or EXCEPT",
                s.clone(),
            )
        })?,
        Some(other) => return Err(ParseError::bad_type(&seg(path, "op"), "string", other)),
        None => return Err(ParseError::missing_field(path, "op")),
    };
    let right_value = obj
        .get("right")
        .ok_or_else(|| ParseError::missing_field(path, "right"))?;
    let right = parse_plan_node(right_value, &seg(path, "right"), depth)?;
    Ok(SetOpClause {
        op,
        right: Box::new(right),
    })
}

// ---------------------------------------------------------------------------
// Operands
// ---------------------------------------------------------------------------

pub(crate) fn parse_operand(value: &Value, path: &str, depth: usize) -> ParseResult<Operand> {
    let depth = depth + 1;
    if depth > MAX_PLAN_DEPTH {
        return Err(ParseError::depth_exceeded(MAX_PLAN_DEPTH));
    }
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return Err(ParseError::bad_type(path, "operand object", value)),
    };

    if obj.contains_key("col") {
        check_keys(obj, path, &["col"])?;
        let raw = as_str(&obj["col"], &seg(path, "col"))?;
        let cr = ColumnRef::parse(raw)
            .ok_or_else(|| ParseError::bad_column_ref(&seg(path, "col"), raw))?;
        return Ok(Operand::Column(cr));
    }
    if obj.contains_key("value") {
        check_keys(obj, path, &["value"])?;
        let v = &obj["value"];
        if v.is_array() || v.is_object() {
            return Err(ParseError::bad_value(
                &seg(path, "value"),
                "a scalar literal (string, number, boolean, or null)",
                v.clone(),
            ));
        }
        return Ok(Operand::Value(v.clone()));
    }
    if obj.contains_key("param") {
        check_keys(obj, path, &["param"])?;
        let name = require_identifier(obj.get("param"), &seg(path, "param"), path, "param")?;
        return Ok(Operand::Param(name));
    }
    if obj.contains_key("func") {
        check_keys(obj, path, &["func", "args"])?;
        let name = match &obj["func"] {
            Value::String(s) if !s.is_empty() => s.clone(),
            other => return Err(ParseError::bad_type(&seg(path, "func"), "string", other)),
        };
        let args = match obj.get("args") {
            None => Vec::new(),
            Some(v) => {
                let p = seg(path, "args");
                as_array(v, &p)?
                    .iter()
                    .enumerate()
                    .map(|(i, a)| parse_operand(a, &idx(&p, i), depth))
                    .collect::<ParseResult<_>>()?
            }
        };
        return Ok(Operand::Func { name, args });
    }
    if obj.contains_key("case") {
        check_keys(obj, path, &["case"])?;
        return parse_case(&obj["case"], &seg(path, "case"), depth);
    }
    if is_plan_object(value) {
        let plan = parse_plan_node(value, path, depth)?;
        return Ok(Operand::Subquery(Box::new(plan)));
    }
    Err(ParseError::unknown_tag(
        path,
        value,
        "one of: col, value, param, func, case",
    ))
}

fn parse_case(value: &Value, path: &str, depth: usize) -> ParseResult<Operand> {
    let obj = as_object(value, path)?;
    check_keys(obj, path, &["when", "else"])?;
    let when_value = obj
        .get("when")
        .ok_or_else(|| ParseError::missing_field(path, "when"))?;
    let when_path = seg(path, "when");
    let arr = as_array(when_value, &when_path)?;
    if arr.is_empty() {
        return Err(ParseError::bad_value(
            &when_path,
            "a non-empty list of WHEN branches",
            when_value.clone(),
        ));
    }
    let mut when = Vec::with_capacity(arr.len());
    for (i, branch) in arr.iter().enumerate() {
        let p = idx(&when_path, i);
        let branch_obj = as_object(branch, &p)?;
        check_keys(branch_obj, &p, &["cond", "then"])?;
        let cond_value = branch_obj
            .get("cond")
            .ok_or_else(|| ParseError::missing_field(&p, "cond"))?;
        let then_value = branch_obj
            .get("then")
            .ok_or_else(|| ParseError::missing_field(&p, "then"))?;
        when.push(CaseWhen {
            cond: parse_predicate(cond_value, &seg(&p, "cond"), depth)?,
            then: parse_operand(then_value, &seg(&p, "then"), depth)?,
        });
    }
    let else_value = match obj.get("else") {
        None => None,
        Some(v) => Some(Box::new(parse_operand(v, &seg(path, "else"), depth)?)),
    };
    Ok(Operand::Case { when, else_value })
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

pub(crate) fn parse_predicate(value: &Value, path: &str, depth: usize) -> ParseResult<Predicate> {
    let depth = depth + 1;
    if depth > MAX_PLAN_DEPTH {
        return Err(ParseError::depth_exceeded(MAX_PLAN_DEPTH));
    }
    let obj = match value.as_object() {
        Some(obj) if obj.len() == 1 => obj,
        _ => {
            return Err(ParseError::unknown_tag(
                path,
                value,
                "a single-key predicate object",
            ));
        }
    };
    let (op, args) = obj.iter().next().expect("single-key object");
    let op_path = seg(path, op);

    if let Some(cmp) = CompareOp::from_key(op) {
        let pair = expect_operands(args, &op_path, op, 2, depth)?;
        let mut it = pair.into_iter();
        return Ok(Predicate::Compare {
            op: cmp,
            left: it.next().expect("arity checked"),
            right: it.next().expect("arity checked"),
        });
    }

    match op.as_str() {
        "LIKE" | "ILIKE" => {
            let pair = expect_operands(args, &op_path, op, 2, depth)?;
            let mut it = pair.into_iter();
            Ok(Predicate::Match {
                op: if op == "LIKE" { MatchOp::Like } else { MatchOp::Ilike },
                expr: it.next().expect("arity checked"),
                pattern: it.next().expect("arity checked"),
            })
        }
        "IS_NULL" | "IS_NOT_NULL" => Ok(Predicate::NullCheck {
            negated: op == "IS_NOT_NULL",
            operand: parse_operand(args, &op_path, depth)?,
        }),
        "BETWEEN" => {
            let triple = expect_operands(args, &op_path, op, 3, depth)?;
            let mut it = triple.into_iter();
            Ok(Predicate::Between {
                expr: it.next().expect("arity checked"),
                low: it.next().expect("arity checked"),
                high: it.next().expect("arity checked"),
            })
        }
        "IN" | "NOT_IN" => {
            let arr = as_array(args, &op_path)?;
            if arr.len() < 2 {
                return Err(ParseError::bad_arity(
                    &op_path,
                    op,
                    "an operand plus at least 1 member",
                    arr.len(),
                ));
            }
            let expr = parse_operand(&arr[0], &idx(&op_path, 0), depth)?;
            let rest = &arr[1..];
            let members = if rest.len() == 1 && is_plan_object(&rest[0]) {
                InMembers::Subquery(Box::new(parse_plan_node(
                    &rest[0],
                    &idx(&op_path, 1),
                    depth,
                )?))
            } else {
                InMembers::List(
                    rest.iter()
                        .enumerate()
                        .map(|(i, v)| parse_operand(v, &idx(&op_path, i + 1), depth))
                        .collect::<ParseResult<_>>()?,
                )
            };
            Ok(Predicate::InSet {
                negated: op == "NOT_IN",
                expr,
                members,
            })
        }
        "AND" | "OR" => {
            let arr = as_array(args, &op_path)?;
            if arr.len() < 2 {
                return Err(ParseError::bad_arity(
                    &op_path,
                    op,
                    "at least 2 sub-predicates",
                    arr.len(),
                ));
            }
            let branches = arr
                .iter()
                .enumerate()
                .map(|(i, v)| parse_predicate(v, &idx(&op_path, i), depth))
                .collect::<ParseResult<_>>()?;
            if op == "AND" {
                Ok(Predicate::And(branches))
            } else {
                Ok(Predicate::Or(branches))
            }
        }
        "NOT" => Ok(Predicate::Not(Box::new(parse_predicate(
            args, &op_path, depth,
        )?))),
        "EXISTS" | "NOT_EXISTS" => {
            if !is_plan_object(args) {
                return Err(ParseError::bad_type(&op_path, "a subquery plan object", args));
            }
            Ok(Predicate::Exists {
                negated: op == "NOT_EXISTS",
                plan: Box::new(parse_plan_node(args, &op_path, depth)?),
            })
        }
        other if is_extension_key(other) => {
            let arr = as_array(args, &op_path)?;
            let parsed = arr
                .iter()
                .enumerate()
                .map(|(i, v)| parse_operand(v, &idx(&op_path, i), depth))
                .collect::<ParseResult<_>>()?;
            Ok(Predicate::Extension {
                op: other.to_string(),
                args: parsed,
            })
        }
        _ => Err(ParseError::unknown_tag(path, value, "a predicate operator")),
    }
}

/// Extension operator keys look like built-in ones: uppercase identifiers.
fn is_extension_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

fn expect_operands(
    args: &Value,
    path: &str,
    op: &str,
    count: usize,
    depth: usize,
) -> ParseResult<Vec<Operand>> {
    let arr = as_array(args, path)?;
    if arr.len() != count {
        return Err(ParseError::bad_arity(
            path,
            op,
            &format!("exactly {count}"),
            arr.len(),
        ));
    }
    arr.iter()
        .enumerate()
        .map(|(i, v)| parse_operand(v, &idx(path, i), depth))
        .collect()
}

// ---------------------------------------------------------------------------
// JSON access helpers
// ---------------------------------------------------------------------------

fn as_object<'a>(
    value: &'a Value,
    path: &str,
) -> ParseResult<&'a serde_json::Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| ParseError::bad_type(display(path), "object", value))
}

fn as_array<'a>(value: &'a Value, path: &str) -> ParseResult<&'a Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| ParseError::bad_type(display(path), "array", value))
}

fn as_str<'a>(value: &'a Value, path: &str) -> ParseResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ParseError::bad_type(display(path), "string", value))
}

fn check_keys(
    obj: &serde_json::Map<String, Value>,
    path: &str,
    allowed: &[&str],
) -> ParseResult<()> {
    for key in obj.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(ParseError::unknown_field(display(path), key, allowed));
        }
    }
    Ok(())
}

fn require_identifier(
    value: Option<&Value>,
    value_path: &str,
    parent_path: &str,
    field: &str,
) -> ParseResult<String> {
    let value = value.ok_or_else(|| ParseError::missing_field(display(parent_path), field))?;
    let raw = as_str(value, value_path)?;
    if !is_identifier(raw) {
        return Err(ParseError::bad_value(
            value_path,
            "an identifier ([A-Za-z_][A-Za-z0-9_]*)",
            raw.to_string(),
        ));
    }
    Ok(raw.to_string())
}

fn optional_identifier(value: Option<&Value>, path: &str) -> ParseResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) => {
            let raw = as_str(v, path)?;
            if !is_identifier(raw) {
                return Err(ParseError::bad_value(
                    path,
                    "an identifier ([A-Za-z_][A-Za-z0-9_]*)",
                    raw.to_string(),
                ));
            }
            Ok(Some(raw.to_string()))
        }
    }
}

fn seg(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

fn idx(path: &str, i: usize) -> String {
    format!("{path}[{i}]")
}

/// Root path renders as "." instead of the empty string.
fn display(path: &str) -> &str {
    if path.is_empty() {
        "."
    } else {
        path
    }
}
