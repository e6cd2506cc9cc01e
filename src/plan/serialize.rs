//! QueryPlan → JSON serialization.
//!
//! Emits the exact grammar the parser accepts, so parsing the output of
//! `to_value` yields a plan equal to the input.

use serde_json::{json, Map, Value};

use super::operand::Operand;
use super::predicate::{InMembers, Predicate};
use super::query_plan::{
    FromClause, OrderByItem, QueryPlan, RowBound, SelectClause, WindowDef,
};

impl QueryPlan {
    /// Serializes the plan back to its JSON grammar.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if !self.ctes.is_empty() {
            let ctes: Vec<Value> = self
                .ctes
                .iter()
                .map(|cte| {
                    let mut entry = Map::new();
                    entry.insert("name".to_string(), Value::from(cte.name.clone()));
                    entry.insert("plan".to_string(), cte.plan.to_value());
                    if cte.recursive {
                        entry.insert("recursive".to_string(), Value::Bool(true));
                    }
                    Value::Object(entry)
                })
                .collect();
            obj.insert("WITH".to_string(), Value::from(ctes));
        }
        obj.insert("SELECT".to_string(), select_to_value(&self.select));
        if let Some(from) = &self.from {
            obj.insert("FROM".to_string(), from_to_value(from));
        }
        if !self.joins.is_empty() {
            let joins: Vec<Value> = self
                .joins
                .iter()
                .map(|join| {
                    let mut entry = Map::new();
                    entry.insert("rel".to_string(), Value::from(join.rel.clone()));
                    entry.insert("type".to_string(), Value::from(join.join_type.as_str()));
                    if let Some(alias) = &join.alias {
                        entry.insert("alias".to_string(), Value::from(alias.clone()));
                    }
                    Value::Object(entry)
                })
                .collect();
            obj.insert("JOIN".to_string(), Value::from(joins));
        }
        if let Some(pred) = &self.where_clause {
            obj.insert("WHERE".to_string(), predicate_to_value(pred));
        }
        if !self.group_by.is_empty() {
            let exprs: Vec<Value> = self.group_by.iter().map(operand_to_value).collect();
            obj.insert("GROUP_BY".to_string(), Value::from(exprs));
        }
        if let Some(pred) = &self.having {
            obj.insert("HAVING".to_string(), predicate_to_value(pred));
        }
        if !self.windows.is_empty() {
            let windows: Vec<Value> = self.windows.iter().map(window_to_value).collect();
            obj.insert("WINDOW".to_string(), Value::from(windows));
        }
        if !self.order_by.is_empty() {
            let items: Vec<Value> = self.order_by.iter().map(order_item_to_value).collect();
            obj.insert("ORDER_BY".to_string(), Value::from(items));
        }
        if let Some(bound) = &self.limit {
            obj.insert("LIMIT".to_string(), bound_to_value(bound));
        }
        if let Some(bound) = &self.offset {
            obj.insert("OFFSET".to_string(), bound_to_value(bound));
        }
        if let Some(set_op) = &self.set_op {
            obj.insert(
                "SET_OP".to_string(),
                json!({"op": set_op.op.key(), "right": set_op.right.to_value()}),
            );
        }
        Value::Object(obj)
    }
}

fn select_to_value(select: &SelectClause) -> Value {
    match select {
        SelectClause::Wildcard => Value::from("*"),
        SelectClause::Items(items) => {
            let out: Vec<Value> = items
                .iter()
                .map(|item| {
                    let mut entry = Map::new();
                    entry.insert("expr".to_string(), operand_to_value(&item.expr));
                    if let Some(alias) = &item.alias {
                        entry.insert("alias".to_string(), Value::from(alias.clone()));
                    }
                    if let Some(over) = &item.over {
                        entry.insert("over".to_string(), Value::from(over.clone()));
                    }
                    Value::Object(entry)
                })
                .collect();
            Value::from(out)
        }
    }
}

fn from_to_value(from: &FromClause) -> Value {
    match from {
        FromClause::Table { table } => json!({ "table": table }),
        FromClause::Subquery { plan, alias } => {
            json!({"subquery": plan.to_value(), "alias": alias})
        }
    }
}

fn window_to_value(window: &WindowDef) -> Value {
    let mut entry = Map::new();
    entry.insert("name".to_string(), Value::from(window.name.clone()));
    if !window.partition_by.is_empty() {
        let exprs: Vec<Value> = window.partition_by.iter().map(operand_to_value).collect();
        entry.insert("partition_by".to_string(), Value::from(exprs));
    }
    if !window.order_by.is_empty() {
        let items: Vec<Value> = window.order_by.iter().map(order_item_to_value).collect();
        entry.insert("order_by".to_string(), Value::from(items));
    }
    if let Some(frame) = &window.frame {
        entry.insert(
            "frame".to_string(),
            json!({
                "type": frame.frame_type.as_str(),
                "start": frame.start,
                "end": frame.end,
            }),
        );
    }
    Value::Object(entry)
}

fn order_item_to_value(item: &OrderByItem) -> Value {
    json!({"expr": operand_to_value(&item.expr), "dir": item.dir.as_str()})
}

fn bound_to_value(bound: &RowBound) -> Value {
    match bound {
        RowBound::Value(n) => json!({ "value": n }),
        RowBound::Param(name) => json!({ "param": name }),
    }
}

/// Serializes an operand back to its tagged JSON form.
pub fn operand_to_value(operand: &Operand) -> Value {
    match operand {
        Operand::Column(cr) => json!({"col": cr.to_string()}),
        Operand::Value(v) => json!({ "value": v }),
        Operand::Param(name) => json!({ "param": name }),
        Operand::Func { name, args } => {
            let rendered: Vec<Value> = args.iter().map(operand_to_value).collect();
            json!({"func": name, "args": rendered})
        }
        Operand::Case { when, else_value } => {
            let branches: Vec<Value> = when
                .iter()
                .map(|branch| {
                    json!({
                        "cond": predicate_to_value(&branch.cond),
                        "then": operand_to_value(&branch.then),
                    })
                })
                .collect();
            let mut body = Map::new();
            body.insert("when".to_string(), Value::from(branches));
            if let Some(e) = else_value {
                body.insert("else".to_string(), operand_to_value(e));
            }
            json!({"case": Value::Object(body)})
        }
        Operand::Subquery(plan) => plan.to_value(),
    }
}

/// Serializes a predicate back to its single-key JSON form.
pub fn predicate_to_value(pred: &Predicate) -> Value {
    match pred {
        Predicate::Compare { op, left, right } => {
            json!({op.key(): [operand_to_value(left), operand_to_value(right)]})
        }
        Predicate::NullCheck { negated, operand } => {
            let key = if *negated { "IS_NOT_NULL" } else { "IS_NULL" };
            json!({key: operand_to_value(operand)})
        }
        Predicate::Match { op, expr, pattern } => {
            json!({op.key(): [operand_to_value(expr), operand_to_value(pattern)]})
        }
        Predicate::InSet {
            negated,
            expr,
            members,
        } => {
            let key = if *negated { "NOT_IN" } else { "IN" };
            let mut args = vec![operand_to_value(expr)];
            match members {
                InMembers::List(items) => args.extend(items.iter().map(operand_to_value)),
                InMembers::Subquery(plan) => args.push(plan.to_value()),
            }
            json!({ key: args })
        }
        Predicate::Between { expr, low, high } => {
            json!({"BETWEEN": [
                operand_to_value(expr),
                operand_to_value(low),
                operand_to_value(high),
            ]})
        }
        Predicate::And(branches) => {
            let out: Vec<Value> = branches.iter().map(predicate_to_value).collect();
            json!({ "AND": out })
        }
        Predicate::Or(branches) => {
            let out: Vec<Value> = branches.iter().map(predicate_to_value).collect();
            json!({ "OR": out })
        }
        Predicate::Not(inner) => json!({"NOT": predicate_to_value(inner)}),
        Predicate::Exists { negated, plan } => {
            let key = if *negated { "NOT_EXISTS" } else { "EXISTS" };
            json!({key: plan.to_value()})
        }
        Predicate::Extension { op, args } => {
            let rendered: Vec<Value> = args.iter().map(operand_to_value).collect();
            json!({ op.clone(): rendered })
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::plan::parser::plan_from_value;

    #[test]
    fn test_parse_serialize_round_trip() {
        let raw = json!({
            "WITH": [{"name": "active", "plan": {
                "SELECT": [{"expr": {"col": "employees.employee_id"}}],
                "FROM": {"table": "employees"},
                "WHERE": {"EQ": [{"col": "employees.active"}, {"value": true}]}
            }}],
            "SELECT": [
                {"expr": {"col": "employees.first_name"}, "alias": "name"},
                {"expr": {"func": "COUNT", "args": [{"col": "employees.employee_id"}]},
                 "alias": "cnt"}
            ],
            "FROM": {"table": "employees"},
            "JOIN": [{"rel": "departments__employees", "type": "LEFT"}],
            "WHERE": {"AND": [
                {"EQ": [{"col": "employees.tenant_id"}, {"param": "TENANT"}]},
                {"NOT_IN": [{"col": "employees.employment_type"},
                            {"value": "intern"}, {"value": "temp"}]}
            ]},
            "GROUP_BY": [{"col": "employees.first_name"}],
            "HAVING": {"GT": [{"func": "COUNT", "args": [{"col": "employees.employee_id"}]},
                              {"value": 1}]},
            "ORDER_BY": [{"expr": {"col": "employees.first_name"}, "dir": "DESC"}],
            "LIMIT": {"value": 25},
            "OFFSET": {"param": "SKIP"}
        });

        let plan = plan_from_value(&raw).unwrap();
        let emitted = plan.to_value();
        let reparsed = plan_from_value(&emitted).unwrap();
        assert_eq!(plan, reparsed);
    }

    #[test]
    fn test_round_trip_preserves_subquery_predicates() {
        let raw = json!({
            "SELECT": "*",
            "FROM": {"table": "departments"},
            "WHERE": {"EXISTS": {
                "SELECT": [{"expr": {"col": "employees.employee_id"}}],
                "FROM": {"table": "employees"},
                "WHERE": {"EQ": [{"col": "employees.department_id"},
                                 {"col": "departments.department_id"}]}
            }}
        });
        let plan = plan_from_value(&raw).unwrap();
        let reparsed = plan_from_value(&plan.to_value()).unwrap();
        assert_eq!(plan, reparsed);
    }
}
