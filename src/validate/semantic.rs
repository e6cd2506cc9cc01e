//! Semantic / business-rule validation.
//!
//! Rules that are neither pure existence checks nor feature flags:
//! HAVING needs a non-empty GROUP BY, grouped queries must cover their
//! non-aggregate projections, LIMIT / OFFSET values stay inside `[0, 2^31)`,
//! OFFSET without LIMIT only on dialects that accept it, and set-operation
//! branches project the same number of columns.

use crate::plan::{
    is_aggregate_function, CaseWhen, ColumnRef, InMembers, Operand, Predicate, QueryPlan,
    RowBound, SelectClause,
};

use super::context::ValidationContext;
use super::errors::{ValidationError, ValidationResult};

const MAX_BOUND: i64 = 1 << 31;

pub(crate) struct SemanticValidator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> SemanticValidator<'a> {
    pub fn new(ctx: ValidationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Runs every semantic rule against one plan level.
    pub fn check(&self, plan: &QueryPlan) -> ValidationResult<()> {
        self.check_having(plan)?;
        self.check_group_by_coverage(plan)?;
        self.check_bounds(plan)?;
        self.check_set_op_arity(plan)?;
        Ok(())
    }

    fn check_having(&self, plan: &QueryPlan) -> ValidationResult<()> {
        if plan.having.is_some() && plan.group_by.is_empty() {
            return Err(ValidationError::having_without_group_by());
        }
        Ok(())
    }

    /// With GROUP BY present, every non-aggregate SELECT / ORDER BY
    /// expression must either equal a grouping expression or reference only
    /// grouped columns outside aggregate calls.
    fn check_group_by_coverage(&self, plan: &QueryPlan) -> ValidationResult<()> {
        if plan.group_by.is_empty() {
            return Ok(());
        }

        let mut grouped = Vec::new();
        for expr in &plan.group_by {
            unaggregated_columns(expr, &mut grouped);
        }

        if let SelectClause::Items(items) = &plan.select {
            for item in items {
                // Windowed expressions run after grouping.
                if item.over.is_some() {
                    continue;
                }
                self.check_covered(&item.expr, &plan.group_by, &grouped)?;
            }
        }
        for item in &plan.order_by {
            self.check_covered(&item.expr, &plan.group_by, &grouped)?;
        }
        Ok(())
    }

    fn check_covered(
        &self,
        expr: &Operand,
        group_by: &[Operand],
        grouped: &[ColumnRef],
    ) -> ValidationResult<()> {
        if group_by.contains(expr) {
            return Ok(());
        }
        let mut bare = Vec::new();
        unaggregated_columns(expr, &mut bare);
        for col in bare {
            if !grouped.contains(&col) {
                return Err(ValidationError::group_by_coverage(&col.to_string()));
            }
        }
        Ok(())
    }

    fn check_bounds(&self, plan: &QueryPlan) -> ValidationResult<()> {
        if let Some(RowBound::Value(v)) = &plan.limit {
            if *v < 0 || *v >= MAX_BOUND {
                return Err(ValidationError::limit_out_of_range("LIMIT", *v));
            }
        }
        if let Some(RowBound::Value(v)) = &plan.offset {
            if *v < 0 || *v >= MAX_BOUND {
                return Err(ValidationError::limit_out_of_range("OFFSET", *v));
            }
        }
        if plan.offset.is_some()
            && plan.limit.is_none()
            && !self.ctx.dialect.offset_without_limit()
        {
            return Err(ValidationError::offset_without_limit(
                self.ctx.dialect.target(),
            ));
        }
        Ok(())
    }

    fn check_set_op_arity(&self, plan: &QueryPlan) -> ValidationResult<()> {
        let Some(set_op) = &plan.set_op else {
            return Ok(());
        };
        if let (Some(left), Some(right)) = (plan.select.arity(), set_op.right.select.arity()) {
            if left != right {
                return Err(ValidationError::set_op_column_mismatch(left, right));
            }
        }
        Ok(())
    }
}

/// Collects column references that are NOT inside an aggregate call.
fn unaggregated_columns(expr: &Operand, out: &mut Vec<ColumnRef>) {
    match expr {
        Operand::Column(cr) => out.push(cr.clone()),
        Operand::Value(_) | Operand::Param(_) => {}
        Operand::Func { name, args } => {
            if is_aggregate_function(name) {
                return;
            }
            for arg in args {
                unaggregated_columns(arg, out);
            }
        }
        Operand::Case { when, else_value } => {
            for CaseWhen { cond, then } in when {
                predicate_unaggregated_columns(cond, out);
                unaggregated_columns(then, out);
            }
            if let Some(e) = else_value {
                unaggregated_columns(e, out);
            }
        }
        // A subquery is its own scope; its references are validated there.
        Operand::Subquery(_) => {}
    }
}

fn predicate_unaggregated_columns(pred: &Predicate, out: &mut Vec<ColumnRef>) {
    match pred {
        Predicate::Compare { left, right, .. } => {
            unaggregated_columns(left, out);
            unaggregated_columns(right, out);
        }
        Predicate::NullCheck { operand, .. } => unaggregated_columns(operand, out),
        Predicate::Match { expr, pattern, .. } => {
            unaggregated_columns(expr, out);
            unaggregated_columns(pattern, out);
        }
        Predicate::InSet { expr, members, .. } => {
            unaggregated_columns(expr, out);
            if let InMembers::List(items) = members {
                for item in items {
                    unaggregated_columns(item, out);
                }
            }
        }
        Predicate::Between { expr, low, high } => {
            unaggregated_columns(expr, out);
            unaggregated_columns(low, out);
            unaggregated_columns(high, out);
        }
        Predicate::And(branches) | Predicate::Or(branches) => {
            for branch in branches {
                predicate_unaggregated_columns(branch, out);
            }
        }
        Predicate::Not(inner) => predicate_unaggregated_columns(inner, out),
        Predicate::Exists { .. } => {}
        Predicate::Extension { args, .. } => {
            for arg in args {
                unaggregated_columns(arg, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::dialect::DialectProfile;
    use crate::plan::plan_from_value;
    use crate::schema::{ColumnInfo, SchemaSnapshot, TableInfo};

    use super::*;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::new(
            vec![TableInfo::new(
                "employees",
                vec![
                    ColumnInfo::not_null("employee_id", "INTEGER"),
                    ColumnInfo::new("department_id", "INTEGER"),
                ],
            )],
            vec![],
        )
        .unwrap()
    }

    fn check(plan: serde_json::Value, dialect: &DialectProfile) -> ValidationResult<()> {
        let snapshot = snapshot();
        let plan = plan_from_value(&plan).unwrap();
        SemanticValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect,
        })
        .check(&plan)
    }

    fn full_dialect() -> DialectProfile {
        DialectProfile::builder(["employees"], "postgres")
            .joins()
            .aggregations()
            .subqueries()
            .set_operations()
            .build()
            .unwrap()
    }

    #[test]
    fn test_having_requires_group_by() {
        let err = check(
            json!({
                "SELECT": "*",
                "HAVING": {"GT": [{"func": "COUNT", "args": []}, {"value": 1}]}
            }),
            &full_dialect(),
        )
        .unwrap_err();
        assert_eq!(err.code(), "validate.having_without_group_by");
    }

    #[test]
    fn test_grouped_projection_must_be_covered() {
        let dialect = full_dialect();
        let ok = json!({
            "SELECT": [
                {"expr": {"col": "employees.department_id"}},
                {"expr": {"func": "COUNT", "args": [{"col": "employees.employee_id"}]}}
            ],
            "GROUP_BY": [{"col": "employees.department_id"}]
        });
        assert!(check(ok, &dialect).is_ok());

        let bad = json!({
            "SELECT": [{"expr": {"col": "employees.employee_id"}}],
            "GROUP_BY": [{"col": "employees.department_id"}]
        });
        let err = check(bad, &dialect).unwrap_err();
        assert_eq!(err.code(), "validate.group_by_coverage");
        assert_eq!(err.details()["column"], "employees.employee_id");
    }

    #[test]
    fn test_limit_range() {
        let dialect = full_dialect();
        let err = check(
            json!({"SELECT": "*", "LIMIT": {"value": 2_i64.pow(31)}}),
            &dialect,
        )
        .unwrap_err();
        assert_eq!(err.code(), "validate.limit_out_of_range");
    }

    #[test]
    fn test_offset_without_limit_per_dialect() {
        let plan = json!({"SELECT": "*", "OFFSET": {"value": 10}});

        let pg = full_dialect();
        assert!(check(plan.clone(), &pg).is_ok());

        let lite = DialectProfile::builder(["employees"], "sqlite")
            .joins()
            .build()
            .unwrap();
        let err = check(plan, &lite).unwrap_err();
        assert_eq!(err.code(), "validate.offset_without_limit");
    }

    #[test]
    fn test_set_op_arity_must_match() {
        let dialect = full_dialect();
        let err = check(
            json!({
                "SELECT": [{"expr": {"col": "employees.employee_id"}}],
                "SET_OP": {"op": "UNION", "right": {
                    "SELECT": [
                        {"expr": {"col": "employees.employee_id"}},
                        {"expr": {"col": "employees.department_id"}}
                    ]
                }}
            }),
            &dialect,
        )
        .unwrap_err();
        assert_eq!(err.code(), "validate.set_op_column_mismatch");
    }

    #[test]
    fn test_wildcard_set_op_skips_arity_check() {
        let dialect = full_dialect();
        let ok = json!({
            "SELECT": "*",
            "SET_OP": {"op": "UNION", "right": {"SELECT": "*"}}
        });
        assert!(check(ok, &dialect).is_ok());
    }
}
