//! Dialect feature-flag validation.
//!
//! Checks that the plan stays within the capabilities the profile enables:
//! CTEs, derived tables, joins (and depth), aggregation clauses, window
//! functions, ORDER BY / OFFSET (unlocked by joins), and set operations.

use crate::dialect::Capability;
use crate::plan::{FromClause, QueryPlan, SelectClause};

use super::context::ValidationContext;
use super::errors::{ValidationError, ValidationResult};

pub(crate) struct DialectValidator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> DialectValidator<'a> {
    pub fn new(ctx: ValidationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Raises on the first disabled feature found.
    pub fn check(&self, plan: &QueryPlan) -> ValidationResult<()> {
        let dialect = self.ctx.dialect;

        if !plan.ctes.is_empty() {
            self.require(Capability::Ctes, "WITH")?;
            for cte in &plan.ctes {
                if cte.recursive && !dialect.allows(Capability::Subqueries) {
                    return Err(ValidationError::recursion_not_enabled(&cte.name));
                }
            }
        }

        if matches!(plan.from, Some(FromClause::Subquery { .. })) {
            self.require(Capability::Subqueries, "FROM subquery")?;
        }

        if !plan.joins.is_empty() {
            self.require(Capability::Joins, "JOIN")?;
            if plan.joins.len() > dialect.max_join_depth() {
                return Err(ValidationError::join_depth_exceeded(
                    plan.joins.len(),
                    dialect.max_join_depth(),
                ));
            }
        }

        if !plan.group_by.is_empty() {
            self.require(Capability::Aggregations, "GROUP_BY")?;
        }
        if plan.having.is_some() {
            self.require(Capability::Aggregations, "HAVING")?;
        }

        let uses_windows = !plan.windows.is_empty()
            || matches!(&plan.select, SelectClause::Items(items)
                if items.iter().any(|item| item.over.is_some()));
        if uses_windows {
            self.require(Capability::WindowFunctions, "WINDOW")?;
        }

        if !plan.order_by.is_empty() {
            self.require(Capability::Joins, "ORDER_BY")?;
        }
        if plan.offset.is_some() {
            self.require(Capability::Joins, "OFFSET")?;
        }
        if plan.set_op.is_some() {
            self.require(Capability::SetOperations, "SET_OP")?;
        }

        Ok(())
    }

    fn require(&self, capability: Capability, clause: &str) -> ValidationResult<()> {
        if self.ctx.dialect.allows(capability) {
            Ok(())
        } else {
            Err(ValidationError::dialect_disabled(clause, capability.as_str()))
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
                vec![ColumnInfo::not_null("employee_id", "INTEGER")],
            )],
            vec![],
        )
        .unwrap()
    }

    fn check(plan: serde_json::Value, dialect: &DialectProfile) -> ValidationResult<()> {
        let snapshot = snapshot();
        let plan = plan_from_value(&plan).unwrap();
        DialectValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect,
        })
        .check(&plan)
    }

    #[test]
    fn test_order_by_locked_behind_joins() {
        let base = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        let err = check(
            json!({
                "SELECT": "*",
                "ORDER_BY": [{"expr": {"col": "employees.employee_id"}}]
            }),
            &base,
        )
        .unwrap_err();
        assert_eq!(err.code(), "validate.dialect_disabled");
        assert_eq!(err.details()["capability"], "joins");
    }

    #[test]
    fn test_join_depth_boundary() {
        let dialect = DialectProfile::builder(["employees"], "postgres")
            .joins()
            .max_join_depth(1)
            .build()
            .unwrap();
        let one = json!({
            "SELECT": "*",
            "JOIN": [{"rel": "a__b"}]
        });
        assert!(check(one, &dialect).is_ok());

        let two = json!({
            "SELECT": "*",
            "JOIN": [{"rel": "a__b"}, {"rel": "b__c"}]
        });
        let err = check(two, &dialect).unwrap_err();
        assert_eq!(err.code(), "validate.join_depth_exceeded");
    }

    #[test]
    fn test_recursive_cte_needs_subqueries() {
        // The profile below cannot be built via the public builder (ctes
        // requires subqueries), so assemble the gating case directly: a
        // recursive CTE plan checked against a ctes-and-subqueries profile
        // passes, while the plain-ctes message is covered by the builder
        // dependency test.
        let dialect = DialectProfile::builder(["employees"], "postgres")
            .subqueries()
            .ctes()
            .build()
            .unwrap();
        let plan = json!({
            "WITH": [{"name": "chain", "recursive": true, "plan": {
                "SELECT": "*", "FROM": {"table": "employees"}
            }}],
            "SELECT": "*",
            "FROM": {"table": "chain"}
        });
        assert!(check(plan, &dialect).is_ok());
    }

    #[test]
    fn test_set_op_requires_capability() {
        let base = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        let err = check(
            json!({
                "SELECT": "*",
                "SET_OP": {"op": "UNION", "right": {"SELECT": "*"}}
            }),
            &base,
        )
        .unwrap_err();
        assert_eq!(err.details()["capability"], "set_operations");
    }
}
