//! Plan validation orchestrator.
//!
//! `PlanValidator` drives the sub-validators in order: dialect feature
//! flags first, then scope construction (CTEs push before the main body),
//! FROM / JOIN existence, expression checks, and the semantic rules.
//! Nested plans (CTE bodies, derived tables, subquery predicates, set-op
//! branches) re-enter `validate_plan` with an inherited scope.
//!
//! The first violation found is raised; nothing is collected.

use std::collections::HashSet;

use crate::dialect::DialectProfile;
use crate::plan::{FromClause, QueryPlan, SelectClause};
use crate::schema::SchemaSnapshot;

use super::context::{ScopeStack, ValidationContext};
use super::dialect::DialectValidator;
use super::errors::{ValidationError, ValidationResult};
use super::expr::ExprValidator;
use super::schema::SchemaValidator;
use super::semantic::SemanticValidator;

/// Validates a QueryPlan against a SchemaSnapshot and DialectProfile.
pub struct PlanValidator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> PlanValidator<'a> {
    /// Creates a validator over shared, immutable inputs.
    pub fn new(snapshot: &'a SchemaSnapshot, dialect: &'a DialectProfile) -> Self {
        Self {
            ctx: ValidationContext { snapshot, dialect },
        }
    }

    /// Validates `plan`, raising the first violation found.
    pub fn validate(&self, plan: &QueryPlan) -> ValidationResult<()> {
        self.validate_plan(plan, &ScopeStack::root())
    }

    /// Validates one plan level inside `parent` visibility.
    pub(crate) fn validate_plan(
        &self,
        plan: &QueryPlan,
        parent: &ScopeStack,
    ) -> ValidationResult<()> {
        DialectValidator::new(self.ctx).check(plan)?;

        let schema = SchemaValidator::new(self.ctx);
        let mut scope = parent.child();

        // CTE names push before the main body; a recursive CTE sees its own
        // name inside its body.
        for cte in &plan.ctes {
            if cte.recursive {
                scope.bind_virtual(&cte.name);
                self.validate_plan(&cte.plan, &scope)?;
            } else {
                self.validate_plan(&cte.plan, &scope)?;
                scope.bind_virtual(&cte.name);
            }
        }

        match &plan.from {
            Some(FromClause::Table { table }) => {
                schema.check_table(table, &scope)?;
                scope.bind_table(table, table);
            }
            Some(FromClause::Subquery { plan: sub, alias }) => {
                self.validate_plan(sub, &scope)?;
                scope.bind_virtual(alias);
            }
            None => {}
        }

        for join in &plan.joins {
            let introduced = schema.check_join(join, &scope)?;
            let name = join.alias.clone().unwrap_or_else(|| introduced.clone());
            scope.bind_table(&name, &introduced);
        }

        self.check_select_shape(plan)?;

        let exprs = ExprValidator::new(self.ctx, self, &scope);
        if let SelectClause::Items(items) = &plan.select {
            for item in items {
                exprs.validate_operand(&item.expr)?;
            }
        }
        if let Some(pred) = &plan.where_clause {
            exprs.validate_predicate(pred)?;
        }
        for expr in &plan.group_by {
            exprs.validate_operand(expr)?;
        }
        if let Some(pred) = &plan.having {
            exprs.validate_predicate(pred)?;
        }
        for window in &plan.windows {
            for expr in &window.partition_by {
                exprs.validate_operand(expr)?;
            }
            for item in &window.order_by {
                exprs.validate_operand(&item.expr)?;
            }
        }
        for item in &plan.order_by {
            exprs.validate_operand(&item.expr)?;
        }

        SemanticValidator::new(self.ctx).check(plan)?;

        // A set-op branch is a sibling query: it sees the parent scope, not
        // this level's FROM.
        if let Some(set_op) = &plan.set_op {
            self.validate_plan(&set_op.right, parent)?;
        }

        Ok(())
    }

    /// Alias uniqueness and named-window resolution for the SELECT list.
    fn check_select_shape(&self, plan: &QueryPlan) -> ValidationResult<()> {
        let SelectClause::Items(items) = &plan.select else {
            return Ok(());
        };
        let mut seen = HashSet::new();
        for item in items {
            if let Some(alias) = &item.alias {
                if !seen.insert(alias.as_str()) {
                    return Err(ValidationError::duplicate_alias(alias));
                }
            }
            if let Some(over) = &item.over {
                if !plan.windows.iter().any(|w| &w.name == over) {
                    return Err(ValidationError::unknown_window(
                        over,
                        plan.windows.iter().map(|w| w.name.as_str()).collect(),
                    ));
                }
            }
        }
        Ok(())
    }
}
