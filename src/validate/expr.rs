//! Operand and predicate validation.
//!
//! The two families are mutually recursive: CASE operands contain
//! predicate conditions, and predicates contain operands — and both can
//! descend into a full nested plan (EXISTS, IN subquery), which re-enters
//! the plan validator in a child scope so correlated references resolve.

use crate::dialect::Capability;
use crate::plan::{
    is_aggregate_function, is_window_function, InMembers, Operand, Predicate,
};

use super::context::{ScopeStack, ValidationContext};
use super::errors::{ValidationError, ValidationResult};
use super::schema::SchemaValidator;
use super::validator::PlanValidator;

pub(crate) struct ExprValidator<'a, 'b> {
    ctx: ValidationContext<'a>,
    validator: &'b PlanValidator<'a>,
    scope: &'b ScopeStack,
}

impl<'a, 'b> ExprValidator<'a, 'b> {
    pub fn new(
        ctx: ValidationContext<'a>,
        validator: &'b PlanValidator<'a>,
        scope: &'b ScopeStack,
    ) -> Self {
        Self {
            ctx,
            validator,
            scope,
        }
    }

    /// Validates a scalar expression tree.
    pub fn validate_operand(&self, operand: &Operand) -> ValidationResult<()> {
        match operand {
            Operand::Column(cr) => {
                SchemaValidator::new(self.ctx).check_column(cr, self.scope)?;
                Ok(())
            }
            Operand::Value(_) | Operand::Param(_) => Ok(()),
            Operand::Func { name, args } => {
                self.check_function(name)?;
                for arg in args {
                    self.validate_operand(arg)?;
                }
                Ok(())
            }
            Operand::Case { when, else_value } => {
                for branch in when {
                    self.validate_predicate(&branch.cond)?;
                    self.validate_operand(&branch.then)?;
                }
                if let Some(e) = else_value {
                    self.validate_operand(e)?;
                }
                Ok(())
            }
            Operand::Subquery(_) => Err(ValidationError::scalar_subquery_unsupported()),
        }
    }

    /// Validates a boolean expression tree.
    pub fn validate_predicate(&self, pred: &Predicate) -> ValidationResult<()> {
        let key = pred.operator_key();
        if !self.ctx.dialect.operator_allowed(key) {
            return Err(ValidationError::operator_not_allowed(
                key,
                self.ctx.dialect.operators().iter().map(String::as_str).collect(),
            ));
        }

        match pred {
            Predicate::Compare { left, right, .. } => {
                self.validate_operand(left)?;
                self.validate_operand(right)
            }
            Predicate::NullCheck { operand, .. } => {
                self.validate_operand(operand)?;
                self.check_null_operand(operand, key)
            }
            Predicate::Match { expr, pattern, .. } => {
                self.validate_operand(expr)?;
                self.validate_operand(pattern)
            }
            Predicate::InSet { expr, members, .. } => {
                self.validate_operand(expr)?;
                match members {
                    InMembers::List(items) => {
                        for item in items {
                            self.validate_operand(item)?;
                        }
                        Ok(())
                    }
                    InMembers::Subquery(plan) => {
                        self.require_subqueries("IN subquery")?;
                        self.validator.validate_plan(plan, self.scope)
                    }
                }
            }
            Predicate::Between { expr, low, high } => {
                self.validate_operand(expr)?;
                self.validate_operand(low)?;
                self.validate_operand(high)
            }
            Predicate::And(branches) | Predicate::Or(branches) => {
                for branch in branches {
                    self.validate_predicate(branch)?;
                }
                Ok(())
            }
            Predicate::Not(inner) => self.validate_predicate(inner),
            Predicate::Exists { plan, .. } => {
                self.require_subqueries(key)?;
                self.validator.validate_plan(plan, self.scope)
            }
            Predicate::Extension { args, .. } => {
                for arg in args {
                    self.validate_operand(arg)?;
                }
                Ok(())
            }
        }
    }

    fn check_function(&self, name: &str) -> ValidationResult<()> {
        if is_aggregate_function(name) {
            if !self.ctx.dialect.allows(Capability::Aggregations) {
                return Err(ValidationError::dialect_disabled(name, "aggregations"));
            }
            return Ok(());
        }
        if is_window_function(name) {
            if !self.ctx.dialect.allows(Capability::WindowFunctions) {
                return Err(ValidationError::dialect_disabled(name, "window_functions"));
            }
            return Ok(());
        }
        if !self.ctx.dialect.function_allowed(name) {
            return Err(ValidationError::bad_function(
                name,
                self.ctx.dialect.functions().iter().map(String::as_str).collect(),
            ));
        }
        Ok(())
    }

    /// IS_NULL / IS_NOT_NULL on a column declared NOT NULL is a
    /// contradiction the planner should repair.
    fn check_null_operand(&self, operand: &Operand, op_key: &str) -> ValidationResult<()> {
        if let Operand::Column(cr) = operand {
            let info = SchemaValidator::new(self.ctx).check_column(cr, self.scope)?;
            if let Some(info) = info {
                if !info.nullable {
                    return Err(ValidationError::nullability(&cr.table, &cr.column, op_key));
                }
            }
        }
        Ok(())
    }

    fn require_subqueries(&self, clause: &str) -> ValidationResult<()> {
        if self.ctx.dialect.allows(Capability::Subqueries) {
            Ok(())
        } else {
            Err(ValidationError::dialect_disabled(clause, "subqueries"))
        }
    }
}
