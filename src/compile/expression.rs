//! Operand and predicate rendering.
//!
//! Lives in its own file because the two families are mutually recursive —
//! CASE operands contain predicate conditions, predicates contain operands,
//! and subquery predicates re-enter full statement assembly with the same
//! parameter state so placeholder names stay globally unique.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::plan::{InMembers, Operand, Predicate};

use super::builder::QueryBuilder;
use super::errors::{CompilationError, CompileResult};

/// Per-call parameter accumulator.
///
/// One instance is threaded through every clause and every nested plan of
/// a single compilation, so literal parameter names never collide across
/// CTEs, set-op branches, and correlated subqueries.
#[derive(Debug, Default)]
pub struct ParamState {
    counter: usize,
    /// Bound literal values, keyed by generated name.
    pub params: BTreeMap<String, Value>,
    /// Logical runtime parameter names referenced by the plan.
    pub required: BTreeSet<String>,
}

impl ParamState {
    /// Binds a literal and returns its fresh `param_{n}` name.
    pub fn bind_value(&mut self, value: Value) -> String {
        let name = format!("param_{}", self.counter);
        self.counter += 1;
        self.params.insert(name.clone(), value);
        name
    }

    /// Records a runtime parameter the caller must supply.
    pub fn require(&mut self, name: &str) {
        self.required.insert(name.to_string());
    }
}

impl QueryBuilder<'_> {
    /// Renders a scalar expression, binding literals as parameters.
    pub(crate) fn render_operand(
        &self,
        operand: &Operand,
        state: &mut ParamState,
    ) -> CompileResult<String> {
        match operand {
            Operand::Column(cr) => Ok(format!(
                "{}.{}",
                self.compiler.quote_identifier(&cr.table),
                self.compiler.quote_identifier(&cr.column)
            )),
            Operand::Value(v) => {
                let name = state.bind_value(v.clone());
                Ok(self.compiler.param_placeholder(&name))
            }
            Operand::Param(name) => {
                state.require(name);
                Ok(self.compiler.param_placeholder(name))
            }
            Operand::Func { name, args } => {
                self.compiler
                    .build_func_call(name, args, &mut |arg| self.render_operand(arg, &mut *state))
            }
            Operand::Case { when, else_value } => {
                let mut parts = vec!["CASE".to_string()];
                for branch in when {
                    let cond = self.render_predicate(&branch.cond, state)?;
                    let then = self.render_operand(&branch.then, state)?;
                    parts.push(format!("WHEN {cond} THEN {then}"));
                }
                if let Some(e) = else_value {
                    parts.push(format!("ELSE {}", self.render_operand(e, state)?));
                }
                parts.push("END".to_string());
                Ok(parts.join(" "))
            }
            Operand::Subquery(_) => Err(CompilationError::internal(
                "scalar subquery reached the compiler",
            )),
        }
    }

    /// Renders a boolean expression.
    pub(crate) fn render_predicate(
        &self,
        pred: &Predicate,
        state: &mut ParamState,
    ) -> CompileResult<String> {
        match pred {
            Predicate::Compare { op, left, right } => {
                let left = self.render_operand(left, state)?;
                let right = self.render_operand(right, state)?;
                Ok(format!("{left} {} {right}", op.sql()))
            }
            Predicate::NullCheck { negated, operand } => {
                let expr = self.render_operand(operand, state)?;
                if *negated {
                    Ok(format!("{expr} IS NOT NULL"))
                } else {
                    Ok(format!("{expr} IS NULL"))
                }
            }
            Predicate::Match { op, expr, pattern } => {
                let left = self.render_operand(expr, state)?;
                let right = self.render_operand(pattern, state)?;
                Ok(self.compiler.build_like(&left, *op, &right))
            }
            Predicate::InSet {
                negated,
                expr,
                members,
            } => {
                let expr = self.render_operand(expr, state)?;
                let keyword = if *negated { "NOT IN" } else { "IN" };
                match members {
                    InMembers::List(items) => {
                        let mut parts = Vec::with_capacity(items.len());
                        for item in items {
                            parts.push(self.render_operand(item, state)?);
                        }
                        Ok(format!("{expr} {keyword} ({})", parts.join(", ")))
                    }
                    InMembers::Subquery(plan) => {
                        let sub = self.build_statement(plan, state)?;
                        Ok(format!("{expr} {keyword} (\n{sub}\n)"))
                    }
                }
            }
            Predicate::Between { expr, low, high } => {
                let expr = self.render_operand(expr, state)?;
                let low = self.render_operand(low, state)?;
                let high = self.render_operand(high, state)?;
                Ok(format!("{expr} BETWEEN {low} AND {high}"))
            }
            Predicate::And(branches) | Predicate::Or(branches) => {
                let joiner = if matches!(pred, Predicate::And(_)) {
                    " AND "
                } else {
                    " OR "
                };
                let mut parts = Vec::with_capacity(branches.len());
                for branch in branches {
                    parts.push(format!("({})", self.render_predicate(branch, state)?));
                }
                Ok(parts.join(joiner))
            }
            Predicate::Not(inner) => {
                Ok(format!("NOT ({})", self.render_predicate(inner, state)?))
            }
            Predicate::Exists { negated, plan } => {
                let sub = self.build_statement(plan, state)?;
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                Ok(format!("{keyword} (\n{sub}\n)"))
            }
            Predicate::Extension { op, args } => {
                let handler = self
                    .operators
                    .get(op)
                    .ok_or_else(|| CompilationError::unsupported_operator(op))?;
                handler(op, args, &mut |arg| self.render_operand(arg, &mut *state))
            }
        }
    }
}
