//! Policy application over a validated plan.
//!
//! Order of enforcement:
//! 1. Column deny-lists, over every reference in the whole tree.
//! 2. Param-bound columns per in-scope table: accept an existing required
//!    conjunct, reject OR-bypasses, otherwise inject or fail.
//! 3. LIMIT defaulting and clamping at the root.
//!
//! The engine owns the plan while it runs and hands back the (possibly
//! mutated) plan plus the set of required runtime parameter names.

use std::collections::BTreeSet;

use crate::dialect::DialectProfile;
use crate::plan::{
    FromClause, InMembers, Predicate, QueryPlan, RowBound,
};
use crate::schema::SchemaSnapshot;
use crate::validate::{ValidationError, ValidationResult};

use super::config::PolicyConfig;

/// A single `(qualifier.column = :param)` requirement in force.
struct RequiredBinding<'a> {
    qualifier: &'a str,
    table: &'a str,
    column: &'a str,
    param: &'a str,
}

/// Applies policy rules to a validated QueryPlan.
pub struct PolicyEngine<'a> {
    config: &'a PolicyConfig,
    snapshot: &'a SchemaSnapshot,
    dialect: &'a DialectProfile,
}

impl<'a> PolicyEngine<'a> {
    /// Creates an engine over shared, immutable inputs.
    pub fn new(
        config: &'a PolicyConfig,
        snapshot: &'a SchemaSnapshot,
        dialect: &'a DialectProfile,
    ) -> Self {
        Self {
            config,
            snapshot,
            dialect,
        }
    }

    /// Applies all policy rules and returns the enforced plan together
    /// with the set of required runtime parameter names.
    ///
    /// # Errors
    ///
    /// - `policy.column_denied` — a referenced column is deny-listed
    /// - `policy.or_bypass` — a required predicate is neutralised by OR
    /// - `policy.missing_required_param` — injection disabled and the
    ///   required predicate is absent
    pub fn apply(&self, mut plan: QueryPlan) -> ValidationResult<(QueryPlan, BTreeSet<String>)> {
        self.check_denied(&plan)?;
        let mut required = BTreeSet::new();
        self.enforce_plan(&mut plan, false, &mut required)?;
        Ok((plan, required))
    }

    // ------------------------------------------------------------------
    // Deny-lists
    // ------------------------------------------------------------------

    fn check_denied(&self, plan: &QueryPlan) -> ValidationResult<()> {
        for col in plan.referenced_columns() {
            if let Some(tpol) = self.config.tables.get(&col.table) {
                if tpol.denied_columns.contains(&col.column) {
                    return Err(ValidationError::column_denied(&col.table, &col.column));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Param-bound columns
    // ------------------------------------------------------------------

    fn enforce_plan(
        &self,
        plan: &mut QueryPlan,
        nested: bool,
        required: &mut BTreeSet<String>,
    ) -> ValidationResult<()> {
        for cte in &mut plan.ctes {
            self.enforce_plan(&mut cte.plan, true, required)?;
        }
        if let Some(FromClause::Subquery { plan: sub, .. }) = &mut plan.from {
            self.enforce_plan(sub, true, required)?;
        }
        if let Some(set_op) = &mut plan.set_op {
            self.enforce_plan(&mut set_op.right, true, required)?;
        }
        if let Some(pred) = &mut plan.where_clause {
            self.enforce_predicate_subplans(pred, required)?;
        }
        if let Some(pred) = &mut plan.having {
            self.enforce_predicate_subplans(pred, required)?;
        }

        for (qualifier, table) in self.scope_tables(plan) {
            let Some(tpol) = self.config.tables.get(&table) else {
                continue;
            };
            for (column, param) in &tpol.param_bound_columns {
                let binding = RequiredBinding {
                    qualifier: &qualifier,
                    table: &table,
                    column,
                    param,
                };
                self.enforce_binding(plan, &binding)?;
                required.insert(param.clone());
            }
        }

        if !nested {
            self.enforce_limit(plan);
        }
        Ok(())
    }

    /// Subquery plans nested inside predicates get their own enforcement.
    fn enforce_predicate_subplans(
        &self,
        pred: &mut Predicate,
        required: &mut BTreeSet<String>,
    ) -> ValidationResult<()> {
        match pred {
            Predicate::Exists { plan, .. } => self.enforce_plan(plan, true, required),
            Predicate::InSet {
                members: InMembers::Subquery(plan),
                ..
            } => self.enforce_plan(plan, true, required),
            Predicate::And(branches) | Predicate::Or(branches) => {
                for branch in branches {
                    self.enforce_predicate_subplans(branch, required)?;
                }
                Ok(())
            }
            Predicate::Not(inner) => self.enforce_predicate_subplans(inner, required),
            _ => Ok(()),
        }
    }

    /// Tables visible at this plan level, as `(qualifier, table)` pairs:
    /// the FROM table plus each JOIN-introduced endpoint (under its alias
    /// when one is declared).
    fn scope_tables(&self, plan: &QueryPlan) -> Vec<(String, String)> {
        let mut out = Vec::new();
        let mut present: BTreeSet<String> = BTreeSet::new();
        if let Some(table) = plan.base_table() {
            out.push((table.to_string(), table.to_string()));
            present.insert(table.to_string());
        }
        for join in &plan.joins {
            let Some(rel) = self.snapshot.relationship(&join.rel) else {
                continue;
            };
            let introduced = if present.contains(&rel.from_table) {
                rel.to_table.clone()
            } else if present.contains(&rel.to_table) {
                rel.from_table.clone()
            } else {
                continue;
            };
            let qualifier = join.alias.clone().unwrap_or_else(|| introduced.clone());
            present.insert(introduced.clone());
            out.push((qualifier, introduced));
        }
        out
    }

    fn enforce_binding(
        &self,
        plan: &mut QueryPlan,
        binding: &RequiredBinding<'_>,
    ) -> ValidationResult<()> {
        if let Some(where_clause) = &plan.where_clause {
            check_or_bypass(where_clause, binding)?;
            if contains_required(where_clause, binding) {
                return Ok(());
            }
        }
        if !self.config.inject_missing_params {
            return Err(ValidationError::missing_required_param(
                &format!("{}.{}", binding.table, binding.column),
                binding.param,
            ));
        }
        let eq = Predicate::column_eq_param(binding.qualifier, binding.column, binding.param);
        plan.where_clause = Some(match plan.where_clause.take() {
            None => eq,
            Some(Predicate::And(mut branches)) => {
                branches.push(eq);
                Predicate::And(branches)
            }
            Some(other) => Predicate::And(vec![other, eq]),
        });
        Ok(())
    }

    // ------------------------------------------------------------------
    // LIMIT
    // ------------------------------------------------------------------

    fn enforce_limit(&self, plan: &mut QueryPlan) {
        match &plan.limit {
            None => {
                if let Some(limit) = self.config.default_limit {
                    plan.limit = Some(RowBound::Value(i64::from(limit)));
                }
            }
            Some(RowBound::Value(v)) if *v > self.dialect.max_limit() => {
                plan.limit = Some(RowBound::Value(self.dialect.max_limit()));
            }
            _ => {}
        }
    }
}

/// True when `pred` is exactly the required equality conjunct.
fn is_required_eq(pred: &Predicate, binding: &RequiredBinding<'_>) -> bool {
    match pred {
        Predicate::Compare {
            op: crate::plan::CompareOp::Eq,
            left: crate::plan::Operand::Column(cr),
            right: crate::plan::Operand::Param(name),
        } => cr.table == binding.qualifier && cr.column == binding.column && name == binding.param,
        _ => false,
    }
}

/// Conjunctive containment: the required equality holds on every path.
/// AND needs any branch; OR needs every branch.
fn contains_required(pred: &Predicate, binding: &RequiredBinding<'_>) -> bool {
    if is_required_eq(pred, binding) {
        return true;
    }
    match pred {
        Predicate::And(branches) => branches.iter().any(|b| contains_required(b, binding)),
        Predicate::Or(branches) => {
            !branches.is_empty() && branches.iter().all(|b| contains_required(b, binding))
        }
        _ => false,
    }
}

/// A required equality inside some OR branches but not all of them means
/// the restriction is optional — a bypass.
fn check_or_bypass(pred: &Predicate, binding: &RequiredBinding<'_>) -> ValidationResult<()> {
    match pred {
        Predicate::And(branches) => {
            for branch in branches {
                check_or_bypass(branch, binding)?;
            }
            Ok(())
        }
        Predicate::Or(branches) => {
            let marks: Vec<bool> = branches
                .iter()
                .map(|b| contains_required(b, binding))
                .collect();
            if marks.iter().any(|&m| m) && !marks.iter().all(|&m| m) {
                return Err(ValidationError::or_bypass(
                    binding.table,
                    binding.column,
                    binding.param,
                ));
            }
            for branch in branches {
                check_or_bypass(branch, binding)?;
            }
            Ok(())
        }
        Predicate::Not(inner) => check_or_bypass(inner, binding),
        _ => Ok(()),
    }
}
