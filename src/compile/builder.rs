//! Plan → SQL assembly.
//!
//! `QueryBuilder` drives clause emission in a fixed order: WITH, SELECT,
//! FROM, JOINs, WHERE, GROUP BY, HAVING, WINDOW, SET_OP, ORDER BY, LIMIT,
//! OFFSET. All dialect-specific rendering goes through the injected
//! `SqlCompiler`; extension operators go through the injected
//! `OperatorRegistry`. The builder holds no persistent state — each call
//! owns its output buffer and parameter accumulator.

use std::collections::BTreeMap;

use serde_json::json;

use crate::plan::{
    CteClause, FromClause, OrderByItem, QueryPlan, RowBound, SelectClause, SetOpClause,
    WindowDef,
};
use crate::schema::SchemaSnapshot;

use super::compiler::{CompiledSQL, SqlCompiler};
use super::errors::{CompilationError, CompileResult};
use super::expression::ParamState;
use super::registry::OperatorRegistry;

/// Compiles a validated, policy-enforced QueryPlan to parameterized SQL.
pub struct QueryBuilder<'a> {
    pub(crate) compiler: &'a dyn SqlCompiler,
    pub(crate) snapshot: &'a SchemaSnapshot,
    pub(crate) operators: &'a OperatorRegistry,
}

impl<'a> QueryBuilder<'a> {
    /// Creates a builder over shared, immutable inputs.
    pub fn new(
        compiler: &'a dyn SqlCompiler,
        snapshot: &'a SchemaSnapshot,
        operators: &'a OperatorRegistry,
    ) -> Self {
        Self {
            compiler,
            snapshot,
            operators,
        }
    }

    /// Compiles `plan` to SQL plus its parameter bindings.
    pub fn build(&self, plan: &QueryPlan) -> CompileResult<CompiledSQL> {
        let mut state = ParamState::default();
        let sql = self.build_statement(plan, &mut state)?;
        Ok(CompiledSQL {
            sql,
            params: state.params,
            required_params: state.required,
            dialect: self.compiler.dialect_name().to_string(),
        })
    }

    /// Full statement: CTE prologue, core query or set-op chain, tail.
    pub(crate) fn build_statement(
        &self,
        plan: &QueryPlan,
        state: &mut ParamState,
    ) -> CompileResult<String> {
        let mut out = String::new();
        if !plan.ctes.is_empty() {
            out.push_str(&self.build_ctes(&plan.ctes, state)?);
            out.push('\n');
        }
        if let Some(set_op) = &plan.set_op {
            out.push_str(&self.build_core(plan, state, false)?);
            out.push('\n');
            out.push_str(&self.build_set_chain(set_op, state)?);
            if let Some(tail) = self.build_tail(plan, state)? {
                out.push('\n');
                out.push_str(&tail);
            }
        } else {
            out.push_str(&self.build_core(plan, state, true)?);
        }
        Ok(out)
    }

    /// SELECT through WINDOW; the tail (ORDER BY, LIMIT, OFFSET) is
    /// included unless the caller emits it after a set-op chain.
    fn build_core(
        &self,
        plan: &QueryPlan,
        state: &mut ParamState,
        include_tail: bool,
    ) -> CompileResult<String> {
        let mut parts: Vec<String> = Vec::new();

        parts.push(self.build_select(plan, state)?);

        if let Some(from) = &plan.from {
            parts.push(self.build_from(from, state)?);
        }
        if !plan.joins.is_empty() {
            parts.extend(self.build_joins(plan)?);
        }
        if let Some(pred) = &plan.where_clause {
            parts.push(format!("WHERE {}", self.render_predicate(pred, state)?));
        }
        if !plan.group_by.is_empty() {
            let mut exprs = Vec::with_capacity(plan.group_by.len());
            for expr in &plan.group_by {
                exprs.push(self.render_operand(expr, state)?);
            }
            parts.push(format!("GROUP BY {}", exprs.join(", ")));
        }
        if let Some(pred) = &plan.having {
            parts.push(format!("HAVING {}", self.render_predicate(pred, state)?));
        }
        if !plan.windows.is_empty() {
            parts.push(self.build_windows(&plan.windows, state)?);
        }
        if include_tail {
            if let Some(tail) = self.build_tail(plan, state)? {
                parts.push(tail);
            }
        }
        Ok(parts.join("\n"))
    }

    fn build_select(&self, plan: &QueryPlan, state: &mut ParamState) -> CompileResult<String> {
        match &plan.select {
            SelectClause::Wildcard => Ok("SELECT *".to_string()),
            SelectClause::Items(items) => {
                let mut rendered = Vec::with_capacity(items.len());
                for item in items {
                    let mut sql = self.render_operand(&item.expr, state)?;
                    if let Some(over) = &item.over {
                        sql = format!("{sql} OVER {}", self.compiler.quote_identifier(over));
                    }
                    if let Some(alias) = &item.alias {
                        sql = format!("{sql} AS {}", self.compiler.quote_identifier(alias));
                    }
                    rendered.push(sql);
                }
                Ok(format!("SELECT {}", rendered.join(", ")))
            }
        }
    }

    fn build_from(&self, from: &FromClause, state: &mut ParamState) -> CompileResult<String> {
        match from {
            FromClause::Table { table } => {
                Ok(format!("FROM {}", self.compiler.quote_identifier(table)))
            }
            FromClause::Subquery { plan, alias } => {
                let sub = self.build_statement(plan, state)?;
                Ok(format!(
                    "FROM (\n{sub}\n) AS {}",
                    self.compiler.quote_identifier(alias)
                ))
            }
        }
    }

    /// Emits JOIN fragments in declared order. The relationship endpoint
    /// not yet in scope is the newly joined table; the ON clause pairs the
    /// in-scope qualifier with the new one.
    fn build_joins(&self, plan: &QueryPlan) -> CompileResult<Vec<String>> {
        let quote = |name: &str| self.compiler.quote_identifier(name);
        // table name -> qualifier it is visible under
        let mut in_scope: BTreeMap<String, String> = BTreeMap::new();
        if let Some(base) = plan.base_table() {
            in_scope.insert(base.to_string(), base.to_string());
        }

        let mut fragments = Vec::with_capacity(plan.joins.len());
        for join in &plan.joins {
            let rel = self.snapshot.relationship(&join.rel).ok_or_else(|| {
                CompilationError::internal(format!(
                    "relationship '{}' disappeared between validation and compilation",
                    join.rel
                ))
            })?;

            let (anchor_table, anchor_col, new_table, new_col) =
                if in_scope.contains_key(&rel.from_table) {
                    (&rel.from_table, &rel.from_col, &rel.to_table, &rel.to_col)
                } else if in_scope.contains_key(&rel.to_table) {
                    (&rel.to_table, &rel.to_col, &rel.from_table, &rel.from_col)
                } else {
                    return Err(CompilationError::internal(format!(
                        "join '{}' has no endpoint in scope",
                        join.rel
                    )));
                };

            let anchor_qualifier = in_scope[anchor_table].clone();
            let new_qualifier = join.alias.clone().unwrap_or_else(|| new_table.clone());

            let mut table_sql = quote(new_table);
            if join.alias.is_some() {
                table_sql = format!("{table_sql} AS {}", quote(&new_qualifier));
            }
            fragments.push(format!(
                "{} JOIN {table_sql} ON {}.{} = {}.{}",
                join.join_type.as_str(),
                quote(&anchor_qualifier),
                quote(anchor_col),
                quote(&new_qualifier),
                quote(new_col),
            ));
            in_scope.insert(new_table.clone(), new_qualifier);
        }
        Ok(fragments)
    }

    fn build_windows(
        &self,
        windows: &[WindowDef],
        state: &mut ParamState,
    ) -> CompileResult<String> {
        let mut defs = Vec::with_capacity(windows.len());
        for window in windows {
            let mut spec = Vec::new();
            if !window.partition_by.is_empty() {
                let mut exprs = Vec::with_capacity(window.partition_by.len());
                for expr in &window.partition_by {
                    exprs.push(self.render_operand(expr, state)?);
                }
                spec.push(format!("PARTITION BY {}", exprs.join(", ")));
            }
            if !window.order_by.is_empty() {
                spec.push(format!(
                    "ORDER BY {}",
                    self.render_order_items(&window.order_by, state)?
                ));
            }
            if let Some(frame) = &window.frame {
                spec.push(format!(
                    "{} BETWEEN {} AND {}",
                    frame.frame_type.as_str(),
                    frame.start,
                    frame.end
                ));
            }
            defs.push(format!(
                "{} AS ({})",
                self.compiler.quote_identifier(&window.name),
                spec.join(" ")
            ));
        }
        Ok(format!("WINDOW {}", defs.join(", ")))
    }

    /// UNION / INTERSECT / EXCEPT chain; each branch is a core query whose
    /// own tail is suppressed (the combined statement carries one tail).
    fn build_set_chain(
        &self,
        set_op: &SetOpClause,
        state: &mut ParamState,
    ) -> CompileResult<String> {
        if !set_op.right.ctes.is_empty() {
            return Err(CompilationError::internal(
                "CTEs are not supported on a set-operation branch",
            ));
        }
        let mut out = set_op.op.sql().to_string();
        out.push('\n');
        out.push_str(&self.build_core(&set_op.right, state, false)?);
        if let Some(next) = &set_op.right.set_op {
            out.push('\n');
            out.push_str(&self.build_set_chain(next, state)?);
        }
        Ok(out)
    }

    /// ORDER BY, LIMIT, OFFSET — `None` when the plan has none of them.
    fn build_tail(
        &self,
        plan: &QueryPlan,
        state: &mut ParamState,
    ) -> CompileResult<Option<String>> {
        let mut parts = Vec::new();
        if !plan.order_by.is_empty() {
            parts.push(format!(
                "ORDER BY {}",
                self.render_order_items(&plan.order_by, state)?
            ));
        }
        if let Some(bound) = &plan.limit {
            parts.push(format!("LIMIT {}", self.render_bound(bound, state)));
        }
        if let Some(bound) = &plan.offset {
            parts.push(format!("OFFSET {}", self.render_bound(bound, state)));
        }
        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join("\n")))
        }
    }

    fn render_order_items(
        &self,
        items: &[OrderByItem],
        state: &mut ParamState,
    ) -> CompileResult<String> {
        let mut rendered = Vec::with_capacity(items.len());
        for item in items {
            rendered.push(format!(
                "{} {}",
                self.render_operand(&item.expr, state)?,
                item.dir.as_str()
            ));
        }
        Ok(rendered.join(", "))
    }

    /// LIMIT / OFFSET values are bound, never inlined.
    fn render_bound(&self, bound: &RowBound, state: &mut ParamState) -> String {
        match bound {
            RowBound::Value(v) => {
                let name = state.bind_value(json!(v));
                self.compiler.param_placeholder(&name)
            }
            RowBound::Param(name) => {
                state.require(name);
                self.compiler.param_placeholder(name)
            }
        }
    }

    fn build_ctes(&self, ctes: &[CteClause], state: &mut ParamState) -> CompileResult<String> {
        let recursive = ctes.iter().any(|cte| cte.recursive);
        let keyword = if recursive { "WITH RECURSIVE" } else { "WITH" };
        let mut defs = Vec::with_capacity(ctes.len());
        for cte in ctes {
            let body = self.build_statement(&cte.plan, state)?;
            defs.push(format!(
                "{} AS (\n{body}\n)",
                self.compiler.quote_identifier(&cte.name)
            ));
        }
        Ok(format!("{keyword} {}", defs.join(", ")))
    }
}
