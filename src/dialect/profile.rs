//! Dialect profile and its fluent builder.

use std::collections::BTreeSet;

use crate::plan::{AGGREGATE_FUNCTIONS, WINDOW_FUNCTIONS};

use super::errors::{ProfileConfigError, ProfileResult};

/// Operators available in every profile (single-table filters).
const BASE_OPERATORS: &[&str] = &[
    "EQ", "NEQ", "GT", "GTE", "LT", "LTE", "BETWEEN", "IN", "NOT_IN", "IS_NULL", "IS_NOT_NULL",
    "LIKE", "AND", "OR", "NOT",
];

/// Extra operator unlocked by `joins()`.
const JOIN_EXTRA_OPERATORS: &[&str] = &["ILIKE"];

/// Extra operators unlocked by `subqueries()`.
const SUBQUERY_EXTRA_OPERATORS: &[&str] = &["EXISTS", "NOT_EXISTS"];

/// SQL feature groups a profile can enable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Capability {
    /// JOIN clauses; also unlocks ORDER BY, OFFSET, and ILIKE.
    Joins,
    /// GROUP BY, HAVING, aggregate functions, CASE expressions.
    Aggregations,
    /// Derived tables, EXISTS / NOT_EXISTS, IN (subquery).
    Subqueries,
    /// Common table expressions (WITH / WITH RECURSIVE).
    Ctes,
    /// UNION, UNION ALL, INTERSECT, EXCEPT.
    SetOperations,
    /// Window functions and the WINDOW clause.
    WindowFunctions,
}

impl Capability {
    /// Returns the capability name used in error details and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Joins => "joins",
            Capability::Aggregations => "aggregations",
            Capability::Subqueries => "subqueries",
            Capability::Ctes => "ctes",
            Capability::SetOperations => "set_operations",
            Capability::WindowFunctions => "window_functions",
        }
    }
}

/// Immutable feature-flag set for one compile target.
///
/// Always created via [`DialectProfile::builder`]; the builder enforces
/// capability dependencies at `build()` time.
#[derive(Debug, Clone)]
pub struct DialectProfile {
    target: String,
    tables: BTreeSet<String>,
    capabilities: BTreeSet<Capability>,
    operators: BTreeSet<String>,
    functions: BTreeSet<String>,
    max_join_depth: usize,
    max_limit: i64,
    offset_without_limit: bool,
}

impl DialectProfile {
    /// Returns a builder for the given table whitelist and target.
    ///
    /// The base profile allows single-table `SELECT / WHERE / LIMIT`.
    /// Chain feature methods to unlock more:
    ///
    /// ```
    /// use fenceql::dialect::DialectProfile;
    ///
    /// let profile = DialectProfile::builder(["employees"], "postgres")
    ///     .joins()
    ///     .aggregations()
    ///     .build()
    ///     .unwrap();
    /// assert!(profile.table_allowed("employees"));
    /// ```
    pub fn builder<I, S>(tables: I, target: &str) -> DialectProfileBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        DialectProfileBuilder::new(tables, target)
    }

    /// The compile target name (`"postgres"`, `"sqlite"`, `"mysql"`, ...).
    pub fn target(&self) -> &str {
        &self.target
    }

    /// True when the capability is enabled.
    pub fn allows(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// True when `table` is in the whitelist.
    pub fn table_allowed(&self, table: &str) -> bool {
        self.tables.contains(table)
    }

    /// True when the predicate operator is allowed.
    pub fn operator_allowed(&self, op: &str) -> bool {
        self.operators.contains(op)
    }

    /// True when the function name is in the allowlist.
    pub fn function_allowed(&self, name: &str) -> bool {
        self.functions.contains(name)
    }

    /// Maximum number of JOIN clauses per query.
    pub fn max_join_depth(&self) -> usize {
        self.max_join_depth
    }

    /// Upper bound on LIMIT values; larger values are clamped by policy.
    pub fn max_limit(&self) -> i64 {
        self.max_limit
    }

    /// True when the target accepts OFFSET without a LIMIT clause.
    pub fn offset_without_limit(&self) -> bool {
        self.offset_without_limit
    }

    /// Whitelisted table names.
    pub fn tables(&self) -> &BTreeSet<String> {
        &self.tables
    }

    /// Allowed predicate operators.
    pub fn operators(&self) -> &BTreeSet<String> {
        &self.operators
    }

    /// Allowed function names.
    pub fn functions(&self) -> &BTreeSet<String> {
        &self.functions
    }

    /// Enabled capabilities.
    pub fn capabilities(&self) -> &BTreeSet<Capability> {
        &self.capabilities
    }
}

/// Fluent builder for [`DialectProfile`].
///
/// Each method enables one independent feature group; methods can be called
/// in any order and combined freely. `build()` validates the combination.
#[derive(Debug, Clone)]
pub struct DialectProfileBuilder {
    target: String,
    tables: BTreeSet<String>,
    capabilities: BTreeSet<Capability>,
    operators: BTreeSet<String>,
    functions: BTreeSet<String>,
    max_join_depth: usize,
    max_limit: i64,
    offset_without_limit: bool,
}

impl DialectProfileBuilder {
    fn new<I, S>(tables: I, target: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.to_string(),
            tables: tables.into_iter().map(Into::into).collect(),
            capabilities: BTreeSet::new(),
            operators: BASE_OPERATORS.iter().map(|s| s.to_string()).collect(),
            functions: BTreeSet::new(),
            max_join_depth: 2,
            max_limit: 1000,
            // Postgres accepts a bare OFFSET; sqlite and mysql require LIMIT.
            offset_without_limit: target == "postgres",
        }
    }

    /// Enables JOIN clauses, ORDER BY, OFFSET, and ILIKE.
    pub fn joins(mut self) -> Self {
        self.capabilities.insert(Capability::Joins);
        self.operators
            .extend(JOIN_EXTRA_OPERATORS.iter().map(|s| s.to_string()));
        self
    }

    /// Enables GROUP BY, HAVING, and the built-in aggregate functions.
    pub fn aggregations(mut self) -> Self {
        self.capabilities.insert(Capability::Aggregations);
        self.functions
            .extend(AGGREGATE_FUNCTIONS.iter().map(|s| s.to_string()));
        self
    }

    /// Enables derived tables, EXISTS / NOT_EXISTS, and IN (subquery).
    pub fn subqueries(mut self) -> Self {
        self.capabilities.insert(Capability::Subqueries);
        self.operators
            .extend(SUBQUERY_EXTRA_OPERATORS.iter().map(|s| s.to_string()));
        self
    }

    /// Enables common table expressions. Requires `subqueries()`.
    pub fn ctes(mut self) -> Self {
        self.capabilities.insert(Capability::Ctes);
        self
    }

    /// Enables UNION, UNION ALL, INTERSECT, EXCEPT.
    pub fn set_operations(mut self) -> Self {
        self.capabilities.insert(Capability::SetOperations);
        self
    }

    /// Enables window functions and the WINDOW clause. Requires
    /// `aggregations()`.
    pub fn window_functions(mut self) -> Self {
        self.capabilities.insert(Capability::WindowFunctions);
        self.functions
            .extend(WINDOW_FUNCTIONS.iter().map(|s| s.to_string()));
        self
    }

    /// Adds scalar function names to the allowlist.
    pub fn functions<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functions.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds extension operator names (must match an `OperatorRegistry`
    /// handler at compile time).
    pub fn operators<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.operators.extend(names.into_iter().map(Into::into));
        self
    }

    /// Sets the maximum number of JOIN clauses per query (default 2).
    pub fn max_join_depth(mut self, depth: usize) -> Self {
        self.max_join_depth = depth;
        self
    }

    /// Sets the upper bound on LIMIT values (default 1000).
    pub fn max_limit(mut self, limit: i64) -> Self {
        self.max_limit = limit;
        self
    }

    /// Overrides the OFFSET-without-LIMIT rule derived from the target.
    pub fn offset_without_limit(mut self, allowed: bool) -> Self {
        self.offset_without_limit = allowed;
        self
    }

    /// Validates the configuration and returns the profile.
    ///
    /// # Errors
    ///
    /// Returns [`ProfileConfigError`] when the table whitelist is empty or a
    /// capability dependency is unmet (`ctes` without `subqueries`,
    /// `window_functions` without `aggregations`).
    pub fn build(self) -> ProfileResult<DialectProfile> {
        if self.tables.is_empty() {
            return Err(ProfileConfigError::empty_tables());
        }
        if self.capabilities.contains(&Capability::Ctes)
            && !self.capabilities.contains(&Capability::Subqueries)
        {
            return Err(ProfileConfigError::dependency("ctes", "subqueries"));
        }
        if self.capabilities.contains(&Capability::WindowFunctions)
            && !self.capabilities.contains(&Capability::Aggregations)
        {
            return Err(ProfileConfigError::dependency(
                "window_functions",
                "aggregations",
            ));
        }
        Ok(DialectProfile {
            target: self.target,
            tables: self.tables,
            capabilities: self.capabilities,
            operators: self.operators,
            functions: self.functions,
            max_join_depth: self.max_join_depth,
            max_limit: self.max_limit,
            offset_without_limit: self.offset_without_limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_profile_allows_single_table_filters() {
        let profile = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        assert!(profile.operator_allowed("EQ"));
        assert!(profile.operator_allowed("NOT_IN"));
        assert!(!profile.operator_allowed("ILIKE"));
        assert!(!profile.operator_allowed("EXISTS"));
        assert!(!profile.allows(Capability::Joins));
    }

    #[test]
    fn test_joins_unlock_ilike() {
        let profile = DialectProfile::builder(["employees"], "postgres")
            .joins()
            .build()
            .unwrap();
        assert!(profile.operator_allowed("ILIKE"));
        assert_eq!(profile.max_join_depth(), 2);
    }

    #[test]
    fn test_ctes_require_subqueries() {
        let err = DialectProfile::builder(["employees"], "postgres")
            .ctes()
            .build()
            .unwrap_err();
        assert_eq!(err.capability(), "ctes");
        assert_eq!(err.requires(), "subqueries");
    }

    #[test]
    fn test_window_functions_require_aggregations() {
        let err = DialectProfile::builder(["employees"], "sqlite")
            .window_functions()
            .build()
            .unwrap_err();
        assert_eq!(err.capability(), "window_functions");
        assert_eq!(err.requires(), "aggregations");
    }

    #[test]
    fn test_empty_tables_rejected() {
        let err = DialectProfile::builder(Vec::<String>::new(), "postgres")
            .build()
            .unwrap_err();
        assert_eq!(err.capability(), "tables");
    }

    #[test]
    fn test_aggregations_populate_function_allowlist() {
        let profile = DialectProfile::builder(["t"], "sqlite")
            .aggregations()
            .build()
            .unwrap();
        assert!(profile.function_allowed("COUNT"));
        assert!(!profile.function_allowed("ROW_NUMBER"));
    }

    #[test]
    fn test_offset_without_limit_follows_target() {
        let pg = DialectProfile::builder(["t"], "postgres").build().unwrap();
        let lite = DialectProfile::builder(["t"], "sqlite").build().unwrap();
        assert!(pg.offset_without_limit());
        assert!(!lite.offset_without_limit());
    }
}
