//! Policy configuration types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Per-table policy rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TablePolicy {
    /// Columns that must always be constrained by equality to a named
    /// runtime parameter, e.g. `{"tenant_id": "TENANT"}`.
    #[serde(default)]
    pub param_bound_columns: BTreeMap<String, String>,
    /// Columns forbidden in any plan referencing this table.
    #[serde(default)]
    pub denied_columns: BTreeSet<String>,
}

impl TablePolicy {
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires `column` to be constrained by `param`.
    pub fn bind_param(mut self, column: impl Into<String>, param: impl Into<String>) -> Self {
        self.param_bound_columns.insert(column.into(), param.into());
        self
    }

    /// Denies `column` entirely.
    pub fn deny(mut self, column: impl Into<String>) -> Self {
        self.denied_columns.insert(column.into());
        self
    }
}

fn default_inject() -> bool {
    true
}

/// Runtime policy configuration applied to every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Per-table policies, keyed by table name.
    #[serde(default)]
    pub tables: BTreeMap<String, TablePolicy>,
    /// When true, required predicates the planner omitted are injected
    /// automatically; when false, the plan is rejected instead.
    #[serde(default = "default_inject")]
    pub inject_missing_params: bool,
    /// LIMIT value inserted when the plan has none. `None` leaves the plan
    /// unbounded.
    #[serde(default)]
    pub default_limit: Option<u32>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            tables: BTreeMap::new(),
            inject_missing_params: true,
            default_limit: None,
        }
    }
}

impl PolicyConfig {
    /// Creates a permissive config: no table rules, injection on, no
    /// default LIMIT.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a per-table policy.
    pub fn table(mut self, name: impl Into<String>, policy: TablePolicy) -> Self {
        self.tables.insert(name.into(), policy);
        self
    }

    /// Sets the default LIMIT.
    pub fn with_default_limit(mut self, limit: u32) -> Self {
        self.default_limit = Some(limit);
        self
    }

    /// Disables automatic injection; missing required predicates reject.
    pub fn strict(mut self) -> Self {
        self.inject_missing_params = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_shape() {
        let config = PolicyConfig::new()
            .table(
                "employees",
                TablePolicy::new()
                    .bind_param("tenant_id", "TENANT")
                    .deny("salary"),
            )
            .with_default_limit(100);

        let tpol = &config.tables["employees"];
        assert_eq!(tpol.param_bound_columns["tenant_id"], "TENANT");
        assert!(tpol.denied_columns.contains("salary"));
        assert_eq!(config.default_limit, Some(100));
        assert!(config.inject_missing_params);
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: PolicyConfig = serde_json::from_str("{}").unwrap();
        assert!(config.inject_missing_params);
        assert!(config.default_limit.is_none());
        assert!(config.tables.is_empty());
    }
}
