//! End-to-End Pipeline Scenarios
//!
//! Full parse → validate → policy → compile runs over a small HR schema:
//! - Tenant predicate injection with default LIMIT
//! - Column deny-lists
//! - Relationship joins with policy on both in-scope tables
//! - OR-bypass hardening
//! - Unknown relationship keys
//! - Dialect profile dependency resolution

use std::collections::BTreeMap;

use serde_json::json;

use fenceql::dialect::DialectProfile;
use fenceql::policy::{PolicyConfig, TablePolicy};
use fenceql::schema::{ColumnInfo, RelationshipInfo, SchemaSnapshot, TableInfo};
use fenceql::{validate_and_compile, QueryError};

// =============================================================================
// Helper Functions
// =============================================================================

fn hr_snapshot() -> SchemaSnapshot {
    SchemaSnapshot::new(
        vec![
            TableInfo::new(
                "employees",
                vec![
                    ColumnInfo::not_null("employee_id", "INT"),
                    ColumnInfo::not_null("tenant_id", "TEXT"),
                    ColumnInfo::new("first_name", "TEXT"),
                    ColumnInfo::new("department_id", "INT"),
                    ColumnInfo::new("salary", "NUMERIC"),
                ],
            ),
            TableInfo::new(
                "departments",
                vec![
                    ColumnInfo::not_null("department_id", "INT"),
                    ColumnInfo::not_null("tenant_id", "TEXT"),
                    ColumnInfo::new("name", "TEXT"),
                ],
            ),
        ],
        vec![RelationshipInfo::new(
            "departments__employees",
            "employees",
            "department_id",
            "departments",
            "department_id",
        )],
    )
    .unwrap()
}

fn postgres_dialect() -> DialectProfile {
    DialectProfile::builder(["employees", "departments"], "postgres")
        .joins()
        .build()
        .unwrap()
}

fn tenant_policy() -> PolicyConfig {
    PolicyConfig::new()
        .table(
            "employees",
            TablePolicy::new().bind_param("tenant_id", "TENANT"),
        )
        .table(
            "departments",
            TablePolicy::new().bind_param("tenant_id", "TENANT"),
        )
        .with_default_limit(100)
}

fn flat(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn validation_code(err: QueryError) -> &'static str {
    match err {
        QueryError::Validation(e) => e.code(),
        other => panic!("expected a validation error, got {other}"),
    }
}

// =============================================================================
// Scenario: Tenant Injection
// =============================================================================

/// A bare single-table select gets the tenant predicate and default LIMIT
/// injected, compiled to exactly the expected Postgres SQL.
#[test]
fn test_tenant_predicate_and_default_limit_injected() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "employees.first_name"}}],
        "FROM": {"table": "employees"}
    });
    let compiled = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &tenant_policy(),
    )
    .unwrap();

    assert_eq!(
        flat(&compiled.sql),
        "SELECT \"employees\".\"first_name\" FROM \"employees\" \
         WHERE \"employees\".\"tenant_id\" = %(TENANT)s LIMIT %(param_0)s"
    );
    assert_eq!(
        compiled.params,
        BTreeMap::from([("param_0".to_string(), json!(100))])
    );
    assert_eq!(
        compiled
            .required_params
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>(),
        vec!["TENANT"]
    );
}

// =============================================================================
// Scenario: Deny List
// =============================================================================

#[test]
fn test_denied_column_rejected_with_details() {
    let policy = tenant_policy().table(
        "employees",
        TablePolicy::new()
            .bind_param("tenant_id", "TENANT")
            .deny("salary"),
    );
    let plan = json!({
        "SELECT": [{"expr": {"col": "employees.salary"}}],
        "FROM": {"table": "employees"}
    });
    let err = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &policy,
    )
    .unwrap_err();

    match err {
        QueryError::Validation(e) => {
            assert_eq!(e.code(), "policy.column_denied");
            assert_eq!(e.details()["table"], "employees");
            assert_eq!(e.details()["column"], "salary");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

// =============================================================================
// Scenario: Relationship Join
// =============================================================================

/// A relationship join resolves its ON clause from the snapshot and both
/// in-scope tables get their tenant predicates.
#[test]
fn test_join_via_relationship_with_policy_on_both_tables() {
    let plan = json!({
        "SELECT": [
            {"expr": {"col": "employees.first_name"}},
            {"expr": {"col": "departments.name"}}
        ],
        "FROM": {"table": "employees"},
        "JOIN": [{"rel": "departments__employees", "type": "LEFT"}]
    });
    let compiled = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &tenant_policy(),
    )
    .unwrap();

    let sql = flat(&compiled.sql);
    assert!(sql.contains(
        "FROM \"employees\" LEFT JOIN \"departments\" \
         ON \"employees\".\"department_id\" = \"departments\".\"department_id\""
    ));
    assert!(sql.contains("\"employees\".\"tenant_id\" = %(TENANT)s"));
    assert!(sql.contains("\"departments\".\"tenant_id\" = %(TENANT)s"));
    assert!(compiled.required_params.contains("TENANT"));
}

// =============================================================================
// Scenario: OR Bypass
// =============================================================================

#[test]
fn test_or_bypass_rejected() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "employees.first_name"}}],
        "FROM": {"table": "employees"},
        "WHERE": {"OR": [
            {"EQ": [{"col": "employees.tenant_id"}, {"param": "TENANT"}]},
            {"EQ": [{"col": "employees.employee_id"}, {"value": 1}]}
        ]}
    });
    let err = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &tenant_policy(),
    )
    .unwrap_err();
    assert_eq!(validation_code(err), "policy.or_bypass");
}

// =============================================================================
// Scenario: Unknown Relationship
// =============================================================================

#[test]
fn test_unknown_relationship_rejected_with_key() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "employees.first_name"}}],
        "FROM": {"table": "employees"},
        "JOIN": [{"rel": "ghost", "type": "INNER"}]
    });
    let err = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &tenant_policy(),
    )
    .unwrap_err();

    match err {
        QueryError::Validation(e) => {
            assert_eq!(e.code(), "validate.unknown_relationship");
            assert_eq!(e.details()["key"], "ghost");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

// =============================================================================
// Scenario: Profile Dependencies
// =============================================================================

#[test]
fn test_ctes_without_subqueries_fails_at_build() {
    let err = DialectProfile::builder(["employees"], "postgres")
        .ctes()
        .build()
        .unwrap_err();
    assert_eq!(err.capability(), "ctes");
    assert_eq!(err.requires(), "subqueries");
    assert!(err.message().contains("subqueries"));
}

// =============================================================================
// Runtime Parameter Merging
// =============================================================================

#[test]
fn test_merge_runtime_params_end_to_end() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "employees.first_name"}}],
        "FROM": {"table": "employees"}
    });
    let compiled = validate_and_compile(
        &plan.to_string(),
        &hr_snapshot(),
        &postgres_dialect(),
        &tenant_policy(),
    )
    .unwrap();

    // Without the tenant value the merge is rejected.
    let err = compiled.merge_runtime_params(BTreeMap::new()).unwrap_err();
    assert_eq!(err.code(), "runtime.missing_param");

    // With it, the union is complete and keeps compiler bindings.
    let merged = compiled
        .merge_runtime_params(BTreeMap::from([("TENANT".to_string(), json!("acme"))]))
        .unwrap();
    assert_eq!(merged["TENANT"], json!("acme"));
    assert_eq!(merged["param_0"], json!(100));
}
