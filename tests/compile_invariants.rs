//! Compilation Invariants
//!
//! - Every literal operand binds exactly one fresh parameter; values never
//!   appear inline in the SQL text
//! - Placeholder and quoting conventions per dialect
//! - Policy injection is idempotent at the SQL level
//! - Compiling the same plan twice is byte-identical

use serde_json::json;

use fenceql::dialect::DialectProfile;
use fenceql::policy::{PolicyConfig, TablePolicy};
use fenceql::schema::{ColumnInfo, RelationshipInfo, SchemaSnapshot, TableInfo};
use fenceql::validate_and_compile;

// =============================================================================
// Helper Functions
// =============================================================================

fn snapshot() -> SchemaSnapshot {
    SchemaSnapshot::new(
        vec![
            TableInfo::new(
                "orders",
                vec![
                    ColumnInfo::not_null("order_id", "INT"),
                    ColumnInfo::not_null("tenant_id", "TEXT"),
                    ColumnInfo::new("status", "TEXT"),
                    ColumnInfo::new("total", "NUMERIC"),
                    ColumnInfo::new("customer_id", "INT"),
                ],
            ),
            TableInfo::new(
                "customers",
                vec![
                    ColumnInfo::not_null("customer_id", "INT"),
                    ColumnInfo::new("email", "TEXT"),
                ],
            ),
        ],
        vec![RelationshipInfo::new(
            "customers__orders",
            "orders",
            "customer_id",
            "customers",
            "customer_id",
        )],
    )
    .unwrap()
}

fn dialect_for(target: &str) -> DialectProfile {
    DialectProfile::builder(["orders", "customers"], target)
        .joins()
        .build()
        .unwrap()
}

fn policy() -> PolicyConfig {
    PolicyConfig::new().table("orders", TablePolicy::new().bind_param("tenant_id", "TENANT"))
}

fn status_plan() -> String {
    json!({
        "SELECT": [{"expr": {"col": "orders.order_id"}}],
        "FROM": {"table": "orders"},
        "WHERE": {"EQ": [{"col": "orders.status"}, {"value": "sh'ipped; DROP TABLE orders"}]},
        "LIMIT": {"value": 20}
    })
    .to_string()
}

// =============================================================================
// Value Binding
// =============================================================================

/// Literal values — including hostile ones — never reach the SQL string.
#[test]
fn test_values_never_inlined() {
    for target in ["postgres", "sqlite", "mysql"] {
        let compiled =
            validate_and_compile(&status_plan(), &snapshot(), &dialect_for(target), &policy())
                .unwrap();
        assert!(
            !compiled.sql.contains("sh'ipped"),
            "literal leaked into {target} SQL: {}",
            compiled.sql
        );
        assert!(!compiled.sql.to_uppercase().contains("DROP TABLE"));
        assert_eq!(
            compiled.params["param_0"],
            json!("sh'ipped; DROP TABLE orders")
        );
        // One binding per literal: the status value plus the LIMIT.
        assert_eq!(compiled.params.len(), 2);
    }
}

// =============================================================================
// Dialect Conventions
// =============================================================================

#[test]
fn test_placeholder_and_quoting_conventions() {
    let postgres =
        validate_and_compile(&status_plan(), &snapshot(), &dialect_for("postgres"), &policy())
            .unwrap();
    assert!(postgres.sql.contains("%(TENANT)s"));
    assert!(postgres.sql.contains("\"orders\".\"tenant_id\""));

    let sqlite =
        validate_and_compile(&status_plan(), &snapshot(), &dialect_for("sqlite"), &policy())
            .unwrap();
    assert!(sqlite.sql.contains(":TENANT"));
    assert!(sqlite.sql.contains("\"orders\".\"tenant_id\""));

    let mysql =
        validate_and_compile(&status_plan(), &snapshot(), &dialect_for("mysql"), &policy())
            .unwrap();
    assert!(mysql.sql.contains("%(TENANT)s"));
    assert!(mysql.sql.contains("`orders`.`tenant_id`"));
}

#[test]
fn test_dialect_field_matches_target() {
    for target in ["postgres", "sqlite", "mysql"] {
        let compiled =
            validate_and_compile(&status_plan(), &snapshot(), &dialect_for(target), &policy())
                .unwrap();
        assert_eq!(compiled.dialect, target);
    }
}

// =============================================================================
// Determinism & Idempotence
// =============================================================================

#[test]
fn test_recompilation_is_byte_identical() {
    let a = validate_and_compile(&status_plan(), &snapshot(), &dialect_for("postgres"), &policy())
        .unwrap();
    let b = validate_and_compile(&status_plan(), &snapshot(), &dialect_for("postgres"), &policy())
        .unwrap();
    assert_eq!(a.sql, b.sql);
    assert_eq!(a.params, b.params);
    assert_eq!(a.required_params, b.required_params);
}

/// Running a policy-injected plan back through the pipeline produces the
/// same SQL: the required conjunct is recognised, not duplicated.
#[test]
fn test_policy_injection_idempotent_at_sql_level() {
    let with_tenant = json!({
        "SELECT": [{"expr": {"col": "orders.order_id"}}],
        "FROM": {"table": "orders"},
        "WHERE": {"AND": [
            {"EQ": [{"col": "orders.status"}, {"value": "shipped"}]},
            {"EQ": [{"col": "orders.tenant_id"}, {"param": "TENANT"}]}
        ]},
        "LIMIT": {"value": 20}
    })
    .to_string();

    let compiled =
        validate_and_compile(&with_tenant, &snapshot(), &dialect_for("postgres"), &policy())
            .unwrap();
    let occurrences = compiled.sql.matches("%(TENANT)s").count();
    assert_eq!(occurrences, 1, "tenant predicate duplicated: {}", compiled.sql);
}

// =============================================================================
// LIMIT Boundaries
// =============================================================================

#[test]
fn test_absent_limit_with_no_default_emits_no_limit() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "orders.order_id"}}],
        "FROM": {"table": "orders"}
    })
    .to_string();
    let compiled =
        validate_and_compile(&plan, &snapshot(), &dialect_for("postgres"), &policy()).unwrap();
    assert!(!compiled.sql.contains("LIMIT"));
}

#[test]
fn test_default_limit_emitted_as_bound_parameter() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "orders.order_id"}}],
        "FROM": {"table": "orders"}
    })
    .to_string();
    let policy = policy().with_default_limit(50);
    let compiled =
        validate_and_compile(&plan, &snapshot(), &dialect_for("postgres"), &policy).unwrap();
    assert!(compiled.sql.contains("LIMIT %(param_0)s"));
    assert_eq!(compiled.params["param_0"], json!(50));
}

#[test]
fn test_limit_param_form_becomes_required() {
    let plan = json!({
        "SELECT": [{"expr": {"col": "orders.order_id"}}],
        "FROM": {"table": "orders"},
        "LIMIT": {"param": "PAGE_SIZE"}
    })
    .to_string();
    let compiled =
        validate_and_compile(&plan, &snapshot(), &dialect_for("postgres"), &policy()).unwrap();
    assert!(compiled.sql.contains("LIMIT %(PAGE_SIZE)s"));
    assert!(compiled.required_params.contains("PAGE_SIZE"));
    assert!(compiled.required_params.contains("TENANT"));
}
