//! Plan Model Invariants
//!
//! - Parse ∘ Serialize is the identity on parser output
//! - Structural strictness: unknown keys, wrong tags, wrong arities reject
//! - Parse errors carry jq-style paths for repair loops
//! - Hard bounds on input size and nesting depth

use serde_json::json;

use fenceql::plan::{parse_plan, plan_from_value, MAX_PLAN_DEPTH};

// =============================================================================
// Round Trips
// =============================================================================

/// Serializing a parsed plan and reparsing it yields an equal plan, across
/// every clause the grammar supports.
#[test]
fn test_parse_serialize_identity_on_full_grammar() {
    let raw = json!({
        "WITH": [
            {"name": "eng", "plan": {
                "SELECT": [{"expr": {"col": "departments.department_id"}}],
                "FROM": {"table": "departments"},
                "WHERE": {"EQ": [{"col": "departments.name"}, {"value": "Engineering"}]}
            }},
            {"name": "chain", "recursive": true, "plan": {
                "SELECT": [{"expr": {"col": "employees.employee_id"}}],
                "FROM": {"table": "employees"}
            }}
        ],
        "SELECT": [
            {"expr": {"col": "employees.first_name"}, "alias": "name"},
            {"expr": {"func": "COUNT", "args": [{"col": "employees.employee_id"}]},
             "alias": "cnt"},
            {"expr": {"func": "SUM", "args": [{"col": "employees.salary"}]},
             "over": "w", "alias": "running"},
            {"expr": {"case": {
                "when": [{"cond": {"IS_NULL": {"col": "employees.manager_id"}},
                          "then": {"value": "top"}}],
                "else": {"value": "reports"}
            }}, "alias": "level"}
        ],
        "FROM": {"table": "employees"},
        "JOIN": [{"rel": "departments__employees", "type": "LEFT", "alias": "d"}],
        "WHERE": {"AND": [
            {"EQ": [{"col": "employees.tenant_id"}, {"param": "TENANT"}]},
            {"OR": [
                {"BETWEEN": [{"col": "employees.salary"}, {"value": 1}, {"value": 9}]},
                {"NOT": {"ILIKE": [{"col": "employees.first_name"}, {"value": "a%"}]}}
            ]},
            {"NOT_IN": [{"col": "employees.employment_type"},
                        {"value": "intern"}, {"value": "temp"}]},
            {"NOT_EXISTS": {
                "SELECT": [{"expr": {"col": "departments.department_id"}}],
                "FROM": {"table": "departments"}
            }}
        ]},
        "GROUP_BY": [{"col": "employees.first_name"}],
        "HAVING": {"GT": [{"func": "COUNT", "args": [{"col": "employees.employee_id"}]},
                          {"value": 1}]},
        "WINDOW": [{"name": "w",
                    "partition_by": [{"col": "employees.department_id"}],
                    "order_by": [{"expr": {"col": "employees.hire_date"}, "dir": "ASC"}],
                    "frame": {"type": "ROWS", "start": "UNBOUNDED PRECEDING",
                              "end": "CURRENT ROW"}}],
        "ORDER_BY": [{"expr": {"col": "employees.first_name"}, "dir": "DESC"}],
        "LIMIT": {"value": 25},
        "OFFSET": {"param": "SKIP"},
        "SET_OP": {"op": "UNION_ALL", "right": {
            "SELECT": [{"expr": {"col": "contractors.first_name"}},
                       {"expr": {"value": 0}},
                       {"expr": {"value": 0}},
                       {"expr": {"value": "contractor"}}],
            "FROM": {"table": "contractors"}
        }}
    });

    let plan = plan_from_value(&raw).unwrap();
    let reparsed = plan_from_value(&plan.to_value()).unwrap();
    assert_eq!(plan, reparsed);

    // And the serialized form is stable.
    assert_eq!(plan.to_value(), reparsed.to_value());
}

// =============================================================================
// Strictness
// =============================================================================

#[test]
fn test_unknown_keys_rejected_at_every_level() {
    for (plan, expected_path) in [
        (json!({"SELECT": "*", "LIMITT": {"value": 1}}), "."),
        (
            json!({"SELECT": [{"expr": {"col": "t.c"}, "hint": 1}]}),
            ".SELECT[0]",
        ),
        (
            json!({"SELECT": "*", "FROM": {"table": "t", "schema": "s"}}),
            ".FROM",
        ),
        (
            json!({"SELECT": "*", "LIMIT": {"value": 1, "strict": true}}),
            ".LIMIT",
        ),
    ] {
        let err = plan_from_value(&plan).unwrap_err();
        assert!(
            err.code() == "parse.unknown_clause" || err.code() == "parse.unknown_field",
            "unexpected code {} for {plan}",
            err.code()
        );
        assert_eq!(err.details()["path"], expected_path, "for {plan}");
    }
}

#[test]
fn test_operand_tag_must_be_recognised() {
    let err = plan_from_value(&json!({
        "SELECT": [{"expr": {"column": "t.c"}}]
    }))
    .unwrap_err();
    assert_eq!(err.code(), "parse.unknown_tag");
}

#[test]
fn test_builtin_arities_rejected_at_parse_time() {
    let cases = [
        json!({"SELECT": "*", "WHERE": {"EQ": [{"col": "t.a"}]}}),
        json!({"SELECT": "*", "WHERE": {"LIKE": [{"col": "t.a"}]}}),
        json!({"SELECT": "*", "WHERE": {"BETWEEN": [{"col": "t.a"}, {"value": 1}]}}),
        json!({"SELECT": "*", "WHERE": {"IN": [{"col": "t.a"}]}}),
        json!({"SELECT": "*", "WHERE": {"OR": [{"IS_NULL": {"col": "t.a"}}]}}),
    ];
    for plan in cases {
        let err = plan_from_value(&plan).unwrap_err();
        assert_eq!(err.code(), "parse.bad_arity", "for {plan}");
    }
}

#[test]
fn test_column_reference_grammar() {
    for bad in ["first_name", "a.b.c", "t.", ".c", "t name.c", "t.c;--"] {
        let err = plan_from_value(&json!({
            "SELECT": [{"expr": {"col": bad}}]
        }))
        .unwrap_err();
        assert_eq!(err.code(), "parse.bad_column_ref", "for {bad:?}");
    }
}

#[test]
fn test_value_operand_must_be_scalar() {
    let err = plan_from_value(&json!({
        "SELECT": [{"expr": {"value": [1, 2, 3]}}]
    }))
    .unwrap_err();
    assert_eq!(err.code(), "parse.bad_value");
}

// =============================================================================
// Bounds
// =============================================================================

#[test]
fn test_depth_bound() {
    let mut operand = json!({"value": 1});
    for _ in 0..=MAX_PLAN_DEPTH {
        operand = json!({"func": "ABS", "args": [operand]});
    }
    let err = plan_from_value(&json!({"SELECT": [{"expr": operand}]})).unwrap_err();
    assert_eq!(err.code(), "parse.depth_exceeded");
}

#[test]
fn test_invalid_json_is_a_parse_error() {
    let err = parse_plan("{not json").unwrap_err();
    assert_eq!(err.code(), "parse.invalid_json");
}

// =============================================================================
// Domain Queries
// =============================================================================

#[test]
fn test_referenced_columns_span_nested_plans() {
    let plan = plan_from_value(&json!({
        "SELECT": [{"expr": {"col": "departments.name"}}],
        "FROM": {"table": "departments"},
        "WHERE": {"EXISTS": {
            "SELECT": [{"expr": {"col": "employees.employee_id"}}],
            "FROM": {"table": "employees"},
            "WHERE": {"EQ": [{"col": "employees.department_id"},
                             {"col": "departments.department_id"}]}
        }}
    }))
    .unwrap();

    let columns = plan.referenced_columns();
    assert!(columns.iter().any(|c| c.to_string() == "departments.name"));
    assert!(columns
        .iter()
        .any(|c| c.to_string() == "employees.department_id"));

    let tables = plan.referenced_tables();
    assert!(tables.contains("departments"));
    assert!(tables.contains("employees"));
}
