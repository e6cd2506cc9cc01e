//! Validation error types.
//!
//! Error codes:
//! - validate.unknown_table / validate.unknown_column
//! - validate.dialect_disabled / validate.operator_not_allowed
//! - validate.join_depth_exceeded / validate.join_disconnected
//! - validate.unknown_relationship
//! - validate.having_without_group_by / validate.group_by_coverage
//! - validate.recursion_not_enabled
//! - validate.set_op_column_mismatch
//! - validate.bad_function / validate.unknown_window
//! - validate.scalar_subquery_unsupported
//! - validate.limit_out_of_range / validate.offset_without_limit
//! - validate.duplicate_alias / validate.nullability
//! - validate.bad_snapshot
//! - policy.column_denied / policy.missing_required_param / policy.or_bypass
//!
//! Every error carries a stable dotted code, a human message, and a
//! machine-readable details map; `to_error_response()` yields the
//! `{code, message, details}` shape used for planner repair loops.

use std::fmt;

use serde_json::{Map, Value};

/// Result type for validation and policy enforcement.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation and policy error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationCode {
    UnknownTable,
    UnknownColumn,
    DialectDisabled,
    OperatorNotAllowed,
    JoinDepthExceeded,
    JoinDisconnected,
    UnknownRelationship,
    HavingWithoutGroupBy,
    GroupByCoverage,
    RecursionNotEnabled,
    SetOpColumnMismatch,
    BadFunction,
    UnknownWindow,
    ScalarSubqueryUnsupported,
    LimitOutOfRange,
    OffsetWithoutLimit,
    DuplicateAlias,
    Nullability,
    BadSnapshot,
    ColumnDenied,
    MissingRequiredParam,
    OrBypass,
}

impl ValidationCode {
    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        match self {
            ValidationCode::UnknownTable => "validate.unknown_table",
            ValidationCode::UnknownColumn => "validate.unknown_column",
            ValidationCode::DialectDisabled => "validate.dialect_disabled",
            ValidationCode::OperatorNotAllowed => "validate.operator_not_allowed",
            ValidationCode::JoinDepthExceeded => "validate.join_depth_exceeded",
            ValidationCode::JoinDisconnected => "validate.join_disconnected",
            ValidationCode::UnknownRelationship => "validate.unknown_relationship",
            ValidationCode::HavingWithoutGroupBy => "validate.having_without_group_by",
            ValidationCode::GroupByCoverage => "validate.group_by_coverage",
            ValidationCode::RecursionNotEnabled => "validate.recursion_not_enabled",
            ValidationCode::SetOpColumnMismatch => "validate.set_op_column_mismatch",
            ValidationCode::BadFunction => "validate.bad_function",
            ValidationCode::UnknownWindow => "validate.unknown_window",
            ValidationCode::ScalarSubqueryUnsupported => "validate.scalar_subquery_unsupported",
            ValidationCode::LimitOutOfRange => "validate.limit_out_of_range",
            ValidationCode::OffsetWithoutLimit => "validate.offset_without_limit",
            ValidationCode::DuplicateAlias => "validate.duplicate_alias",
            ValidationCode::Nullability => "validate.nullability",
            ValidationCode::BadSnapshot => "validate.bad_snapshot",
            ValidationCode::ColumnDenied => "policy.column_denied",
            ValidationCode::MissingRequiredParam => "policy.missing_required_param",
            ValidationCode::OrBypass => "policy.or_bypass",
        }
    }
}

impl fmt::Display for ValidationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The plan violates a schema, dialect, semantic, or policy rule.
#[derive(Debug, Clone)]
pub struct ValidationError {
    code: ValidationCode,
    message: String,
    details: Map<String, Value>,
}

impl ValidationError {
    fn new(code: ValidationCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Map::new(),
        }
    }

    fn detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    /// Table is neither in the snapshot / whitelist nor a visible alias.
    pub fn unknown_table(table: &str, allowed: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::UnknownTable,
            format!("Table '{table}' does not exist in the schema snapshot"),
        )
        .detail("table", table)
        .detail("allowed_tables", Value::from(allowed))
    }

    /// Column does not exist on the resolved table.
    pub fn unknown_column(table: &str, column: &str, allowed: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::UnknownColumn,
            format!("Column '{column}' does not exist on table '{table}'"),
        )
        .detail("table", table)
        .detail("column", column)
        .detail("allowed_columns", Value::from(allowed))
    }

    /// A clause needs a capability the profile does not enable.
    pub fn dialect_disabled(clause: &str, capability: &str) -> Self {
        Self::new(
            ValidationCode::DialectDisabled,
            format!("{clause} is not enabled (requires the '{capability}' capability)"),
        )
        .detail("clause", clause)
        .detail("capability", capability)
    }

    /// A predicate operator is outside the profile's allowed set.
    pub fn operator_not_allowed(op: &str, allowed: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::OperatorNotAllowed,
            format!("Operator '{op}' is not in the allowed operator set"),
        )
        .detail("operator", op)
        .detail("allowed_operators", Value::from(allowed))
    }

    /// The JOIN list is longer than the configured maximum.
    pub fn join_depth_exceeded(used: usize, max: usize) -> Self {
        Self::new(
            ValidationCode::JoinDepthExceeded,
            format!("Query uses {used} JOIN(s) but max_join_depth={max}"),
        )
        .detail("joins", used)
        .detail("max_join_depth", max)
    }

    /// Neither endpoint of a join relationship is in scope.
    pub fn join_disconnected(key: &str, from_table: &str, to_table: &str) -> Self {
        Self::new(
            ValidationCode::JoinDisconnected,
            format!(
                "Relationship '{key}' connects '{from_table}' and '{to_table}', \
                 neither of which is in scope"
            ),
        )
        .detail("key", key)
        .detail("from_table", from_table)
        .detail("to_table", to_table)
    }

    /// A JOIN uses a relationship key the snapshot does not declare.
    pub fn unknown_relationship(key: &str, allowed: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::UnknownRelationship,
            format!("Unknown relationship key '{key}'"),
        )
        .detail("key", key)
        .detail("allowed_relationships", Value::from(allowed))
    }

    /// HAVING without a (non-empty) GROUP BY.
    pub fn having_without_group_by() -> Self {
        Self::new(
            ValidationCode::HavingWithoutGroupBy,
            "HAVING requires a non-empty GROUP_BY",
        )
    }

    /// A non-aggregate projection is not covered by GROUP BY.
    pub fn group_by_coverage(column: &str) -> Self {
        Self::new(
            ValidationCode::GroupByCoverage,
            format!("Column '{column}' must appear in GROUP_BY or inside an aggregate"),
        )
        .detail("column", column)
    }

    /// WITH RECURSIVE without the subqueries capability.
    pub fn recursion_not_enabled(cte_name: &str) -> Self {
        Self::new(
            ValidationCode::RecursionNotEnabled,
            format!(
                "Recursive CTE '{cte_name}' requires both the 'ctes' and 'subqueries' \
                 capabilities"
            ),
        )
        .detail("cte", cte_name)
    }

    /// Set-operation branches project different column counts.
    pub fn set_op_column_mismatch(left: usize, right: usize) -> Self {
        Self::new(
            ValidationCode::SetOpColumnMismatch,
            format!("Set operation branches project {left} vs {right} columns"),
        )
        .detail("left", left)
        .detail("right", right)
    }

    /// Function name is not allowed for this profile.
    pub fn bad_function(name: &str, allowed: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::BadFunction,
            format!("Function '{name}' is not in the allowed function list"),
        )
        .detail("function", name)
        .detail("allowed_functions", Value::from(allowed))
    }

    /// A select item names a window the WINDOW clause does not declare.
    pub fn unknown_window(name: &str, declared: Vec<&str>) -> Self {
        Self::new(
            ValidationCode::UnknownWindow,
            format!("Window '{name}' is not declared in the WINDOW clause"),
        )
        .detail("window", name)
        .detail("declared_windows", Value::from(declared))
    }

    /// A subquery appeared in scalar position.
    pub fn scalar_subquery_unsupported() -> Self {
        Self::new(
            ValidationCode::ScalarSubqueryUnsupported,
            "Scalar subqueries are not supported; use a CTE or derived table instead",
        )
    }

    /// LIMIT / OFFSET value outside `[0, 2^31)`.
    pub fn limit_out_of_range(clause: &str, value: i64) -> Self {
        Self::new(
            ValidationCode::LimitOutOfRange,
            format!("{clause} value {value} is outside [0, 2^31)"),
        )
        .detail("clause", clause)
        .detail("value", value)
    }

    /// OFFSET without LIMIT on a dialect that requires LIMIT.
    pub fn offset_without_limit(target: &str) -> Self {
        Self::new(
            ValidationCode::OffsetWithoutLimit,
            format!("OFFSET without LIMIT is not accepted by the '{target}' dialect"),
        )
        .detail("target", target)
    }

    /// A select alias is used twice.
    pub fn duplicate_alias(alias: &str) -> Self {
        Self::new(
            ValidationCode::DuplicateAlias,
            format!("Alias '{alias}' is used more than once"),
        )
        .detail("alias", alias)
    }

    /// A null-check was applied to a column declared NOT NULL.
    pub fn nullability(table: &str, column: &str, operator: &str) -> Self {
        Self::new(
            ValidationCode::Nullability,
            format!("{operator} on '{table}.{column}', which is declared NOT NULL"),
        )
        .detail("table", table)
        .detail("column", column)
        .detail("operator", operator)
    }

    /// The snapshot itself is structurally invalid.
    pub fn bad_snapshot(message: impl Into<String>) -> Self {
        Self::new(ValidationCode::BadSnapshot, message)
    }

    /// A referenced column is on the policy deny-list.
    pub fn column_denied(table: &str, column: &str) -> Self {
        Self::new(
            ValidationCode::ColumnDenied,
            format!("Column '{column}' on table '{table}' is denied by policy"),
        )
        .detail("table", table)
        .detail("column", column)
    }

    /// A param-bound column has no usable required predicate and injection
    /// is disabled.
    pub fn missing_required_param(column_ref: &str, param: &str) -> Self {
        Self::new(
            ValidationCode::MissingRequiredParam,
            format!("Column '{column_ref}' must be constrained by {{\"param\": \"{param}\"}}"),
        )
        .detail("column", column_ref)
        .detail("required_param", param)
    }

    /// A required predicate sits under an OR with an unprotected sibling.
    pub fn or_bypass(table: &str, column: &str, param: &str) -> Self {
        Self::new(
            ValidationCode::OrBypass,
            format!(
                "Required predicate '{table}.{column} = :{param}' is bypassed by an OR branch"
            ),
        )
        .detail("table", table)
        .detail("column", column)
        .detail("required_param", param)
    }

    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        self.code.code()
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ValidationCode {
        self.code
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the machine-readable details map.
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// Returns a structured `{code, message, details}` response intended
    /// for planner repair loops.
    pub fn to_error_response(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("code".to_string(), Value::from(self.code()));
        obj.insert("message".to_string(), Value::from(self.message.clone()));
        obj.insert("details".to_string(), Value::Object(self.details.clone()));
        Value::Object(obj)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(
            ValidationCode::HavingWithoutGroupBy.code(),
            "validate.having_without_group_by"
        );
        assert_eq!(ValidationCode::ColumnDenied.code(), "policy.column_denied");
        assert_eq!(ValidationCode::OrBypass.code(), "policy.or_bypass");
    }

    #[test]
    fn test_error_response_carries_details() {
        let err = ValidationError::column_denied("employees", "salary");
        let response = err.to_error_response();
        assert_eq!(response["code"], "policy.column_denied");
        assert_eq!(response["details"]["table"], "employees");
        assert_eq!(response["details"]["column"], "salary");
    }

    #[test]
    fn test_display_includes_code() {
        let err = ValidationError::unknown_relationship("ghost", vec![]);
        let shown = err.to_string();
        assert!(shown.contains("validate.unknown_relationship"));
        assert!(shown.contains("ghost"));
    }
}
