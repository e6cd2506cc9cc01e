//! Parse error types.
//!
//! Error codes:
//! - parse.invalid_json
//! - parse.too_large
//! - parse.depth_exceeded
//! - parse.unknown_clause
//! - parse.unknown_field
//! - parse.missing_field
//! - parse.unknown_tag
//! - parse.bad_arity
//! - parse.bad_column_ref
//! - parse.bad_type
//! - parse.bad_value
//!
//! Every error carries a jq-style `path` into the offending JSON plus
//! `got` / `expected` details, so the caller can echo it back to the
//! planner as a repair hint.

use std::fmt;

use serde_json::{Map, Value};

/// Result type for plan parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parse error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// Input is not well-formed JSON.
    InvalidJson,
    /// Input exceeds the plan size bound.
    TooLarge,
    /// Nesting exceeds the recursion bound.
    DepthExceeded,
    /// Unknown top-level clause key.
    UnknownClause,
    /// Unknown key inside a clause or expression object.
    UnknownField,
    /// A required field is absent.
    MissingField,
    /// An operand or predicate object has no recognised discriminator.
    UnknownTag,
    /// A built-in operator received the wrong number of arguments.
    BadArity,
    /// A column reference does not match `IDENT "." IDENT`.
    BadColumnRef,
    /// A value has the wrong JSON type.
    BadType,
    /// A value has the right type but an invalid content.
    BadValue,
}

impl ParseErrorCode {
    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorCode::InvalidJson => "parse.invalid_json",
            ParseErrorCode::TooLarge => "parse.too_large",
            ParseErrorCode::DepthExceeded => "parse.depth_exceeded",
            ParseErrorCode::UnknownClause => "parse.unknown_clause",
            ParseErrorCode::UnknownField => "parse.unknown_field",
            ParseErrorCode::MissingField => "parse.missing_field",
            ParseErrorCode::UnknownTag => "parse.unknown_tag",
            ParseErrorCode::BadArity => "parse.bad_arity",
            ParseErrorCode::BadColumnRef => "parse.bad_column_ref",
            ParseErrorCode::BadType => "parse.bad_type",
            ParseErrorCode::BadValue => "parse.bad_value",
        }
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Input is not a well-formed QueryPlan.
#[derive(Debug, Clone)]
pub struct ParseError {
    code: ParseErrorCode,
    message: String,
    details: Map<String, Value>,
}

impl ParseError {
    fn new(code: ParseErrorCode, message: impl Into<String>) -> Self {
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

    /// Input was not valid JSON.
    pub fn invalid_json(err: &serde_json::Error) -> Self {
        Self::new(ParseErrorCode::InvalidJson, format!("Invalid JSON: {err}"))
    }

    /// Input exceeds the byte bound.
    pub fn too_large(len: usize, max: usize) -> Self {
        Self::new(
            ParseErrorCode::TooLarge,
            format!("Plan is {len} bytes; the maximum is {max}"),
        )
        .detail("got", len)
        .detail("expected", format!("<= {max} bytes"))
    }

    /// Nesting exceeds the depth bound.
    pub fn depth_exceeded(max: usize) -> Self {
        Self::new(
            ParseErrorCode::DepthExceeded,
            format!("Plan nesting exceeds the maximum depth of {max}"),
        )
        .detail("expected", format!("depth <= {max}"))
    }

    /// Unknown top-level clause key.
    pub fn unknown_clause(path: &str, key: &str, expected: &[&str]) -> Self {
        Self::new(
            ParseErrorCode::UnknownClause,
            format!("Unknown clause '{key}'"),
        )
        .detail("path", path)
        .detail("got", key)
        .detail("expected", Value::from(expected.to_vec()))
    }

    /// Unknown key inside an object.
    pub fn unknown_field(path: &str, key: &str, expected: &[&str]) -> Self {
        Self::new(
            ParseErrorCode::UnknownField,
            format!("Unknown field '{key}' at {path}"),
        )
        .detail("path", path)
        .detail("got", key)
        .detail("expected", Value::from(expected.to_vec()))
    }

    /// A required field is absent.
    pub fn missing_field(path: &str, field: &str) -> Self {
        Self::new(
            ParseErrorCode::MissingField,
            format!("Missing required field '{field}' at {path}"),
        )
        .detail("path", path)
        .detail("expected", field)
    }

    /// No recognised discriminator key.
    pub fn unknown_tag(path: &str, got: &Value, expected: &str) -> Self {
        Self::new(
            ParseErrorCode::UnknownTag,
            format!("Unrecognised expression at {path}; expected {expected}"),
        )
        .detail("path", path)
        .detail("got", type_name(got))
        .detail("expected", expected)
    }

    /// Wrong argument count for a built-in operator.
    pub fn bad_arity(path: &str, op: &str, expected: &str, got: usize) -> Self {
        Self::new(
            ParseErrorCode::BadArity,
            format!("{op} requires {expected} operand(s), got {got}"),
        )
        .detail("path", path)
        .detail("got", got)
        .detail("expected", expected)
    }

    /// Malformed column reference.
    pub fn bad_column_ref(path: &str, raw: &str) -> Self {
        Self::new(
            ParseErrorCode::BadColumnRef,
            format!("Column reference '{raw}' must match \"table.column\""),
        )
        .detail("path", path)
        .detail("got", raw)
        .detail("expected", "IDENT \".\" IDENT")
    }

    /// Wrong JSON type.
    pub fn bad_type(path: &str, expected: &str, got: &Value) -> Self {
        Self::new(
            ParseErrorCode::BadType,
            format!("Expected {expected} at {path}, got {}", type_name(got)),
        )
        .detail("path", path)
        .detail("got", type_name(got))
        .detail("expected", expected)
    }

    /// Right type, invalid content.
    pub fn bad_value(path: &str, expected: &str, got: impl Into<Value>) -> Self {
        Self::new(
            ParseErrorCode::BadValue,
            format!("Invalid value at {path}; expected {expected}"),
        )
        .detail("path", path)
        .detail("got", got)
        .detail("expected", expected)
    }

    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        self.code.code()
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ParseErrorCode {
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

    /// Returns a structured `{code, message, details}` response suitable
    /// for feeding back to the planner as a repair hint.
    pub fn to_error_response(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("code".to_string(), Value::from(self.code()));
        obj.insert("message".to_string(), Value::from(self.message.clone()));
        obj.insert("details".to_string(), Value::Object(self.details.clone()));
        Value::Object(obj)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ParseError {}

/// Returns the JSON type name for error messages.
pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
