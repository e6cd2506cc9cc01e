//! Compilation error types.
//!
//! Error codes:
//! - compile.unsupported_dialect
//! - compile.unsupported_operator
//! - compile.internal
//! - runtime.missing_param
//! - runtime.param_collision
//!
//! Because validation has already run, a `compile.*` failure is either a
//! bug or a mis-registered extension; `runtime.*` failures are caller
//! mistakes at parameter-merge time.

use std::fmt;

use serde_json::{Map, Value};

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompilationError>;

/// Compilation and runtime-parameter error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorCode {
    /// No compiler registered for the requested target.
    UnsupportedDialect,
    /// No handler registered for an extension operator.
    UnsupportedOperator,
    /// A plan shape that validation should have rejected reached the
    /// compiler.
    Internal,
    /// A required runtime parameter was not supplied.
    MissingRuntimeParam,
    /// A runtime parameter collides with a compiler-bound one.
    ParamCollision,
}

impl CompileErrorCode {
    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        match self {
            CompileErrorCode::UnsupportedDialect => "compile.unsupported_dialect",
            CompileErrorCode::UnsupportedOperator => "compile.unsupported_operator",
            CompileErrorCode::Internal => "compile.internal",
            CompileErrorCode::MissingRuntimeParam => "runtime.missing_param",
            CompileErrorCode::ParamCollision => "runtime.param_collision",
        }
    }
}

/// The compiler cannot render a validated plan, or runtime parameters are
/// missing / colliding.
#[derive(Debug, Clone)]
pub struct CompilationError {
    code: CompileErrorCode,
    message: String,
    details: Map<String, Value>,
}

impl CompilationError {
    fn new(code: CompileErrorCode, message: impl Into<String>) -> Self {
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

    /// No compiler registered for `target`.
    pub fn unsupported_dialect(target: &str, registered: Vec<&str>) -> Self {
        Self::new(
            CompileErrorCode::UnsupportedDialect,
            format!("Unsupported dialect target '{target}'"),
        )
        .detail("target", target)
        .detail("registered_targets", Value::from(registered))
    }

    /// No handler registered for an extension operator.
    pub fn unsupported_operator(op: &str) -> Self {
        Self::new(
            CompileErrorCode::UnsupportedOperator,
            format!("No rendering handler registered for operator '{op}'"),
        )
        .detail("operator", op)
    }

    /// An unexpected plan shape reached the compiler.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(CompileErrorCode::Internal, message)
    }

    /// Required runtime parameters were not supplied.
    pub fn missing_runtime_params(names: Vec<String>) -> Self {
        Self::new(
            CompileErrorCode::MissingRuntimeParam,
            format!("Missing required runtime parameter(s): {}", names.join(", ")),
        )
        .detail("missing", Value::from(names))
    }

    /// A runtime parameter name collides with a compiler-bound one.
    pub fn param_collision(name: &str) -> Self {
        Self::new(
            CompileErrorCode::ParamCollision,
            format!("Runtime parameter '{name}' collides with a compiler-bound parameter"),
        )
        .detail("param", name)
    }

    /// Returns the stable dotted code string.
    pub fn code(&self) -> &'static str {
        self.code.code()
    }

    /// Returns the error kind.
    pub fn kind(&self) -> CompileErrorCode {
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
}

impl fmt::Display for CompilationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CompilationError {}
