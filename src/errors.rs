//! Unified error type for the whole pipeline.
//!
//! One root enum over the four leaf categories, so callers of the
//! top-level entry points can match on a single type while each subsystem
//! keeps its own focused error with stable dotted codes.

use thiserror::Error;

use crate::compile::CompilationError;
use crate::dialect::ProfileConfigError;
use crate::plan::ParseError;
use crate::validate::ValidationError;

/// Result type for the top-level pipeline.
pub type QueryResult<T> = Result<T, QueryError>;

/// Any failure the pipeline can surface.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Input is not a well-formed QueryPlan.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The plan violates schema, dialect, semantic, or policy rules.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The compiler cannot render the plan, or runtime params are wrong.
    #[error(transparent)]
    Compilation(#[from] CompilationError),

    /// A dialect profile was misconfigured at build time.
    #[error(transparent)]
    ProfileConfig(#[from] ProfileConfigError),
}

impl QueryError {
    /// The stable dotted error code of the underlying failure.
    pub fn code(&self) -> &'static str {
        match self {
            QueryError::Parse(e) => e.code(),
            QueryError::Validation(e) => e.code(),
            QueryError::Compilation(e) => e.code(),
            QueryError::ProfileConfig(_) => "profile.config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_passthrough() {
        let err: QueryError = ValidationError::having_without_group_by().into();
        assert_eq!(err.code(), "validate.having_without_group_by");

        let err: QueryError = CompilationError::unsupported_operator("REGEXP").into();
        assert_eq!(err.code(), "compile.unsupported_operator");
    }
}
