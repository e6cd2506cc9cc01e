//! fenceql - a policy-enforcing query planner and SQL compiler
//!
//! Sits between an untrusted planner (an LLM) and a relational database.
//! The planner emits a structured QueryPlan JSON document; fenceql
//! validates it against a declared schema and dialect profile, injects the
//! predicates tenant policy requires, and compiles it to parameterized SQL
//! bound to a named-parameter map. Raw SQL never crosses the trust
//! boundary.
//!
//! # Pipeline
//!
//! ```text
//! JSON bytes ──► Parse ──► Validate ──► Apply Policy ──► Compile ──► (sql, params)
//! ```
//!
//! Every stage is a pure function of immutable inputs; a `SchemaSnapshot`,
//! `DialectProfile`, and `PolicyConfig` are built once and shared across
//! requests and threads without synchronisation.
//!
//! # Example
//!
//! ```
//! use fenceql::dialect::DialectProfile;
//! use fenceql::policy::{PolicyConfig, TablePolicy};
//! use fenceql::schema::{ColumnInfo, SchemaSnapshot, TableInfo};
//!
//! let snapshot = SchemaSnapshot::new(
//!     vec![TableInfo::new(
//!         "employees",
//!         vec![
//!             ColumnInfo::not_null("tenant_id", "TEXT"),
//!             ColumnInfo::new("first_name", "TEXT"),
//!         ],
//!     )],
//!     vec![],
//! )
//! .unwrap();
//! let dialect = DialectProfile::builder(["employees"], "postgres")
//!     .build()
//!     .unwrap();
//! let policy = PolicyConfig::new()
//!     .table("employees", TablePolicy::new().bind_param("tenant_id", "TENANT"))
//!     .with_default_limit(100);
//!
//! let plan = r#"{
//!     "SELECT": [{"expr": {"col": "employees.first_name"}}],
//!     "FROM": {"table": "employees"}
//! }"#;
//! let compiled = fenceql::validate_and_compile(plan, &snapshot, &dialect, &policy).unwrap();
//! assert!(compiled.sql.contains("%(TENANT)s"));
//! assert!(compiled.required_params.contains("TENANT"));
//! ```

pub mod compile;
pub mod dialect;
pub mod errors;
pub mod plan;
pub mod policy;
pub mod prompt;
pub mod schema;
pub mod validate;

pub use compile::{CompiledSQL, CompilerFactory, OperatorRegistry, QueryBuilder, SqlCompiler};
pub use dialect::{DialectProfile, ProfileConfigError};
pub use errors::{QueryError, QueryResult};
pub use plan::{parse_plan, ParseError, QueryPlan};
pub use policy::{PolicyConfig, PolicyEngine, TablePolicy};
pub use prompt::{PromptBuilder, PromptComponents};
pub use schema::{ColumnInfo, RelationshipInfo, SchemaSnapshot, TableInfo};
pub use validate::{PlanValidator, ValidationError};

/// Parses, validates, applies policy, and compiles a QueryPlan JSON string
/// using the built-in dialect compilers and an empty operator registry.
///
/// # Errors
///
/// - [`ParseError`] — input is not a well-formed QueryPlan
/// - [`ValidationError`] — schema / dialect / semantic / policy violation
/// - [`compile::CompilationError`] — the plan cannot be rendered
pub fn validate_and_compile(
    plan_json: &str,
    snapshot: &SchemaSnapshot,
    dialect: &DialectProfile,
    policy: &PolicyConfig,
) -> QueryResult<CompiledSQL> {
    let factory = CompilerFactory::with_builtins();
    let operators = OperatorRegistry::new();
    validate_and_compile_with(plan_json, snapshot, dialect, policy, &factory, &operators)
}

/// [`validate_and_compile`] with caller-supplied registries, for processes
/// that register extra dialects or extension operators at startup.
pub fn validate_and_compile_with(
    plan_json: &str,
    snapshot: &SchemaSnapshot,
    dialect: &DialectProfile,
    policy: &PolicyConfig,
    factory: &CompilerFactory,
    operators: &OperatorRegistry,
) -> QueryResult<CompiledSQL> {
    let plan = plan::parse_plan(plan_json)?;
    PlanValidator::new(snapshot, dialect).validate(&plan)?;
    let (plan, required) = PolicyEngine::new(policy, snapshot, dialect).apply(plan)?;
    let compiler = factory.create(dialect.target())?;
    let mut compiled = QueryBuilder::new(compiler.as_ref(), snapshot, operators).build(&plan)?;
    compiled.required_params.extend(required);
    Ok(compiled)
}

/// Builds the system and user prompts for the LLM planner from the same
/// inputs the pipeline validates against.
pub fn get_prompt_components(
    snapshot: &SchemaSnapshot,
    dialect: &DialectProfile,
    question: &str,
    policy: Option<&PolicyConfig>,
    policy_summary: &str,
) -> PromptComponents {
    PromptBuilder::new(snapshot, dialect, policy, policy_summary).build(question)
}
