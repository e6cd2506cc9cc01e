//! Policy enforcement subsystem
//!
//! Runs after structural validation and before compilation. Enforces
//! per-table column deny-lists, param-bound columns (tenant isolation),
//! the OR-bypass hardening rule, and default / maximum LIMIT values.
//!
//! # Design Principles
//!
//! - The schema snapshot stays a pure structural description; all policy
//!   lives here
//! - Injection is idempotent: applying the engine twice yields the same plan
//! - Nested plans (CTE bodies, derived tables, subquery predicates, set-op
//!   branches) are enforced too; only the root gets LIMIT defaulting

mod config;
mod engine;

pub use config::{PolicyConfig, TablePolicy};
pub use engine::PolicyEngine;
