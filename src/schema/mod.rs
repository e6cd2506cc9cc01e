//! Schema snapshot subsystem
//!
//! An immutable structural description of the database that the planner is
//! allowed to reference: tables, columns (type + nullability), and named
//! join relationships.
//!
//! # Design Principles
//!
//! - Build once, share across requests; never mutated after construction
//! - Column lookup is O(1) by (table, column); relationship lookup is O(1) by key
//! - Relationship endpoints must resolve to declared (table, column) pairs
//! - Structural metadata only — the snapshot carries no policy

mod infer;
mod snapshot;

pub use infer::infer_relationships_from_names;
pub use snapshot::{ColumnInfo, RelationshipInfo, SchemaSnapshot, TableInfo};
