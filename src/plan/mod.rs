//! QueryPlan model subsystem
//!
//! The typed tree mirroring the SELECT grammar, its strict JSON parser,
//! and the inverse serializer.
//!
//! # Design Principles
//!
//! - The parser is structural only; it never consults the schema
//! - Unknown keys at any level are parse failures, not warnings
//! - Operand and predicate nodes are tagged sum types matched exhaustively
//! - Input size and nesting depth are hard-bounded

mod column_ref;
mod errors;
mod operand;
mod parser;
mod predicate;
mod query_plan;
mod serialize;

pub use column_ref::ColumnRef;
pub use errors::{ParseError, ParseErrorCode, ParseResult};
pub use operand::{
    is_aggregate_function, is_window_function, CaseWhen, Operand, AGGREGATE_FUNCTIONS,
    WINDOW_FUNCTIONS,
};
pub use parser::{parse_plan, plan_from_value, MAX_PLAN_BYTES, MAX_PLAN_DEPTH};
pub use predicate::{CompareOp, InMembers, MatchOp, Predicate};
pub use query_plan::{
    CteClause, FrameType, FromClause, JoinClause, JoinType, OrderByItem, QueryPlan, RowBound,
    SelectClause, SelectItem, SetOp, SetOpClause, SortDirection, WindowDef, WindowFrame,
};
pub use serialize::{operand_to_value, predicate_to_value};
