//! Validation context and name scope.
//!
//! The context packages the `(snapshot, dialect)` pair threaded through
//! every sub-validator. The scope stack tracks which relation names are
//! visible at a point in the tree: snapshot tables brought in by FROM and
//! JOIN (possibly under an alias), plus virtual relations (CTE names and
//! derived-table aliases) whose columns the snapshot cannot check.
//!
//! Subquery validation works on a child scope that inherits parent
//! visibility, so correlated references inside EXISTS resolve.

use std::collections::HashMap;

use crate::dialect::DialectProfile;
use crate::schema::SchemaSnapshot;

/// Immutable inputs for a single validation run.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// The schema the planner was given.
    pub snapshot: &'a SchemaSnapshot,
    /// The dialect profile controlling allowed features.
    pub dialect: &'a DialectProfile,
}

/// What a visible name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relation {
    /// A snapshot table, possibly bound under an alias.
    Table(String),
    /// A CTE or derived-table alias; columns are not schema-checked.
    Virtual,
}

/// A stack of name-resolution frames.
#[derive(Debug, Clone, Default)]
pub struct ScopeStack {
    frames: Vec<HashMap<String, Relation>>,
}

impl ScopeStack {
    /// An empty scope with no visible names.
    pub fn root() -> Self {
        Self::default()
    }

    /// A child scope that inherits this scope's visibility and adds a
    /// fresh frame for the nested plan's own names.
    pub fn child(&self) -> Self {
        let mut child = self.clone();
        child.frames.push(HashMap::new());
        child
    }

    /// Binds `name` to a snapshot table in the innermost frame.
    pub fn bind_table(&mut self, name: &str, table: &str) {
        self.top().insert(name.to_string(), Relation::Table(table.to_string()));
    }

    /// Binds `name` to a virtual relation in the innermost frame.
    pub fn bind_virtual(&mut self, name: &str) {
        self.top().insert(name.to_string(), Relation::Virtual);
    }

    /// Resolves a name, innermost frame first.
    pub fn resolve(&self, name: &str) -> Option<&Relation> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    /// True when some binding (under any name) refers to `table`.
    pub fn has_table(&self, table: &str) -> bool {
        self.frames.iter().any(|frame| {
            frame
                .values()
                .any(|rel| matches!(rel, Relation::Table(t) if t == table))
        })
    }

    fn top(&mut self) -> &mut HashMap<String, Relation> {
        if self.frames.is_empty() {
            self.frames.push(HashMap::new());
        }
        self.frames.last_mut().expect("frame pushed above")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_inherits_parent_bindings() {
        let mut parent = ScopeStack::root();
        parent.bind_table("employees", "employees");

        let mut child = parent.child();
        child.bind_virtual("dept_totals");

        assert!(child.resolve("employees").is_some());
        assert!(child.resolve("dept_totals").is_some());
        assert!(parent.resolve("dept_totals").is_none());
    }

    #[test]
    fn test_inner_frame_shadows_outer() {
        let mut parent = ScopeStack::root();
        parent.bind_table("t", "employees");
        let mut child = parent.child();
        child.bind_virtual("t");
        assert_eq!(child.resolve("t"), Some(&Relation::Virtual));
    }

    #[test]
    fn test_has_table_sees_aliased_bindings() {
        let mut scope = ScopeStack::root();
        scope.bind_table("mgr", "employees");
        assert!(scope.has_table("employees"));
        assert!(!scope.has_table("departments"));
    }
}
