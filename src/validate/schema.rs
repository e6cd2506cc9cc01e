//! Schema existence validation.
//!
//! Resolves table and column references against the snapshot, the profile's
//! table whitelist, and the current scope (CTE names, derived-table and
//! JOIN aliases). Joins must use declared relationship keys, with one
//! endpoint already in scope; the other endpoint is introduced.

use crate::plan::{ColumnRef, JoinClause};
use crate::schema::ColumnInfo;

use super::context::{Relation, ScopeStack, ValidationContext};
use super::errors::{ValidationError, ValidationResult};

pub(crate) struct SchemaValidator<'a> {
    ctx: ValidationContext<'a>,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(ctx: ValidationContext<'a>) -> Self {
        Self { ctx }
    }

    /// Checks a FROM / reference table name: a whitelisted snapshot table
    /// or a virtual relation already in scope.
    pub fn check_table(&self, table: &str, scope: &ScopeStack) -> ValidationResult<()> {
        if scope.resolve(table).is_some() {
            return Ok(());
        }
        if self.snapshot_table_visible(table) {
            return Ok(());
        }
        Err(ValidationError::unknown_table(table, self.visible_tables()))
    }

    /// Checks a column reference and returns its snapshot metadata when the
    /// qualifier resolves to a real table (virtual relations yield `None`).
    pub fn check_column(
        &self,
        col: &ColumnRef,
        scope: &ScopeStack,
    ) -> ValidationResult<Option<&'a ColumnInfo>> {
        let table = match scope.resolve(&col.table) {
            Some(Relation::Virtual) => return Ok(None),
            Some(Relation::Table(t)) => t.clone(),
            None => {
                if !self.snapshot_table_visible(&col.table) {
                    return Err(ValidationError::unknown_table(
                        &col.table,
                        self.visible_tables(),
                    ));
                }
                col.table.clone()
            }
        };
        match self.ctx.snapshot.column(&table, &col.column) {
            Some(info) => Ok(Some(info)),
            None => Err(ValidationError::unknown_column(
                &table,
                &col.column,
                self.ctx.snapshot.column_names(&table),
            )),
        }
    }

    /// Checks a JOIN clause and returns the name of the newly introduced
    /// endpoint table.
    pub fn check_join(&self, join: &JoinClause, scope: &ScopeStack) -> ValidationResult<String> {
        let rel = self.ctx.snapshot.relationship(&join.rel).ok_or_else(|| {
            ValidationError::unknown_relationship(&join.rel, self.ctx.snapshot.relationship_keys())
        })?;

        // Either endpoint may anchor the join; the other side is introduced.
        let introduced = if scope.has_table(&rel.from_table) {
            rel.to_table.as_str()
        } else if scope.has_table(&rel.to_table) {
            rel.from_table.as_str()
        } else {
            return Err(ValidationError::join_disconnected(
                &join.rel,
                &rel.from_table,
                &rel.to_table,
            ));
        };

        if !self.snapshot_table_visible(introduced) {
            return Err(ValidationError::unknown_table(
                introduced,
                self.visible_tables(),
            ));
        }
        Ok(introduced.to_string())
    }

    fn snapshot_table_visible(&self, table: &str) -> bool {
        self.ctx.snapshot.table(table).is_some() && self.ctx.dialect.table_allowed(table)
    }

    fn visible_tables(&self) -> Vec<&str> {
        self.ctx
            .snapshot
            .table_names()
            .into_iter()
            .filter(|t| self.ctx.dialect.table_allowed(t))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::dialect::DialectProfile;
    use crate::plan::JoinType;
    use crate::schema::{ColumnInfo, RelationshipInfo, SchemaSnapshot, TableInfo};

    use super::*;

    fn snapshot() -> SchemaSnapshot {
        SchemaSnapshot::new(
            vec![
                TableInfo::new(
                    "employees",
                    vec![
                        ColumnInfo::not_null("employee_id", "INTEGER"),
                        ColumnInfo::new("department_id", "INTEGER"),
                    ],
                ),
                TableInfo::new(
                    "departments",
                    vec![ColumnInfo::not_null("department_id", "INTEGER")],
                ),
            ],
            vec![RelationshipInfo::new(
                "departments__employees",
                "employees",
                "department_id",
                "departments",
                "department_id",
            )],
        )
        .unwrap()
    }

    fn join(rel: &str) -> JoinClause {
        JoinClause {
            rel: rel.to_string(),
            join_type: JoinType::Left,
            alias: None,
        }
    }

    #[test]
    fn test_whitelist_hides_snapshot_tables() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });
        let scope = ScopeStack::root();

        assert!(validator.check_table("employees", &scope).is_ok());
        let err = validator.check_table("departments", &scope).unwrap_err();
        assert_eq!(err.code(), "validate.unknown_table");
    }

    #[test]
    fn test_unknown_relationship_reports_key() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees", "departments"], "postgres")
            .joins()
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });
        let mut scope = ScopeStack::root();
        scope.bind_table("employees", "employees");

        let err = validator.check_join(&join("ghost"), &scope).unwrap_err();
        assert_eq!(err.code(), "validate.unknown_relationship");
        assert_eq!(err.details()["key"], "ghost");
    }

    #[test]
    fn test_join_introduces_other_endpoint() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees", "departments"], "postgres")
            .joins()
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });

        let mut scope = ScopeStack::root();
        scope.bind_table("employees", "employees");
        let introduced = validator
            .check_join(&join("departments__employees"), &scope)
            .unwrap();
        assert_eq!(introduced, "departments");

        // Traversal works from the other side too.
        let mut scope = ScopeStack::root();
        scope.bind_table("departments", "departments");
        let introduced = validator
            .check_join(&join("departments__employees"), &scope)
            .unwrap();
        assert_eq!(introduced, "employees");
    }

    #[test]
    fn test_disconnected_join_rejected() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees", "departments"], "postgres")
            .joins()
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });
        let scope = ScopeStack::root();
        let err = validator
            .check_join(&join("departments__employees"), &scope)
            .unwrap_err();
        assert_eq!(err.code(), "validate.join_disconnected");
    }

    #[test]
    fn test_virtual_relations_skip_column_checks() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });
        let mut scope = ScopeStack::root();
        scope.bind_virtual("totals");

        let info = validator
            .check_column(&ColumnRef::new("totals", "anything"), &scope)
            .unwrap();
        assert!(info.is_none());
    }

    #[test]
    fn test_unknown_column_lists_alternatives() {
        let snapshot = snapshot();
        let dialect = DialectProfile::builder(["employees"], "postgres")
            .build()
            .unwrap();
        let validator = SchemaValidator::new(ValidationContext {
            snapshot: &snapshot,
            dialect: &dialect,
        });
        let scope = ScopeStack::root();

        let err = validator
            .check_column(&ColumnRef::new("employees", "salary"), &scope)
            .unwrap_err();
        assert_eq!(err.code(), "validate.unknown_column");
        assert!(err.details()["allowed_columns"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "employee_id"));
    }
}
