//! Snapshot types and lookup indexes.
//!
//! The snapshot is produced by the caller (hand-written or reflected from a
//! live database) and injected into validation, policy, and compilation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::validate::{ValidationError, ValidationResult};

/// Metadata for a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name, unique within its table.
    pub name: String,
    /// Declared SQL type (opaque string, e.g. `"TEXT"`, `"INTEGER"`).
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Whether the column can be NULL.
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Optional human description (surfaced in planner prompts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_nullable() -> bool {
    true
}

impl ColumnInfo {
    /// Creates a nullable column.
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: true,
            description: None,
        }
    }

    /// Creates a NOT NULL column.
    pub fn not_null(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            nullable: false,
            description: None,
        }
    }

    /// Attaches a description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named, pre-defined JOIN relationship between two tables.
///
/// Plans reference relationships by `key`; they never carry ad-hoc ON
/// clauses. The relationship is directional (`from` → `to`) but the join
/// builder may traverse it either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipInfo {
    /// Unique relationship identifier (conventionally `"<parent>__<child>"`).
    pub key: String,
    /// Source table name.
    pub from_table: String,
    /// Join column on the source table.
    pub from_col: String,
    /// Target table name.
    pub to_table: String,
    /// Join column on the target table.
    pub to_col: String,
}

impl RelationshipInfo {
    /// Creates a relationship between two (table, column) endpoints.
    pub fn new(
        key: impl Into<String>,
        from_table: impl Into<String>,
        from_col: impl Into<String>,
        to_table: impl Into<String>,
        to_col: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            from_table: from_table.into(),
            from_col: from_col.into(),
            to_table: to_table.into(),
            to_col: to_col.into(),
        }
    }
}

/// Metadata for a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Table name, unique within the snapshot.
    pub name: String,
    /// Ordered list of column metadata.
    pub columns: Vec<ColumnInfo>,
    /// Relationship keys this table participates in.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<String>,
    /// Optional human description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl TableInfo {
    /// Creates a table from its columns.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnInfo>) -> Self {
        Self {
            name: name.into(),
            columns,
            relationships: Vec::new(),
            description: None,
        }
    }

    /// Returns all column names for this table.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Plain serde shape of a snapshot, before index construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSpec {
    tables: Vec<TableInfo>,
    #[serde(default)]
    relationships: Vec<RelationshipInfo>,
}

/// Describes the schema the planner is allowed to use.
///
/// Constructed once via [`SchemaSnapshot::new`], which builds the lookup
/// indexes and rejects structurally invalid input (duplicate names,
/// relationship endpoints that do not resolve).
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SnapshotSpec")]
pub struct SchemaSnapshot {
    tables: Vec<TableInfo>,
    relationships: Vec<RelationshipInfo>,
    table_index: HashMap<String, usize>,
    column_index: HashMap<String, HashMap<String, usize>>,
    relationship_index: HashMap<String, usize>,
}

impl SchemaSnapshot {
    /// Builds a snapshot and its lookup indexes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` (code `validate.bad_snapshot`) if:
    /// - a table or relationship key is declared twice
    /// - a column name repeats within a table
    /// - a relationship endpoint names an unknown table or column
    pub fn new(
        tables: Vec<TableInfo>,
        relationships: Vec<RelationshipInfo>,
    ) -> ValidationResult<Self> {
        let mut table_index = HashMap::new();
        let mut column_index: HashMap<String, HashMap<String, usize>> = HashMap::new();

        for (i, table) in tables.iter().enumerate() {
            if table_index.insert(table.name.clone(), i).is_some() {
                return Err(ValidationError::bad_snapshot(format!(
                    "Table '{}' is declared more than once",
                    table.name
                )));
            }
            let mut cols = HashMap::new();
            for (j, col) in table.columns.iter().enumerate() {
                if cols.insert(col.name.clone(), j).is_some() {
                    return Err(ValidationError::bad_snapshot(format!(
                        "Column '{}' is declared more than once on table '{}'",
                        col.name, table.name
                    )));
                }
            }
            column_index.insert(table.name.clone(), cols);
        }

        let mut relationship_index = HashMap::new();
        for (i, rel) in relationships.iter().enumerate() {
            if relationship_index.insert(rel.key.clone(), i).is_some() {
                return Err(ValidationError::bad_snapshot(format!(
                    "Relationship key '{}' is declared more than once",
                    rel.key
                )));
            }
            for (table, column) in [
                (&rel.from_table, &rel.from_col),
                (&rel.to_table, &rel.to_col),
            ] {
                let exists = column_index
                    .get(table.as_str())
                    .is_some_and(|cols| cols.contains_key(column.as_str()));
                if !exists {
                    return Err(ValidationError::bad_snapshot(format!(
                        "Relationship '{}' endpoint '{}.{}' does not resolve to a declared column",
                        rel.key, table, column
                    )));
                }
            }
        }

        Ok(Self {
            tables,
            relationships,
            table_index,
            column_index,
            relationship_index,
        })
    }

    /// Returns the table metadata for `name`, if declared.
    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.table_index.get(name).map(|&i| &self.tables[i])
    }

    /// Returns the column metadata for a (table, column) pair, if declared.
    pub fn column(&self, table: &str, column: &str) -> Option<&ColumnInfo> {
        let table_idx = *self.table_index.get(table)?;
        let col_idx = *self.column_index.get(table)?.get(column)?;
        Some(&self.tables[table_idx].columns[col_idx])
    }

    /// Returns the relationship for `key`, if declared.
    pub fn relationship(&self, key: &str) -> Option<&RelationshipInfo> {
        self.relationship_index
            .get(key)
            .map(|&i| &self.relationships[i])
    }

    /// Returns column names for `table`, or an empty list if unknown.
    pub fn column_names(&self, table: &str) -> Vec<&str> {
        self.table(table).map_or_else(Vec::new, TableInfo::column_names)
    }

    /// Returns all table names in the snapshot.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    /// Returns all relationship keys in the snapshot.
    pub fn relationship_keys(&self) -> Vec<&str> {
        self.relationships.iter().map(|r| r.key.as_str()).collect()
    }

    /// All tables, in declaration order.
    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    /// All relationships, in declaration order.
    pub fn relationships(&self) -> &[RelationshipInfo] {
        &self.relationships
    }
}

impl TryFrom<SnapshotSpec> for SchemaSnapshot {
    type Error = ValidationError;

    fn try_from(spec: SnapshotSpec) -> Result<Self, Self::Error> {
        Self::new(spec.tables, spec.relationships)
    }
}

impl Serialize for SchemaSnapshot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SnapshotSpec {
            tables: self.tables.clone(),
            relationships: self.relationships.clone(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employees() -> TableInfo {
        TableInfo::new(
            "employees",
            vec![
                ColumnInfo::not_null("employee_id", "INTEGER"),
                ColumnInfo::not_null("tenant_id", "TEXT"),
                ColumnInfo::new("first_name", "TEXT"),
                ColumnInfo::new("department_id", "INTEGER"),
            ],
        )
    }

    fn departments() -> TableInfo {
        TableInfo::new(
            "departments",
            vec![
                ColumnInfo::not_null("department_id", "INTEGER"),
                ColumnInfo::new("name", "TEXT"),
            ],
        )
    }

    #[test]
    fn test_lookup_by_table_and_column() {
        let snapshot = SchemaSnapshot::new(vec![employees(), departments()], vec![]).unwrap();

        assert!(snapshot.table("employees").is_some());
        assert!(snapshot.table("ghosts").is_none());

        let col = snapshot.column("employees", "tenant_id").unwrap();
        assert_eq!(col.sql_type, "TEXT");
        assert!(!col.nullable);
        assert!(snapshot.column("employees", "salary").is_none());
        assert!(snapshot.column("ghosts", "tenant_id").is_none());
    }

    #[test]
    fn test_relationship_lookup() {
        let rel = RelationshipInfo::new(
            "departments__employees",
            "employees",
            "department_id",
            "departments",
            "department_id",
        );
        let snapshot =
            SchemaSnapshot::new(vec![employees(), departments()], vec![rel.clone()]).unwrap();

        assert_eq!(snapshot.relationship("departments__employees"), Some(&rel));
        assert!(snapshot.relationship("ghost").is_none());
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let result = SchemaSnapshot::new(vec![employees(), employees()], vec![]);
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().code(), "validate.bad_snapshot");
    }

    #[test]
    fn test_dangling_relationship_endpoint_rejected() {
        let rel = RelationshipInfo::new("x__y", "employees", "department_id", "ghosts", "id");
        let result = SchemaSnapshot::new(vec![employees()], vec![rel]);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("ghosts.id"));
    }

    #[test]
    fn test_duplicate_relationship_key_rejected() {
        let rel = RelationshipInfo::new(
            "departments__employees",
            "employees",
            "department_id",
            "departments",
            "department_id",
        );
        let result =
            SchemaSnapshot::new(vec![employees(), departments()], vec![rel.clone(), rel]);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_rebuilds_indexes() {
        let raw = serde_json::json!({
            "tables": [
                {"name": "users", "columns": [
                    {"name": "id", "type": "INTEGER", "nullable": false},
                    {"name": "email", "type": "TEXT"}
                ]}
            ]
        });
        let snapshot: SchemaSnapshot = serde_json::from_value(raw).unwrap();
        assert!(snapshot.column("users", "email").unwrap().nullable);
        assert!(!snapshot.column("users", "id").unwrap().nullable);
    }
}
