//! Relationship inference from column naming conventions.
//!
//! Many real-world databases omit FOREIGN KEY declarations even when columns
//! are semantically related. For every column named `{prefix}_id`, a parent
//! table named `{prefix}` or `{prefix}s` with an `id` column yields an
//! inferred relationship under the standard `{parent}__{child}` key.

use std::collections::{HashMap, HashSet};

use crate::validate::ValidationResult;

use super::snapshot::{RelationshipInfo, SchemaSnapshot, TableInfo};

/// Returns a new snapshot with relationships inferred from `*_id` naming
/// conventions merged in. Relationships already present are preserved; the
/// input snapshot is not mutated.
pub fn infer_relationships_from_names(
    snapshot: &SchemaSnapshot,
) -> ValidationResult<SchemaSnapshot> {
    let mut existing_keys: HashSet<String> =
        snapshot.relationship_keys().iter().map(|k| k.to_string()).collect();

    // Pre-scan (child, parent) pairs so self-references and multiple foreign
    // keys to the same parent get disambiguated with the column name.
    let mut pair_count: HashMap<(String, String), usize> = HashMap::new();
    for table in snapshot.tables() {
        let mut seen: HashSet<String> = HashSet::new();
        for col in &table.columns {
            if let Some(parent) = candidate_parent(&col.name, snapshot) {
                if seen.insert(parent.to_string()) {
                    *pair_count
                        .entry((table.name.clone(), parent.to_string()))
                        .or_insert(0) += 1;
                }
            }
        }
    }

    let mut inferred: Vec<RelationshipInfo> = Vec::new();
    let mut extra_keys: HashMap<String, Vec<String>> = HashMap::new();

    for table in snapshot.tables() {
        for col in &table.columns {
            let Some(parent) = candidate_parent(&col.name, snapshot) else {
                continue;
            };
            let key = relationship_key(&table.name, &col.name, parent, &pair_count);
            if !existing_keys.insert(key.clone()) {
                continue;
            }
            inferred.push(RelationshipInfo::new(
                key.clone(),
                table.name.clone(),
                col.name.clone(),
                parent,
                "id",
            ));
            extra_keys.entry(table.name.clone()).or_default().push(key.clone());
            if parent != table.name {
                extra_keys.entry(parent.to_string()).or_default().push(key);
            }
        }
    }

    if inferred.is_empty() {
        return Ok(snapshot.clone());
    }

    let tables: Vec<TableInfo> = snapshot
        .tables()
        .iter()
        .map(|t| {
            let mut table = t.clone();
            if let Some(keys) = extra_keys.get(&t.name) {
                table.relationships.extend(keys.iter().cloned());
            }
            table
        })
        .collect();

    let mut relationships = snapshot.relationships().to_vec();
    relationships.extend(inferred);
    SchemaSnapshot::new(tables, relationships)
}

/// Resolves the parent table for a `{prefix}_id` column: tries `prefix`
/// verbatim, then `prefix + "s"`. The candidate must have an `id` column.
fn candidate_parent<'a>(column_name: &str, snapshot: &'a SchemaSnapshot) -> Option<&'a str> {
    let prefix = column_name.strip_suffix("_id")?;
    if prefix.is_empty() {
        return None;
    }
    let plural = format!("{prefix}s");
    for candidate in [prefix, plural.as_str()] {
        if let Some(table) = snapshot.table(candidate) {
            if table.columns.iter().any(|c| c.name == "id") {
                return Some(&table.name);
            }
        }
    }
    None
}

/// Short `{parent}__{child}` key, or the long `{parent}__{child}__{col}`
/// form when the pair is ambiguous (self-reference or multiple FKs).
fn relationship_key(
    child: &str,
    child_col: &str,
    parent: &str,
    pair_count: &HashMap<(String, String), usize>,
) -> String {
    let ambiguous = child == parent
        || pair_count
            .get(&(child.to_string(), parent.to_string()))
            .is_some_and(|&n| n > 1);
    if ambiguous {
        format!("{parent}__{child}__{child_col}")
    } else {
        format!("{parent}__{child}")
    }
}
