//! System / user prompt construction.

use serde_json::{json, Map, Value};

use crate::dialect::DialectProfile;
use crate::policy::PolicyConfig;
use crate::schema::SchemaSnapshot;

const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are a query planner for a SQL database.

## Your role
- Output a structured QueryPlan (JSON only).
- Do NOT output SQL strings.
- Do NOT output commentary, explanations, or markdown.
- Do NOT invent tables, columns, or relationship keys.
- Do NOT hardcode tenant IDs or other runtime values; use {"param": "PARAM_NAME"}.

## Exact output format

Top-level keys (omit unused): WITH, SELECT, FROM, JOIN, WHERE, GROUP_BY,
HAVING, WINDOW, ORDER_BY, LIMIT, OFFSET, SET_OP

### SELECT
A JSON array where EVERY item is an object with an "expr" key:
  {"expr": {"col": "table.column"}}
  {"expr": {"col": "table.column"}, "alias": "my_alias"}
  {"expr": {"func": "COUNT", "args": [{"col": "t.id"}]}, "alias": "cnt"}
The wildcard form is the bare string "*".

### FROM
Always an object with a "table" key, never a plain string:
  {"table": "employees"}

### LIMIT / OFFSET
Always an object, never a plain integer:
  {"value": 50}   or   {"param": "PAGE_SIZE"}

### WHERE / HAVING
A predicate object: the operator is the single top-level key, its value is
the argument list.
Comparison (2 operands):  {"EQ": [left, right]}  {"GT": [left, right]}
Null check (1 operand):   {"IS_NULL": {"col": "t.col"}}
Range (3 operands):       {"BETWEEN": [val, low, high]}
Membership:               {"IN": [{"col": "t.col"}, {"value": 1}, {"value": 2}]}
Logical:                  {"AND": [pred1, pred2]}  {"OR": [pred1, pred2]}
Negation:                 {"NOT": pred}

### ORDER_BY
An array of objects with "expr" and optional "dir" ("ASC" or "DESC"):
  [{"expr": {"col": "t.salary"}, "dir": "DESC"}]

### JOIN
An array of objects with "rel" (a relationship key from the schema),
"type", and an optional "alias":
  [{"rel": "departments__employees", "type": "LEFT"}]

### Operand types
- Column reference:  {"col": "table.column"}
- Literal value:     {"value": 42}  or  {"value": "text"}  or  {"value": true}
- Runtime param:     {"param": "TENANT"}
- Function call:     {"func": "COUNT", "args": [{"col": "t.id"}]}
- CASE expression:   {"case": {"when": [{"cond": predicate, "then": operand}], "else": operand}}

## Dialect profile (what you are allowed to use)
__DIALECT_PROFILE__

## Policy summary
__POLICY_SUMMARY__

## Schema snapshot (tables, columns, and relationships you may reference)
__SCHEMA_SNAPSHOT__

## Error repair
If the system returns a structured error, output only a corrected QueryPlan
JSON. Do not include commentary. Do not change unrelated parts of the plan.
"#;

/// Prompt parts ready to pass to an LLM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptComponents {
    /// Full system prompt including dialect, policy, and schema sections.
    pub system_prompt: String,
    /// The user's question.
    pub user_prompt: String,
    /// Raw schema summary JSON (for logging / debugging).
    pub schema_snapshot_json: String,
    /// Raw dialect summary JSON.
    pub dialect_profile_json: String,
}

/// Builds structured prompts for the LLM planner.
pub struct PromptBuilder<'a> {
    snapshot: &'a SchemaSnapshot,
    dialect: &'a DialectProfile,
    policy: Option<&'a PolicyConfig>,
    policy_summary: String,
}

impl<'a> PromptBuilder<'a> {
    /// Creates a builder. When a policy is supplied, param-bound column
    /// annotations are included in the schema section so the planner knows
    /// which columns must use `{"param": ...}` rather than literals.
    pub fn new(
        snapshot: &'a SchemaSnapshot,
        dialect: &'a DialectProfile,
        policy: Option<&'a PolicyConfig>,
        policy_summary: &str,
    ) -> Self {
        let policy_summary = if policy_summary.is_empty() {
            "All queries must include required runtime parameters where specified \
             by the schema. Always include LIMIT."
                .to_string()
        } else {
            policy_summary.to_string()
        };
        Self {
            snapshot,
            dialect,
            policy,
            policy_summary,
        }
    }

    /// Builds system and user prompts for the given question.
    pub fn build(&self, question: &str) -> PromptComponents {
        let schema_json = self.schema_summary();
        let dialect_json = self.dialect_summary();
        let system_prompt = SYSTEM_PROMPT_TEMPLATE
            .replace("__DIALECT_PROFILE__", &dialect_json)
            .replace("__POLICY_SUMMARY__", &self.policy_summary)
            .replace("__SCHEMA_SNAPSHOT__", &schema_json);
        PromptComponents {
            system_prompt,
            user_prompt: question.to_string(),
            schema_snapshot_json: schema_json,
            dialect_profile_json: dialect_json,
        }
    }

    /// Builds a correction prompt after a structured validation error.
    pub fn build_repair_prompt(
        &self,
        error_response: &Value,
        previous_plan_json: &str,
    ) -> PromptComponents {
        let error_text =
            serde_json::to_string_pretty(error_response).unwrap_or_else(|_| "{}".to_string());
        let question = format!(
            "The following QueryPlan produced an error:\n```json\n{previous_plan_json}\n```\n\n\
             Error:\n```json\n{error_text}\n```\n\n\
             Output only a corrected QueryPlan JSON. Do not include commentary. \
             Do not repeat the error. Do not change unrelated parts of the plan."
        );
        self.build(&question)
    }

    fn schema_summary(&self) -> String {
        let mut tables = Vec::new();
        for table in self.snapshot.tables() {
            let bound = self
                .policy
                .and_then(|p| p.tables.get(&table.name))
                .map(|tpol| &tpol.param_bound_columns);
            let columns: Vec<Value> = table
                .columns
                .iter()
                .map(|col| {
                    let mut entry = Map::new();
                    entry.insert("name".to_string(), Value::from(col.name.clone()));
                    entry.insert("type".to_string(), Value::from(col.sql_type.clone()));
                    if let Some(desc) = &col.description {
                        entry.insert("description".to_string(), Value::from(desc.clone()));
                    }
                    if let Some(param) = bound.and_then(|b| b.get(&col.name)) {
                        entry.insert("param_bound".to_string(), Value::from(param.clone()));
                    }
                    Value::Object(entry)
                })
                .collect();
            let mut entry = Map::new();
            entry.insert("name".to_string(), Value::from(table.name.clone()));
            entry.insert("columns".to_string(), Value::from(columns));
            if let Some(desc) = &table.description {
                entry.insert("description".to_string(), Value::from(desc.clone()));
            }
            tables.push(Value::Object(entry));
        }
        let relationships: Vec<Value> = self
            .snapshot
            .relationships()
            .iter()
            .map(|rel| {
                json!({
                    "key": rel.key,
                    "join": format!(
                        "{}.{} = {}.{}",
                        rel.from_table, rel.from_col, rel.to_table, rel.to_col
                    ),
                })
            })
            .collect();
        let summary = json!({"tables": tables, "relationships": relationships});
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    }

    fn dialect_summary(&self) -> String {
        let capabilities: Vec<&str> = self
            .dialect
            .capabilities()
            .iter()
            .map(|c| c.as_str())
            .collect();
        let summary = json!({
            "target": self.dialect.target(),
            "tables": self.dialect.tables(),
            "operators": self.dialect.operators(),
            "functions": self.dialect.functions(),
            "capabilities": capabilities,
            "max_join_depth": self.dialect.max_join_depth(),
            "max_limit": self.dialect.max_limit(),
        });
        serde_json::to_string_pretty(&summary).unwrap_or_else(|_| "{}".to_string())
    }
}
