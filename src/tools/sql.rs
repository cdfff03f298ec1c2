//! SQL toolkit: lets the model discover tables, read schemas and run queries.

use super::traits::{Tool, ToolResult};
use crate::database::SqlDatabase;
use async_trait::async_trait;
use serde_json::json;

/// Run a blocking database call off the async executor and fold database
/// errors into a failed [`ToolResult`] so the model can correct itself.
async fn blocking<F>(db: &SqlDatabase, f: F) -> anyhow::Result<ToolResult>
where
    F: FnOnce(&SqlDatabase) -> anyhow::Result<String> + Send + 'static,
{
    let db = db.clone();
    let outcome = tokio::task::spawn_blocking(move || f(&db)).await?;
    Ok(match outcome {
        Ok(output) => ToolResult::ok(output),
        Err(e) => ToolResult::fail(format!("{e:#}")),
    })
}

/// Lists every table in the database.
pub struct ListTablesTool {
    db: SqlDatabase,
}

impl ListTablesTool {
    pub fn new(db: SqlDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for ListTablesTool {
    fn name(&self) -> &str {
        "sql_db_list_tables"
    }

    fn description(&self) -> &str {
        "Input is an empty string, output is a comma-separated list of tables in the database."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "tool_input": {
                    "type": "string",
                    "description": "An empty string",
                    "default": ""
                }
            }
        })
    }

    async fn execute(&self, _args: serde_json::Value) -> anyhow::Result<ToolResult> {
        blocking(&self.db, |db| Ok(db.table_names()?.join(", "))).await
    }
}

/// Shows `CREATE` statements and sample rows for named tables.
pub struct SchemaTool {
    db: SqlDatabase,
}

impl SchemaTool {
    pub fn new(db: SqlDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for SchemaTool {
    fn name(&self) -> &str {
        "sql_db_schema"
    }

    fn description(&self) -> &str {
        "Input to this tool is a comma-separated list of tables, output is the schema and \
         sample rows for those tables. Be sure that the tables actually exist by calling \
         sql_db_list_tables first! Example Input: table1, table2, table3"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "table_names": {
                    "type": "string",
                    "description": "A comma-separated list of the table names for which to return the schema. Example input: 'table1, table2, table3'"
                }
            },
            "required": ["table_names"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let tables: Vec<String> = args
            .get("table_names")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        if tables.is_empty() {
            return Ok(ToolResult::fail("Missing 'table_names' parameter"));
        }

        blocking(&self.db, move |db| db.table_info(&tables)).await
    }
}

/// Executes a SQL query and returns the rows as text.
pub struct QueryTool {
    db: SqlDatabase,
}

impl QueryTool {
    pub fn new(db: SqlDatabase) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Tool for QueryTool {
    fn name(&self) -> &str {
        "sql_db_query"
    }

    fn description(&self) -> &str {
        "Input to this tool is a detailed and correct SQL query, output is a result from the \
         database. If the query is not correct, an error message will be returned. If an error \
         is returned, rewrite the query, check the query, and try again. If you encounter an \
         issue with Unknown column 'xxxx' in 'field list', use sql_db_schema to query the \
         correct table fields."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "A detailed and correct SQL query."
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> anyhow::Result<ToolResult> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default()
            .to_string();

        if query.is_empty() {
            return Ok(ToolResult::fail("Missing 'query' parameter"));
        }

        blocking(&self.db, move |db| Ok(db.run(&query)?.to_string())).await
    }
}
