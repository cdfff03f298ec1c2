//! Tool subsystem for agent-callable capabilities.
//!
//! Each tool implements the [`Tool`] trait defined in [`traits`], which
//! requires a name, description, JSON parameter schema, and an async
//! `execute` method returning a structured [`ToolResult`].
//!
//! The SQL toolkit assembled by [`sql_tools`] is what the agent sees: list
//! tables, inspect schemas, run queries. Every tool shares one read-only
//! [`SqlDatabase`] handle.

pub mod sql;
pub mod traits;

pub use sql::{ListTablesTool, QueryTool, SchemaTool};
pub use traits::{Tool, ToolResult, ToolSpec};

use crate::database::SqlDatabase;

/// Create the SQL tool registry (list tables, schema, query).
pub fn sql_tools(db: &SqlDatabase) -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(ListTablesTool::new(db.clone())),
        Box::new(SchemaTool::new(db.clone())),
        Box::new(QueryTool::new(db.clone())),
    ]
}
