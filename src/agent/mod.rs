//! Agent assembly: model provider, SQL toolkit and optional session memory.

pub mod history;
pub mod prompt;
pub mod sql_agent;
pub mod traits;

pub use history::AgentWithHistory;
pub use prompt::SYSTEM_PROMPT;
pub use sql_agent::{SqlAgent, SqlAgentBuilder, MAX_ITERATIONS_OUTPUT};
pub use traits::{AgentExecutor, AgentInput, AgentOutput};

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use crate::database::SqlDatabase;
use crate::providers;
use crate::sessions::SessionMemory;
use crate::tools;

/// Build the SQL agent described by `config`.
///
/// With `memory`, every invocation is threaded through the session store so
/// follow-up questions see earlier turns. Without it, each question stands
/// alone.
pub fn setup_agent(
    config: &Config,
    memory: Option<Arc<dyn SessionMemory>>,
) -> Result<Box<dyn AgentExecutor>> {
    let db = SqlDatabase::open(config.db_path())
        .with_context(|| format!("opening database {}", config.db_path().display()))?;
    tracing::info!(path = %db.path().display(), dialect = db.dialect(), "database connected");

    let provider = providers::create_provider("openai", config.api_key.as_deref(), &config.api_url)?;

    let agent = SqlAgent::builder()
        .provider(provider)
        .tools(tools::sql_tools(&db))
        .system_prompt(SYSTEM_PROMPT)
        .model(config.model.clone())
        .temperature(config.temperature)
        .max_iterations(config.max_iterations)
        .build()?;
    tracing::info!(
        model = %config.model,
        tools = ?agent.tool_names(),
        "agent ready"
    );

    Ok(match memory {
        Some(memory) => {
            tracing::info!(store = memory.name(), "session memory enabled");
            Box::new(
                AgentWithHistory::new(Box::new(agent), memory)
                    .with_max_history_messages(config.max_history_messages),
            )
        }
        None => Box::new(agent),
    })
}
