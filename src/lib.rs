#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_literal_bound
)]

pub mod agent;
pub mod config;
pub mod database;
pub mod providers;
pub mod repl;
pub mod sessions;
pub mod tools;

pub use agent::{setup_agent, AgentExecutor, AgentInput, AgentOutput};
pub use config::{Config, ConfigError};
pub use repl::ChatLoop;
pub use sessions::{create_session_store, InMemorySessionStore, SessionMemory};
