pub mod schema;

pub use schema::{Config, ConfigError, API_KEY_PLACEHOLDER};
