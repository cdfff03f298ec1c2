use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Value shipped in sample `.env` files; never a real credential.
pub const API_KEY_PLACEHOLDER: &str = "your-api-key-here";

const DEFAULT_DB_PATH: &str = "ecommerce.db";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_API_URL: &str = "https://api.openai.com/v1";

// ── Errors ───────────────────────────────────────────────────────

/// Startup configuration failures. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Please set your OPENAI_API_KEY environment variable")]
    MissingApiKey,

    #[error(
        "Database '{}' not found. Please create the transactions database first.",
        .0.display()
    )]
    DatabaseNotFound(PathBuf),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ── Top-level config ──────────────────────────────────────────────

/// Runtime settings, read once at startup from the environment.
///
/// Each setting accepts an `ECOMCHAT_`-prefixed variable which wins over the
/// bare legacy name (`DB_PATH`, `MODEL`, `TEMPERATURE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite transactions database. Default: `ecommerce.db`.
    pub db_path: PathBuf,
    /// Chat model identifier. Default: `gpt-4o-mini`.
    pub model: String,
    /// Sampling temperature (0.0–2.0). Default: `0`.
    pub temperature: f64,
    /// Provider credential from `OPENAI_API_KEY`. Required.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Chat-completions base URL from `OPENAI_BASE_URL`.
    pub api_url: String,
    /// Maximum model rounds per question. Default: `15`.
    pub max_iterations: usize,
    /// Maximum prior turns sent as conversation context. Default: `50`.
    pub max_history_messages: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            model: DEFAULT_MODEL.into(),
            temperature: 0.0,
            api_key: None,
            api_url: DEFAULT_API_URL.into(),
            max_iterations: 15,
            max_history_messages: 50,
        }
    }
}

impl Config {
    /// Build a config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Overlay any values present in `lookup` onto this config.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        if let Some(path) = get(&["ECOMCHAT_DB_PATH", "DB_PATH"]) {
            self.db_path = PathBuf::from(path);
        }

        if let Some(model) = get(&["ECOMCHAT_MODEL", "MODEL"]) {
            self.model = model;
        }

        if let Some(raw) = get(&["ECOMCHAT_TEMPERATURE", "TEMPERATURE"]) {
            self.temperature = raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "TEMPERATURE",
                reason: format!("{raw:?}: {e}"),
            })?;
        }

        // The credential is taken verbatim so a whitespace-only key is still
        // caught by `validate`.
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }

        if let Some(url) = get(&["OPENAI_BASE_URL"]) {
            self.api_url = url;
        }

        if let Some(raw) = get(&["ECOMCHAT_MAX_ITERATIONS"]) {
            self.max_iterations = parse_count("ECOMCHAT_MAX_ITERATIONS", &raw)?;
        }

        if let Some(raw) = get(&["ECOMCHAT_MAX_HISTORY_MESSAGES"]) {
            self.max_history_messages = parse_count("ECOMCHAT_MAX_HISTORY_MESSAGES", &raw)?;
        }

        Ok(())
    }

    /// Check everything the chat session needs before it starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.api_key.as_deref().map(str::trim) {
            None | Some("") | Some(API_KEY_PLACEHOLDER) => {
                return Err(ConfigError::MissingApiKey)
            }
            Some(_) => {}
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidValue {
                key: "TEMPERATURE",
                reason: format!("{} is outside 0.0..=2.0", self.temperature),
            });
        }

        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                key: "ECOMCHAT_MAX_ITERATIONS",
                reason: "must be at least 1".into(),
            });
        }

        if !self.db_path.exists() {
            return Err(ConfigError::DatabaseNotFound(self.db_path.clone()));
        }

        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

fn parse_count(key: &'static str, raw: &str) -> Result<usize, ConfigError> {
    raw.parse().map_err(|e| ConfigError::InvalidValue {
        key,
        reason: format!("{raw:?}: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn valid_config(db: &NamedTempFile) -> Config {
        Config {
            db_path: db.path().to_path_buf(),
            api_key: Some("sk-test-key-123".into()),
            ..Config::default()
        }
    }

    #[test]
    fn loads_values_from_lookup() {
        let config = Config::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test-key-123"),
            ("MODEL", "gpt-4o"),
            ("TEMPERATURE", "0.5"),
            ("DB_PATH", "shop.db"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1"),
        ]))
        .unwrap();

        assert_eq!(config.api_key.as_deref(), Some("sk-test-key-123"));
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.5);
        assert_eq!(config.db_path, PathBuf::from("shop.db"));
        assert_eq!(config.api_url, "http://localhost:8080/v1");
    }

    #[test]
    fn uses_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[("OPENAI_API_KEY", "test-key")])).unwrap();

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.db_path, PathBuf::from("ecommerce.db"));
        assert_eq!(config.api_url, "https://api.openai.com/v1");
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.max_history_messages, 50);
    }

    #[test]
    fn prefixed_variables_win_over_legacy_names() {
        let config = Config::from_lookup(lookup_from(&[
            ("MODEL", "legacy-model"),
            ("ECOMCHAT_MODEL", "preferred-model"),
            ("DB_PATH", "legacy.db"),
            ("ECOMCHAT_DB_PATH", "  "),
        ]))
        .unwrap();

        assert_eq!(config.model, "preferred-model");
        // Blank prefixed values fall through to the legacy name.
        assert_eq!(config.db_path, PathBuf::from("legacy.db"));
    }

    #[test]
    fn unparseable_temperature_is_rejected() {
        let err = Config::from_lookup(lookup_from(&[("TEMPERATURE", "warm")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "TEMPERATURE",
                ..
            }
        ));
    }

    #[test]
    fn unparseable_iteration_limit_is_rejected() {
        let err =
            Config::from_lookup(lookup_from(&[("ECOMCHAT_MAX_ITERATIONS", "-3")])).unwrap_err();
        assert!(err.to_string().contains("ECOMCHAT_MAX_ITERATIONS"));
    }

    #[test]
    fn validate_rejects_missing_api_key() {
        let db = NamedTempFile::new().unwrap();
        let config = Config {
            api_key: None,
            ..valid_config(&db)
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert!(err.to_string().contains("Please set your OPENAI_API_KEY"));
    }

    #[test]
    fn validate_rejects_blank_api_key() {
        let db = NamedTempFile::new().unwrap();
        let config = Config {
            api_key: Some("   ".into()),
            ..valid_config(&db)
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn validate_rejects_placeholder_api_key() {
        let db = NamedTempFile::new().unwrap();
        let config = Config {
            api_key: Some(API_KEY_PLACEHOLDER.into()),
            ..valid_config(&db)
        };
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn validate_rejects_missing_database() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nonexistent.db");
        let config = Config {
            db_path: missing.clone(),
            api_key: Some("sk-test-key-123".into()),
            ..Config::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::DatabaseNotFound(ref p) if *p == missing));
        let message = err.to_string();
        assert!(message.starts_with("Database '"));
        assert!(message.contains("not found"));
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let db = NamedTempFile::new().unwrap();
        let config = Config {
            temperature: 2.5,
            ..valid_config(&db)
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                key: "TEMPERATURE",
                ..
            })
        ));
    }

    #[test]
    fn validate_rejects_zero_iterations() {
        let db = NamedTempFile::new().unwrap();
        let config = Config {
            max_iterations: 0,
            ..valid_config(&db)
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_complete_config() {
        let db = NamedTempFile::new().unwrap();
        valid_config(&db).validate().unwrap();
    }

    #[test]
    fn api_key_is_never_serialized() {
        let config = Config {
            api_key: Some("sk-secret".into()),
            ..Config::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
