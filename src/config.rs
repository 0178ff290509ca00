//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Path value that selects the in-memory backend.
pub const MEMORY_DB: &str = ":memory:";

/// How answers are checked before they are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Any non-blank answer is accepted as typed (trimmed).
    #[default]
    Lenient,
    /// Answers must match one of the listed options, case-insensitively.
    Strict,
}

/// What to do when a persisted record no longer decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorruptStatePolicy {
    /// Log the corruption and start that record over from its default.
    #[default]
    Reset,
    /// Return the error to the caller without touching storage.
    Fail,
}

/// Bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Database file. `None` selects the in-memory backend.
    pub db_path: Option<PathBuf>,
    /// User identity the CLI host talks as.
    pub user_id: String,
    /// Conversation the CLI host talks in.
    pub conversation_id: String,
    pub validation: ValidationMode,
    pub on_corrupt_state: CorruptStatePolicy,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from("./data/food-match.db")),
            user_id: "local-user".to_string(),
            conversation_id: uuid::Uuid::new_v4().to_string(),
            validation: ValidationMode::default(),
            on_corrupt_state: CorruptStatePolicy::default(),
        }
    }
}

impl BotConfig {
    /// Build the configuration from `FOOD_MATCH_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup("FOOD_MATCH_DB_PATH") {
            config.db_path = if path == MEMORY_DB {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(user_id) = non_empty(lookup("FOOD_MATCH_USER_ID")) {
            config.user_id = user_id;
        }
        if let Some(conversation_id) = non_empty(lookup("FOOD_MATCH_CONVERSATION_ID")) {
            config.conversation_id = conversation_id;
        }
        if let Some(strict) = lookup("FOOD_MATCH_STRICT") {
            config.validation = if parse_bool("FOOD_MATCH_STRICT", &strict)? {
                ValidationMode::Strict
            } else {
                ValidationMode::Lenient
            };
        }
        if let Some(policy) = lookup("FOOD_MATCH_ON_CORRUPT_STATE") {
            config.on_corrupt_state = match policy.trim().to_ascii_lowercase().as_str() {
                "reset" => CorruptStatePolicy::Reset,
                "fail" => CorruptStatePolicy::Fail,
                other => {
                    return Err(ConfigError::InvalidValue {
                        key: "FOOD_MATCH_ON_CORRUPT_STATE".to_string(),
                        message: format!("expected 'reset' or 'fail', got '{other}'"),
                    });
                }
            };
        }

        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}
