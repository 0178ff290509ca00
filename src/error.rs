//! Error types for FoodMatch.

/// Top-level error type for the bot.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A stored value exists but no longer decodes into its record type.
    #[error("Corrupt value for {scope}/{key}: {reason}")]
    Corrupt {
        scope: String,
        key: String,
        raw: serde_json::Value,
        reason: String,
    },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },
}

/// Conversation flow errors.
///
/// User input never produces one of these; a blank answer is a normal
/// rejection branch. These only surface when persisted state is broken.
#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Unrecognized question state {raw} for conversation {conversation_id}")]
    UnrecognizedState {
        conversation_id: String,
        raw: String,
    },

    #[error("Corrupt profile for user {user_id}: {reason}")]
    CorruptProfile { user_id: String, reason: String },
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
