//! `Database` trait — scoped key-value persistence for flow records.

use async_trait::async_trait;

use crate::error::DatabaseError;

/// One record to write in a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingEntry {
    pub scope: String,
    pub key: String,
    pub value: serde_json::Value,
}

impl SettingEntry {
    pub fn new(scope: impl Into<String>, key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            scope: scope.into(),
            key: key.into(),
            value,
        }
    }
}

/// Backend-agnostic persistence of JSON values keyed by `(scope, key)`.
#[async_trait]
pub trait Database: Send + Sync {
    /// Read a value. `Ok(None)` when nothing is stored.
    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a value.
    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Write several values as one unit.
    ///
    /// The default writes sequentially; backends with transactions override
    /// this so that either every entry lands or none does.
    async fn set_settings(&self, entries: &[SettingEntry]) -> Result<(), DatabaseError> {
        for entry in entries {
            self.set_setting(&entry.scope, &entry.key, &entry.value)
                .await?;
        }
        Ok(())
    }
}
