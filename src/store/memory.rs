//! In-memory `Database` — for tests and throwaway sessions.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::DatabaseError;

use super::traits::{Database, SettingEntry};

/// Settings held in a map; lost when the process exits.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    settings: RwLock<HashMap<(String, String), serde_json::Value>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let settings = self.settings.read().await;
        Ok(settings
            .get(&(scope.to_string(), key.to_string()))
            .cloned())
    }

    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let mut settings = self.settings.write().await;
        settings.insert((scope.to_string(), key.to_string()), value.clone());
        Ok(())
    }

    async fn set_settings(&self, entries: &[SettingEntry]) -> Result<(), DatabaseError> {
        // One write guard for the whole batch.
        let mut settings = self.settings.write().await;
        for entry in entries {
            settings.insert(
                (entry.scope.clone(), entry.key.clone()),
                entry.value.clone(),
            );
        }
        Ok(())
    }
}
