//! libSQL backend — async `Database` trait implementation.
//!
//! Supports local file and in-memory databases. Values are stored as JSON
//! text in the `settings` table, keyed by `(scope, key)`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{Database, SettingEntry};

const UPSERT_SETTING: &str = "INSERT INTO settings (scope, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT (scope, key) DO UPDATE SET value = ?3, updated_at = ?4";

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations. Writes are
/// serialized so a batch transaction never interleaves with another write.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
    write_lock: Mutex<()>,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    DatabaseError::Pool(format!("Failed to create database directory: {e}"))
                })?;
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.init_schema().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
            write_lock: Mutex::new(()),
        })
    }

    /// Get the connection.
    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn init_schema(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }
}

fn encode(value: &serde_json::Value) -> Result<String, DatabaseError> {
    serde_json::to_string(value).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn get_setting(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE scope = ?1 AND key = ?2",
                params![scope, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
                // Undecodable text is surfaced as a JSON string so the caller
                // sees it as corrupt instead of silently missing.
                let value = serde_json::from_str(&value_str)
                    .unwrap_or(serde_json::Value::String(value_str));
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        scope: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let value_str = encode(value)?;
        let now = Utc::now().to_rfc3339();

        let _guard = self.write_lock.lock().await;
        self.conn()
            .execute(UPSERT_SETTING, params![scope, key, value_str, now])
            .await
            .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        Ok(())
    }

    async fn set_settings(&self, entries: &[SettingEntry]) -> Result<(), DatabaseError> {
        let encoded = entries
            .iter()
            .map(|entry| -> Result<_, DatabaseError> { Ok((entry, encode(&entry.value)?)) })
            .collect::<Result<Vec<_>, _>>()?;
        let now = Utc::now().to_rfc3339();

        let _guard = self.write_lock.lock().await;
        let tx = self
            .conn()
            .transaction()
            .await
            .map_err(|e| DatabaseError::Query(format!("set_settings begin: {e}")))?;

        for (entry, value_str) in encoded {
            let result = tx
                .execute(
                    UPSERT_SETTING,
                    params![entry.scope.as_str(), entry.key.as_str(), value_str, now.as_str()],
                )
                .await;
            if let Err(e) = result {
                if let Err(rollback) = tx.rollback().await {
                    debug!("set_settings rollback failed: {rollback}");
                }
                return Err(DatabaseError::Query(format!("set_settings: {e}")));
            }
        }

        tx.commit()
            .await
            .map_err(|e| DatabaseError::Query(format!("set_settings commit: {e}")))?;
        debug!(count = entries.len(), "Settings batch committed");
        Ok(())
    }
}
