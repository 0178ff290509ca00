//! Typed accessor over a single `Database` key.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::DatabaseError;

use super::traits::{Database, SettingEntry};

/// A typed record stored as JSON under a fixed key, one per scope.
#[derive(Debug)]
pub struct Property<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Property<T> {}

impl<T> Property<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    /// Load the record for `scope`, or `T::default()` if none is stored.
    ///
    /// A stored value that fails to decode is `DatabaseError::Corrupt`.
    pub async fn get_or_default(&self, db: &dyn Database, scope: &str) -> Result<T, DatabaseError> {
        match db.get_setting(scope, self.key).await? {
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| DatabaseError::Corrupt {
                scope: scope.to_string(),
                key: self.key.to_string(),
                raw,
                reason: e.to_string(),
            }),
            None => Ok(T::default()),
        }
    }

    /// Build a batch entry writing `value` for `scope`.
    pub fn entry(&self, scope: &str, value: &T) -> Result<SettingEntry, DatabaseError> {
        let json =
            serde_json::to_value(value).map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        Ok(SettingEntry::new(scope, self.key, json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::{ConversationFlow, Question};
    use crate::store::MemoryBackend;

    const FLOW: Property<ConversationFlow> = Property::new("conversation_flow");

    #[tokio::test]
    async fn missing_value_yields_default() {
        let db = MemoryBackend::new();
        let flow = FLOW.get_or_default(&db, "conversation:1").await.unwrap();
        assert_eq!(flow, ConversationFlow::default());
    }

    #[tokio::test]
    async fn entry_then_get() {
        let db = MemoryBackend::new();
        let flow = ConversationFlow {
            last_question_asked: Question::Diet,
        };
        let entry = FLOW.entry("conversation:1", &flow).unwrap();
        assert_eq!(entry.key, "conversation_flow");
        db.set_settings(&[entry]).await.unwrap();

        let loaded = FLOW.get_or_default(&db, "conversation:1").await.unwrap();
        assert_eq!(loaded, flow);

        // Other scopes are unaffected
        let other = FLOW.get_or_default(&db, "conversation:2").await.unwrap();
        assert_eq!(other.last_question_asked, Question::None);
    }

    #[tokio::test]
    async fn undecodable_value_is_corrupt() {
        let db = MemoryBackend::new();
        db.set_setting(
            "conversation:1",
            "conversation_flow",
            &serde_json::json!({"last_question_asked": "dessert"}),
        )
        .await
        .unwrap();

        let err = FLOW.get_or_default(&db, "conversation:1").await.unwrap_err();
        match err {
            DatabaseError::Corrupt { scope, key, raw, .. } => {
                assert_eq!(scope, "conversation:1");
                assert_eq!(key, "conversation_flow");
                assert_eq!(raw["last_question_asked"], "dessert");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }
}
