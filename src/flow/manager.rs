//! FlowManager — coordinates persistence, the flow engine, and replies for
//! each turn.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::channels::{Channel, IncomingMessage, OutgoingResponse};
use crate::config::{BotConfig, CorruptStatePolicy};
use crate::error::{DatabaseError, FlowError, Result};
use crate::store::{Database, Property};

use super::engine::{FlowEngine, Turn, TurnOutcome};
use super::model::{UserProfile, settings_keys};
use super::state::{ConversationFlow, Question};

const FLOW: Property<ConversationFlow> = Property::new(settings_keys::CONVERSATION_FLOW);
const PROFILE: Property<UserProfile> = Property::new(settings_keys::USER_PROFILE);

/// Sent when a turn fails for reasons the user cannot fix by retyping.
pub const TURN_FAILED: &str = "Sorry, something went wrong. Please try again.";

/// Result of one handled turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub conversation_id: String,
    pub user_id: String,
    pub turn: Turn,
    /// Whether a corrupt stored record was reset before the turn ran.
    pub recovered: bool,
}

/// Current position of a conversation, as stored.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FlowStatus {
    pub question: Question,
    pub profile: UserProfile,
}

/// Runs turns: load both records, step the engine, send replies in order,
/// then persist both records together.
pub struct FlowManager {
    db: Arc<dyn Database>,
    engine: FlowEngine,
    on_corrupt_state: CorruptStatePolicy,
    /// One lock per conversation with a turn in flight.
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FlowManager {
    pub fn new(db: Arc<dyn Database>, engine: FlowEngine, on_corrupt_state: CorruptStatePolicy) -> Self {
        Self {
            db,
            engine,
            on_corrupt_state,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(db: Arc<dyn Database>, config: &BotConfig) -> Self {
        Self::new(db, FlowEngine::new(config.validation), config.on_corrupt_state)
    }

    /// Handle one inbound message and reply on `channel`.
    ///
    /// Turns for the same conversation run one at a time. If any reply fails
    /// to send, nothing is persisted and the turn can be re-run.
    pub async fn handle_message(
        &self,
        channel: &dyn Channel,
        msg: &IncomingMessage,
    ) -> Result<TurnReport> {
        let lock = self.turn_lock(&msg.conversation_id).await;
        let result = {
            let _guard = lock.lock().await;
            self.run_turn(channel, msg).await
        };
        self.release_turn_lock(&msg.conversation_id, lock).await;
        result
    }

    /// Read the stored position without running a turn.
    pub async fn status(&self, conversation_id: &str, user_id: &str) -> Result<FlowStatus> {
        let (flow, _) = self.load_flow(conversation_id).await?;
        let (profile, _) = self.load_profile(user_id).await?;
        Ok(FlowStatus {
            question: flow.last_question_asked,
            profile,
        })
    }

    /// Drive every message from `channel` until its stream ends.
    ///
    /// A failed turn is logged and the user is told to try again; the loop
    /// keeps going. The channel hears `end_turn` after every message.
    pub async fn run(&self, channel: &dyn Channel) -> Result<()> {
        let mut messages = channel.start().await?;
        info!(channel = channel.name(), "Listening");
        while let Some(msg) = messages.next().await {
            if let Err(e) = self.handle_message(channel, &msg).await {
                error!(
                    channel = channel.name(),
                    conversation_id = %msg.conversation_id,
                    user_id = %msg.user_id,
                    "Turn failed: {e}"
                );
                if let Err(e) = channel.respond(&msg, OutgoingResponse::text(TURN_FAILED)).await {
                    warn!(channel = channel.name(), "Failed to report turn failure: {e}");
                }
            }
            if let Err(e) = channel.end_turn(&msg).await {
                warn!(channel = channel.name(), "end_turn failed: {e}");
            }
        }
        channel.shutdown().await?;
        info!(channel = channel.name(), "Channel closed");
        Ok(())
    }

    async fn run_turn(&self, channel: &dyn Channel, msg: &IncomingMessage) -> Result<TurnReport> {
        let (mut flow, flow_recovered) = self.load_flow(&msg.conversation_id).await?;
        let (mut profile, profile_recovered) = self.load_profile(&msg.user_id).await?;
        if profile_recovered {
            // The stored pointer assumes answers that are gone.
            flow = ConversationFlow::default();
        }

        debug!(
            message_id = %msg.id,
            channel = %msg.channel,
            conversation_id = %msg.conversation_id,
            user_id = %msg.user_id,
            question = %flow.last_question_asked,
            "Processing turn"
        );

        let turn = self
            .engine
            .step(&mut flow, &mut profile, msg.content.as_deref());

        for text in &turn.messages {
            channel
                .respond(msg, OutgoingResponse::text(text.as_str()))
                .await?;
        }

        let entries = [
            FLOW.entry(&settings_keys::conversation_scope(&msg.conversation_id), &flow)?,
            PROFILE.entry(&settings_keys::user_scope(&msg.user_id), &profile)?,
        ];
        self.db.set_settings(&entries).await?;

        match &turn.outcome {
            TurnOutcome::Rejected { question } => {
                debug!(conversation_id = %msg.conversation_id, %question, "Answer rejected");
            }
            TurnOutcome::Restarted { question } => {
                warn!(
                    conversation_id = %msg.conversation_id,
                    user_id = %msg.user_id,
                    %question,
                    "Profile missing earlier answers, restarting conversation"
                );
            }
            TurnOutcome::Completed { .. } => {
                info!(
                    conversation_id = %msg.conversation_id,
                    user_id = %msg.user_id,
                    "Profile cycle completed"
                );
            }
            TurnOutcome::Started | TurnOutcome::Accepted { .. } => {
                debug!(
                    conversation_id = %msg.conversation_id,
                    question = %turn.next,
                    "Advanced"
                );
            }
        }

        Ok(TurnReport {
            conversation_id: msg.conversation_id.clone(),
            user_id: msg.user_id.clone(),
            turn,
            recovered: flow_recovered || profile_recovered,
        })
    }

    /// Load the conversation's flow, applying the corrupt-state policy.
    async fn load_flow(&self, conversation_id: &str) -> Result<(ConversationFlow, bool)> {
        let scope = settings_keys::conversation_scope(conversation_id);
        match FLOW.get_or_default(self.db.as_ref(), &scope).await {
            Ok(flow) => Ok((flow, false)),
            Err(DatabaseError::Corrupt { raw, reason, .. }) => {
                let raw = raw
                    .get("last_question_asked")
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| raw.to_string());
                match self.on_corrupt_state {
                    CorruptStatePolicy::Reset => {
                        warn!(
                            %conversation_id,
                            %raw,
                            "Unrecognized question state, restarting conversation: {reason}"
                        );
                        Ok((ConversationFlow::default(), true))
                    }
                    CorruptStatePolicy::Fail => Err(FlowError::UnrecognizedState {
                        conversation_id: conversation_id.to_string(),
                        raw,
                    }
                    .into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load the user's profile, applying the corrupt-state policy.
    async fn load_profile(&self, user_id: &str) -> Result<(UserProfile, bool)> {
        let scope = settings_keys::user_scope(user_id);
        match PROFILE.get_or_default(self.db.as_ref(), &scope).await {
            Ok(profile) => Ok((profile, false)),
            Err(DatabaseError::Corrupt { reason, .. }) => match self.on_corrupt_state {
                CorruptStatePolicy::Reset => {
                    warn!(%user_id, "Corrupt profile, starting empty: {reason}");
                    Ok((UserProfile::default(), true))
                }
                CorruptStatePolicy::Fail => Err(FlowError::CorruptProfile {
                    user_id: user_id.to_string(),
                    reason,
                }
                .into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn turn_lock(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.turn_locks.lock().await;
        Arc::clone(
            locks
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drop the conversation's lock entry once no other turn holds it.
    async fn release_turn_lock(&self, conversation_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        // The map and `lock` are the only owners when nobody else is waiting.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(conversation_id);
        }
    }

    #[cfg(test)]
    async fn tracked_conversations(&self) -> usize {
        self.turn_locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::BufferChannel;
    use crate::config::ValidationMode;
    use crate::flow::prompts;
    use crate::store::MemoryBackend;

    fn manager(db: Arc<MemoryBackend>, policy: CorruptStatePolicy) -> FlowManager {
        FlowManager::new(db, FlowEngine::new(ValidationMode::Lenient), policy)
    }

    fn msg(text: &str) -> IncomingMessage {
        IncomingMessage::new("test", "u1", "c1", Some(text.to_string()))
    }

    #[tokio::test]
    async fn first_turn_welcomes_and_persists() {
        let db = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);
        let channel = BufferChannel::new();

        let report = manager.handle_message(&channel, &msg("")).await.unwrap();
        assert_eq!(report.turn.outcome, TurnOutcome::Started);
        assert!(!report.recovered);
        assert_eq!(channel.drain(), prompts::welcome());

        let status = manager.status("c1", "u1").await.unwrap();
        assert_eq!(status.question, Question::Location);
        assert!(status.profile.is_empty());
        assert_eq!(manager.tracked_conversations().await, 0);
    }

    #[tokio::test]
    async fn failed_send_persists_nothing() {
        let db = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);

        let channel = BufferChannel::failing_after(1);
        let err = manager.handle_message(&channel, &msg("hi")).await;
        assert!(err.is_err());
        assert!(db.get_setting("conversation:c1", "conversation_flow").await.unwrap().is_none());
        assert!(db.get_setting("user:u1", "user_profile").await.unwrap().is_none());

        // Re-running the turn behaves like the first attempt.
        let channel = BufferChannel::new();
        manager.handle_message(&channel, &msg("hi")).await.unwrap();
        assert_eq!(channel.drain(), prompts::welcome());
    }

    #[tokio::test]
    async fn corrupt_flow_resets_under_reset_policy() {
        let db = Arc::new(MemoryBackend::new());
        db.set_setting(
            "conversation:c1",
            "conversation_flow",
            &serde_json::json!({"last_question_asked": "dessert"}),
        )
        .await
        .unwrap();
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);
        let channel = BufferChannel::new();

        let report = manager.handle_message(&channel, &msg("hello")).await.unwrap();
        assert!(report.recovered);
        assert_eq!(report.turn.outcome, TurnOutcome::Started);
        assert_eq!(channel.drain(), prompts::welcome());

        let stored = db
            .get_setting("conversation:c1", "conversation_flow")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored["last_question_asked"], "location");
    }

    #[tokio::test]
    async fn corrupt_flow_fails_under_fail_policy() {
        let db = Arc::new(MemoryBackend::new());
        let corrupt = serde_json::json!({"last_question_asked": "dessert"});
        db.set_setting("conversation:c1", "conversation_flow", &corrupt)
            .await
            .unwrap();
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Fail);
        let channel = BufferChannel::new();

        let err = manager
            .handle_message(&channel, &msg("hello"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Flow(FlowError::UnrecognizedState { ref raw, .. }) if raw.contains("dessert")
        ));
        assert!(channel.drain().is_empty());

        // Storage untouched
        let stored = db
            .get_setting("conversation:c1", "conversation_flow")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, corrupt);
    }

    #[tokio::test]
    async fn corrupt_profile_restarts_under_reset_policy() {
        let db = Arc::new(MemoryBackend::new());
        db.set_setting(
            "conversation:c1",
            "conversation_flow",
            &serde_json::json!({"last_question_asked": "range"}),
        )
        .await
        .unwrap();
        db.set_setting("user:u1", "user_profile", &serde_json::json!({"location": 42}))
            .await
            .unwrap();
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);
        let channel = BufferChannel::new();

        let report = manager.handle_message(&channel, &msg("10-20")).await.unwrap();
        assert!(report.recovered);
        assert_eq!(report.turn.asked, Question::None);
        assert_eq!(report.turn.outcome, TurnOutcome::Started);

        let replies = channel.drain();
        assert_eq!(replies, prompts::welcome());
        assert!(!replies.iter().any(|r| r.starts_with("Displaying")));

        let status = manager.status("c1", "u1").await.unwrap();
        assert_eq!(status.question, Question::Location);
        assert!(status.profile.is_empty());
    }

    #[tokio::test]
    async fn pointer_past_missing_answers_restarts() {
        let db = Arc::new(MemoryBackend::new());
        db.set_setting(
            "conversation:c1",
            "conversation_flow",
            &serde_json::json!({"last_question_asked": "range"}),
        )
        .await
        .unwrap();
        db.set_setting("user:u1", "user_profile", &serde_json::json!({"meal": "dinner"}))
            .await
            .unwrap();
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);
        let channel = BufferChannel::new();

        let report = manager.handle_message(&channel, &msg("10-20")).await.unwrap();
        assert!(!report.recovered);
        assert_eq!(
            report.turn.outcome,
            TurnOutcome::Restarted {
                question: Question::Range
            }
        );
        assert_eq!(channel.drain(), prompts::welcome());

        let status = manager.status("c1", "u1").await.unwrap();
        assert_eq!(status.question, Question::Location);
        assert!(status.profile.is_empty());
    }

    #[tokio::test]
    async fn run_ends_every_turn_on_the_channel() {
        let db = Arc::new(MemoryBackend::new());
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Reset);
        let channel = BufferChannel::with_inbound(vec![msg("hi"), msg("Atlanta")]);

        manager.run(&channel).await.unwrap();

        assert_eq!(channel.completed_turns(), 2);
        let replies = channel.drain();
        assert_eq!(replies.len(), 6);
        assert_eq!(replies[3], "You're in Atlanta.");
    }

    #[tokio::test]
    async fn corrupt_profile_fails_under_fail_policy() {
        let db = Arc::new(MemoryBackend::new());
        db.set_setting("user:u1", "user_profile", &serde_json::json!({"location": 42}))
            .await
            .unwrap();
        let manager = manager(Arc::clone(&db), CorruptStatePolicy::Fail);

        let err = manager.status("c1", "u1").await.unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::Flow(FlowError::CorruptProfile { .. })
        ));
    }

    #[tokio::test]
    async fn concurrent_turns_in_one_conversation_serialize() {
        let db = Arc::new(MemoryBackend::new());
        let manager = Arc::new(manager(Arc::clone(&db), CorruptStatePolicy::Reset));
        let channel = Arc::new(BufferChannel::new());

        // Welcome first so the following answers are read as the location.
        manager.handle_message(channel.as_ref(), &msg("start")).await.unwrap();
        channel.drain();

        let mut handles = Vec::new();
        for answer in ["Atlanta", "vegan"] {
            let manager = Arc::clone(&manager);
            let channel = Arc::clone(&channel);
            handles.push(tokio::spawn(async move {
                manager
                    .handle_message(channel.as_ref(), &msg(answer))
                    .await
                    .unwrap()
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // Two sequential turns: location then diet, in some order.
        let status = manager.status("c1", "u1").await.unwrap();
        assert_eq!(status.question, Question::Meal);
        assert!(status.profile.location.is_some());
        assert!(status.profile.diet.is_some());
        assert_eq!(channel.drain().len(), 5);
    }
}
