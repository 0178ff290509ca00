//! User profile data model.

use serde::{Deserialize, Serialize};

use super::state::Question;

/// Answers collected during the current cycle.
///
/// Stored under the user's scope at key `"user_profile"`. A field is set
/// exactly when its question has been answered in the current cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
}

impl UserProfile {
    /// The stored answer for `question`, if any.
    pub fn answer(&self, question: Question) -> Option<&str> {
        match question {
            Question::Location => self.location.as_deref(),
            Question::Diet => self.diet.as_deref(),
            Question::Meal => self.meal.as_deref(),
            Question::Range => self.range.as_deref(),
            Question::None => None,
        }
    }

    /// Store an answer. Answers to `Question::None` are dropped.
    pub fn set_answer(&mut self, question: Question, value: String) {
        let slot = match question {
            Question::Location => &mut self.location,
            Question::Diet => &mut self.diet,
            Question::Meal => &mut self.meal,
            Question::Range => &mut self.range,
            Question::None => return,
        };
        *slot = Some(value);
    }

    /// Whether no question has been answered yet.
    pub fn is_empty(&self) -> bool {
        self.location.is_none() && self.diet.is_none() && self.meal.is_none() && self.range.is_none()
    }

    /// Whether every question asked before `question` in the cycle has an
    /// answer. For `Question::None` that means the whole cycle.
    pub fn answered_before(&self, question: Question) -> bool {
        Question::ALL
            .iter()
            .skip(1)
            .take_while(|q| **q != question)
            .all(|q| self.answer(*q).is_some())
    }

    /// Start a new cycle, returning the answers of the one just finished.
    pub fn take(&mut self) -> UserProfile {
        std::mem::take(self)
    }
}

/// Storage keys and scopes used for flow persistence.
pub mod settings_keys {
    /// Key for the ConversationFlow JSON blob.
    pub const CONVERSATION_FLOW: &str = "conversation_flow";
    /// Key for the UserProfile JSON blob.
    pub const USER_PROFILE: &str = "user_profile";

    /// Scope holding conversation-scoped records.
    pub fn conversation_scope(conversation_id: &str) -> String {
        format!("conversation:{conversation_id}")
    }

    /// Scope holding user-scoped records.
    pub fn user_scope(user_id: &str) -> String {
        format!("user:{user_id}")
    }
}
