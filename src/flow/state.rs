//! Conversation flow state machine — tracks which question is awaiting an answer.

use serde::{Deserialize, Serialize};

/// The question whose answer is expected next.
///
/// Cycles linearly: None → Location → Diet → Meal → Range → None.
/// `None` means either a fresh conversation or a cycle that just finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Question {
    #[default]
    None,
    Location,
    Diet,
    Meal,
    Range,
}

impl Question {
    /// Every state, in cycle order.
    pub const ALL: [Question; 5] = [
        Question::None,
        Question::Location,
        Question::Diet,
        Question::Meal,
        Question::Range,
    ];

    /// The state that follows a successful answer (or the welcome, for `None`).
    pub fn next(&self) -> Question {
        use Question::*;
        match self {
            None => Location,
            Location => Diet,
            Diet => Meal,
            Meal => Range,
            Range => None,
        }
    }

    /// Whether answering this question finishes a cycle.
    pub fn completes_cycle(&self) -> bool {
        matches!(self, Self::Range)
    }

    /// Whether this state reads and validates the turn input.
    pub fn reads_input(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Location => "location",
            Self::Diet => "diet",
            Self::Meal => "meal",
            Self::Range => "range",
        };
        write!(f, "{s}")
    }
}

/// Conversation-scoped flow record.
///
/// Stored under the conversation's scope at key `"conversation_flow"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConversationFlow {
    /// The question whose answer is expected next.
    #[serde(default)]
    pub last_question_asked: Question,
}

impl ConversationFlow {
    /// Move to the next state. Returns the state entered.
    pub fn advance(&mut self) -> Question {
        let next = self.last_question_asked.next();
        self.last_question_asked = next;
        next
    }
}
