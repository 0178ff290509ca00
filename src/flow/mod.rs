//! Conversation flow — scripted form filling over four questions.
//!
//! Each turn the bot asks for the next of location, dietary restriction,
//! meal type, and price range, validating and storing every answer. Once
//! the price range is in, it sends a summary and starts over.

pub mod engine;
pub mod manager;
pub mod model;
pub mod prompts;
pub mod state;
pub mod validation;

pub use engine::{FlowEngine, Turn, TurnOutcome};
pub use manager::{FlowManager, FlowStatus, TurnReport};
pub use model::UserProfile;
pub use state::{ConversationFlow, Question};
pub use validation::{Rejection, Validator};
