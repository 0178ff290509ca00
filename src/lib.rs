//! FoodMatch — turn-based conversational form filling.

pub mod channels;
pub mod config;
pub mod error;
pub mod flow;
pub mod store;
