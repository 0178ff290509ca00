//! The fixed outbound script.
//!
//! Every prompt is a separate outbound message; order within a `Vec` is the
//! order the user sees.

use super::model::UserProfile;
use super::state::Question;

/// Shown when a rejection carries no specific message.
pub const FALLBACK_REJECTION: &str = "I'm sorry, I didn't understand that.";

/// Shown after the summary, before the flow returns to `Question::None`.
pub const RESTART_INVITATION: &str = "Type anything to run the bot again.";

const LOCATION_CHOICES: &[&str] = &["Atlanta", "New York", "Chicago"];
const DIET_CHOICES: &[&str] = &["Vegetarian", "Vegan", "Gluten-Free", "Halal", "none"];
const MEAL_CHOICES: &[&str] = &["Breakfast", "Lunch", "Dinner"];
const RANGE_CHOICES: &[&str] = &["0-5", "5-10", "10-20", "20+"];

/// Options listed to the user for `question`.
pub fn choices(question: Question) -> &'static [&'static str] {
    match question {
        Question::Location => LOCATION_CHOICES,
        Question::Diet => DIET_CHOICES,
        Question::Meal => MEAL_CHOICES,
        Question::Range => RANGE_CHOICES,
        Question::None => &[],
    }
}

/// Category-specific rejection text for a blank or unrecognized answer.
pub fn rejection(question: Question) -> Option<&'static str> {
    match question {
        Question::Location => Some("Please enter the exact location."),
        Question::Diet => Some("Please enter the exact diet."),
        Question::Meal => Some("Please enter the exact meal type."),
        Question::Range => Some("Please enter the exact price range."),
        Question::None => None,
    }
}

/// Messages that open a cycle and ask for the location.
pub fn welcome() -> Vec<String> {
    vec![
        "Welcome to FoodMatch!".to_string(),
        "Where are you?".to_string(),
        "Enter Atlanta, New York, or Chicago:".to_string(),
    ]
}

/// Messages sent after `answered` was accepted into `profile`.
pub fn after_answer(answered: Question, profile: &UserProfile) -> Vec<String> {
    match answered {
        Question::None => welcome(),
        Question::Location => profile
            .location
            .iter()
            .map(|location| format!("You're in {location}."))
            .chain([
                "Do you have any dietary restrictions?".to_string(),
                "Enter Vegetarian, Vegan, Gluten-Free, Halal, or none".to_string(),
            ])
            .collect(),
        Question::Diet => vec![
            "Great! Next, what meal are you looking for?".to_string(),
            "Want Breakfast, Lunch or Dinner?".to_string(),
        ],
        Question::Meal => vec![
            "Now, what price range are you looking for?".to_string(),
            RANGE_CHOICES.join(", "),
        ],
        Question::Range => summary(profile)
            .into_iter()
            .chain([RESTART_INVITATION.to_string()])
            .collect(),
    }
}

/// One-line summary of a finished cycle, or `None` if any answer is missing.
pub fn summary(profile: &UserProfile) -> Option<String> {
    Some(format!(
        "Displaying {} options in {} for a {} diet in the {} price range.",
        profile.meal.as_deref()?,
        profile.location.as_deref()?,
        profile.diet.as_deref()?,
        profile.range.as_deref()?,
    ))
}
