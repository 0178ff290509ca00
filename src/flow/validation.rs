//! Answer validation — pure functions from raw turn text to a stored value.

use crate::config::ValidationMode;

use super::prompts::{self, FALLBACK_REJECTION};
use super::state::Question;

/// Why an answer was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Text to show the user. `None` falls back to [`FALLBACK_REJECTION`].
    pub message: Option<String>,
}

impl Rejection {
    /// The text the user sees.
    pub fn text(&self) -> &str {
        self.message.as_deref().unwrap_or(FALLBACK_REJECTION)
    }
}

/// A single parameterized answer validator.
///
/// Blank input is always rejected. With `choices` set, the trimmed input must
/// also match one option case-insensitively and is normalized to its spelling.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    rejection: Option<&'static str>,
    choices: Option<&'static [&'static str]>,
}

impl Validator {
    pub fn new(rejection: Option<&'static str>) -> Self {
        Self {
            rejection,
            choices: None,
        }
    }

    /// Restrict accepted answers to `choices`.
    pub fn with_choices(mut self, choices: &'static [&'static str]) -> Self {
        self.choices = Some(choices);
        self
    }

    /// The validator used for answers to `question`.
    pub fn for_question(question: Question, mode: ValidationMode) -> Self {
        let validator = Self::new(prompts::rejection(question));
        match mode {
            ValidationMode::Lenient => validator,
            ValidationMode::Strict => validator.with_choices(prompts::choices(question)),
        }
    }

    /// Trim and check `input`. `None` is treated like blank text.
    pub fn validate(&self, input: Option<&str>) -> Result<String, Rejection> {
        let trimmed = input.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(self.reject());
        }

        match self.choices {
            None => Ok(trimmed.to_string()),
            Some(choices) => choices
                .iter()
                .find(|choice| choice.eq_ignore_ascii_case(trimmed))
                .map(|choice| choice.to_string())
                .ok_or_else(|| self.reject()),
        }
    }

    fn reject(&self) -> Rejection {
        Rejection {
            message: self.rejection.map(str::to_string),
        }
    }
}
