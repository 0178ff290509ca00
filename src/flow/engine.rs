//! Flow engine — the synchronous, deterministic transition function.
//!
//! Given the question pointer, the in-progress profile, and the raw turn
//! text, decide the outbound messages and mutate both records. No I/O.

use crate::config::ValidationMode;

use super::model::UserProfile;
use super::prompts;
use super::state::{ConversationFlow, Question};
use super::validation::Validator;

/// What a single turn did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The input was a trigger; the welcome sequence was sent.
    Started,
    /// The stored profile was missing answers owed to `question`; the input
    /// was dropped and the cycle started over with the welcome sequence.
    Restarted { question: Question },
    /// The answer was stored and the next question asked.
    Accepted { question: Question, value: String },
    /// The answer was rejected; nothing changed.
    Rejected { question: Question },
    /// The final answer was stored, the summary sent, and the profile reset.
    Completed { profile: UserProfile },
}

/// Result of one engine step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    /// State the turn was evaluated in.
    pub asked: Question,
    /// State after the turn.
    pub next: Question,
    pub outcome: TurnOutcome,
    /// Outbound messages, in send order.
    pub messages: Vec<String>,
}

/// Drives the None → Location → Diet → Meal → Range → None cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowEngine {
    mode: ValidationMode,
}

impl FlowEngine {
    pub fn new(mode: ValidationMode) -> Self {
        Self { mode }
    }

    /// Process one turn of input against `flow` and `profile`.
    pub fn step(
        &self,
        flow: &mut ConversationFlow,
        profile: &mut UserProfile,
        input: Option<&str>,
    ) -> Turn {
        let asked = flow.last_question_asked;

        if !asked.reads_input() {
            // Any input, blank included, only triggers the welcome.
            if !profile.is_empty() {
                *profile = UserProfile::default();
            }
            let next = flow.advance();
            return Turn {
                asked,
                next,
                outcome: TurnOutcome::Started,
                messages: prompts::welcome(),
            };
        }

        if !profile.answered_before(asked) {
            *profile = UserProfile::default();
            *flow = ConversationFlow::default();
            let next = flow.advance();
            return Turn {
                asked,
                next,
                outcome: TurnOutcome::Restarted { question: asked },
                messages: prompts::welcome(),
            };
        }

        let value = match Validator::for_question(asked, self.mode).validate(input) {
            Ok(value) => value,
            Err(rejection) => {
                return Turn {
                    asked,
                    next: asked,
                    outcome: TurnOutcome::Rejected { question: asked },
                    messages: vec![rejection.text().to_string()],
                };
            }
        };

        profile.set_answer(asked, value.clone());
        // Summary is rendered from the finished profile before it is reset.
        let messages = prompts::after_answer(asked, profile);
        let outcome = if asked.completes_cycle() {
            TurnOutcome::Completed {
                profile: profile.take(),
            }
        } else {
            TurnOutcome::Accepted {
                question: asked,
                value,
            }
        };
        let next = flow.advance();

        Turn {
            asked,
            next,
            outcome,
            messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(question: Question) -> ConversationFlow {
        ConversationFlow {
            last_question_asked: question,
        }
    }

    /// A profile holding every answer owed before `question` is asked.
    fn answered_up_to(question: Question) -> UserProfile {
        let mut profile = UserProfile::default();
        for earlier in Question::ALL.into_iter().skip(1).take_while(|q| *q != question) {
            profile.set_answer(earlier, format!("{earlier} answer"));
        }
        profile
    }

    #[test]
    fn none_ignores_input_and_welcomes() {
        let engine = FlowEngine::default();
        for input in [None, Some(""), Some("   "), Some("hello")] {
            let mut flow = ConversationFlow::default();
            let mut profile = UserProfile::default();
            let turn = engine.step(&mut flow, &mut profile, input);

            assert_eq!(turn.outcome, TurnOutcome::Started);
            assert_eq!(turn.messages, prompts::welcome());
            assert_eq!(flow.last_question_asked, Question::Location);
            assert!(profile.is_empty());
        }
    }

    #[test]
    fn blank_answers_hold_state_at_every_question() {
        let engine = FlowEngine::default();
        for question in [
            Question::Location,
            Question::Diet,
            Question::Meal,
            Question::Range,
        ] {
            for input in [None, Some(""), Some(" \t ")] {
                let mut flow = at(question);
                let mut profile = answered_up_to(question);
                let turn = engine.step(&mut flow, &mut profile, input);

                assert_eq!(turn.outcome, TurnOutcome::Rejected { question });
                assert_eq!(turn.next, question);
                assert_eq!(flow.last_question_asked, question);
                assert!(profile.answer(question).is_none());
                assert_eq!(turn.messages.len(), 1);
                assert_eq!(Some(turn.messages[0].as_str()), prompts::rejection(question));
            }
        }
    }

    #[test]
    fn rejection_leaves_earlier_answers_untouched() {
        let engine = FlowEngine::default();
        let mut flow = at(Question::Meal);
        let mut profile = UserProfile {
            location: Some("Atlanta".to_string()),
            diet: Some("vegan".to_string()),
            ..Default::default()
        };
        let before = profile.clone();

        engine.step(&mut flow, &mut profile, Some(""));
        assert_eq!(profile, before);
    }

    #[test]
    fn valid_answer_is_stored_trimmed() {
        let engine = FlowEngine::default();
        let mut flow = at(Question::Location);
        let mut profile = UserProfile::default();
        let turn = engine.step(&mut flow, &mut profile, Some(" Atlanta "));

        assert_eq!(profile.location.as_deref(), Some("Atlanta"));
        assert_eq!(flow.last_question_asked, Question::Diet);
        assert_eq!(
            turn.outcome,
            TurnOutcome::Accepted {
                question: Question::Location,
                value: "Atlanta".to_string()
            }
        );
        assert_eq!(turn.messages[0], "You're in Atlanta.");
        assert_eq!(turn.messages.len(), 3);
    }

    #[test]
    fn range_completes_and_resets() {
        let engine = FlowEngine::default();
        let mut flow = at(Question::Range);
        let mut profile = UserProfile {
            location: Some("Atlanta".to_string()),
            diet: Some("vegan".to_string()),
            meal: Some("dinner".to_string()),
            range: None,
        };

        let turn = engine.step(&mut flow, &mut profile, Some("10-20"));

        assert_eq!(flow.last_question_asked, Question::None);
        assert!(profile.is_empty());
        match &turn.outcome {
            TurnOutcome::Completed { profile: finished } => {
                assert!(finished.answered_before(Question::None));
                assert_eq!(finished.range.as_deref(), Some("10-20"));
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(turn.messages.len(), 2);
        for value in ["Atlanta", "vegan", "dinner", "10-20"] {
            assert!(turn.messages[0].contains(value));
        }
        assert_eq!(turn.messages[1], prompts::RESTART_INVITATION);
    }

    #[test]
    fn missing_earlier_answer_restarts_cycle() {
        let engine = FlowEngine::default();
        let mut flow = at(Question::Range);
        let mut profile = UserProfile {
            meal: Some("dinner".to_string()),
            ..Default::default()
        };

        let turn = engine.step(&mut flow, &mut profile, Some("10-20"));

        assert_eq!(
            turn.outcome,
            TurnOutcome::Restarted {
                question: Question::Range
            }
        );
        assert_eq!(turn.next, Question::Location);
        assert_eq!(flow.last_question_asked, Question::Location);
        assert!(profile.is_empty());
        assert_eq!(turn.messages, prompts::welcome());
    }

    #[test]
    fn restart_after_stale_profile_clears_it() {
        let engine = FlowEngine::default();
        let mut flow = ConversationFlow::default();
        let mut profile = UserProfile {
            location: Some("Chicago".to_string()),
            ..Default::default()
        };
        engine.step(&mut flow, &mut profile, Some("hi"));
        assert!(profile.is_empty());
    }

    #[test]
    fn strict_mode_rejects_unlisted_city() {
        let engine = FlowEngine::new(ValidationMode::Strict);
        let mut flow = at(Question::Location);
        let mut profile = UserProfile::default();

        let turn = engine.step(&mut flow, &mut profile, Some("Tokyo"));
        assert_eq!(
            turn.outcome,
            TurnOutcome::Rejected {
                question: Question::Location
            }
        );
        assert_eq!(flow.last_question_asked, Question::Location);

        engine.step(&mut flow, &mut profile, Some("chicago"));
        assert_eq!(profile.location.as_deref(), Some("Chicago"));
    }
}
