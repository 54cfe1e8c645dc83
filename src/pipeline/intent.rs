//! Rule-based intent classifier.
//!
//! Pattern groups are tested against the lower-cased message in a fixed
//! precedence; the first group that matches decides the intent:
//! - cancel phrases → Cancel
//! - reschedule phrases → Reschedule
//! - info / hours questions → Info
//! - complaints (escalation) → Info
//! - explicit booking verbs → Booking
//! - "need/want/I'd like" followed by a service noun → Booking
//! - otherwise → Unknown
//!
//! The escalation group is also scanned on its own, so a complaint is
//! flagged even when an earlier group already decided the intent.

use regex::Regex;
use tracing::debug;

use crate::pipeline::context::Intent;

const CANCEL_PATTERN: &str =
    r"\b(cancel|cancelled|canceling|cancellation|can't make it|won't be able|need to cancel)\b";
const RESCHEDULE_PATTERN: &str = r"\b(reschedule|change|move|different time|another time)\b";
const INFO_PATTERN: &str = r"\b(open|hours|opening|when are you|what time|where|price|cost|info|information|what are your)\b";
const ESCALATION_PATTERN: &str =
    r"\b(angry|ridiculous|complaint|terrible|never answer|frustrated|upset)\b";
const BOOKING_VERB_PATTERN: &str = r"\b(book|appointment|reserve|schedule|make an appointment)\b";
const BOOKING_DESIRE_PATTERN: &str =
    r"\b(need|want|i'?d like)\b.*\b(haircut|service|appointment|trim|shave)\b";
const HOURS_QUESTION_PATTERN: &str = r"\b(hours|opening|when are you|what time|open|closed)\b";

/// One classification rule.
#[derive(Debug, Clone)]
pub struct IntentRule {
    /// Short rule label for logging.
    pub label: String,
    /// Compiled regex, matched against lower-cased text.
    pub regex: Regex,
    /// Intent assigned when this rule matches.
    pub intent: Intent,
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    /// The message contains a complaint / escalation signal.
    pub escalation: bool,
    /// Label of the rule that decided the intent (None for the default).
    pub matched_rule: Option<String>,
}

/// Keyword classifier over a closed set of intents.
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
    escalation: Regex,
    hours_question: Regex,
}

impl IntentClassifier {
    /// Create a classifier with the default rule set.
    pub fn default_rules() -> Self {
        let rule = |label: &str, pattern: &str, intent: Intent| IntentRule {
            label: label.into(),
            regex: Regex::new(pattern).unwrap(),
            intent,
        };

        // Cancel and reschedule come before booking: "cancel my appointment"
        // contains a booking noun.
        let rules = vec![
            rule("cancel", CANCEL_PATTERN, Intent::Cancel),
            rule("reschedule", RESCHEDULE_PATTERN, Intent::Reschedule),
            rule("info", INFO_PATTERN, Intent::Info),
            rule("escalation", ESCALATION_PATTERN, Intent::Info),
            rule("booking_verb", BOOKING_VERB_PATTERN, Intent::Booking),
            rule("booking_desire", BOOKING_DESIRE_PATTERN, Intent::Booking),
        ];

        Self {
            rules,
            escalation: Regex::new(ESCALATION_PATTERN).unwrap(),
            hours_question: Regex::new(HOURS_QUESTION_PATTERN).unwrap(),
        }
    }

    /// Classify a raw message.
    pub fn classify(&self, message: &str) -> Classification {
        let lowered = message.to_lowercase();
        let escalation = self.escalation.is_match(&lowered);

        for rule in &self.rules {
            if rule.regex.is_match(&lowered) {
                debug!(rule = %rule.label, intent = %rule.intent, escalation, "Intent rule matched");
                return Classification {
                    intent: rule.intent,
                    escalation,
                    matched_rule: Some(rule.label.clone()),
                };
            }
        }

        Classification {
            intent: Intent::Unknown,
            escalation,
            matched_rule: None,
        }
    }

    /// True if the message contains a complaint / escalation signal.
    pub fn is_escalation(&self, message: &str) -> bool {
        self.escalation.is_match(&message.to_lowercase())
    }

    /// True if the message asks about opening hours.
    pub fn asks_about_hours(&self, message: &str) -> bool {
        self.hours_question.is_match(&message.to_lowercase())
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::default_rules()
    }
}
