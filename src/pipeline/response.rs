//! Response builder. Turns the final context into the reply text.
//!
//! Branches are evaluated in priority order and the first one that applies
//! writes the reply:
//! 1. escalation (overrides everything, including validation errors)
//! 2. validation errors
//! 3. confirmed booking
//! 4. cancel
//! 5. reschedule
//! 6. info (opening hours or a generic prompt)
//! 7. default greeting

use chrono::NaiveDateTime;

use crate::business::{BusinessSnapshot, day_name};
use crate::pipeline::context::{Intent, RunContext};
use crate::pipeline::intent::IntentClassifier;

pub const ESCALATION_REPLY: &str = "I understand your frustration. Let me connect you with our team right away. Someone will reach out to you shortly.";
pub const ASK_SERVICE_AND_TIME_REPLY: &str = "I'd be happy to help you book an appointment! Could you please let me know what service you'd like and when you'd prefer to come in?";
pub const ASK_SERVICE_REPLY: &str = "Great! What service would you like to book?";
pub const CHOOSE_DIFFERENT_TIME: &str = "Would you like to choose a different time?";
pub const CANCEL_REPLY: &str =
    "I can help you cancel your appointment. Could you tell me what time it was scheduled for?";
pub const RESCHEDULE_REPLY: &str =
    "I'd be happy to help you reschedule. What time would work better for you?";
pub const HOURS_NOT_CONFIGURED_REPLY: &str = "I'd be happy to share our hours! However, our hours haven't been configured yet. Please contact us directly for our current hours.";
pub const INFO_REPLY: &str = "I'd be happy to help! What information are you looking for?";
pub const DEFAULT_REPLY: &str = "I'm here to help! How can I assist you today?";

/// Which branch produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Escalation,
    ValidationErrors,
    BookingConfirmed,
    Cancel,
    Reschedule,
    OpeningHours,
    Info,
    Default,
}

impl ResponseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Escalation => "escalation",
            Self::ValidationErrors => "validation_errors",
            Self::BookingConfirmed => "booking_confirmed",
            Self::Cancel => "cancel",
            Self::Reschedule => "reschedule",
            Self::OpeningHours => "opening_hours",
            Self::Info => "info",
            Self::Default => "default",
        }
    }
}

/// Write `response_message` (and any reply-related actions) to the context.
pub fn build_response(
    ctx: &mut RunContext,
    snapshot: &BusinessSnapshot,
    classifier: &IntentClassifier,
) -> ResponseKind {
    let (kind, message) = compose(ctx, snapshot, classifier);
    match kind {
        ResponseKind::Escalation => ctx.record_action("escalation_triggered"),
        ResponseKind::BookingConfirmed => ctx.record_action("booking_confirmed"),
        _ => {}
    }
    ctx.response_message = Some(message);
    kind
}

fn compose(
    ctx: &RunContext,
    snapshot: &BusinessSnapshot,
    classifier: &IntentClassifier,
) -> (ResponseKind, String) {
    if ctx.escalation {
        return (ResponseKind::Escalation, ESCALATION_REPLY.to_string());
    }

    if !ctx.validation_errors.is_empty() {
        return (ResponseKind::ValidationErrors, validation_reply(ctx));
    }

    if let (Intent::Booking, Some(service), Some(when)) = (
        ctx.intent(),
        ctx.requested_service.as_deref(),
        ctx.requested_date_time.as_ref(),
    ) {
        let reply = format!(
            "Perfect! You're booked for a {service} on {}. We'll see you then!",
            format_long(when)
        );
        return (ResponseKind::BookingConfirmed, reply);
    }

    match ctx.intent() {
        Intent::Cancel => (ResponseKind::Cancel, CANCEL_REPLY.to_string()),
        Intent::Reschedule => (ResponseKind::Reschedule, RESCHEDULE_REPLY.to_string()),
        Intent::Info if classifier.asks_about_hours(&ctx.raw_message) => {
            (ResponseKind::OpeningHours, hours_reply(snapshot))
        }
        Intent::Info => (ResponseKind::Info, INFO_REPLY.to_string()),
        Intent::Booking | Intent::Unknown => (ResponseKind::Default, DEFAULT_REPLY.to_string()),
    }
}

fn validation_reply(ctx: &RunContext) -> String {
    let joined = ctx.validation_errors.join(". ");
    if !ctx.is_booking() {
        return joined;
    }

    match (&ctx.requested_service, &ctx.requested_date_time) {
        (None, None) => ASK_SERVICE_AND_TIME_REPLY.to_string(),
        (None, Some(_)) => ASK_SERVICE_REPLY.to_string(),
        (Some(service), None) => format!("Perfect! When would you like to schedule your {service}?"),
        (Some(_), Some(_)) => format!("{joined} {CHOOSE_DIFFERENT_TIME}"),
    }
}

/// Long human-readable form, e.g. "Sunday, October 18 at 3:00 PM".
pub fn format_long(when: &NaiveDateTime) -> String {
    when.format("%A, %B %-d at %-I:%M %p").to_string()
}

/// Opening hours, one line per configured weekday, Monday first.
fn hours_reply(snapshot: &BusinessSnapshot) -> String {
    if snapshot.opening_hours.is_empty() {
        return HOURS_NOT_CONFIGURED_REPLY.to_string();
    }

    let mut hours: Vec<_> = snapshot.opening_hours.iter().collect();
    hours.sort_by_key(|oh| oh.day_of_week);

    let lines: Vec<String> = hours
        .iter()
        .map(|oh| {
            if oh.is_closed {
                format!("{}: Closed", day_name(oh.day_of_week))
            } else {
                format!("{}: {} - {}", day_name(oh.day_of_week), oh.open_time, oh.close_time)
            }
        })
        .collect();

    format!(
        "Here are our opening hours:\n\n{}\n\nHow can I help you today?",
        lines.join("\n")
    )
}
