//! External action adapters. Lead and booking recording.
//!
//! Each adapter calls the customer ledger once and folds the outcome into
//! the context (`actions_taken`) and the audit trail:
//! - record created → `<action>_created` (info)
//! - ledger reported a failure → `<action>_failed` (warning)
//! - ledger call panicked → `<action>_error` (error)
//!
//! No outcome is propagated; the run always continues.

use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use serde_json::json;
use tracing::debug;

use crate::error::LedgerError;
use crate::ledger::{BookingRecord, BookingStatus, CustomerLedger, LeadRecord};
use crate::pipeline::context::RunContext;
use crate::pipeline::events::EventLog;
use crate::pipeline::panic_message;

/// Outcome of one external action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Created { record_id: String },
    Failed { reason: String },
    Errored { reason: String },
    Skipped { reason: String },
}

/// Which ledger action is being recorded.
#[derive(Debug, Clone, Copy)]
enum Action {
    Lead,
    Booking,
}

impl Action {
    fn tag(&self) -> &'static str {
        match self {
            Self::Lead => "lead",
            Self::Booking => "booking",
        }
    }
}

/// Record a lead for every message, whatever the intent or validation outcome.
pub async fn record_lead(
    ctx: &mut RunContext,
    ledger: &dyn CustomerLedger,
    log: &mut EventLog,
) -> ActionOutcome {
    let today = Utc::now().date_naive();
    let lead = LeadRecord {
        name: ctx.customer_name.clone(),
        channel: ctx.channel,
        intent: ctx.intent(),
        last_message: ctx.raw_message.clone(),
        created_at: today,
        updated_at: today,
    };

    let result = AssertUnwindSafe(ledger.create_lead(&lead))
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()));

    fold_outcome(Action::Lead, result, ctx, log)
}

/// Record a booking when the request is complete and valid; otherwise a
/// no-op that never contacts the ledger.
pub async fn record_booking(
    ctx: &mut RunContext,
    ledger: &dyn CustomerLedger,
    log: &mut EventLog,
) -> ActionOutcome {
    let (Some(service), Some(date_time)) = (ctx.requested_service.clone(), ctx.requested_date_time)
    else {
        return skipped("Booking data incomplete");
    };
    if !ctx.is_booking() {
        return skipped("Booking data incomplete");
    }
    if !ctx.validation_errors.is_empty() {
        return skipped("Validation errors prevent booking creation");
    }

    let booking = BookingRecord {
        name: ctx.customer_name.clone(),
        service,
        date_time,
        status: BookingStatus::Confirmed,
        source_message: ctx.raw_message.clone(),
        channel: ctx.channel,
    };

    let result = AssertUnwindSafe(ledger.create_booking(&booking))
        .catch_unwind()
        .await
        .map_err(|payload| panic_message(payload.as_ref()));

    fold_outcome(Action::Booking, result, ctx, log)
}

fn skipped(reason: &str) -> ActionOutcome {
    debug!(reason, "Skipping booking creation");
    ActionOutcome::Skipped {
        reason: reason.to_string(),
    }
}

/// Fold a ledger call result into the context and audit trail.
/// Outer `Err` is a panic message; inner `Err` is a reported failure.
fn fold_outcome(
    action: Action,
    result: Result<Result<String, LedgerError>, String>,
    ctx: &mut RunContext,
    log: &mut EventLog,
) -> ActionOutcome {
    let tag = action.tag();
    match result {
        Ok(Ok(record_id)) => {
            ctx.record_action(format!("{tag}_created:{record_id}"));
            log.info(
                format!("{tag}_created"),
                format!("{} created in customer ledger: {record_id}", capitalize(tag)),
                json!({ "record_id": record_id }),
            );
            ActionOutcome::Created { record_id }
        }
        Ok(Err(e)) => {
            let reason = e.to_string();
            ctx.record_action(format!("{tag}_failed:{reason}"));
            log.warning(
                format!("{tag}_failed"),
                format!("Failed to create {tag} in customer ledger: {reason}"),
                json!({ "error": reason }),
            );
            ActionOutcome::Failed { reason }
        }
        Err(reason) => {
            ctx.record_action(format!("{tag}_failed:{reason}"));
            log.error(
                format!("{tag}_error"),
                format!("Error creating {tag}: {reason}"),
                json!({ "error": reason }),
            );
            ActionOutcome::Errored { reason }
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;
    use crate::ledger::UnconfiguredLedger;
    use crate::pipeline::context::{Channel, Intent};
    use crate::pipeline::events::Severity;

    /// Ledger stub that records calls and replies with a fixed behaviour.
    struct StubLedger {
        behaviour: Behaviour,
        leads: Mutex<Vec<LeadRecord>>,
        bookings: Mutex<Vec<BookingRecord>>,
    }

    enum Behaviour {
        Succeed,
        Reject,
        Panic,
    }

    impl StubLedger {
        fn new(behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                leads: Mutex::new(Vec::new()),
                bookings: Mutex::new(Vec::new()),
            }
        }

        fn reply(&self, id: &str) -> Result<String, LedgerError> {
            match self.behaviour {
                Behaviour::Succeed => Ok(id.to_string()),
                Behaviour::Reject => Err(LedgerError::Rejected {
                    status: 422,
                    message: "Unknown field".into(),
                }),
                Behaviour::Panic => panic!("ledger exploded"),
            }
        }
    }

    #[async_trait]
    impl CustomerLedger for StubLedger {
        fn name(&self) -> &str {
            "stub"
        }

        async fn create_lead(&self, lead: &LeadRecord) -> Result<String, LedgerError> {
            self.leads.lock().unwrap().push(lead.clone());
            self.reply("recLEAD")
        }

        async fn create_booking(&self, booking: &BookingRecord) -> Result<String, LedgerError> {
            self.bookings.lock().unwrap().push(booking.clone());
            self.reply("recBOOK")
        }
    }

    fn complete_booking() -> RunContext {
        let mut ctx = RunContext::new("b1", Channel::Sms, "book a haircut tomorrow at 3pm");
        ctx.intent = Some(Intent::Booking);
        ctx.set_customer_name("Deva");
        ctx.set_requested_service("Haircut");
        ctx.set_requested_date_time(
            NaiveDate::from_ymd_opt(2026, 10, 18)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
        );
        ctx
    }

    #[tokio::test]
    async fn lead_created() {
        let ledger = StubLedger::new(Behaviour::Succeed);
        let mut ctx = complete_booking();
        let mut log = EventLog::new();

        let outcome = record_lead(&mut ctx, &ledger, &mut log).await;
        assert_eq!(
            outcome,
            ActionOutcome::Created {
                record_id: "recLEAD".into()
            }
        );
        assert_eq!(ctx.actions_taken, vec!["lead_created:recLEAD"]);
        assert_eq!(log.event_types(), vec!["lead_created"]);

        let leads = ledger.leads.lock().unwrap();
        assert_eq!(leads[0].name.as_deref(), Some("Deva"));
        assert_eq!(leads[0].intent, Intent::Booking);
        assert_eq!(leads[0].channel, Channel::Sms);
    }

    #[tokio::test]
    async fn lead_attempted_for_any_intent() {
        let ledger = StubLedger::new(Behaviour::Succeed);
        let mut ctx = RunContext::new("b1", Channel::Web, "hello");
        ctx.add_validation_error("something");
        let mut log = EventLog::new();

        record_lead(&mut ctx, &ledger, &mut log).await;
        assert_eq!(ledger.leads.lock().unwrap()[0].intent, Intent::Unknown);
    }

    #[tokio::test]
    async fn unconfigured_ledger_is_reported_failure() {
        let mut ctx = RunContext::new("b1", Channel::Web, "hello");
        let mut log = EventLog::new();

        let outcome = record_lead(&mut ctx, &UnconfiguredLedger, &mut log).await;
        assert!(matches!(outcome, ActionOutcome::Failed { .. }));
        assert_eq!(
            ctx.actions_taken,
            vec!["lead_failed:Airtable credentials not configured"]
        );
        let event = log.find("lead_failed").unwrap();
        assert_eq!(event.severity, Severity::Warning);
        assert!(!log.has_errors());
    }

    #[tokio::test]
    async fn panicking_ledger_is_error_event() {
        let ledger = StubLedger::new(Behaviour::Panic);
        let mut ctx = RunContext::new("b1", Channel::Web, "hello");
        let mut log = EventLog::new();

        let outcome = record_lead(&mut ctx, &ledger, &mut log).await;
        assert_eq!(
            outcome,
            ActionOutcome::Errored {
                reason: "ledger exploded".into()
            }
        );
        assert_eq!(ctx.actions_taken, vec!["lead_failed:ledger exploded"]);
        assert_eq!(log.find("lead_error").unwrap().severity, Severity::Error);
    }

    #[tokio::test]
    async fn booking_created_for_complete_request() {
        let ledger = StubLedger::new(Behaviour::Succeed);
        let mut ctx = complete_booking();
        let mut log = EventLog::new();

        let outcome = record_booking(&mut ctx, &ledger, &mut log).await;
        assert_eq!(
            outcome,
            ActionOutcome::Created {
                record_id: "recBOOK".into()
            }
        );
        assert_eq!(ctx.actions_taken, vec!["booking_created:recBOOK"]);

        let bookings = ledger.bookings.lock().unwrap();
        assert_eq!(bookings[0].service, "Haircut");
        assert_eq!(bookings[0].status, BookingStatus::Confirmed);
    }

    #[tokio::test]
    async fn booking_rejected_is_warning() {
        let ledger = StubLedger::new(Behaviour::Reject);
        let mut ctx = complete_booking();
        let mut log = EventLog::new();

        record_booking(&mut ctx, &ledger, &mut log).await;
        assert_eq!(ctx.actions_taken, vec!["booking_failed:Unknown field"]);
        assert_eq!(log.find("booking_failed").unwrap().severity, Severity::Warning);
    }

    #[tokio::test]
    async fn booking_skipped_without_contacting_ledger() {
        let ledger = StubLedger::new(Behaviour::Succeed);
        let mut log = EventLog::new();

        let mut missing = complete_booking();
        missing.requested_service = None;
        assert!(matches!(
            record_booking(&mut missing, &ledger, &mut log).await,
            ActionOutcome::Skipped { .. }
        ));

        let mut invalid = complete_booking();
        invalid.add_validation_error("We're closed on Sunday");
        assert!(matches!(
            record_booking(&mut invalid, &ledger, &mut log).await,
            ActionOutcome::Skipped { .. }
        ));

        let mut not_booking = complete_booking();
        not_booking.intent = Some(Intent::Reschedule);
        assert!(matches!(
            record_booking(&mut not_booking, &ledger, &mut log).await,
            ActionOutcome::Skipped { .. }
        ));

        assert!(ledger.bookings.lock().unwrap().is_empty());
        assert!(log.is_empty());
        assert!(invalid.actions_taken.is_empty());
    }
}
