//! Booking workflow pipeline.
//!
//! Every inbound message, whatever the channel, runs through the same
//! fixed step catalog (see [`template::WORKFLOW_TEMPLATE`]):
//! 1. intent detection (rule-based, no model calls)
//! 2. entity extraction: customer name, date/time, service
//! 3. validation against required fields and opening hours
//! 4. external actions against the customer ledger
//! 5. reply composition
//!
//! A run never fails as a whole. It returns the final [`RunContext`] and
//! the ordered [`EventLog`]; callers derive a [`RunStatus`] from them.

pub mod actions;
pub mod context;
pub mod dates;
pub mod events;
pub mod extract;
pub mod intent;
pub mod response;
pub mod runner;
pub mod template;
pub mod validate;

use std::any::Any;

pub use context::{Channel, Intent, RunContext};
pub use dates::{DateParser, RelativeDateParser};
pub use events::{EventLog, LogEvent, Severity};
pub use runner::{RunResult, RunStatus, WorkflowRunner};
pub use template::{StepName, WORKFLOW_TEMPLATE, WorkflowTemplate};

/// Human-readable text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
