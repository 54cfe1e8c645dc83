//! Booking validators. Failures are soft: they append human-readable
//! messages to `validation_errors` and never stop the run.

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::business::{BusinessSnapshot, day_name};
use crate::pipeline::context::RunContext;

pub const SERVICE_REQUIRED: &str = "Service is required for booking";
pub const DATETIME_REQUIRED: &str = "Date and time are required for booking";

/// Append an error for each missing booking field. Booking intent only;
/// both checks always run. Returns the number of errors added.
pub fn validate_required_fields(ctx: &mut RunContext) -> usize {
    if !ctx.is_booking() {
        return 0;
    }

    let before = ctx.validation_errors.len();
    if ctx.requested_service.is_none() {
        ctx.add_validation_error(SERVICE_REQUIRED);
    }
    if ctx.requested_date_time.is_none() {
        ctx.add_validation_error(DATETIME_REQUIRED);
    }
    ctx.validation_errors.len() - before
}

/// Monday-based weekday index (Monday = 0 .. Sunday = 6).
pub fn day_of_week(when: &NaiveDateTime) -> u8 {
    // Calendar index with Sunday = 0, rotated so Sunday lands on 6.
    match when.weekday().num_days_from_sunday() {
        0 => 6,
        n => (n - 1) as u8,
    }
}

/// Zero-padded `"HH:MM"` time of day.
pub fn time_of_day(when: &NaiveDateTime) -> String {
    format!("{:02}:{:02}", when.hour(), when.minute())
}

/// Check the requested date/time against the opening hours. Booking intent
/// with a requested date/time only. Returns the error message if one was added.
///
/// Times are compared as strings. Hours that are not zero-padded (`"9:00"`)
/// sort after most requests, so those requests are rejected rather than booked.
pub fn validate_opening_hours(ctx: &mut RunContext, snapshot: &BusinessSnapshot) -> Option<String> {
    if !ctx.is_booking() {
        return None;
    }
    let when = ctx.requested_date_time?;

    let day = day_of_week(&when);
    let error = match snapshot.hours_for(day) {
        None => Some(format!("We're closed on {}", day_name(day))),
        Some(hours) if hours.is_closed => Some(format!("We're closed on {}", day_name(day))),
        Some(hours) => {
            // Zero-padded HH:MM strings order the same as times; the
            // boundaries themselves are accepted.
            let requested = time_of_day(&when);
            if requested < hours.open_time || requested > hours.close_time {
                Some(format!(
                    "We're open {} to {} on {}",
                    hours.open_time,
                    hours.close_time,
                    day_name(day)
                ))
            } else {
                None
            }
        }
    };

    if let Some(ref message) = error {
        ctx.add_validation_error(message.clone());
    }
    error
}
