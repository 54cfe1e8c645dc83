//! Run context. The mutable record threaded through one pipeline run.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Channel a message arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Web,
    Email,
    Sms,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Email => "email",
            Self::Sms => "sms",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(Self::Web),
            "email" => Ok(Self::Email),
            "sms" => Ok(Self::Sms),
            other => Err(format!("unknown channel: '{other}'")),
        }
    }
}

/// Closed set of message purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Booking,
    Cancel,
    Reschedule,
    Info,
    #[default]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Cancel => "cancel",
            Self::Reschedule => "reschedule",
            Self::Info => "info",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of one pipeline run.
///
/// Owned exclusively by the runner for the duration of the run. Extracted
/// fields are set at most once; `validation_errors` and `actions_taken`
/// only grow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub business_id: String,
    pub channel: Channel,
    pub raw_message: String,

    /// `None` until the classifier step has run.
    pub intent: Option<Intent>,
    /// Escalation signal, scanned independently of `intent`.
    pub escalation: bool,
    pub customer_name: Option<String>,
    pub requested_date_time: Option<NaiveDateTime>,
    pub requested_service: Option<String>,

    pub validation_errors: Vec<String>,
    pub actions_taken: Vec<String>,
    pub response_message: Option<String>,
}

impl RunContext {
    /// Fresh context with only the inputs populated.
    pub fn new(business_id: impl Into<String>, channel: Channel, raw_message: impl Into<String>) -> Self {
        Self {
            business_id: business_id.into(),
            channel,
            raw_message: raw_message.into(),
            intent: None,
            escalation: false,
            customer_name: None,
            requested_date_time: None,
            requested_service: None,
            validation_errors: Vec::new(),
            actions_taken: Vec::new(),
            response_message: None,
        }
    }

    /// Classified intent, `Unknown` before classification.
    pub fn intent(&self) -> Intent {
        self.intent.unwrap_or_default()
    }

    pub fn is_booking(&self) -> bool {
        self.intent() == Intent::Booking
    }

    /// True when intent is booking and both service and date/time are known.
    pub fn has_booking_details(&self) -> bool {
        self.is_booking() && self.requested_service.is_some() && self.requested_date_time.is_some()
    }

    /// Set the customer name unless one was already extracted.
    pub fn set_customer_name(&mut self, name: impl Into<String>) -> bool {
        set_once(&mut self.customer_name, name.into())
    }

    /// Set the requested date/time unless one was already extracted.
    pub fn set_requested_date_time(&mut self, when: NaiveDateTime) -> bool {
        set_once(&mut self.requested_date_time, when)
    }

    /// Set the requested service unless one was already matched.
    pub fn set_requested_service(&mut self, service: impl Into<String>) -> bool {
        set_once(&mut self.requested_service, service.into())
    }

    pub fn add_validation_error(&mut self, error: impl Into<String>) {
        self.validation_errors.push(error.into());
    }

    /// Record an action. Use `"<action>:<detail>"` for external actions.
    pub fn record_action(&mut self, action: impl Into<String>) {
        self.actions_taken.push(action.into());
    }
}

fn set_once<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}
