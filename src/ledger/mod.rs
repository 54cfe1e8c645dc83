//! Customer ledger. External system of record for leads and bookings.
//!
//! The pipeline only depends on the `CustomerLedger` trait. A call either
//! yields the created record's ID or a `LedgerError` describing a handled
//! failure; the action adapters fold both outcomes into the run.

pub mod airtable;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::pipeline::context::{Channel, Intent};

pub use airtable::AirtableLedger;

/// Name recorded when the customer did not introduce themselves.
pub const ANONYMOUS_NAME: &str = "Anonymous";

/// Lead payload: one row per incoming message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadRecord {
    pub name: Option<String>,
    pub channel: Channel,
    pub intent: Intent,
    pub last_message: String,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

/// Status written on a booking row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Booking payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRecord {
    pub name: Option<String>,
    pub service: String,
    pub date_time: NaiveDateTime,
    pub status: BookingStatus,
    pub source_message: String,
    pub channel: Channel,
}

/// External system of record for leads and bookings.
#[async_trait]
pub trait CustomerLedger: Send + Sync {
    /// Ledger name for logging (e.g. "airtable").
    fn name(&self) -> &str;

    /// Create a lead row. Returns the record ID.
    async fn create_lead(&self, lead: &LeadRecord) -> Result<String, LedgerError>;

    /// Create a booking row. Returns the record ID.
    async fn create_booking(&self, booking: &BookingRecord) -> Result<String, LedgerError>;
}

/// Ledger used when no credentials are configured. Every call reports
/// `LedgerError::NotConfigured` without touching the network.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredLedger;

#[async_trait]
impl CustomerLedger for UnconfiguredLedger {
    fn name(&self) -> &str {
        "unconfigured"
    }

    async fn create_lead(&self, _lead: &LeadRecord) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured)
    }

    async fn create_booking(&self, _booking: &BookingRecord) -> Result<String, LedgerError> {
        Err(LedgerError::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_ledger_reports_not_configured() {
        let ledger = UnconfiguredLedger;
        let lead = LeadRecord {
            name: None,
            channel: Channel::Web,
            intent: Intent::Unknown,
            last_message: "hello".into(),
            created_at: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
        };
        let err = ledger.create_lead(&lead).await.unwrap_err();
        assert_eq!(err.to_string(), "Airtable credentials not configured");
    }

    #[test]
    fn booking_status_serialization() {
        assert_eq!(
            serde_json::to_value(BookingStatus::Confirmed).unwrap(),
            "confirmed"
        );
        assert_eq!(BookingStatus::Cancelled.as_str(), "cancelled");
    }
}
