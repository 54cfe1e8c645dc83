//! Airtable-backed customer ledger.
//!
//! Leads and bookings are plain rows created with `POST /{base}/{table}`
//! and a `{"fields": {...}}` body. The created record's `id` is returned.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::{ANONYMOUS_NAME, BookingRecord, CustomerLedger, LeadRecord};
use crate::config::LedgerConfig;
use crate::error::LedgerError;

/// Customer ledger speaking the Airtable REST API.
pub struct AirtableLedger {
    config: LedgerConfig,
    client: reqwest::Client,
}

impl AirtableLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.config.api_url, self.config.base_id, table)
    }

    /// Create one row and return its record ID.
    async fn create_record(&self, table: &str, fields: Value) -> Result<String, LedgerError> {
        let response = self
            .client
            .post(self.table_url(table))
            .bearer_auth(self.config.token.expose_secret())
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| LedgerError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = api_error_message(&body).unwrap_or_else(|| {
                format!(
                    "Airtable API error: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                )
            });
            warn!(table, status = status.as_u16(), error = %message, "Airtable rejected record");
            return Err(LedgerError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(e.to_string()))?;
        let record_id = body
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| LedgerError::InvalidResponse("missing record id".into()))?;

        debug!(table, record_id, "Airtable record created");
        Ok(record_id.to_string())
    }
}

#[async_trait]
impl CustomerLedger for AirtableLedger {
    fn name(&self) -> &str {
        "airtable"
    }

    async fn create_lead(&self, lead: &LeadRecord) -> Result<String, LedgerError> {
        self.create_record(&self.config.leads_table, lead_fields(lead))
            .await
    }

    async fn create_booking(&self, booking: &BookingRecord) -> Result<String, LedgerError> {
        self.create_record(&self.config.bookings_table, booking_fields(booking))
            .await
    }
}

fn lead_fields(lead: &LeadRecord) -> Value {
    json!({
        "Name": lead.name.as_deref().unwrap_or(ANONYMOUS_NAME),
        "Channel": lead.channel.as_str(),
        "Intent": lead.intent.as_str(),
        "LastMessage": lead.last_message,
        "CreatedAt": lead.created_at.format("%Y-%m-%d").to_string(),
        "UpdatedAt": lead.updated_at.format("%Y-%m-%d").to_string(),
    })
}

fn booking_fields(booking: &BookingRecord) -> Value {
    json!({
        "Name": booking.name.as_deref().unwrap_or(ANONYMOUS_NAME),
        "Service": booking.service,
        "DateTime": booking.date_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
        "Status": booking.status.as_str(),
        "SourceMessage": booking.source_message,
        "Channel": booking.channel.as_str(),
    })
}

/// Airtable reports errors as `{"error": {"message": ...}}` or `{"error": "CODE"}`.
fn api_error_message(body: &Value) -> Option<String> {
    let error = body.get("error")?;
    error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(String::from)
}
