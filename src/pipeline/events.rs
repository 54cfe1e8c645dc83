//! Audit trail for a run.
//!
//! Events are appended in execution order and never reordered or removed.
//! Each one is mirrored to `tracing` at the matching level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Event severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One audit-trail entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub event_type: String,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, append-only sequence of log events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventLog {
    events: Vec<LogEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(
        &mut self,
        event_type: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
        metadata: Option<serde_json::Value>,
    ) {
        let event = LogEvent {
            event_type: event_type.into(),
            severity,
            message: message.into(),
            metadata,
            timestamp: Utc::now(),
        };

        match event.severity {
            Severity::Info => info!(event = %event.event_type, "{}", event.message),
            Severity::Warning => warn!(event = %event.event_type, "{}", event.message),
            Severity::Error => error!(event = %event.event_type, "{}", event.message),
        }

        self.events.push(event);
    }

    pub fn info(
        &mut self,
        event_type: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        self.push(event_type, Severity::Info, message, Some(metadata));
    }

    pub fn warning(
        &mut self,
        event_type: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        self.push(event_type, Severity::Warning, message, Some(metadata));
    }

    pub fn error(
        &mut self,
        event_type: impl Into<String>,
        message: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        self.push(event_type, Severity::Error, message, Some(metadata));
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.events.iter().any(|e| e.severity == Severity::Error)
    }

    /// Event types in order.
    pub fn event_types(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.event_type.as_str()).collect()
    }

    /// First event with the given type.
    pub fn find(&self, event_type: &str) -> Option<&LogEvent> {
        self.events.iter().find(|e| e.event_type == event_type)
    }

    pub fn into_events(self) -> Vec<LogEvent> {
        self.events
    }
}
