//! Business snapshot. The read-only configuration a run works against.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// Weekday names indexed Monday = 0 .. Sunday = 6.
pub const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Display name for a Monday-based day index.
pub fn day_name(day_of_week: u8) -> &'static str {
    DAY_NAMES
        .get(usize::from(day_of_week))
        .copied()
        .unwrap_or("Unknown")
}

/// A bookable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    #[serde(default = "default_duration", alias = "duration")]
    pub duration_minutes: u32,
}

fn default_duration() -> u32 {
    30
}

impl Service {
    pub fn new(name: impl Into<String>, duration_minutes: u32) -> Self {
        Self {
            name: name.into(),
            duration_minutes,
        }
    }
}

/// Opening hours for one weekday. Times are `"HH:MM"` strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningHour {
    /// Monday = 0 .. Sunday = 6.
    pub day_of_week: u8,
    pub open_time: String,
    pub close_time: String,
    #[serde(default)]
    pub is_closed: bool,
}

impl OpeningHour {
    /// An open day.
    pub fn open(day_of_week: u8, open_time: &str, close_time: &str) -> Self {
        Self {
            day_of_week,
            open_time: open_time.to_string(),
            close_time: close_time.to_string(),
            is_closed: false,
        }
    }

    /// A closed day.
    pub fn closed(day_of_week: u8) -> Self {
        Self {
            day_of_week,
            open_time: "00:00".to_string(),
            close_time: "00:00".to_string(),
            is_closed: true,
        }
    }
}

/// Immutable view of one business's services and opening hours.
///
/// Services are kept sorted by name and opening hours by weekday, so
/// every consumer iterates them in the configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub opening_hours: Vec<OpeningHour>,
}

impl BusinessSnapshot {
    /// Create a snapshot with no services or hours.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timezone: None,
            services: Vec::new(),
            opening_hours: Vec::new(),
        }
    }

    pub fn with_services(mut self, services: Vec<Service>) -> Self {
        self.services = services;
        self.normalize();
        self
    }

    pub fn with_opening_hours(mut self, hours: Vec<OpeningHour>) -> Self {
        self.opening_hours = hours;
        self.normalize();
        self
    }

    /// Same hours on all seven days.
    pub fn open_every_day(self, open_time: &str, close_time: &str) -> Self {
        let hours = (0..7)
            .map(|day| OpeningHour::open(day, open_time, close_time))
            .collect();
        self.with_opening_hours(hours)
    }

    /// Sort services by name and hours by weekday.
    pub fn normalize(&mut self) {
        self.services.sort_by(|a, b| a.name.cmp(&b.name));
        self.opening_hours.sort_by_key(|oh| oh.day_of_week);
    }

    /// Opening hours for a Monday-based day index.
    pub fn hours_for(&self, day_of_week: u8) -> Option<&OpeningHour> {
        self.opening_hours
            .iter()
            .find(|oh| oh.day_of_week == day_of_week)
    }

    /// Check structural invariants: a business name, weekday range, one
    /// entry per weekday, `HH:MM` times on open days, non-empty service names.
    pub fn validate(&self) -> Result<(), DirectoryError> {
        if self.name.trim().is_empty() {
            return Err(DirectoryError::InvalidSnapshot(
                "business name must not be empty".into(),
            ));
        }

        let mut seen = HashSet::new();
        for oh in &self.opening_hours {
            if oh.day_of_week > 6 {
                return Err(DirectoryError::InvalidSnapshot(format!(
                    "day_of_week {} out of range 0..6",
                    oh.day_of_week
                )));
            }
            if !seen.insert(oh.day_of_week) {
                return Err(DirectoryError::InvalidSnapshot(format!(
                    "duplicate opening hours for {}",
                    day_name(oh.day_of_week)
                )));
            }
            if !oh.is_closed {
                for time in [&oh.open_time, &oh.close_time] {
                    if !is_hh_mm(time) {
                        return Err(DirectoryError::InvalidSnapshot(format!(
                            "invalid time '{}' for {}",
                            time,
                            day_name(oh.day_of_week)
                        )));
                    }
                }
            }
        }

        if self.services.iter().any(|s| s.name.trim().is_empty()) {
            return Err(DirectoryError::InvalidSnapshot(
                "service name must not be empty".into(),
            ));
        }

        Ok(())
    }
}

/// True for zero-padded 24-hour `"HH:MM"`.
pub fn is_hh_mm(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = [bytes[0], bytes[1], bytes[3], bytes[4]];
    if !digits.iter().all(u8::is_ascii_digit) {
        return false;
    }
    let hour = (bytes[0] - b'0') * 10 + (bytes[1] - b'0');
    let minute = (bytes[3] - b'0') * 10 + (bytes[4] - b'0');
    hour < 24 && minute < 60
}
