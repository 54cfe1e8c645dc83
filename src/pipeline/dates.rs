//! Natural-language date/time parsing.
//!
//! The pipeline treats the parser as a collaborator: it hands over the raw
//! message and gets back the first absolute point in time the parser can
//! resolve, or nothing. No timezone conversion is applied anywhere.

use async_trait::async_trait;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use regex::{Captures, Regex};

use crate::error::PipelineError;

/// Resolves free text to an absolute date/time.
#[async_trait]
pub trait DateParser: Send + Sync {
    /// First absolute date/time found in `text`, if any.
    async fn parse_first(&self, text: &str) -> Result<Option<NaiveDateTime>, PipelineError>;
}

/// Hour used when a date is given without a time.
const DEFAULT_HOUR: u32 = 12;
/// Hour used for "tonight" without a time.
const TONIGHT_HOUR: u32 = 20;
/// Bare "at N" hours up to this one are read as afternoon ("at 3" is 15:00).
const LAST_AFTERNOON_HOUR: u32 = 7;

const MONTHS: &str = "jan|january|feb|february|mar|march|apr|april|may|jun|june|jul|july|aug|august|sep|sept|september|oct|october|nov|november|dec|december";
const WEEKDAYS: &str = "monday|tuesday|wednesday|thursday|friday|saturday|sunday";

/// Rule-based English date parser, resolving relative expressions
/// ("tomorrow", "friday", "3pm") against a reference moment.
pub struct RelativeDateParser {
    reference: Option<NaiveDateTime>,
    relative_day: Regex,
    iso_date: Regex,
    slash_date: Regex,
    month_day: Regex,
    day_month: Regex,
    weekday: Regex,
    meridiem_time: Regex,
    clock_time: Regex,
    named_time: Regex,
    bare_at_hour: Regex,
}

impl RelativeDateParser {
    /// Parser resolving against the current local time.
    pub fn new() -> Self {
        Self {
            reference: None,
            relative_day: Regex::new(r"\b(day after tomorrow|today|tonight|tomorrow)\b").unwrap(),
            iso_date: Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap(),
            slash_date: Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").unwrap(),
            month_day: Regex::new(&format!(
                r"\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?\b(?:,?\s+(\d{{4}}))?"
            ))
            .unwrap(),
            day_month: Regex::new(&format!(
                r"\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\b(?:,?\s+(\d{{4}}))?"
            ))
            .unwrap(),
            weekday: Regex::new(&format!(r"\b(?:(next|this)\s+)?({WEEKDAYS})\b")).unwrap(),
            meridiem_time: Regex::new(r"\b(\d{1,2})(?::(\d{2}))?\s*(am\b|pm\b|a\.m\.|p\.m\.)").unwrap(),
            clock_time: Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap(),
            named_time: Regex::new(r"\b(noon|midday|midnight)\b").unwrap(),
            bare_at_hour: Regex::new(r"\bat\s+(\d{1,2})\b").unwrap(),
        }
    }

    /// Parser resolving against a fixed moment.
    pub fn with_reference(reference: NaiveDateTime) -> Self {
        Self {
            reference: Some(reference),
            ..Self::new()
        }
    }

    fn reference(&self) -> NaiveDateTime {
        self.reference
            .unwrap_or_else(|| Local::now().naive_local())
    }

    /// Synchronous core of `parse_first`.
    pub fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        let lowered = text.to_lowercase();
        let reference = self.reference();

        let date = self.find_date(&lowered, reference.date());
        let time = self.find_time(&lowered);

        match (date, time) {
            (Some(found), Some(time)) => Some(found.date.and_time(time)),
            (Some(found), None) => found.date.and_hms_opt(found.default_hour, 0, 0),
            (None, Some(time)) => Some(reference.date().and_time(time)),
            (None, None) => None,
        }
    }

    /// Earliest date expression in the text.
    fn find_date(&self, text: &str, today: NaiveDate) -> Option<FoundDate> {
        let candidates = [
            first_resolved(&self.relative_day, text, |c| resolve_relative_day(c, today)),
            first_resolved(&self.iso_date, text, |c| {
                NaiveDate::from_ymd_opt(num(c, 1)?, num(c, 2)?, num(c, 3)?).map(FoundDate::at_noon)
            }),
            first_resolved(&self.slash_date, text, |c| {
                let year = year_or(c, 3, today.year())?;
                NaiveDate::from_ymd_opt(year, num(c, 1)?, num(c, 2)?).map(FoundDate::at_noon)
            }),
            first_resolved(&self.month_day, text, |c| {
                let year = year_or(c, 3, today.year())?;
                NaiveDate::from_ymd_opt(year, month_number(c.get(1)?.as_str())?, num(c, 2)?)
                    .map(FoundDate::at_noon)
            }),
            first_resolved(&self.day_month, text, |c| {
                let year = year_or(c, 3, today.year())?;
                NaiveDate::from_ymd_opt(year, month_number(c.get(2)?.as_str())?, num(c, 1)?)
                    .map(FoundDate::at_noon)
            }),
            first_resolved(&self.weekday, text, |c| {
                let weekday = weekday_from_name(c.get(2)?.as_str())?;
                let strictly_after = c.get(1).is_some_and(|m| m.as_str() == "next");
                Some(FoundDate::at_noon(next_weekday(today, weekday, strictly_after)))
            }),
        ];

        candidates
            .into_iter()
            .flatten()
            .min_by_key(|(start, _)| *start)
            .map(|(_, found)| found)
    }

    /// First time expression, by pattern priority.
    fn find_time(&self, text: &str) -> Option<NaiveTime> {
        let meridiem = || {
            first_resolved(&self.meridiem_time, text, |c| {
                let hour: u32 = num(c, 1)?;
                let minute: u32 = c.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
                if !(1..=12).contains(&hour) {
                    return None;
                }
                let pm = c.get(3)?.as_str().starts_with('p');
                let hour = match (hour, pm) {
                    (12, false) => 0,
                    (12, true) => 12,
                    (h, true) => h + 12,
                    (h, false) => h,
                };
                NaiveTime::from_hms_opt(hour, minute, 0)
            })
        };
        let clock = || {
            first_resolved(&self.clock_time, text, |c| {
                NaiveTime::from_hms_opt(num(c, 1)?, num(c, 2)?, 0)
            })
        };
        let named = || {
            first_resolved(&self.named_time, text, |c| match c.get(1)?.as_str() {
                "midnight" => NaiveTime::from_hms_opt(0, 0, 0),
                _ => NaiveTime::from_hms_opt(12, 0, 0),
            })
        };
        let bare = || {
            first_resolved(&self.bare_at_hour, text, |c| {
                let hour: u32 = num(c, 1)?;
                let hour = match hour {
                    1..=LAST_AFTERNOON_HOUR => hour + 12,
                    h => h,
                };
                NaiveTime::from_hms_opt(hour, 0, 0)
            })
        };

        meridiem()
            .or_else(clock)
            .or_else(named)
            .or_else(bare)
            .map(|(_, time)| time)
    }
}

impl Default for RelativeDateParser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DateParser for RelativeDateParser {
    async fn parse_first(&self, text: &str) -> Result<Option<NaiveDateTime>, PipelineError> {
        Ok(self.parse(text))
    }
}

/// A resolved calendar date plus the hour to use if no time is given.
struct FoundDate {
    date: NaiveDate,
    default_hour: u32,
}

impl FoundDate {
    fn at_noon(date: NaiveDate) -> Self {
        Self {
            date,
            default_hour: DEFAULT_HOUR,
        }
    }
}

/// First match of `regex` that `resolve` accepts, with its start offset.
fn first_resolved<T>(
    regex: &Regex,
    text: &str,
    resolve: impl Fn(&Captures<'_>) -> Option<T>,
) -> Option<(usize, T)> {
    regex.captures_iter(text).find_map(|caps| {
        let start = caps.get(0)?.start();
        resolve(&caps).map(|value| (start, value))
    })
}

fn num<T: std::str::FromStr>(caps: &Captures<'_>, group: usize) -> Option<T> {
    caps.get(group)?.as_str().parse().ok()
}

/// Year from a capture group, two-digit years meaning 20xx.
fn year_or(caps: &Captures<'_>, group: usize, default: i32) -> Option<i32> {
    match caps.get(group) {
        None => Some(default),
        Some(m) => {
            let year: i32 = m.as_str().parse().ok()?;
            Some(if m.as_str().len() == 2 { 2000 + year } else { year })
        }
    }
}

fn resolve_relative_day(caps: &Captures<'_>, today: NaiveDate) -> Option<FoundDate> {
    let found = match caps.get(1)?.as_str() {
        "today" => FoundDate::at_noon(today),
        "tonight" => FoundDate {
            date: today,
            default_hour: TONIGHT_HOUR,
        },
        "tomorrow" => FoundDate::at_noon(today + Duration::days(1)),
        "day after tomorrow" => FoundDate::at_noon(today + Duration::days(2)),
        _ => return None,
    };
    Some(found)
}

fn month_number(name: &str) -> Option<u32> {
    let month = match name.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    name.parse().ok()
}

/// Next date falling on `weekday`. Today counts unless `strictly_after`.
fn next_weekday(today: NaiveDate, weekday: Weekday, strictly_after: bool) -> NaiveDate {
    let current = today.weekday().num_days_from_monday() as i64;
    let target = weekday.num_days_from_monday() as i64;
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 && strictly_after {
        ahead = 7;
    }
    today + Duration::days(ahead)
}
