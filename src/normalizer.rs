use crate::types::{EventTime, NormalizedEvent, RawRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, info};

pub const SUMMARY: &str = "SUMMARY";
pub const DESCRIPTION: &str = "DESCRIPTION";
pub const LOCATION: &str = "LOCATION";
pub const URL: &str = "URL";
pub const DTSTART: &str = "DTSTART";
pub const DTEND: &str = "DTEND";

fn re_details_url() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Get up-to-date information at:\s*(https?://[^\s\\]+)").unwrap()
    })
}

/// Pull the "more info" link out of a description, e.g.
/// `Get up-to-date information at: https://lu.ma/abc\n` yields `https://lu.ma/abc`.
pub fn extract_url(description: &str) -> Option<String> {
    let captures = re_details_url().captures(description)?;
    let url = captures
        .get(1)?
        .as_str()
        .trim_end_matches(|c: char| c.is_whitespace() || c == '\\');
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

/// Read a calendar date value. Basic forms become UTC timestamps, anything else
/// is returned as text.
pub fn parse_event_time(value: &str) -> Option<EventTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Some(stripped) = value.strip_suffix('Z') {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S") {
            return Some(EventTime::Timestamp(naive.and_utc()));
        }
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(EventTime::Timestamp(naive.and_utc()));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y%m%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Some(EventTime::Timestamp(midnight.and_utc()));
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(EventTime::Timestamp(ts.with_timezone(&Utc)));
    }

    Some(EventTime::Text(value.to_string()))
}

fn non_empty(record: &RawRecord, key: &str) -> Option<String> {
    record
        .get(key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Map one record, or `None` when it lacks a summary, description or location.
pub fn normalize_record(record: &RawRecord) -> Option<NormalizedEvent> {
    let name = non_empty(record, SUMMARY)?;
    let description = non_empty(record, DESCRIPTION)?;
    let location = non_empty(record, LOCATION)?;

    let url = non_empty(record, URL).or_else(|| extract_url(&description));

    Some(NormalizedEvent {
        start: record.get(DTSTART).and_then(parse_event_time),
        end: record.get(DTEND).and_then(parse_event_time),
        name,
        description,
        location,
        url,
    })
}

pub fn normalize(records: &[RawRecord]) -> Vec<NormalizedEvent> {
    let events: Vec<NormalizedEvent> = records
        .iter()
        .filter_map(|record| {
            let event = normalize_record(record);
            if event.is_none() {
                debug!(
                    "Dropping incomplete record (summary: {:?})",
                    record.get(SUMMARY)
                );
            }
            event
        })
        .collect();

    let dropped = records.len() - events.len();
    if dropped > 0 {
        info!("Dropped {} incomplete records", dropped);
    }
    info!("Normalized {} events", events.len());

    events
}
