//! The `events` endpoint.
//!
//! Keeps published events that have not started more than a day ago, sorted
//! by start. Refetched when the language changes; a location change alone
//! keeps the cached list.

use super::content_url;
use crate::RouteParams;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use endpoint_store_core::endpoint::{Endpoint, EndpointBuilder};
use endpoint_store_core::environment::Clock;
use endpoint_store_core::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// A published event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    /// CMS id
    pub id: u64,
    /// Title
    pub title: String,
    /// HTML body
    pub content: String,
    /// Thumbnail URL
    pub thumbnail: Option<String>,
    /// Street address
    pub address: Option<String>,
    /// Town
    pub town: Option<String>,
    /// When it takes place
    pub date: EventDate,
}

/// When an event takes place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventDate {
    /// Start, UTC
    pub start: DateTime<Utc>,
    /// End, UTC, if given
    pub end: Option<DateTime<Utc>>,
    /// Whether the event lasts all day
    pub all_day: bool,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    thumbnail: Value,
    #[serde(default)]
    status: String,
    #[serde(default)]
    location: RawLocation,
    #[serde(default)]
    event: RawSchedule,
}

#[derive(Debug, Default, Deserialize)]
struct RawLocation {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    town: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSchedule {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    all_day: Value,
}

/// `YYYY-MM-DD` plus optional `HH:MM:SS` (midnight when absent), read as UTC.
///
/// Missing or unparseable dates yield `None`.
fn parse_date(date: Option<&str>, time: Option<&str>) -> Option<DateTime<Utc>> {
    let date = date.filter(|d| !d.is_empty())?;
    let time = time.filter(|t| !t.is_empty()).unwrap_or("00:00:00");

    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(NaiveDateTime::new(date, time).and_utc())
}

fn is_truthy(flag: &Value) -> bool {
    match flag {
        Value::Bool(b) => *b,
        Value::String(s) => s == "1",
        Value::Number(n) => n.as_u64() == Some(1),
        _ => false,
    }
}

/// Map the CMS response into upcoming published events.
///
/// # Errors
///
/// Returns the decode error when the response is not a list of events.
pub fn parse_events(json: Value, now: DateTime<Utc>) -> Result<Vec<Event>, serde_json::Error> {
    let raw: Vec<RawEvent> = serde_json::from_value(json)?;
    let cutoff = now - TimeDelta::days(1);

    let mut events: Vec<Event> = raw
        .into_iter()
        .filter(|event| event.status == "publish")
        .filter_map(|event| {
            let schedule = &event.event;
            let start = parse_date(schedule.start_date.as_deref(), schedule.start_time.as_deref())?;
            let end = parse_date(schedule.end_date.as_deref(), schedule.end_time.as_deref());
            let all_day = is_truthy(&schedule.all_day);

            Some(Event {
                id: event.id,
                title: event.title,
                content: event.content,
                thumbnail: event.thumbnail.as_str().map(ToString::to_string),
                address: event.location.address,
                town: event.location.town,
                date: EventDate {
                    start,
                    end,
                    all_day,
                },
            })
        })
        .filter(|event| event.date.start > cutoff)
        .collect();

    events.sort_by_key(|event| event.date.start);
    Ok(events)
}

/// Builder for the `events` endpoint, for callers that add an override
#[must_use]
pub fn events_builder(base_url: &str, clock: Arc<dyn Clock>) -> EndpointBuilder<RouteParams> {
    let base_url = base_url.to_string();

    EndpointBuilder::new("events")
        .with_url_mapper(move |params: &RouteParams| content_url(&base_url, "events", params))
        .with_mapper(move |json| parse_events(json, clock.now()))
        .with_refetch_logic(|old: &RouteParams, new: &RouteParams| old.language != new.language)
}

/// The `events` endpoint against the CMS at `base_url`
///
/// # Errors
///
/// Never in practice; the builder is complete.
pub fn events_endpoint(
    base_url: &str,
    clock: Arc<dyn Clock>,
) -> Result<Endpoint<RouteParams>, ConfigError> {
    events_builder(base_url, clock).build()
}
