//! Calendar API types and data structures.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar event snapshot. Never mutated after a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub calendar_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub attendees: Vec<Attendee>,
    pub organizer: Option<String>,
    pub html_link: Option<String>,
}

/// Event time - can be a specific datetime or an all-day date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventTime {
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
}

impl EventTime {
    /// Midnight UTC for all-day dates.
    pub fn as_datetime(&self) -> DateTime<Utc> {
        match self {
            EventTime::DateTime(dt) => *dt,
            EventTime::Date(d) => d.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// The instant for timed events; `None` for all-day dates.
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            EventTime::DateTime(dt) => Some(*dt),
            EventTime::Date(_) => None,
        }
    }
}

impl Event {
    pub fn is_all_day(&self) -> bool {
        matches!(self.start, EventTime::Date(_))
    }
}

/// Event attendee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub email: String,
    pub display_name: Option<String>,
    pub response_status: ResponseStatus,
    pub is_organizer: bool,
    /// The attendee entry for the calendar owner.
    pub is_self: bool,
}

impl Attendee {
    pub fn new(email: impl Into<String>, response_status: ResponseStatus) -> Self {
        Self {
            email: email.into(),
            display_name: None,
            response_status,
            is_organizer: false,
            is_self: false,
        }
    }
}

/// Attendee response status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseStatus {
    #[default]
    NeedsAction,
    Declined,
    Tentative,
    Accepted,
}

impl ResponseStatus {
    fn from_api(status: Option<&str>) -> Self {
        match status {
            Some("accepted") => ResponseStatus::Accepted,
            Some("declined") => ResponseStatus::Declined,
            Some("tentative") => ResponseStatus::Tentative,
            _ => ResponseStatus::NeedsAction,
        }
    }
}

/// Calendar reference as offered in the picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub time_zone: Option<String>,
    pub is_primary: bool,
}

// API Response Types

/// Google Calendar API event response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEvent {
    pub id: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<ApiEventTime>,
    pub end: Option<ApiEventTime>,
    #[serde(default)]
    pub attendees: Vec<ApiAttendee>,
    pub organizer: Option<ApiOrganizer>,
    pub html_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
    pub time_zone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAttendee {
    // Resources and some group entries come without an address
    #[serde(default)]
    pub email: String,
    pub display_name: Option<String>,
    pub response_status: Option<String>,
    #[serde(default)]
    pub organizer: bool,
    #[serde(default, rename = "self")]
    pub is_self: bool,
}

#[derive(Debug, Deserialize)]
pub struct ApiOrganizer {
    pub email: Option<String>,
    #[serde(rename = "displayName")]
    pub display_name: Option<String>,
}

/// API response for event list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventListResponse {
    #[serde(default)]
    pub items: Vec<ApiEvent>,
    pub next_page_token: Option<String>,
}

/// API response for calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListResponse {
    #[serde(default)]
    pub items: Vec<ApiCalendar>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCalendar {
    pub id: String,
    pub summary: Option<String>,
    pub summary_override: Option<String>,
    pub description: Option<String>,
    pub time_zone: Option<String>,
    #[serde(default)]
    pub primary: bool,
}

impl Event {
    /// Convert API response to a local Event. Returns `None` when the event
    /// has no usable start.
    pub fn from_api(api: ApiEvent, calendar_id: &str) -> Option<Self> {
        let start = api.start.as_ref().and_then(parse_event_time)?;
        let end = api
            .end
            .as_ref()
            .and_then(parse_event_time)
            .unwrap_or_else(|| start.clone());

        let attendees = api
            .attendees
            .into_iter()
            .filter(|a| !a.email.is_empty())
            .map(|a| Attendee {
                response_status: ResponseStatus::from_api(a.response_status.as_deref()),
                email: a.email,
                display_name: a.display_name,
                is_organizer: a.organizer,
                is_self: a.is_self,
            })
            .collect();

        Some(Self {
            id: api.id,
            calendar_id: calendar_id.to_string(),
            summary: api.summary.unwrap_or_default(),
            description: api.description,
            location: api.location,
            start,
            end,
            attendees,
            organizer: api.organizer.and_then(|o| o.email),
            html_link: api.html_link,
        })
    }
}

impl From<ApiCalendar> for Calendar {
    fn from(api: ApiCalendar) -> Self {
        Self {
            id: api.id,
            summary: api.summary_override.or(api.summary).unwrap_or_default(),
            description: api.description,
            time_zone: api.time_zone,
            is_primary: api.primary,
        }
    }
}

fn parse_event_time(api: &ApiEventTime) -> Option<EventTime> {
    if let Some(dt_str) = &api.date_time {
        if let Ok(dt) = DateTime::parse_from_rfc3339(dt_str) {
            return Some(EventTime::DateTime(dt.with_timezone(&Utc)));
        }
    }
    if let Some(date_str) = &api.date {
        if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
            return Some(EventTime::Date(date));
        }
    }
    None
}
