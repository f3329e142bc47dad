//! Calendar backend: async operations using the shared runtime and channel pattern.
//! All network work runs off the caller's thread; results sent via mpsc.

use chrono::Utc;
use late_calendar::{next_event, Calendar, Event};

use crate::bridge;
use crate::services::google_common::{GoogleEndpoints, TokenSource};

/// Error type for Calendar operations.
#[derive(Debug, Clone)]
pub enum CalendarError {
    Network(String),
    Auth(String),
    NotFound(String),
    RateLimited(u64),
    NotInitialized,
}

impl std::fmt::Display for CalendarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarError::Network(s) => write!(f, "Calendar error: {}", s),
            CalendarError::Auth(s) => write!(f, "Calendar auth error: {}", s),
            CalendarError::NotFound(id) => write!(f, "Calendar not found: {}", id),
            CalendarError::RateLimited(secs) => write!(f, "Calendar rate limited for {}s", secs),
            CalendarError::NotInitialized => write!(f, "Calendar service not initialized"),
        }
    }
}

impl std::error::Error for CalendarError {}

impl From<late_calendar::CalendarError> for CalendarError {
    fn from(e: late_calendar::CalendarError) -> Self {
        match e {
            late_calendar::CalendarError::CalendarNotFound(id) => CalendarError::NotFound(id),
            late_calendar::CalendarError::RateLimited(secs) => CalendarError::RateLimited(secs),
            e if e.should_refresh_token() => CalendarError::Auth(e.to_string()),
            e => CalendarError::Network(e.to_string()),
        }
    }
}

/// Messages sent from async operations back to the surface thread.
#[derive(Debug)]
pub enum CalendarServiceMessage {
    /// Result of fetching the calendar list.
    FetchCalendarsDone(Result<Vec<Calendar>, CalendarError>),
    /// Result of fetching upcoming events, reduced to the next one.
    FetchNextEventDone(Result<Option<Event>, CalendarError>),
}

/// Request the user's calendar list.
pub fn request_fetch_calendars(
    tx: &std::sync::mpsc::Sender<CalendarServiceMessage>,
    endpoints: GoogleEndpoints,
    token: TokenSource,
) {
    let tx = tx.clone();
    let runtime = match bridge::get_runtime() {
        Some(r) => r,
        None => {
            let _ = tx.send(CalendarServiceMessage::FetchCalendarsDone(Err(
                CalendarError::NotInitialized,
            )));
            return;
        }
    };

    runtime.spawn(async move {
        let access_token = token.resolve().await;
        let client = endpoints.calendar_client(&access_token);

        let result = client.list_calendars().await.map_err(|e| {
            tracing::error!("Failed to list calendars: {}", e);
            if e.should_refresh_token() {
                token.on_rejected();
            }
            CalendarError::from(e)
        });

        let _ = tx.send(CalendarServiceMessage::FetchCalendarsDone(result));
    });
}

/// Request upcoming events of `calendar_id` and pick the next one.
pub fn request_fetch_next_event(
    tx: &std::sync::mpsc::Sender<CalendarServiceMessage>,
    endpoints: GoogleEndpoints,
    token: TokenSource,
    calendar_id: String,
    max_results: u32,
) {
    let tx = tx.clone();
    let runtime = match bridge::get_runtime() {
        Some(r) => r,
        None => {
            let _ = tx.send(CalendarServiceMessage::FetchNextEventDone(Err(
                CalendarError::NotInitialized,
            )));
            return;
        }
    };

    runtime.spawn(async move {
        let access_token = token.resolve().await;
        let client = endpoints.calendar_client(&access_token);

        let result = match client
            .list_upcoming_events(&calendar_id, Utc::now(), max_results)
            .await
        {
            Ok(events) => Ok(next_event(&events, Utc::now()).cloned()),
            Err(e) => {
                tracing::error!("Failed to fetch events for {}: {}", calendar_id, e);
                if e.should_refresh_token() {
                    token.on_rejected();
                }
                Err(CalendarError::from(e))
            }
        };

        let _ = tx.send(CalendarServiceMessage::FetchNextEventDone(result));
    });
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn calendar_error_display() {
        assert!(format!("{}", CalendarError::Network("timeout".into())).contains("Calendar error"));
        assert!(format!("{}", CalendarError::NotFound("x".into())).contains("not found"));
        assert!(format!("{}", CalendarError::NotInitialized).contains("not initialized"));
    }

    #[test]
    fn api_errors_are_classified() {
        let auth = CalendarError::from(late_calendar::CalendarError::TokenExpired);
        assert!(matches!(auth, CalendarError::Auth(_)));

        let missing = CalendarError::from(late_calendar::CalendarError::CalendarNotFound("c".into()));
        assert!(matches!(missing, CalendarError::NotFound(id) if id == "c"));

        let limited = CalendarError::from(late_calendar::CalendarError::RateLimited(3));
        assert!(matches!(limited, CalendarError::RateLimited(3)));

        let other = CalendarError::from(late_calendar::CalendarError::ApiError("boom".into()));
        assert!(matches!(other, CalendarError::Network(_)));
    }

    #[test]
    fn fetch_against_unreachable_host_reports_error() {
        bridge::init_runtime().unwrap();
        let (tx, rx) = mpsc::channel();
        let endpoints = GoogleEndpoints {
            calendar_api_url: "http://127.0.0.1:9".into(),
            gmail_api_url: "http://127.0.0.1:9".into(),
        };

        request_fetch_next_event(&tx, endpoints, TokenSource::Stored("t".into()), "primary".into(), 5);

        let msg = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(
            msg,
            CalendarServiceMessage::FetchNextEventDone(Err(CalendarError::Network(_)))
        ));
    }
}
