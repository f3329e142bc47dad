pub mod auth_service;
pub mod calendar_service;
pub mod gmail_service;
pub mod google_common;

pub use auth_service::{request_authenticate as request_auth, AuthError, AuthServiceMessage};
pub use calendar_service::{
    request_fetch_calendars as request_calendar_fetch_calendars,
    request_fetch_next_event as request_calendar_fetch_next_event, CalendarError,
    CalendarServiceMessage,
};
pub use gmail_service::{
    request_send_late_notice as request_gmail_send_late_notice, GmailError, GmailServiceMessage,
};
pub use google_common::{GoogleEndpoints, TokenRenewer, TokenSource};
