//! Google Calendar access for Late.
//!
//! Provides the Calendar API client and next-event selection.

pub mod client;
pub mod error;
pub mod select;
pub mod types;

pub use client::CalendarClient;
pub use error::CalendarError;
pub use select::{minutes_until, next_event};
pub use types::{Attendee, Calendar, Event, EventTime, ResponseStatus};
