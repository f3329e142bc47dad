//! Widget model: a glanceable status line for the next meeting with a
//! one-press "send late notice" action.
//!
//! The widget only reads the preference store. It refetches every
//! `widget.poll_seconds`, and after a send holds the outcome for
//! `widget.send_feedback_seconds` before resetting and refetching.

use std::sync::mpsc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use late_calendar::{minutes_until, Event};
use late_core::{App, PreferenceStore, Preferences, RefreshState, WidgetConfig, RECONFIGURE};
use late_gmail::SendState;

use crate::services::{
    request_calendar_fetch_next_event, request_gmail_send_late_notice, CalendarServiceMessage,
    GmailServiceMessage, GoogleEndpoints, TokenSource,
};

/// How close the next meeting is, as the widget presents it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    /// First fetch still in flight.
    Loading,
    /// Session or calendar missing or rejected.
    Reconfigure,
    /// No upcoming meeting.
    Idle,
    Upcoming,
    /// Starts within `widget.urgent_minutes`.
    Imminent,
}

pub struct WidgetModel {
    prefs: PreferenceStore,
    config: WidgetConfig,
    max_results: u32,
    endpoints: GoogleEndpoints,
    calendar_tx: mpsc::Sender<CalendarServiceMessage>,
    calendar_rx: mpsc::Receiver<CalendarServiceMessage>,
    gmail_tx: mpsc::Sender<GmailServiceMessage>,
    gmail_rx: mpsc::Receiver<GmailServiceMessage>,
    state: RefreshState<Event>,
    session: Preferences,
    send_state: SendState,
    feedback_since: Option<Instant>,
    last_fetch: Option<Instant>,
}

impl WidgetModel {
    pub fn new(app: &App) -> Self {
        let (calendar_tx, calendar_rx) = mpsc::channel();
        let (gmail_tx, gmail_rx) = mpsc::channel();

        Self {
            prefs: app.prefs().clone(),
            config: app.config().widget.clone(),
            max_results: app.config().calendar.max_results,
            endpoints: GoogleEndpoints::from_config(app.config()),
            calendar_tx,
            calendar_rx,
            gmail_tx,
            gmail_rx,
            state: RefreshState::default(),
            session: Preferences::default(),
            send_state: SendState::Idle,
            feedback_since: None,
            last_fetch: None,
        }
    }

    pub fn state(&self) -> &RefreshState<Event> {
        &self.state
    }

    pub fn send_state(&self) -> SendState {
        self.send_state
    }

    /// Re-read the preferences and refetch the next event.
    pub fn refresh(&mut self, now: Instant) {
        self.session = self.prefs.load_or_default();
        self.last_fetch = Some(now);

        if !self.session.is_configured() {
            self.state.on_missing_config();
            return;
        }
        let (Some(token), Some(calendar_id)) =
            (self.session.token.clone(), self.session.calendar_id.clone())
        else {
            return;
        };

        self.state.begin_fetch();
        request_calendar_fetch_next_event(
            &self.calendar_tx,
            self.endpoints.clone(),
            TokenSource::Stored(token),
            calendar_id,
            self.max_results,
        );
    }

    /// Drive timers: end the send feedback hold, and poll when due.
    pub fn tick(&mut self, now: Instant) {
        if let Some(since) = self.feedback_since {
            if now.duration_since(since) >= Duration::from_secs(self.config.send_feedback_seconds) {
                self.feedback_since = None;
                self.send_state = SendState::Idle;
                self.refresh(now);
            }
            return;
        }

        if self.send_state == SendState::Sending {
            return;
        }

        let poll = Duration::from_secs(self.config.poll_seconds);
        let due = self
            .last_fetch
            .map_or(true, |last| now.duration_since(last) >= poll);
        if due {
            self.refresh(now);
        }
    }

    /// Whether the "Send email!" action is offered.
    pub fn can_send(&self) -> bool {
        self.send_state == SendState::Idle && self.state.current().is_some()
    }

    /// Send the late notice for the shown meeting. Returns false when the
    /// action is not available.
    pub fn send(&mut self) -> bool {
        if !self.can_send() {
            return false;
        }

        let (event, token, sender) = match (
            self.state.current(),
            &self.session.token,
            &self.session.email,
        ) {
            (Some(event), Some(token), Some(sender)) => (event.clone(), token.clone(), sender.clone()),
            _ => return false,
        };

        self.send_state = SendState::Sending;
        request_gmail_send_late_notice(
            &self.gmail_tx,
            self.endpoints.clone(),
            TokenSource::Stored(token),
            event,
            sender,
        );
        true
    }

    /// Drain pending results. Returns true if anything changed.
    pub fn poll_channel(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.calendar_rx.try_recv() {
            self.handle_calendar_message(msg);
            changed = true;
        }
        while let Ok(msg) = self.gmail_rx.try_recv() {
            self.handle_gmail_message(msg, now);
            changed = true;
        }
        changed
    }

    pub fn handle_calendar_message(&mut self, msg: CalendarServiceMessage) {
        match msg {
            CalendarServiceMessage::FetchNextEventDone(Ok(next)) => self.state.on_fetch_ok(next),
            CalendarServiceMessage::FetchNextEventDone(Err(e)) => {
                tracing::warn!("Widget fetch failed: {}", e);
                self.state.on_fetch_err();
            }
            CalendarServiceMessage::FetchCalendarsDone(_) => {}
        }
    }

    pub fn handle_gmail_message(&mut self, msg: GmailServiceMessage, now: Instant) {
        match msg {
            GmailServiceMessage::SendDone(result) => {
                self.send_state = match result {
                    Ok(()) => SendState::Sent,
                    Err(e) => {
                        tracing::warn!("Widget send failed: {}", e);
                        SendState::Failed
                    }
                };
                self.feedback_since = Some(now);
            }
        }
    }

    pub fn urgency(&self, now: DateTime<Utc>) -> Urgency {
        match &self.state {
            RefreshState::Uninitialized | RefreshState::Fetching => Urgency::Loading,
            RefreshState::Stale => Urgency::Reconfigure,
            RefreshState::Ready(None) => Urgency::Idle,
            RefreshState::Ready(Some(event)) => {
                let window = chrono::Duration::try_minutes(self.config.urgent_minutes);
                match (event.start.instant(), window) {
                    (Some(start), Some(window)) if start - now <= window => Urgency::Imminent,
                    _ => Urgency::Upcoming,
                }
            }
        }
    }

    /// Status line. Send feedback takes precedence over the meeting.
    pub fn label(&self, now: DateTime<Utc>) -> String {
        if let Some(feedback) = self.send_state.label() {
            return feedback.to_string();
        }

        match (self.urgency(now), self.state.current()) {
            (Urgency::Loading, _) => "Checking calendar...".to_string(),
            (Urgency::Reconfigure, _) => RECONFIGURE.to_string(),
            (Urgency::Imminent, Some(event)) => {
                let minutes = minutes_until(event, now).unwrap_or(0).max(0);
                format!("Meeting: {} in {} minute(s)!", event.summary, minutes)
            }
            (Urgency::Upcoming, Some(event)) => format!("Next meeting: {}", event.summary),
            _ => "No upcoming meetings".to_string(),
        }
    }
}
