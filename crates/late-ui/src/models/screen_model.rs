//! Full-screen model: calendar picker, next-event detail view, and the
//! "send late notice" action.
//!
//! This surface owns writes to the calendar selection. Every change of
//! selection triggers a refetch. Uses the shared runtime and channel pattern
//! (no block_on); call `poll_channel` from the surface loop.

use std::sync::{mpsc, Arc};

use chrono::Local;
use late_calendar::{Calendar, Event};
use late_core::{App, AppError, AuthError, Preferences, RefreshState, RECONFIGURE};
use late_gmail::SendState;

use crate::services::{
    request_calendar_fetch_calendars, request_calendar_fetch_next_event,
    request_gmail_send_late_notice, CalendarServiceMessage, GmailServiceMessage, GoogleEndpoints,
    TokenRenewer, TokenSource,
};

pub struct ScreenModel {
    app: App,
    endpoints: GoogleEndpoints,
    renewer: Option<Arc<TokenRenewer>>,
    calendar_tx: mpsc::Sender<CalendarServiceMessage>,
    calendar_rx: mpsc::Receiver<CalendarServiceMessage>,
    gmail_tx: mpsc::Sender<GmailServiceMessage>,
    gmail_rx: mpsc::Receiver<GmailServiceMessage>,
    state: RefreshState<Event>,
    calendars: Vec<Calendar>,
    loading_calendars: bool,
    send_state: SendState,
    error_message: Option<String>,
}

impl ScreenModel {
    pub fn new(app: App) -> Self {
        let endpoints = GoogleEndpoints::from_config(app.config());
        let renewer = TokenRenewer::from_app(&app).map(Arc::new);
        let (calendar_tx, calendar_rx) = mpsc::channel();
        let (gmail_tx, gmail_rx) = mpsc::channel();

        Self {
            app,
            endpoints,
            renewer,
            calendar_tx,
            calendar_rx,
            gmail_tx,
            gmail_rx,
            state: RefreshState::default(),
            calendars: Vec::new(),
            loading_calendars: false,
            send_state: SendState::Idle,
            error_message: None,
        }
    }

    pub fn state(&self) -> &RefreshState<Event> {
        &self.state
    }

    pub fn next_event(&self) -> Option<&Event> {
        self.state.current()
    }

    pub fn calendars(&self) -> &[Calendar] {
        &self.calendars
    }

    pub fn send_state(&self) -> SendState {
        self.send_state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn selected_calendar_id(&self) -> Option<String> {
        self.app.prefs().load_or_default().calendar_id
    }

    /// Work is still in flight.
    pub fn is_busy(&self) -> bool {
        self.state.is_fetching() || self.loading_calendars || self.send_state == SendState::Sending
    }

    fn token_source(&self, prefs: &Preferences) -> Option<TokenSource> {
        let token = prefs.token.clone()?;
        Some(match &self.renewer {
            Some(renewer) => TokenSource::Renewing {
                renewer: renewer.clone(),
                fallback: token,
            },
            None => TokenSource::Stored(token),
        })
    }

    /// Refetch the next event of the selected calendar.
    pub fn refresh(&mut self) {
        let prefs = self.app.prefs().load_or_default();
        if !prefs.can_fetch() {
            tracing::info!("Token or calendar not set, skipping fetch");
            self.state.on_missing_config();
            return;
        }
        let (Some(token), Some(calendar_id)) = (self.token_source(&prefs), prefs.calendar_id) else {
            return;
        };

        self.state.begin_fetch();
        self.error_message = None;
        request_calendar_fetch_next_event(
            &self.calendar_tx,
            self.endpoints.clone(),
            token,
            calendar_id,
            self.app.config().calendar.max_results,
        );
    }

    /// Fetch the calendar list for the picker.
    pub fn load_calendars(&mut self) {
        let prefs = self.app.prefs().load_or_default();
        let token = match self.token_source(&prefs) {
            Some(t) => t,
            None => {
                self.error_message = Some(AuthError::NotSignedIn.user_message().to_string());
                return;
            }
        };

        self.loading_calendars = true;
        request_calendar_fetch_calendars(&self.calendar_tx, self.endpoints.clone(), token);
    }

    /// Persist a new calendar selection and refetch.
    pub fn select_calendar(&mut self, calendar_id: &str) -> Result<(), AppError> {
        self.app.prefs().set_calendar_id(Some(calendar_id))?;
        tracing::info!("Selected calendar {}", calendar_id);
        self.refresh();
        Ok(())
    }

    /// Notify the attendees of the current next event.
    pub fn send_late_notice(&mut self) {
        if self.send_state == SendState::Sending {
            tracing::warn!("send_late_notice: send already in progress");
            return;
        }

        let prefs = self.app.prefs().load_or_default();
        let (token, sender) = match (self.token_source(&prefs), prefs.email) {
            (Some(token), Some(sender)) => (token, sender),
            _ => {
                self.state.on_missing_config();
                return;
            }
        };

        let event = match self.state.current() {
            Some(event) => event.clone(),
            None => {
                tracing::warn!("send_late_notice: no upcoming event");
                self.send_state = SendState::Failed;
                return;
            }
        };

        self.send_state = SendState::Sending;
        request_gmail_send_late_notice(&self.gmail_tx, self.endpoints.clone(), token, event, sender);
    }

    /// Back to `Idle` after the outcome of a send has been shown.
    pub fn reset_send(&mut self) {
        self.send_state = SendState::Idle;
    }

    /// Drain pending results. Returns true if anything changed.
    pub fn poll_channel(&mut self) -> bool {
        let mut changed = false;
        while let Ok(msg) = self.calendar_rx.try_recv() {
            self.handle_calendar_message(msg);
            changed = true;
        }
        while let Ok(msg) = self.gmail_rx.try_recv() {
            self.handle_gmail_message(msg);
            changed = true;
        }
        changed
    }

    pub fn handle_calendar_message(&mut self, msg: CalendarServiceMessage) {
        match msg {
            CalendarServiceMessage::FetchNextEventDone(result) => match result {
                Ok(next) => {
                    self.state.on_fetch_ok(next);
                    self.error_message = None;
                }
                Err(e) => {
                    self.state.on_fetch_err();
                    self.error_message = Some(AppError::from(e).user_message().to_string());
                }
            },
            CalendarServiceMessage::FetchCalendarsDone(result) => {
                self.loading_calendars = false;
                match result {
                    Ok(calendars) => {
                        self.calendars = calendars;
                        self.error_message = None;
                    }
                    Err(e) => {
                        self.error_message = Some(AppError::from(e).user_message().to_string());
                    }
                }
            }
        }
    }

    pub fn handle_gmail_message(&mut self, msg: GmailServiceMessage) {
        match msg {
            GmailServiceMessage::SendDone(Ok(())) => {
                self.send_state = SendState::Sent;
                self.error_message = None;
            }
            GmailServiceMessage::SendDone(Err(e)) => {
                self.send_state = SendState::Failed;
                self.error_message = Some(AppError::from(e).user_message().to_string());
            }
        }
    }

    /// Detail view of the next event.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        match &self.state {
            RefreshState::Uninitialized | RefreshState::Fetching => {
                lines.push("Loading...".to_string());
            }
            RefreshState::Stale => lines.push(RECONFIGURE.to_string()),
            RefreshState::Ready(None) => lines.push("No upcoming meetings".to_string()),
            RefreshState::Ready(Some(event)) => {
                lines.push(event.summary.clone());
                let starts = event.start.as_datetime().with_timezone(&Local);
                lines.push(format!("Starts at {}", starts.format("%a %b %-d, %H:%M")));
                if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
                    lines.push(String::new());
                    lines.push(description.to_string());
                }
                if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
                    lines.push(format!("Location: {}", location));
                }
                if let Some(link) = &event.html_link {
                    lines.push(format!("Open Calendar: {}", link));
                }
            }
        }

        if let Some(label) = self.send_state.label() {
            lines.push(String::new());
            lines.push(label.to_string());
        }

        lines.join("\n")
    }

    /// Calendar picker listing, the selected calendar marked with `*`.
    pub fn render_calendars(&self) -> String {
        let selected = self.selected_calendar_id();
        self.calendars
            .iter()
            .map(|cal| {
                let marker = if selected.as_deref() == Some(cal.id.as_str()) { "*" } else { " " };
                let primary = if cal.is_primary { " (primary)" } else { "" };
                format!("{} {}  {}{}", marker, cal.summary, cal.id, primary)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use crate::bridge;
    use crate::services::CalendarError;
    use chrono::{Duration, Utc};
    use late_calendar::{Attendee, EventTime, ResponseStatus};
    use late_core::Config;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app_in(dir: &std::path::Path, api: Option<&str>) -> App {
        let mut config = Config {
            config_dir: dir.to_path_buf(),
            ..Config::default()
        };
        if let Some(uri) = api {
            config.google.calendar_api_url = uri.to_string();
            config.google.gmail_api_url = uri.to_string();
        }
        App::with_config(config)
    }

    fn event(summary: &str) -> Event {
        let start = EventTime::DateTime(Utc::now() + Duration::minutes(45));
        Event {
            id: "ev".into(),
            calendar_id: "primary".into(),
            summary: summary.into(),
            description: Some("Agenda in doc".into()),
            location: Some("Room 1".into()),
            end: start.clone(),
            start,
            attendees: vec![Attendee::new("a@x", ResponseStatus::Accepted)],
            organizer: None,
            html_link: Some("https://calendar.google.com/event?eid=ev".into()),
        }
    }

    fn wait_until_idle(model: &mut ScreenModel) {
        for _ in 0..100 {
            model.poll_channel();
            if !model.is_busy() {
                return;
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }
        panic!("model stayed busy");
    }

    #[test]
    fn missing_prefs_go_stale_without_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ScreenModel::new(app_in(dir.path(), None));

        model.refresh();

        assert!(model.state().is_stale());
        assert!(!model.is_busy());
        assert_eq!(model.render(), RECONFIGURE);
    }

    #[test]
    fn fetch_error_goes_stale() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ScreenModel::new(app_in(dir.path(), None));

        model.handle_calendar_message(CalendarServiceMessage::FetchNextEventDone(Err(
            CalendarError::Auth("Token expired".into()),
        )));

        assert!(model.state().is_stale());
        assert_eq!(model.error_message(), Some(RECONFIGURE));
    }

    #[test]
    fn detail_view_shows_event() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ScreenModel::new(app_in(dir.path(), None));

        model.handle_calendar_message(CalendarServiceMessage::FetchNextEventDone(Ok(Some(
            event("Planning"),
        ))));
        let text = model.render();

        assert!(text.starts_with("Planning\nStarts at "));
        assert!(text.contains("Agenda in doc"));
        assert!(text.contains("Location: Room 1"));
        assert!(text.contains("Open Calendar: https://calendar.google.com/event?eid=ev"));
    }

    #[test]
    fn empty_calendar_shows_no_meetings() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = ScreenModel::new(app_in(dir.path(), None));

        model.handle_calendar_message(CalendarServiceMessage::FetchNextEventDone(Ok(None)));

        assert_eq!(model.render(), "No upcoming meetings");
    }

    #[test]
    fn send_without_event_fails() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path(), None);
        app.prefs().set_session("me@x", "tok").unwrap();
        let mut model = ScreenModel::new(app);

        model.send_late_notice();

        assert_eq!(model.send_state(), SendState::Failed);
        assert!(model.render().ends_with("Failed to send email."));
    }

    #[test]
    fn send_without_email_needs_reconfigure() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path(), None);
        app.prefs().set_token(Some("tok")).unwrap();
        let mut model = ScreenModel::new(app);
        model.handle_calendar_message(CalendarServiceMessage::FetchNextEventDone(Ok(Some(
            event("Planning"),
        ))));

        model.send_late_notice();

        assert!(model.state().is_stale());
        assert_eq!(model.send_state(), SendState::Idle);
    }

    #[test]
    fn calendar_picker_marks_selection() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path(), None);
        app.prefs().set_calendar_id(Some("work")).unwrap();
        let mut model = ScreenModel::new(app);

        model.handle_calendar_message(CalendarServiceMessage::FetchCalendarsDone(Ok(vec![
            Calendar {
                id: "me@x".into(),
                summary: "Me".into(),
                description: None,
                time_zone: None,
                is_primary: true,
            },
            Calendar {
                id: "work".into(),
                summary: "Work".into(),
                description: None,
                time_zone: None,
                is_primary: false,
            },
        ])));

        let listing = model.render_calendars();
        assert_eq!(listing, "  Me  me@x (primary)\n* Work  work");
    }

    #[test]
    fn select_calendar_persists_and_refetches() {
        let runtime = bridge::init_runtime().unwrap();
        let start = (Utc::now() + Duration::minutes(20)).to_rfc3339();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/calendars/work/events"))
                .and(query_param("singleEvents", "true"))
                .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "items": [{
                        "id": "w1",
                        "summary": "Budget",
                        "start": {"dateTime": start},
                        "end": {"dateTime": start}
                    }]
                })))
                .expect(1)
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path(), Some(&server.uri()));
        app.prefs().set_session("me@x", "tok").unwrap();
        let mut model = ScreenModel::new(app.clone());

        model.select_calendar("work").unwrap();
        assert!(model.state().is_fetching());
        wait_until_idle(&mut model);

        assert_eq!(app.prefs().load().unwrap().calendar_id.as_deref(), Some("work"));
        assert_eq!(model.next_event().unwrap().summary, "Budget");
    }

    #[test]
    fn gmail_failure_leaves_failed_state() {
        let runtime = bridge::init_runtime().unwrap();
        let server = runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/gmail/v1/users/me/messages/send"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;
            server
        });

        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path(), Some(&server.uri()));
        app.prefs().set_session("me@x", "tok").unwrap();
        let mut model = ScreenModel::new(app);
        model.handle_calendar_message(CalendarServiceMessage::FetchNextEventDone(Ok(Some(
            event("Planning"),
        ))));

        model.send_late_notice();
        assert_eq!(model.send_state(), SendState::Sending);
        wait_until_idle(&mut model);

        assert_eq!(model.send_state(), SendState::Failed);
        assert_eq!(model.error_message(), Some("Failed to send email."));
        assert!(model.next_event().is_some());
    }
}
