//! The running-late notice: who gets it, what it says, and sending it.

use base64::Engine;
use late_calendar::{Attendee, Event, ResponseStatus};

use crate::client::GmailClient;
use crate::error::GmailError;
use crate::types::SentMessage;

const SUBJECT_PREFIX: &str = "Running Late to meeting - ";

const BODY: &str = "I hope this email finds you well. I wanted to inform you that I will be \
running a bit late for our upcoming meeting. I apologize for any inconvenience this may cause.";

/// Progress of one user-triggered send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendState {
    #[default]
    Idle,
    Sending,
    Sent,
    Failed,
}

impl SendState {
    /// Status line shown while the state is active. `Idle` has none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            SendState::Idle => None,
            SendState::Sending => Some("Sending Email..."),
            SendState::Sent => Some("Successfully sent email!"),
            SendState::Failed => Some("Failed to send email."),
        }
    }
}

/// Addresses to notify: every attendee that has not declined, minus the
/// sender. Input order is kept. The sender match is exact.
pub fn recipients(attendees: &[Attendee], sender: &str) -> Vec<String> {
    attendees
        .iter()
        .filter(|a| a.response_status != ResponseStatus::Declined)
        .filter(|a| a.email != sender)
        .map(|a| a.email.clone())
        .collect()
}

/// A composed late notice, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LateNotice {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl LateNotice {
    pub fn for_event(event: &Event, sender: &str) -> Self {
        Self {
            from: sender.to_string(),
            to: recipients(&event.attendees, sender),
            subject: format!("{}{}", SUBJECT_PREFIX, event.summary),
            body: BODY.to_string(),
        }
    }

    /// RFC 2822 text with CRLF line endings.
    pub fn to_mime(&self) -> String {
        format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            self.from,
            self.to.join(", "),
            encode_header(&self.subject),
            self.body,
        )
    }

    /// Base64url without padding, as the `raw` field of `messages.send` takes it.
    pub fn to_raw(&self) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(self.to_mime().as_bytes())
    }
}

// Meeting titles are free text; non-ASCII needs an RFC 2047 encoded-word.
fn encode_header(value: &str) -> String {
    if value.is_ascii() {
        value.to_string()
    } else {
        format!(
            "=?UTF-8?B?{}?=",
            base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
        )
    }
}

/// Compose and send the notice for `event`.
pub async fn deliver(
    client: &GmailClient,
    event: &Event,
    sender: &str,
) -> Result<SentMessage, GmailError> {
    let notice = LateNotice::for_event(event, sender);
    if notice.to.is_empty() {
        return Err(GmailError::NoRecipients);
    }
    tracing::info!("Notifying {} attendee(s) of {}", notice.to.len(), event.id);
    client.send_raw(&notice.to_raw()).await
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use chrono::{TimeZone, Utc};
    use late_calendar::EventTime;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event(summary: &str, attendees: Vec<Attendee>) -> Event {
        let start = EventTime::DateTime(Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap());
        Event {
            id: "ev1".to_string(),
            calendar_id: "primary".to_string(),
            summary: summary.to_string(),
            description: None,
            location: None,
            end: start.clone(),
            start,
            attendees,
            organizer: None,
            html_link: None,
        }
    }

    fn attendees() -> Vec<Attendee> {
        vec![
            Attendee::new("a@x", ResponseStatus::Accepted),
            Attendee::new("sender@x", ResponseStatus::Accepted),
            Attendee::new("b@x", ResponseStatus::Declined),
        ]
    }

    #[test]
    fn recipients_skip_declined_and_sender() {
        assert_eq!(recipients(&attendees(), "sender@x"), vec!["a@x".to_string()]);
    }

    #[test]
    fn recipients_keep_order_and_pending_answers() {
        let list = vec![
            Attendee::new("c@x", ResponseStatus::NeedsAction),
            Attendee::new("a@x", ResponseStatus::Tentative),
        ];
        assert_eq!(recipients(&list, "me@x"), vec!["c@x", "a@x"]);
    }

    #[test]
    fn sender_match_is_case_sensitive() {
        let list = vec![Attendee::new("Sender@x", ResponseStatus::Accepted)];
        assert_eq!(recipients(&list, "sender@x"), vec!["Sender@x"]);
    }

    #[test]
    fn notice_subject_and_body() {
        let notice = LateNotice::for_event(&event("Standup", attendees()), "sender@x");
        assert_eq!(notice.subject, "Running Late to meeting - Standup");
        assert!(notice.body.starts_with("I hope this email finds you well."));
        assert_eq!(notice.to, vec!["a@x"]);
    }

    #[test]
    fn mime_headers_use_crlf() {
        let mut notice = LateNotice::for_event(&event("Review", attendees()), "sender@x");
        notice.to.push("c@x".to_string());
        let mime = notice.to_mime();

        assert!(mime.starts_with("From: sender@x\r\nTo: a@x, c@x\r\n"));
        assert!(mime.contains("Subject: Running Late to meeting - Review\r\n"));
        assert!(mime.contains("Content-Type: text/plain; charset=utf-8\r\n\r\nI hope"));
    }

    #[test]
    fn non_ascii_subject_is_encoded_word() {
        let notice = LateNotice::for_event(&event("Kahvi ☕", attendees()), "sender@x");
        let mime = notice.to_mime();
        assert!(mime.contains("Subject: =?UTF-8?B?"));

        let raw = notice.to_raw();
        assert!(!raw.contains('='));
        assert!(!raw.contains('+'));
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(raw).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), mime);
    }

    #[tokio::test]
    async fn successful_send_returns_message_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/gmail/v1/users/me/messages/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = GmailClient::with_base_url("token", &server.uri());
        let sent = deliver(&client, &event("Sync", attendees()), "sender@x").await.unwrap();
        assert_eq!(sent.id, "m1");
    }

    #[tokio::test]
    async fn server_error_is_send_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = GmailClient::with_base_url("token", &server.uri());
        let err = deliver(&client, &event("Sync", attendees()), "sender@x").await.unwrap_err();
        assert!(matches!(err, GmailError::SendFailed(_)));
        assert!(!err.should_refresh_token());
    }

    #[tokio::test]
    async fn no_recipients_fails_without_calling_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m1"})))
            .expect(0)
            .mount(&server)
            .await;

        let client = GmailClient::with_base_url("token", &server.uri());
        let solo = event("Focus", vec![Attendee::new("sender@x", ResponseStatus::Accepted)]);

        let err = deliver(&client, &solo, "sender@x").await.unwrap_err();
        assert!(matches!(err, GmailError::NoRecipients));
    }

    #[test]
    fn send_state_labels() {
        assert_eq!(SendState::Idle.label(), None);
        assert_eq!(SendState::Sending.label(), Some("Sending Email..."));
        assert_eq!(SendState::Sent.label(), Some("Successfully sent email!"));
        assert_eq!(SendState::Failed.label(), Some("Failed to send email."));
    }
}
