//! Gmail backend: sends the late notice off the caller's thread.

use late_calendar::Event;
use late_gmail::deliver;

use crate::bridge;
use crate::services::google_common::{GoogleEndpoints, TokenSource};

/// Error type for Gmail operations.
#[derive(Debug, Clone)]
pub enum GmailError {
    Send(String),
    Auth(String),
    NoRecipients,
    NotInitialized,
}

impl std::fmt::Display for GmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GmailError::Send(s) => write!(f, "Gmail error: {}", s),
            GmailError::Auth(s) => write!(f, "Gmail auth error: {}", s),
            GmailError::NoRecipients => write!(f, "No attendees to notify"),
            GmailError::NotInitialized => write!(f, "Gmail service not initialized"),
        }
    }
}

impl std::error::Error for GmailError {}

impl From<late_gmail::GmailError> for GmailError {
    fn from(e: late_gmail::GmailError) -> Self {
        match e {
            late_gmail::GmailError::NoRecipients => GmailError::NoRecipients,
            e if e.should_refresh_token() => GmailError::Auth(e.to_string()),
            e => GmailError::Send(e.to_string()),
        }
    }
}

/// Messages sent from async operations back to the surface thread.
#[derive(Debug)]
pub enum GmailServiceMessage {
    /// Outcome of a late-notice send.
    SendDone(Result<(), GmailError>),
}

/// Request to notify the attendees of `event` that `sender` is running late.
pub fn request_send_late_notice(
    tx: &std::sync::mpsc::Sender<GmailServiceMessage>,
    endpoints: GoogleEndpoints,
    token: TokenSource,
    event: Event,
    sender: String,
) {
    let tx = tx.clone();
    let runtime = match bridge::get_runtime() {
        Some(r) => r,
        None => {
            tracing::error!("Gmail service not initialized");
            let _ = tx.send(GmailServiceMessage::SendDone(Err(GmailError::NotInitialized)));
            return;
        }
    };

    runtime.spawn(async move {
        let access_token = token.resolve().await;
        let client = endpoints.gmail_client(&access_token);

        let result = match deliver(&client, &event, &sender).await {
            Ok(sent) => {
                tracing::info!("Late notice for {} sent as {}", event.id, sent.id);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Failed to send late notice for {}: {}", event.id, e);
                if e.should_refresh_token() {
                    token.on_rejected();
                }
                Err(GmailError::from(e))
            }
        };

        let _ = tx.send(GmailServiceMessage::SendDone(result));
    });
}
