use crate::services::gmail_service::GmailError;
use late_core::AppError;

impl From<GmailError> for AppError {
    fn from(e: GmailError) -> Self {
        match e {
            GmailError::Send(s) | GmailError::Auth(s) => AppError::Email(s),
            GmailError::NoRecipients => AppError::Email("no attendees to notify".into()),
            GmailError::NotInitialized => {
                AppError::Other(anyhow::anyhow!("Gmail service not initialized"))
            }
        }
    }
}
