//! Gmail-specific error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GmailError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("No recipients")]
    NoRecipients,

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl GmailError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired | Self::TokenExpired => {
                "Calendar or token expired. Please reconfigure.".to_string()
            }
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::NoRecipients => "No one to notify for this meeting.".to_string(),
            Self::SendFailed(_) | Self::ApiError(_) => "Failed to send email.".to_string(),
            Self::NetworkError(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether this error should trigger a token refresh.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::AuthRequired)
    }
}
