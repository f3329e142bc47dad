//! Gmail API client.

use tracing::instrument;

use crate::error::GmailError;
use crate::types::{SendRequest, SentMessage};

pub struct GmailClient {
    client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GmailClient {
    pub fn with_base_url(access_token: &str, base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            access_token: access_token.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// Send an already encoded message (base64url RFC 2822) as the
    /// signed-in user.
    #[instrument(skip(self, raw), level = "info")]
    pub async fn send_raw(&self, raw: &str) -> Result<SentMessage, GmailError> {
        let url = format!("{}/gmail/v1/users/me/messages/send", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.auth_header())
            .json(&SendRequest { raw })
            .send()
            .await?;

        let sent: SentMessage = self.handle_response(response).await?;
        tracing::info!("Sent message {}", sent.id);
        Ok(sent)
    }

    /// Helper to handle API responses and errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, GmailError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| GmailError::ApiError(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(GmailError::TokenExpired)
        } else if status.as_u16() == 403 {
            Err(GmailError::AuthRequired)
        } else if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            Err(GmailError::RateLimited(retry_after))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(GmailError::SendFailed(format!("{}: {}", status, text)))
        }
    }
}
