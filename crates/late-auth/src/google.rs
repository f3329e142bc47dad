//! Google OAuth2 provider for Gmail send and Calendar read access.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::storage::TokenSet;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Send the late notice to the attendees.
pub const GMAIL_SEND_SCOPE: &str = "https://www.googleapis.com/auth/gmail.send";
/// List every calendar to pick one from.
pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
/// Read events and their attendees.
pub const CALENDAR_EVENTS_READONLY_SCOPE: &str =
    "https://www.googleapis.com/auth/calendar.events.readonly";
/// Learn the signed-in address, used as the notice sender.
pub const USERINFO_SCOPE: &str = "https://www.googleapis.com/auth/userinfo.email";

pub const REQUESTED_SCOPES: [&str; 4] = [
    GMAIL_SEND_SCOPE,
    CALENDAR_SCOPE,
    CALENDAR_EVENTS_READONLY_SCOPE,
    USERINFO_SCOPE,
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
}

impl GoogleTokenResponse {
    /// Convert to a storable token set. A refresh response usually omits the
    /// refresh token, so the previous one is carried over.
    pub fn into_token_set(self, previous_refresh: Option<String>) -> TokenSet {
        let expires_at = chrono::Utc::now().timestamp() + self.expires_in as i64;
        TokenSet {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at,
            scopes: self.scope.split_whitespace().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleUserInfo {
    pub email: String,
}

pub struct GoogleOAuth2Provider {
    pub client_id: String,
    pub client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
    http: reqwest::Client,
}

impl GoogleOAuth2Provider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            auth_url: GOOGLE_AUTH_URL.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            userinfo_url: GOOGLE_USERINFO_URL.to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Point token and userinfo calls at another host (used against mock servers).
    pub fn with_endpoints(mut self, token_url: &str, userinfo_url: &str) -> Self {
        self.token_url = token_url.to_string();
        self.userinfo_url = userinfo_url.to_string();
        self
    }

    fn redirect_uri(port: u16) -> String {
        format!("http://localhost:{}/callback", port)
    }

    /// Generate authorization URL for OAuth flow.
    /// Returns (url, state) where state should be verified on callback.
    pub fn authorization_url(&self, port: u16) -> (String, String) {
        let state = uuid::Uuid::new_v4().to_string();
        let redirect_uri = Self::redirect_uri(port);
        let scopes = REQUESTED_SCOPES.join(" ");

        let url = format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&prompt=consent",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&redirect_uri),
            urlencoding::encode(&scopes),
            urlencoding::encode(&state),
        );

        (url, state)
    }

    /// Exchange authorization code for tokens.
    #[tracing::instrument(skip(self, code), level = "info")]
    pub async fn exchange_code(&self, code: &str, port: u16) -> Result<GoogleTokenResponse> {
        let redirect_uri = Self::redirect_uri(port);

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", &redirect_uri),
            ])
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token exchange failed: {}", error_text);
        }

        response.json::<GoogleTokenResponse>().await.context("Failed to parse token response")
    }

    /// Refresh an expired access token.
    #[tracing::instrument(skip(self, refresh_token), level = "info")]
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<GoogleTokenResponse> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .context("Failed to send refresh request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token refresh failed: {}", error_text);
        }

        response.json::<GoogleTokenResponse>().await.context("Failed to parse refresh response")
    }

    /// Get user info (email) from access token.
    #[tracing::instrument(skip(self, access_token), level = "info")]
    pub async fn get_user_info(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .context("Failed to fetch user info")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("User info request failed: {}", error_text);
        }

        response.json::<GoogleUserInfo>().await.context("Failed to parse user info")
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider() -> GoogleOAuth2Provider {
        GoogleOAuth2Provider::new("test_client_id".to_string(), "test_client_secret".to_string())
    }

    #[test]
    fn test_auth_url_requests_send_and_calendar_scopes() {
        let (url, _state) = provider().authorization_url(8080);
        assert!(url.contains(&*urlencoding::encode(GMAIL_SEND_SCOPE)));
        assert!(url.contains(&*urlencoding::encode(CALENDAR_EVENTS_READONLY_SCOPE)));
        assert!(url.contains(&*urlencoding::encode("http://localhost:8080/callback")));
    }

    #[test]
    fn test_auth_url_contains_offline_access() {
        let (url, _state) = provider().authorization_url(8080);
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("prompt=consent"));
    }

    #[test]
    fn test_state_is_unique() {
        let p = provider();
        let (_, state1) = p.authorization_url(8080);
        let (_, state2) = p.authorization_url(8080);
        assert_ne!(state1, state2);
    }

    #[test]
    fn test_refresh_response_keeps_previous_refresh_token() {
        let response = GoogleTokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: 3600,
            token_type: "Bearer".to_string(),
            scope: format!("{} {}", GMAIL_SEND_SCOPE, CALENDAR_SCOPE),
        };

        let set = response.into_token_set(Some("old_refresh".to_string()));
        assert_eq!(set.access_token, "new");
        assert_eq!(set.refresh_token.as_deref(), Some("old_refresh"));
        assert_eq!(set.scopes.len(), 2);
        assert!(!set.needs_refresh());
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.token",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "token_type": "Bearer",
                "scope": GMAIL_SEND_SCOPE
            })))
            .mount(&mock_server)
            .await;

        let p = provider().with_endpoints(
            &format!("{}/token", mock_server.uri()),
            &format!("{}/userinfo", mock_server.uri()),
        );
        let tokens = p.exchange_code("abc", 8080).await.unwrap();

        assert_eq!(tokens.access_token, "ya29.token");
        assert_eq!(tokens.refresh_token.as_deref(), Some("1//refresh"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&mock_server)
            .await;

        let p = provider().with_endpoints(
            &format!("{}/token", mock_server.uri()),
            &format!("{}/userinfo", mock_server.uri()),
        );
        let err = p.refresh_token("revoked").await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    #[tokio::test]
    async fn test_get_user_info_uses_bearer() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/userinfo"))
            .and(header("Authorization", "Bearer ya29.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "me@example.com",
                "verified_email": true
            })))
            .mount(&mock_server)
            .await;

        let p = provider().with_endpoints(
            &format!("{}/token", mock_server.uri()),
            &format!("{}/userinfo", mock_server.uri()),
        );
        let info = p.get_user_info("ya29.token").await.unwrap();
        assert_eq!(info.email, "me@example.com");
    }
}
