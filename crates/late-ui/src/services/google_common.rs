//! Shared helpers for the Google services (Calendar, Gmail): API endpoints
//! and where the access token comes from.

use std::sync::Arc;

use late_auth::{fresh_token, mark_expired, GoogleOAuth2Provider, SecureStorage};
use late_calendar::CalendarClient;
use late_core::{App, Config, PreferenceStore};
use late_gmail::GmailClient;

/// Base URLs for the Google APIs, taken from config so tests can point them
/// at a mock server.
#[derive(Debug, Clone)]
pub struct GoogleEndpoints {
    pub calendar_api_url: String,
    pub gmail_api_url: String,
}

impl GoogleEndpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            calendar_api_url: config.google.calendar_api_url.clone(),
            gmail_api_url: config.google.gmail_api_url.clone(),
        }
    }

    pub fn calendar_client(&self, access_token: &str) -> CalendarClient {
        CalendarClient::with_base_url(access_token, &self.calendar_api_url)
    }

    pub fn gmail_client(&self, access_token: &str) -> GmailClient {
        GmailClient::with_base_url(access_token, &self.gmail_api_url)
    }
}

/// Renews the access token from the stored token set and keeps the
/// preference store in step with it.
pub struct TokenRenewer {
    provider: GoogleOAuth2Provider,
    storage: SecureStorage,
    prefs: PreferenceStore,
}

impl TokenRenewer {
    pub fn new(provider: GoogleOAuth2Provider, storage: SecureStorage, prefs: PreferenceStore) -> Self {
        Self {
            provider,
            storage,
            prefs,
        }
    }

    /// `None` when Google OAuth credentials are not configured.
    pub fn from_app(app: &App) -> Option<Self> {
        let (client_id, client_secret) = app.config().google.credentials()?;
        Some(Self::new(
            GoogleOAuth2Provider::new(client_id, client_secret),
            SecureStorage::new(app.config().tokens_dir()),
            app.prefs().clone(),
        ))
    }

    async fn access_token(&self) -> anyhow::Result<String> {
        let token_set = fresh_token(&self.provider, &self.storage).await?;

        let prefs = self.prefs.load_or_default();
        if prefs.token.as_deref() != Some(token_set.access_token.as_str()) {
            self.prefs.set_token(Some(token_set.access_token.as_str()))?;
            tracing::info!("Stored renewed access token");
        }
        Ok(token_set.access_token)
    }

    fn invalidate(&self) {
        if let Err(e) = mark_expired(&self.storage) {
            tracing::warn!("Could not mark token expired: {}", e);
        }
    }
}

/// Where a request gets its bearer token.
#[derive(Clone)]
pub enum TokenSource {
    /// The persisted token, used as is.
    Stored(String),
    /// Renew through the stored token set when close to expiry. Falls back
    /// to the persisted token when renewal is not possible.
    Renewing {
        renewer: Arc<TokenRenewer>,
        fallback: String,
    },
}

impl TokenSource {
    pub async fn resolve(&self) -> String {
        match self {
            TokenSource::Stored(token) => token.clone(),
            TokenSource::Renewing { renewer, fallback } => match renewer.access_token().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("Token renewal unavailable, using stored token: {:#}", e);
                    fallback.clone()
                }
            },
        }
    }

    /// The API rejected the token: make the next resolve renew it.
    pub fn on_rejected(&self) {
        if let TokenSource::Renewing { renewer, .. } = self {
            renewer.invalidate();
        }
    }
}

impl std::fmt::Debug for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::Stored(_) => write!(f, "TokenSource::Stored"),
            TokenSource::Renewing { .. } => write!(f, "TokenSource::Renewing"),
        }
    }
}
