//! Google sign-in model.
//!
//! Runs the browser sign-in flow and records the session in the preference
//! store. Sign-out forgets the session but keeps the calendar selection.

use std::sync::{mpsc, Arc};

use late_auth::{GoogleOAuth2Provider, SecureStorage, GOOGLE_SERVICE};
use late_core::{App, AppError, AuthError as CoreAuthError};

use crate::services::{request_auth, AuthError, AuthServiceMessage};

/// Operation state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum OpState {
    #[default]
    Idle,
    Authenticating,
}

pub struct GoogleAuthModel {
    app: App,
    op_state: OpState,
    rx: Option<mpsc::Receiver<AuthServiceMessage>>,
    error_message: Option<String>,
    user_email: Option<String>,
}

impl GoogleAuthModel {
    pub fn new(app: App) -> Self {
        let user_email = app.prefs().load_or_default().email;
        Self {
            app,
            op_state: OpState::Idle,
            rx: None,
            error_message: None,
            user_email,
        }
    }

    fn storage(&self) -> SecureStorage {
        SecureStorage::new(self.app.config().tokens_dir())
    }

    pub fn loading(&self) -> bool {
        self.op_state == OpState::Authenticating
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    /// Signed in as far as the surfaces are concerned: an email and a token
    /// are persisted.
    pub fn is_authenticated(&self) -> bool {
        let prefs = self.app.prefs().load_or_default();
        prefs.email.is_some() && prefs.token.is_some()
    }

    /// Start the Google sign-in flow (non-blocking).
    pub fn authenticate(&mut self) {
        // Prevent concurrent operations
        if self.op_state != OpState::Idle {
            tracing::warn!("authenticate: operation already in progress");
            return;
        }

        let (client_id, client_secret) = match self.app.config().google.credentials() {
            Some(credentials) => credentials,
            None => {
                self.error_message = Some(AppError::from(AuthError::NotConfigured).user_message().to_string());
                return;
            }
        };

        let (tx, rx) = mpsc::channel();
        self.rx = Some(rx);
        self.error_message = None;
        self.op_state = OpState::Authenticating;

        tracing::info!("Starting Google OAuth authentication flow");
        let provider = Arc::new(GoogleOAuth2Provider::new(client_id, client_secret));
        request_auth(&tx, provider, self.storage());
    }

    /// Poll for the sign-in result. Returns true once the flow has finished.
    pub fn poll_channel(&mut self) -> bool {
        let msg = match self.rx.as_ref().map(|rx| rx.try_recv()) {
            Some(Ok(msg)) => msg,
            Some(Err(mpsc::TryRecvError::Empty)) | None => return false,
            Some(Err(mpsc::TryRecvError::Disconnected)) => {
                self.rx = None;
                self.op_state = OpState::Idle;
                self.error_message = Some("Failed to log in. Please try again.".to_string());
                return true;
            }
        };
        self.handle_message(msg);
        true
    }

    pub fn handle_message(&mut self, msg: AuthServiceMessage) {
        match msg {
            AuthServiceMessage::AuthenticateDone(result) => {
                self.op_state = OpState::Idle;
                self.rx = None;

                match result {
                    Ok(sign_in) => {
                        match self
                            .app
                            .prefs()
                            .set_session(&sign_in.email, &sign_in.token_set.access_token)
                        {
                            Ok(_) => {
                                tracing::info!("Signed in as {}", sign_in.email);
                                self.user_email = Some(sign_in.email);
                                self.error_message = None;
                            }
                            Err(e) => {
                                tracing::error!("Failed to persist session: {}", e);
                                self.error_message = Some(AppError::from(e).user_message().to_string());
                            }
                        }
                    }
                    Err(e) => {
                        self.error_message = Some(AppError::from(e).user_message().to_string());
                    }
                }
            }
        }
    }

    /// Forget the session and the stored token set.
    pub fn sign_out(&mut self) -> Result<(), AppError> {
        self.app.prefs().clear_session()?;

        self.storage()
            .delete_token(GOOGLE_SERVICE)
            .map_err(|e| CoreAuthError::StorageError(format!("{:#}", e)))?;

        self.user_email = None;
        self.error_message = None;
        tracing::info!("Signed out of Google");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use late_auth::{SignIn, TokenSet};
    use late_core::Config;

    fn app_in(dir: &std::path::Path) -> App {
        App::with_config(Config {
            config_dir: dir.to_path_buf(),
            ..Config::default()
        })
    }

    fn token_set() -> TokenSet {
        TokenSet {
            access_token: "ya29.token".into(),
            refresh_token: Some("1//refresh".into()),
            expires_at: chrono::Utc::now().timestamp() + 3600,
            scopes: vec![],
        }
    }

    #[test]
    fn unconfigured_credentials_do_not_start_flow() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = GoogleAuthModel::new(app_in(dir.path()));

        model.authenticate();

        assert!(!model.loading());
        assert!(model.error_message().unwrap().contains("[google]"));
        assert!(!model.poll_channel());
    }

    #[test]
    fn successful_sign_in_persists_session() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        let mut model = GoogleAuthModel::new(app.clone());

        model.handle_message(AuthServiceMessage::AuthenticateDone(Ok(SignIn {
            email: "me@example.com".into(),
            token_set: token_set(),
        })));

        let prefs = app.prefs().load().unwrap();
        assert_eq!(prefs.email.as_deref(), Some("me@example.com"));
        assert_eq!(prefs.token.as_deref(), Some("ya29.token"));
        assert!(model.is_authenticated());
        assert_eq!(model.user_email(), Some("me@example.com"));
    }

    #[test]
    fn failed_sign_in_shows_login_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut model = GoogleAuthModel::new(app_in(dir.path()));

        model.handle_message(AuthServiceMessage::AuthenticateDone(Err(AuthError::OAuth(
            "access_denied".into(),
        ))));

        assert_eq!(model.error_message(), Some("Failed to log in. Please try again."));
        assert!(!model.is_authenticated());
    }

    #[test]
    fn sign_out_keeps_calendar_selection() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        app.prefs().set_session("me@example.com", "tok").unwrap();
        app.prefs().set_calendar_id(Some("work")).unwrap();
        let storage = SecureStorage::new(app.config().tokens_dir());
        storage.store_token(GOOGLE_SERVICE, &token_set()).unwrap();

        let mut model = GoogleAuthModel::new(app.clone());
        model.sign_out().unwrap();

        let prefs = app.prefs().load().unwrap();
        assert!(prefs.email.is_none());
        assert!(prefs.token.is_none());
        assert_eq!(prefs.calendar_id.as_deref(), Some("work"));
        assert!(!storage.has_token(GOOGLE_SERVICE));
        assert!(model.user_email().is_none());
    }
}
