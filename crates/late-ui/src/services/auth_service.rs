//! Auth backend: async Google OAuth sign-in.
//! OAuth flow runs off the caller's thread; results sent via mpsc.

use std::sync::Arc;

use late_auth::{authenticate, GoogleOAuth2Provider, NoCallbackPort, SecureStorage, SignIn};

use crate::bridge;

/// Error type for auth operations
#[derive(Debug, Clone)]
pub enum AuthError {
    OAuth(String),
    NoPort,
    NotConfigured,
    NotInitialized,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::OAuth(s) => write!(f, "Authentication failed: {}", s),
            AuthError::NoPort => write!(f, "No free port for the OAuth callback"),
            AuthError::NotConfigured => {
                write!(f, "Google OAuth not configured in config.toml")
            }
            AuthError::NotInitialized => write!(f, "Auth service not initialized"),
        }
    }
}

impl std::error::Error for AuthError {}

impl From<anyhow::Error> for AuthError {
    fn from(e: anyhow::Error) -> Self {
        if e.downcast_ref::<NoCallbackPort>().is_some() {
            AuthError::NoPort
        } else {
            AuthError::OAuth(format!("{:#}", e))
        }
    }
}

/// Messages sent from async operations back to the surface thread
#[derive(Debug)]
pub enum AuthServiceMessage {
    /// Result of the Google sign-in flow
    AuthenticateDone(Result<SignIn, AuthError>),
}

/// Request to start Google sign-in asynchronously.
/// Sends `AuthenticateDone` on the channel when complete.
pub fn request_authenticate(
    tx: &std::sync::mpsc::Sender<AuthServiceMessage>,
    provider: Arc<GoogleOAuth2Provider>,
    storage: SecureStorage,
) {
    let tx = tx.clone();
    let runtime = match bridge::get_runtime() {
        Some(r) => r,
        None => {
            let _ = tx.send(AuthServiceMessage::AuthenticateDone(Err(
                AuthError::NotInitialized,
            )));
            return;
        }
    };

    runtime.spawn(async move {
        let result = authenticate(&provider, &storage).await.map_err(|e| {
            tracing::error!("Google sign-in failed: {:#}", e);
            AuthError::from(e)
        });
        let _ = tx.send(AuthServiceMessage::AuthenticateDone(result));
    });
}
