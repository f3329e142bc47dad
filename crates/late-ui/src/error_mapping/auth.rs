use crate::services::auth_service::AuthError as UiAuthError;
use late_core::{AppError, AuthError, ConfigError};

impl From<UiAuthError> for AppError {
    fn from(e: UiAuthError) -> Self {
        match e {
            UiAuthError::NoPort => AppError::Auth(AuthError::NoCallbackPort),
            UiAuthError::OAuth(s) => AppError::Auth(AuthError::OAuthFailed(s)),
            UiAuthError::NotConfigured => AppError::Config(ConfigError::MissingSetting(
                "Google OAuth (client_id, client_secret)".into(),
            )),
            UiAuthError::NotInitialized => {
                AppError::Other(anyhow::anyhow!("Auth service not initialized"))
            }
        }
    }
}
