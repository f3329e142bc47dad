//! Centralized error types for Late.
//!
//! Every failure is caught at the boundary where it occurs and mapped into
//! [`AppError`]; `user_message()` gives the status line a surface displays.

use thiserror::Error;

/// Status shown when the session or calendar selection is missing or rejected.
pub const RECONFIGURE: &str = "Calendar or token expired. Please reconfigure.";

/// Top-level application error type.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Preference store error: {0}")]
    Prefs(#[from] PrefsError),

    #[error("Calendar error: {0}")]
    Calendar(String),

    #[error("Email error: {0}")]
    Email(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Returns a user-friendly message suitable for a status line.
    pub fn user_message(&self) -> &'static str {
        match self {
            AppError::Network(e) => e.user_message(),
            AppError::Config(e) => e.user_message(),
            AppError::Auth(e) => e.user_message(),
            AppError::Prefs(e) => e.user_message(),
            AppError::Calendar(_) => RECONFIGURE,
            AppError::Email(_) => "Failed to send email.",
            AppError::Other(_) => "An unexpected error occurred. Please try again.",
        }
    }
}

/// Network-related errors (HTTP, connectivity).
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl NetworkError {
    pub fn user_message(&self) -> &'static str {
        match self {
            NetworkError::ConnectionFailed(_) => {
                "Unable to connect. Check your internet connection."
            }
            NetworkError::RateLimited(_) => "Too many requests. Please wait and try again.",
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingSetting(String),
}

impl ConfigError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ConfigError::MissingSetting(_) => {
                "Google OAuth is not configured. Add a [google] section to config.toml."
            }
        }
    }
}

/// Authentication errors (OAuth, tokens, credentials).
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not signed in")]
    NotSignedIn,

    #[error("OAuth flow failed: {0}")]
    OAuthFailed(String),

    #[error("Token storage error: {0}")]
    StorageError(String),

    #[error("No free port for OAuth callback")]
    NoCallbackPort,
}

impl AuthError {
    pub fn user_message(&self) -> &'static str {
        match self {
            AuthError::NotSignedIn => "Not signed in. Run `late sign-in` first.",
            AuthError::OAuthFailed(_) => "Failed to log in. Please try again.",
            AuthError::StorageError(_) => "Failed to save credentials. Please try again.",
            AuthError::NoCallbackPort => {
                "Sign-in ports 8080-8089 are busy. Close other apps and try again."
            }
        }
    }
}

/// Preference store errors.
#[derive(Debug, Error)]
pub enum PrefsError {
    #[error("Failed to read preferences: {0}")]
    Read(#[source] std::io::Error),

    #[error("Failed to write preferences: {0}")]
    Write(#[source] std::io::Error),

    #[error("Preferences file is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

impl PrefsError {
    pub fn user_message(&self) -> &'static str {
        match self {
            PrefsError::Read(_) | PrefsError::Malformed(_) => {
                "Saved settings could not be read. Please reconfigure."
            }
            PrefsError::Write(_) => "Failed to save settings. Please try again.",
        }
    }
}
