pub mod app;
pub mod config;
pub mod error;
pub mod prefs;
pub mod refresh_state;

pub use app::App;
pub use config::{
    CalendarConfig, Config, GoogleConfig, ValidationResult, WidgetConfig, DEFAULT_MAX_RESULTS,
    MAX_URGENT_MINUTES,
};
pub use error::{AppError, AuthError, ConfigError, NetworkError, PrefsError, RECONFIGURE};
pub use prefs::{PreferenceStore, Preferences};
pub use refresh_state::RefreshState;

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Logs go to stderr so terminal rendering on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    tracing::debug!("Late core initialized");
    Ok(())
}
