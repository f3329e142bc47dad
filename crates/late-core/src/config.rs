use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Directory name under the platform config dir.
pub const APP_DIR_NAME: &str = "late";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding config.toml, prefs.json and the token store
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Google OAuth client and API endpoints
    #[serde(default)]
    pub google: GoogleConfig,

    /// Calendar query settings
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Widget polling and presentation settings
    #[serde(default)]
    pub widget: WidgetConfig,
}

/// Google OAuth client credentials and API base URLs.
///
/// Create an OAuth client of type "Desktop app" in the Google Cloud console
/// and paste its id and secret here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    #[serde(default = "default_calendar_api_url")]
    pub calendar_api_url: String,
    #[serde(default = "default_gmail_api_url")]
    pub gmail_api_url: String,
}

fn default_calendar_api_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_gmail_api_url() -> String {
    "https://gmail.googleapis.com".to_string()
}

impl GoogleConfig {
    /// Returns (client_id, client_secret) if both are set to real values.
    pub fn credentials(&self) -> Option<(String, String)> {
        let id = self.client_id.as_deref().filter(|s| is_real_value(s))?;
        let secret = self.client_secret.as_deref().filter(|s| is_real_value(s))?;
        Some((id.to_string(), secret.to_string()))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }
}

fn is_real_value(s: &str) -> bool {
    !s.trim().is_empty() && !s.starts_with("YOUR_")
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: Some("YOUR_GOOGLE_CLIENT_ID".to_string()),
            client_secret: Some("YOUR_GOOGLE_CLIENT_SECRET".to_string()),
            calendar_api_url: default_calendar_api_url(),
            gmail_api_url: default_gmail_api_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Upper bound on events fetched per refresh
    #[serde(default = "default_max_results")]
    pub max_results: u32,
}

/// Events fetched per refresh unless `calendar.max_results` says otherwise.
pub const DEFAULT_MAX_RESULTS: u32 = 5;

/// Largest accepted `widget.urgent_minutes`: one week.
pub const MAX_URGENT_MINUTES: i64 = 7 * 24 * 60;

fn default_max_results() -> u32 {
    DEFAULT_MAX_RESULTS
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidgetConfig {
    /// Seconds between background refetches
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    /// Events starting within this many minutes are shown as imminent
    #[serde(default = "default_urgent_minutes")]
    pub urgent_minutes: i64,
    /// How long send feedback stays on screen before resetting
    #[serde(default = "default_send_feedback_seconds")]
    pub send_feedback_seconds: u64,
}

fn default_poll_seconds() -> u64 {
    60
}

fn default_urgent_minutes() -> i64 {
    30
}

fn default_send_feedback_seconds() -> u64 {
    2
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            poll_seconds: default_poll_seconds(),
            urgent_minutes: default_urgent_minutes(),
            send_feedback_seconds: default_send_feedback_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            google: GoogleConfig::default(),
            calendar: CalendarConfig::default(),
            widget: WidgetConfig::default(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from a specific file, creating a default one if missing
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let mut config = Self::default();
            if let Some(parent) = path.parent() {
                config.config_dir = parent.to_path_buf();
            }
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.google.calendar_api_url, "google.calendar_api_url", &mut result);
        self.validate_url(&self.google.gmail_api_url, "google.gmail_api_url", &mut result);

        if !self.google.is_configured() {
            result.add_warning(
                "google",
                "Google OAuth not configured - sign-in will be unavailable",
            );
        }

        if self.calendar.max_results == 0 {
            result.add_error("calendar.max_results", "Must fetch at least one event");
        } else if self.calendar.max_results > 250 {
            result.add_error(
                "calendar.max_results",
                "Calendar API returns at most 250 events per page",
            );
        }

        if self.widget.poll_seconds == 0 {
            result.add_error("widget.poll_seconds", "Poll interval must be greater than 0");
        } else if self.widget.poll_seconds < 10 {
            result.add_warning(
                "widget.poll_seconds",
                "Polling more often than every 10 seconds may hit API quotas",
            );
        }

        if self.widget.urgent_minutes < 0 {
            result.add_error("widget.urgent_minutes", "Threshold cannot be negative");
        } else if self.widget.urgent_minutes > MAX_URGENT_MINUTES {
            result.add_error(
                "widget.urgent_minutes",
                format!("Threshold cannot exceed {} minutes (one week)", MAX_URGENT_MINUTES),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the preference store inside the config directory
    pub fn prefs_path(&self) -> PathBuf {
        self.config_dir.join("prefs.json")
    }

    /// Directory for OAuth token files
    pub fn tokens_dir(&self) -> PathBuf {
        self.config_dir.join("tokens")
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join(APP_DIR_NAME);

        Ok(config_dir.join("config.toml"))
    }
}
