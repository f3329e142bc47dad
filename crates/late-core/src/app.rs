use anyhow::Result;
use std::sync::Arc;

use crate::{Config, PreferenceStore};

/// Application context handed to each surface: the loaded configuration and
/// the preference store living next to it.
#[derive(Debug, Clone)]
pub struct App {
    config: Arc<Config>,
    prefs: PreferenceStore,
}

impl App {
    /// Load and validate configuration from the default location.
    pub fn new() -> Result<Self> {
        let (config, _validation) = Config::load_validated()?;
        Ok(Self::with_config(config))
    }

    /// Build a context around an already-loaded configuration.
    pub fn with_config(config: Config) -> Self {
        let prefs = PreferenceStore::new(config.prefs_path());
        tracing::debug!("Using preferences at {}", prefs.path().display());

        Self {
            config: Arc::new(config),
            prefs,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prefs(&self) -> &PreferenceStore {
        &self.prefs
    }
}
