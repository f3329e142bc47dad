//! Persisted key-value preferences shared by the surfaces.
//!
//! Three string keys survive between runs: the signed-in email, the last
//! access token, and the selected calendar id. The full screen and sign-in
//! flow write; the widget only reads. Every write replaces the whole file
//! through a temp file and rename, and bumps `revision` so a reader can tell
//! whether what it holds is older than what is on disk.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// Snapshot of the persisted preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub revision: u64,
}

impl Preferences {
    /// Token and calendar id are both present, so a fetch can be attempted.
    pub fn can_fetch(&self) -> bool {
        self.token.is_some() && self.calendar_id.is_some()
    }

    /// Sender, token, and calendar id are all present.
    pub fn is_configured(&self) -> bool {
        self.email.is_some() && self.can_fetch()
    }
}

/// File-backed preference store. Cheap to clone; clones share the write lock.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current snapshot. A missing file reads as empty preferences.
    pub fn load(&self) -> Result<Preferences, PrefsError> {
        match fs::read_to_string(&self.path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Preferences::default()),
            Err(e) => Err(PrefsError::Read(e)),
        }
    }

    /// Read, logging and swallowing failures. Used on surfaces where a bad
    /// file should route to "reconfigure" instead of aborting.
    pub fn load_or_default(&self) -> Preferences {
        self.load().unwrap_or_else(|e| {
            tracing::warn!("Falling back to empty preferences: {}", e);
            Preferences::default()
        })
    }

    pub fn set_token(&self, token: Option<&str>) -> Result<Preferences, PrefsError> {
        self.update(|p| p.token = token.map(str::to_string))
    }

    pub fn set_calendar_id(&self, calendar_id: Option<&str>) -> Result<Preferences, PrefsError> {
        self.update(|p| p.calendar_id = calendar_id.map(str::to_string))
    }

    /// Store the session obtained from a successful sign-in.
    pub fn set_session(&self, email: &str, token: &str) -> Result<Preferences, PrefsError> {
        self.update(|p| {
            p.email = Some(email.to_string());
            p.token = Some(token.to_string());
        })
    }

    /// Forget the session. The calendar selection is kept.
    pub fn clear_session(&self) -> Result<Preferences, PrefsError> {
        self.update(|p| {
            p.email = None;
            p.token = None;
        })
    }

    /// Read-modify-write under the store lock, returning the written snapshot.
    fn update(&self, apply: impl FnOnce(&mut Preferences)) -> Result<Preferences, PrefsError> {
        let _guard = self.write_lock.lock();

        let mut prefs = self.load()?;
        apply(&mut prefs);
        prefs.revision += 1;

        self.write_atomic(&prefs)?;
        tracing::debug!(revision = prefs.revision, "Preferences written");
        Ok(prefs)
    }

    fn write_atomic(&self, prefs: &Preferences) -> Result<(), PrefsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(PrefsError::Write)?;
        }

        let json = serde_json::to_string_pretty(prefs)?;
        let tmp = self.path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes()).map_err(PrefsError::Write)?;
        fs::rename(&tmp, &self.path).map_err(PrefsError::Write)?;
        Ok(())
    }
}

/// Write `contents` to a fresh owner-only file.
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
