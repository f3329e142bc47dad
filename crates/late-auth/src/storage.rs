use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Service id the Google token set is stored under.
pub const GOOGLE_SERVICE: &str = "google";

/// Token set for OAuth2 authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,

    /// Optional refresh token for token renewal
    pub refresh_token: Option<String>,

    /// Token expiration timestamp (Unix timestamp)
    pub expires_at: i64,

    /// Scopes granted to this token
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Check if the token needs refresh (within 5 minutes of expiry)
    pub fn needs_refresh(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now >= self.expires_at - 300
    }

}

/// File-based token storage, one JSON file per service under `dir`.
#[derive(Debug, Clone)]
pub struct SecureStorage {
    dir: PathBuf,
}

impl SecureStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn token_path(&self, service: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).context("Failed to create tokens directory")?;
        Ok(self.dir.join(format!("{}.json", service)))
    }

    /// Store a token set
    pub fn store_token(&self, service: &str, token_set: &TokenSet) -> Result<()> {
        let path = self.token_path(service)?;

        let json =
            serde_json::to_string_pretty(token_set).context("Failed to serialize token set")?;

        let tmp = path.with_extension("json.tmp");
        write_private(&tmp, json.as_bytes()).context("Failed to write token file")?;
        fs::rename(&tmp, &path).context("Failed to replace token file")?;

        tracing::info!("Stored token for service: {}", service);
        Ok(())
    }

    /// Retrieve a token set
    pub fn retrieve_token(&self, service: &str) -> Result<TokenSet> {
        let path = self.token_path(service)?;

        let json = fs::read_to_string(&path).context("Failed to read token file")?;

        serde_json::from_str(&json).context("Failed to deserialize token set")
    }

    /// Delete a token set; a missing file is not an error
    pub fn delete_token(&self, service: &str) -> Result<()> {
        let path = self.token_path(service)?;

        if path.exists() {
            fs::remove_file(&path).context("Failed to delete token file")?;
            tracing::info!("Deleted token for service: {}", service);
        }

        Ok(())
    }

    pub fn has_token(&self, service: &str) -> bool {
        self.retrieve_token(service).is_ok()
    }
}

/// Create `path` owner-only and write `contents`, replacing any leftover file.
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

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn token(expires_in: i64) -> TokenSet {
        TokenSet {
            access_token: "test".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: chrono::Utc::now().timestamp() + expires_in,
            scopes: vec![],
        }
    }

    #[test]
    fn test_token_expiry() {
        assert!(token(-3600).needs_refresh());
        assert!(!token(3600).needs_refresh());
        assert!(token(200).needs_refresh());
    }

    #[test]
    fn test_store_retrieve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::new(dir.path().join("tokens"));

        assert!(!storage.has_token(GOOGLE_SERVICE));

        storage.store_token(GOOGLE_SERVICE, &token(3600)).unwrap();
        assert!(storage.has_token(GOOGLE_SERVICE));
        let loaded = storage.retrieve_token(GOOGLE_SERVICE).unwrap();
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));

        storage.delete_token(GOOGLE_SERVICE).unwrap();
        assert!(!storage.has_token(GOOGLE_SERVICE));
        storage.delete_token(GOOGLE_SERVICE).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_token_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let storage = SecureStorage::new(dir.path());
        storage.store_token(GOOGLE_SERVICE, &token(3600)).unwrap();

        storage.store_token(GOOGLE_SERVICE, &token(7200)).unwrap();

        let mode = fs::metadata(dir.path().join("google.json")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert!(!dir.path().join("google.json.tmp").exists());
    }
}
