//! Durable key/value storage for the session token and cached user.
//!
//! The store is deliberately dumb: it validates nothing and never fails a
//! read. A missing, unreadable, or corrupted medium reads as empty so the
//! session bootstrap can always fall back to "not authenticated".

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;
use roster_core::types::Timestamp;
use roster_core::user::UserRecord;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// The two logical keys a credential store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    /// Raw bearer token.
    Token,
    /// JSON-serialized [`UserRecord`].
    User,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 2] = [CredentialKey::Token, CredentialKey::User];

    /// Name of the key in the storage medium.
    pub fn storage_name(self) -> &'static str {
        match self {
            CredentialKey::Token => "authToken",
            CredentialKey::User => "user",
        }
    }
}

/// Process-wide durable map over [`CredentialKey`]s.
pub trait CredentialStore: Send + Sync {
    /// Read a raw value. Absent or unreadable values are `None`.
    fn get(&self, key: CredentialKey) -> Option<String>;

    /// Write a raw value.
    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError>;

    /// Remove a value. Clearing an absent key is a no-op.
    fn clear(&self, key: CredentialKey) -> Result<(), StoreError>;

    /// When the medium was last written, if it tracks that.
    fn last_updated(&self) -> Option<Timestamp> {
        None
    }

    /// Stored session token, ignoring empty strings.
    fn token(&self) -> Option<String> {
        self.get(CredentialKey::Token).filter(|t| !t.is_empty())
    }

    /// Stored user record. Corrupted JSON is treated as absent.
    fn cached_user(&self) -> Option<UserRecord> {
        let raw = self.get(CredentialKey::User)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Cached user record is corrupted, ignoring it");
                None
            }
        }
    }

    /// Serialize and store a user record.
    fn save_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        self.set(CredentialKey::User, &json)
    }

    /// Clear both keys. Both are attempted even if the first fails.
    fn clear_all(&self) -> Result<(), StoreError> {
        let token = self.clear(CredentialKey::Token);
        let user = self.clear(CredentialKey::User);
        token.and(user)
    }
}

// ---------------------------------------------------------------------------
// MemoryCredentialStore
// ---------------------------------------------------------------------------

/// In-memory store for tests and throwaway sessions.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    entries: Mutex<HashMap<CredentialKey, String>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a token and a serialized user.
    pub fn with_session(token: &str, user: &UserRecord) -> Result<Self, StoreError> {
        let store = Self::new();
        store.set(CredentialKey::Token, token)?;
        store.save_user(user)?;
        Ok(store)
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<CredentialKey, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.entries().get(&key).cloned()
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.entries().insert(key, value.to_string());
        Ok(())
    }

    fn clear(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.entries().remove(&key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileCredentialStore
// ---------------------------------------------------------------------------

/// On-disk layout of the credential file.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<Timestamp>,
}

impl CredentialFile {
    fn slot(&mut self, key: CredentialKey) -> &mut Option<String> {
        match key {
            CredentialKey::Token => &mut self.auth_token,
            CredentialKey::User => &mut self.user,
        }
    }

    fn is_empty(&self) -> bool {
        self.auth_token.is_none() && self.user.is_none()
    }
}

/// Credential store persisted as a small JSON document.
///
/// Survives process restarts. Writes go to a sibling temp file that is
/// renamed into place, so a crash mid-write leaves the previous content.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_file(&self) -> CredentialFile {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return CredentialFile::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Credential file unreadable");
                return CredentialFile::default();
            }
        };

        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Credential file corrupted");
            CredentialFile::default()
        })
    }

    fn write_file(&self, file: &CredentialFile) -> Result<(), StoreError> {
        if file.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e.into()),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(file)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn update(&self, key: CredentialKey, value: Option<&str>) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut file = self.read_file();

        let slot = file.slot(key);
        if value.is_none() && slot.is_none() {
            return Ok(());
        }
        *slot = value.map(str::to_string);
        file.updated_at = Some(Utc::now());

        self.write_file(&file)
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: CredentialKey) -> Option<String> {
        self.read_file().slot(key).take()
    }

    fn set(&self, key: CredentialKey, value: &str) -> Result<(), StoreError> {
        self.update(key, Some(value))
    }

    fn clear(&self, key: CredentialKey) -> Result<(), StoreError> {
        self.update(key, None)
    }

    fn last_updated(&self) -> Option<Timestamp> {
        self.read_file().updated_at
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
