//! Read-only inspection of the credential store.

use std::fmt;

use roster_core::roles::Role;
use roster_core::types::{DbId, Timestamp};
use serde::Serialize;

use crate::store::{CredentialKey, CredentialStore};

/// State of the stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum UserEntry {
    Absent,
    /// Present but not a valid user document.
    Corrupted,
    Valid { id: DbId, email: String, role: Role },
}

/// Summary of what the credential store holds. Never contains the token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageReport {
    pub token_present: bool,
    pub token_length: usize,
    pub user: UserEntry,
    pub last_updated: Option<Timestamp>,
}

impl StorageReport {
    /// Token and user are either both usable or both absent.
    pub fn is_consistent(&self) -> bool {
        let user_valid = matches!(self.user, UserEntry::Valid { .. });
        match (self.token_present, &self.user) {
            (false, UserEntry::Absent) => true,
            (true, _) => user_valid,
            (false, _) => false,
        }
    }

    /// Human-readable problems, empty when consistent.
    pub fn problems(&self) -> Vec<&'static str> {
        let mut problems = Vec::new();
        if !self.token_present && self.user != UserEntry::Absent {
            problems.push("user record stored without a token");
        }
        if self.token_present && self.user == UserEntry::Absent {
            problems.push("token stored without a user record");
        }
        if self.user == UserEntry::Corrupted {
            problems.push("user record is not valid JSON");
        }
        problems
    }
}

impl fmt::Display for StorageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.token_present {
            writeln!(f, "token:   present ({} chars)", self.token_length)?;
        } else {
            writeln!(f, "token:   missing")?;
        }
        match &self.user {
            UserEntry::Absent => writeln!(f, "user:    missing")?,
            UserEntry::Corrupted => writeln!(f, "user:    present but unreadable")?,
            UserEntry::Valid { id, email, role } => {
                writeln!(f, "user:    #{id} {email} ({})", role.label())?
            }
        }
        if let Some(at) = self.last_updated {
            writeln!(f, "updated: {}", at.to_rfc3339())?;
        }
        if self.is_consistent() {
            write!(f, "status:  OK")
        } else {
            write!(f, "status:  {}", self.problems().join("; "))
        }
    }
}

/// Inspect `store` without modifying it.
pub fn inspect(store: &dyn CredentialStore) -> StorageReport {
    let token = store.token();
    let user = match store.get(CredentialKey::User) {
        None => UserEntry::Absent,
        Some(_) => match store.cached_user() {
            Some(user) => UserEntry::Valid {
                id: user.id,
                email: user.email,
                role: user.role,
            },
            None => UserEntry::Corrupted,
        },
    };

    StorageReport {
        token_present: token.is_some(),
        token_length: token.map(|t| t.len()).unwrap_or(0),
        user,
        last_updated: store.last_updated(),
    }
}
