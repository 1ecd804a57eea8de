//! The authenticated principal as seen by the front-end.

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::types::DbId;

/// Organisational unit a user may belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: DbId,
    pub name: String,
}

/// Denormalised snapshot of the signed-in user.
///
/// Persisted as JSON under the `user` credential key and mirrored in memory
/// by the session. Field names follow the backend's camelCase documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: DbId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl UserRecord {
    /// "First Last", trimmed when one part is empty.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// Copy the editable profile fields from a freshly saved profile.
    ///
    /// Identity and role are kept: a profile update never changes who the
    /// user is or what they may do.
    pub fn merge_profile(&mut self, profile: &UserRecord) {
        self.email = profile.email.clone();
        self.first_name = profile.first_name.clone();
        self.last_name = profile.last_name.clone();
        if profile.unit.is_some() {
            self.unit = profile.unit.clone();
        }
    }
}

/// Editable profile fields sent with `PUT /user/profile`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Body of `PUT /user/profile/password`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}
