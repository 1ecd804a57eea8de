//! Role hierarchy and the capability checks derived from it.
//!
//! Every role-based decision in the front-end goes through the predicates
//! in this module. Nothing else compares role names directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::DbId;
use crate::user::UserRecord;

// ---------------------------------------------------------------------------
// Wire names
// ---------------------------------------------------------------------------

/// Wire name of an ordinary member.
pub const ROLE_MEMBER: &str = "USER";
/// Wire name of a group leader.
pub const ROLE_JUGENDWART: &str = "JUGENDWART";
/// Wire name of a district leader.
pub const ROLE_KREISJUGENDWART: &str = "KREISJUGENDWART";
/// Wire name of an administrator.
pub const ROLE_ADMIN: &str = "ADMIN";

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// Role of an authenticated user, ordered by trust.
///
/// `Member < Jugendwart < Kreisjugendwart < Admin`. Unknown wire names
/// decode to [`Role::Member`] so an unexpected value never grants more
/// than the least-trusted role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Member,
    Jugendwart,
    Kreisjugendwart,
    Admin,
}

impl Role {
    /// All roles, lowest trust first.
    pub const ALL: [Role; 4] = [
        Role::Member,
        Role::Jugendwart,
        Role::Kreisjugendwart,
        Role::Admin,
    ];

    /// Wire name as sent by the backend.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => ROLE_MEMBER,
            Role::Jugendwart => ROLE_JUGENDWART,
            Role::Kreisjugendwart => ROLE_KREISJUGENDWART,
            Role::Admin => ROLE_ADMIN,
        }
    }

    /// Human-readable label for lists and chips.
    pub fn label(self) -> &'static str {
        match self {
            Role::Member => "Mitglied",
            Role::Jugendwart => "Jugendwart",
            Role::Kreisjugendwart => "Kreisjugendwart",
            Role::Admin => "Administrator",
        }
    }

    /// Lenient parse: case-insensitive, unknown names map to `Member`.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            ROLE_ADMIN => Role::Admin,
            ROLE_KREISJUGENDWART => Role::Kreisjugendwart,
            ROLE_JUGENDWART => Role::Jugendwart,
            _ => Role::Member,
        }
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        Role::parse(&value)
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Capability predicates
// ---------------------------------------------------------------------------

/// Roles allowed to see and manage every group, not just their own.
const MANAGE_ALL_ROLES: &[Role] = &[Role::Admin, Role::Kreisjugendwart];

/// `true` when a user is present and their role is one of `roles`.
pub fn has_role(user: Option<&UserRecord>, roles: &[Role]) -> bool {
    user.is_some_and(|u| roles.contains(&u.role))
}

/// `true` iff the user is an administrator.
pub fn is_admin(user: Option<&UserRecord>) -> bool {
    has_role(user, &[Role::Admin])
}

/// `true` iff the user is an administrator or a Kreisjugendwart.
pub fn can_manage_all(user: Option<&UserRecord>) -> bool {
    has_role(user, MANAGE_ALL_ROLES)
}

/// A group may be edited by anyone who manages all groups, or by its creator.
pub fn can_edit_group(user: Option<&UserRecord>, created_by: DbId) -> bool {
    can_manage_all(user) || user.is_some_and(|u| u.id == created_by)
}

/// Snapshot of the derived capabilities for one user.
///
/// Computed on demand for display; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub is_admin: bool,
    pub can_manage_all: bool,
}

impl Capabilities {
    pub fn of(user: Option<&UserRecord>) -> Self {
        Self {
            is_admin: is_admin(user),
            can_manage_all: can_manage_all(user),
        }
    }
}
