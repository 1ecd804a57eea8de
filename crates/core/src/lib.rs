//! Roster domain types shared by the client library and the CLI.
//!
//! Holds the authenticated principal ([`user::UserRecord`]), the role
//! hierarchy with its derived capability checks ([`roles`]), input
//! validation for credential forms, and the common [`error::CoreError`].

pub mod error;
pub mod roles;
pub mod types;
pub mod user;
pub mod validation;
