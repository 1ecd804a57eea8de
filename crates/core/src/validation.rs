//! Client-side checks for credential forms, run before any backend call.

use crate::error::CoreError;

/// Minimum password length accepted on registration and password change.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Require a non-empty value.
pub fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Very small email sanity check: one `@` with text on both sides.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    require_non_empty("email", email)?;
    match email.trim().split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(())
        }
        _ => Err(CoreError::Validation(format!("'{email}' is not a valid email address"))),
    }
}

/// Validate the fields of a login form.
pub fn validate_login(email: &str, password: &str) -> Result<(), CoreError> {
    validate_email(email)?;
    require_non_empty("password", password)
}

/// Validate the fields of a registration form.
pub fn validate_registration(
    email: &str,
    password: &str,
    first_name: &str,
    last_name: &str,
) -> Result<(), CoreError> {
    validate_email(email)?;
    validate_new_password(password)?;
    require_non_empty("firstName", first_name)?;
    require_non_empty("lastName", last_name)
}

/// A new password must have at least [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_new_password(password: &str) -> Result<(), CoreError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must have at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
