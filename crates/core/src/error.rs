/// Domain-level error shared by every roster crate.
///
/// Carries no transport detail; the client crate wraps it next to its
/// HTTP and storage errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}
