//! Error taxonomy for the doctor service core.
//!
//! Domain-rule violations (`NotFound`, `InvalidArgument`, `Conflict`)
//! propagate to the caller as typed failures. Adapter failures (`Store`,
//! `Directory`) are infrastructure errors; cross-service enrichment failures
//! degrade gracefully at their call-sites instead of surfacing here.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A doctor, activation request, relationship or appointment required by
    /// the operation does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller supplied a value outside the accepted domain (unknown
    /// activation action, unparsable status filter, malformed date).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not permitted in the entity's current state, or a
    /// uniqueness/overlap constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The entity store failed to complete a read or write.
    #[error("store error: {0}")]
    Store(String),

    /// The user directory could not be reached or returned a malformed
    /// response.
    #[error("user directory error: {0}")]
    Directory(String),
}

pub type CoreResult<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Shorthand for the NotFound raised whenever a caller identity does not
    /// resolve to a doctor record.
    pub fn doctor_not_found(id: &str) -> Self {
        CoreError::NotFound(format!("doctor not found: {id}"))
    }
}
