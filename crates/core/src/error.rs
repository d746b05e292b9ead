/// Domain-level error shared by every layer.
///
/// The API layer maps each variant to an HTTP status and a stable error code,
/// so new variants must also be handled in `studyroom_api::error`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// A state machine rejected the requested transition.
    #[error("{0}")]
    InvalidTransition(String),

    /// The lead already carries a tutor claim.
    #[error("This lead has already been claimed")]
    AlreadyClaimed,

    /// The lead is no longer in the `new` state.
    #[error("This lead is not open anymore")]
    NotOpen,

    /// The session already has an invoice (or has left the billable states).
    #[error("Session is already billed")]
    AlreadyBilled,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] keyed by any displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
