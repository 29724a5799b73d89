//! Error types for component validation and interaction responses.
//!
//! Validation and state-misuse errors are raised before anything touches the
//! network. Transport failures are wrapped transparently: the caller sees the
//! [`HttpError`] exactly as the transport produced it.

use crate::http::HttpError;

/// Structural violations detected while building an [`ActionRow`].
///
/// [`ActionRow`]: crate::types::component::ActionRow
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// The row already holds the maximum of five components.
    #[error("action rows can only have up to {max} components", max = crate::types::component::MAX_ROW_COMPONENTS)]
    TooManyComponents,
    /// A select menu must be the only component in its row.
    #[error("a select menu must be the only component in an action row")]
    SelectOnly,
}

/// Failures surfaced by the interaction response state machine and the
/// message handles it returns.
#[derive(Debug, thiserror::Error)]
pub enum InteractionError {
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// `edit_original` was called after `defer`; a deferred interaction has to
    /// be resolved through `respond`.
    #[error("edit_original is invalid for deferred interactions, use respond instead")]
    DeferredEditOriginal,

    /// The interaction already received its initial callback.
    #[error("the interaction has already been responded to")]
    AlreadyResponded,

    /// The interaction was already deferred.
    #[error("the interaction has already been deferred")]
    AlreadyDeferred,

    /// Ephemeral responses cannot be deleted through the response endpoint.
    #[error("cannot delete an ephemeral message")]
    EphemeralDelete,

    #[error(transparent)]
    Http(#[from] HttpError),
}
