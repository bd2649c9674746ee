//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into `DomainError`. Validation outcomes
//! a member can act on are `Rejection`s and carry a stable reason code.

use thiserror::Error;

use super::entities::BookingStatus;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Repository error: {0}")]
    Repo(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Export failed: {0}")]
    Export(String),

    /// Prompt failed or was dismissed by the member.
    #[error("Input error: {0}")]
    Input(String),

    #[error("{0}")]
    Rejected(#[from] Rejection),
}

/// Why a booking-related request was turned down.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("Sessions must be booked for a future time")]
    PastStart,

    #[error("The trainer already has a session booked in that time")]
    Overlap,

    #[error("Availability '{0}' is not of the form HH:MM-HH:MM")]
    MalformedAvailability(String),

    #[error("A session must end after it starts")]
    InvalidInterval,

    #[error("Cannot change a {from} session to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Only upcoming sessions that are not already cancelled can be cancelled")]
    CancelNotAllowed,

    #[error("Only completed sessions without a rating can be rated")]
    NotRateable,

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("This session belongs to another member")]
    NotOwner,

    #[error("The session was changed by someone else, try again")]
    ConcurrentUpdate,
}

impl Rejection {
    /// Stable reason code for collaborators (JSON responses, logs).
    pub fn code(&self) -> &'static str {
        match self {
            Rejection::PastStart => "past-start",
            Rejection::Overlap => "overlap",
            Rejection::MalformedAvailability(_) => "malformed-availability",
            Rejection::InvalidInterval => "invalid-interval",
            Rejection::InvalidTransition { .. } => "invalid-transition",
            Rejection::CancelNotAllowed => "cancel-not-allowed",
            Rejection::NotRateable => "not-rateable",
            Rejection::InvalidRating(_) => "invalid-rating",
            Rejection::NotOwner => "not-owner",
            Rejection::ConcurrentUpdate => "concurrent-update",
        }
    }
}

impl DomainError {
    /// The rejection, when this error is a user-facing validation outcome.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            DomainError::Rejected(r) => Some(r),
            _ => None,
        }
    }
}
