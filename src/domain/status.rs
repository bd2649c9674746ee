//! Booking status transitions.
//!
//! `scheduled -> confirmed -> completed`, and `scheduled | confirmed -> cancelled`.
//! Cancelled and completed are terminal.

use chrono::NaiveDateTime;

use super::entities::BookingStatus;
use super::errors::Rejection;

/// Validate moving a booking that starts at `start` from `from` to `to`.
pub fn transition(
    from: BookingStatus,
    to: BookingStatus,
    start: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<BookingStatus, Rejection> {
    use BookingStatus::*;

    match (from, to) {
        (Scheduled, Confirmed) | (Confirmed, Completed) => Ok(to),
        (Scheduled | Confirmed, Cancelled) if start > now => Ok(Cancelled),
        (_, Cancelled) => Err(Rejection::CancelNotAllowed),
        _ => Err(Rejection::InvalidTransition { from, to }),
    }
}
