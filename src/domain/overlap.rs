//! Overlap validation for new bookings.
//!
//! All intervals are half-open `[start, end)`; two intervals that merely touch
//! do not conflict.

use chrono::NaiveDateTime;

use super::entities::{BookedInterval, BookingRequest};
use super::errors::Rejection;

/// True when `[a_start, a_end)` and `[b_start, b_end)` share any instant.
pub fn intervals_overlap(
    a_start: NaiveDateTime,
    a_end: NaiveDateTime,
    b_start: NaiveDateTime,
    b_end: NaiveDateTime,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// True when `[start, end)` collides with any non-cancelled booking.
pub fn conflicts_with_any(
    start: NaiveDateTime,
    end: NaiveDateTime,
    booked: &[BookedInterval],
) -> bool {
    booked
        .iter()
        .filter(|b| b.status.blocks_time())
        .any(|b| intervals_overlap(start, end, b.start, b.end))
}

/// Check a proposed booking. The future-start rule runs before the overlap test.
pub fn validate_booking(
    request: &BookingRequest,
    booked: &[BookedInterval],
    now: NaiveDateTime,
) -> Result<(), Rejection> {
    if request.proposed_start <= now {
        return Err(Rejection::PastStart);
    }
    if request.proposed_end <= request.proposed_start {
        return Err(Rejection::InvalidInterval);
    }
    if conflicts_with_any(request.proposed_start, request.proposed_end, booked) {
        return Err(Rejection::Overlap);
    }
    Ok(())
}

pub fn is_available(
    request: &BookingRequest,
    booked: &[BookedInterval],
    now: NaiveDateTime,
) -> bool {
    validate_booking(request, booked, now).is_ok()
}
