//! Free-slot enumeration: availability window minus booked intervals.

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::availability::{AvailabilityWindow, WeeklyAvailability};
use super::entities::{BookedInterval, CandidateSlot};
use super::overlap::conflicts_with_any;

/// Length of every bookable slot.
pub const SLOT_MINUTES: i64 = 30;

pub fn slot_length() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

/// Lazy iterator over every whole slot of one window on one date.
///
/// Stops before a slot would run past the window end, so a trailing partial
/// slot is never produced. Cloning restarts from the current position.
/// A slot that would fall outside the representable calendar ends the sequence.
#[derive(Debug, Clone)]
pub struct CandidateSlots {
    window_start: NaiveDateTime,
    offset: Duration,
    length: Duration,
    step: Duration,
}

impl CandidateSlots {
    pub fn new(date: NaiveDate, window: AvailabilityWindow, step: Duration) -> Self {
        Self {
            window_start: date.and_time(window.start()),
            offset: Duration::zero(),
            length: window.length(),
            step,
        }
    }

    /// An iterator that yields nothing; used for unavailable days.
    fn empty() -> Self {
        Self {
            window_start: NaiveDateTime::default(),
            offset: Duration::zero(),
            length: Duration::zero(),
            step: slot_length(),
        }
    }
}

impl Iterator for CandidateSlots {
    type Item = CandidateSlot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.step <= Duration::zero() {
            return None;
        }
        let end_offset = self.offset.checked_add(&self.step)?;
        if end_offset > self.length {
            return None;
        }
        let start = self.window_start.checked_add_signed(self.offset)?;
        let end = self.window_start.checked_add_signed(end_offset)?;
        self.offset = end_offset;
        Some(CandidateSlot { start, end })
    }
}

/// Every whole slot of `date`, booked or not. Empty when the weekday has no window.
pub fn candidate_slots(availability: &WeeklyAvailability, date: NaiveDate) -> CandidateSlots {
    match availability.on(date) {
        Some(window) => CandidateSlots::new(date, window, slot_length()),
        None => CandidateSlots::empty(),
    }
}

/// Free slots on `date`, earliest first. Cancelled bookings are ignored.
pub fn enumerate_free_slots(
    availability: &WeeklyAvailability,
    booked: &[BookedInterval],
    date: NaiveDate,
) -> Vec<CandidateSlot> {
    candidate_slots(availability, date)
        .filter(|slot| !conflicts_with_any(slot.start, slot.end, booked))
        .collect()
}
