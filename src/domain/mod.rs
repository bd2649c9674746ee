//! Core domain layer. No external I/O dependencies.
//!
//! Entities and booking rules live here. Dependencies flow inward.

pub mod availability;
pub mod entities;
pub mod errors;
pub mod overlap;
pub mod slots;
pub mod status;

pub use availability::{AvailabilityWindow, WeeklyAvailability};
pub use entities::{
    Appointment, BookedInterval, BookingRequest, BookingStatus, CandidateSlot, Notification,
    Trainer,
};
pub use errors::{DomainError, Rejection};
pub use overlap::{is_available, validate_booking};
pub use slots::{SLOT_MINUTES, enumerate_free_slots};
