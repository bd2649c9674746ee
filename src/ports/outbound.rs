//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{
    Appointment, BookedInterval, BookingRequest, BookingStatus, DomainError, Notification, Trainer,
};
use chrono::{NaiveDate, NaiveDateTime};

/// Trainer roster with parsed weekly availability.
#[async_trait::async_trait]
pub trait TrainerRepo: Send + Sync {
    async fn list_trainers(&self) -> Result<Vec<Trainer>, DomainError>;

    /// Returns `None` for an unknown trainer id.
    async fn get_trainer(&self, trainer_id: i64) -> Result<Option<Trainer>, DomainError>;

    /// Insert or replace a trainer and all seven days of availability.
    async fn upsert_trainer(&self, trainer: &Trainer) -> Result<(), DomainError>;
}

/// Appointment storage.
#[async_trait::async_trait]
pub trait BookingRepo: Send + Sync {
    /// Non-cancelled bookings of a trainer that intersect `date`, earliest first.
    async fn booked_intervals(
        &self,
        trainer_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, DomainError>;

    /// Non-cancelled bookings of a trainer that intersect `[from, to)`.
    async fn booked_between(
        &self,
        trainer_id: i64,
        from: NaiveDateTime,
        to: NaiveDateTime,
    ) -> Result<Vec<BookedInterval>, DomainError>;

    /// Insert a `scheduled` appointment only if no non-cancelled booking of the
    /// same trainer overlaps it. Check and insert are a single atomic step.
    /// Returns `None` when an overlapping booking exists.
    async fn insert_if_free(
        &self,
        member_id: i64,
        request: &BookingRequest,
        created_at: NaiveDateTime,
    ) -> Result<Option<Appointment>, DomainError>;

    async fn get_appointment(&self, appointment_id: i64)
    -> Result<Option<Appointment>, DomainError>;

    /// Compare-and-set on status. Returns false if the row no longer has `from`.
    async fn update_status(
        &self,
        appointment_id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<bool, DomainError>;

    /// All appointments of a member, with trainer names, earliest first.
    async fn member_appointments(&self, member_id: i64) -> Result<Vec<Appointment>, DomainError>;

    /// Store rating and feedback. Returns false if the session is already rated.
    async fn save_rating(
        &self,
        appointment_id: i64,
        rating: u8,
        feedback: Option<&str>,
    ) -> Result<bool, DomainError>;
}

/// Fire-and-record notification to a member.
#[async_trait::async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, member_id: i64, message: &str) -> Result<(), DomainError>;
}

/// Stored notifications a member can read back.
#[async_trait::async_trait]
pub trait InboxPort: Send + Sync {
    async fn list_notifications(
        &self,
        member_id: i64,
        unread_only: bool,
    ) -> Result<Vec<Notification>, DomainError>;

    /// Mark one notification read. Only the owning member's rows are touched.
    async fn mark_read(&self, member_id: i64, notification_id: i64) -> Result<(), DomainError>;
}
