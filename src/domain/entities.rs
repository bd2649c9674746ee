//! Domain entities. Pure data structures for the core business.
//!
//! No SQL or IO types here. Adapters map rows into these.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::availability::WeeklyAvailability;
use super::errors::DomainError;

/// A personal trainer members can book sessions with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trainer {
    pub id: i64,
    pub name: String,
    pub specialty: Option<String>,
    pub availability: WeeklyAvailability,
}

/// Lifecycle of a booking. Stored lower-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Scheduled => "scheduled",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Cancelled bookings never occupy trainer time.
    pub fn blocks_time(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scheduled" => Ok(BookingStatus::Scheduled),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "completed" => Ok(BookingStatus::Completed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(DomainError::Repo(format!("unknown booking status '{}'", other))),
        }
    }
}

/// Time a trainer already has booked. Only non-cancelled intervals conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookedInterval {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
}

/// A fixed-length slot inside an availability window. Generated per query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSlot {
    #[serde(with = "slot_time")]
    pub start: NaiveDateTime,
    #[serde(with = "slot_time")]
    pub end: NaiveDateTime,
}

impl fmt::Display for CandidateSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Member's request to book `[proposed_start, proposed_end)` with a trainer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRequest {
    pub trainer_id: i64,
    pub proposed_start: NaiveDateTime,
    pub proposed_end: NaiveDateTime,
}

impl From<(i64, CandidateSlot)> for BookingRequest {
    fn from((trainer_id, slot): (i64, CandidateSlot)) -> Self {
        Self {
            trainer_id,
            proposed_start: slot.start,
            proposed_end: slot.end,
        }
    }
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub member_id: i64,
    pub trainer_id: i64,
    /// Filled by queries that join the trainers table.
    pub trainer_name: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub status: BookingStatus,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Row for the member's notification inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub member_id: i64,
    pub message: String,
    pub created_at: NaiveDateTime,
    pub read: bool,
}

/// Wire format for slot timestamps: `2024-05-06T09:30:00`.
mod slot_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

    pub fn serialize<S: Serializer>(t: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}
