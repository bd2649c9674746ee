//! Application use cases. Orchestrate domain logic via ports.

pub mod booking_service;
pub mod history_service;

pub use booking_service::BookingService;
pub use history_service::HistoryService;
