//! Infrastructure adapters. Implement outbound ports.
//!
//! SQLite, roster file, webhook, CSV export, terminal UI. Map errors to DomainError.

pub mod export;
pub mod integrations;
pub mod persistence;
pub mod ui;
