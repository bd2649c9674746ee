//! Persistence adapters: SQLite store and JSON roster import.

pub mod roster_json;
pub mod sqlite_repo;

pub use roster_json::RosterJson;
pub use sqlite_repo::SqliteRepo;
