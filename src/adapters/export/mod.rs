//! Export of member data to files.

pub mod csv_utils;

pub use csv_utils::appointments_to_csv;
