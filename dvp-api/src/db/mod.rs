//! Per-table database operations

pub mod devices;
pub mod diagnoses;
pub mod history;
pub mod passports;
pub mod users;
