// src/ingest/mod.rs
//! Race-record ingestion: the `RaceDataSource` seam and its providers.
//! Result rows, lap records, and schedules are read-only inputs; everything
//! downstream of this module is a pure data transformation.

pub mod providers;
pub mod types;

pub use types::{LapRecord, RaceDataSource, RaceResultRow, ScheduleEntry, SessionType};
