// src/ingest/types.rs
use anyhow::Result;
use chrono::NaiveDate;

/// Session kinds the scoring pipeline consumes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Qualifying,
    Race,
}

/// One driver's result row in a single session.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RaceResultRow {
    pub driver: String,       // full name, e.g. "Max Verstappen"
    pub abbreviation: String, // short code, e.g. "VER"
    pub team_id: String,
    pub team_name: String,
    pub position: Option<u32>, // 1-based; None when not classified
    pub status: String,
    pub points: f64,
    /// Qualifying segment times in seconds; a segment is None when the driver
    /// did not run it (or this is a race row).
    pub q1: Option<f64>,
    pub q2: Option<f64>,
    pub q3: Option<f64>,
    /// Display attribute only; never used in scoring.
    pub team_color: Option<String>,
}

/// One lap for one driver, without telemetry channels.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LapRecord {
    pub abbreviation: String,
    pub lap_time: Option<f64>, // seconds; None for invalid laps
    pub pit_in: bool,
    pub pit_out: bool,
    pub accurate: bool,
    pub compound: Option<String>,
    pub stint: Option<u32>,
}

/// One event in a season schedule.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScheduleEntry {
    pub round: u32,
    pub event_date: NaiveDate,
    pub is_testing: bool,
}

#[async_trait::async_trait]
pub trait RaceDataSource: Send + Sync {
    async fn results(
        &self,
        season: u16,
        round: u32,
        session: SessionType,
    ) -> Result<Vec<RaceResultRow>>;
    async fn laps(&self, season: u16, round: u32) -> Result<Vec<LapRecord>>;
    async fn schedule(&self, season: u16) -> Result<Vec<ScheduleEntry>>;
    fn name(&self) -> &'static str;
}
