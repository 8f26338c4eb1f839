//! Raw and normalized synergy tables.
//!
//! In-memory stores keyed by (driver, season). The raw table is the only
//! state that must survive weight changes; the normalized table is derived
//! and only ever replaced in full. CSV save/load carries the dashboard-facing
//! column names.

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::normalize::SynergyLevel;

/// One scored driver-season, persisted with the historical column names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSynergyRecord {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Season")]
    pub season: u16,
    #[serde(rename = "TeammateDelta")]
    pub teammate_delta: f64,
    #[serde(rename = "LapStdev")]
    pub lap_stdev: f64,
    #[serde(rename = "AvgQ")]
    pub avg_qualifying: f64,
    #[serde(rename = "AvgR")]
    pub avg_race: f64,
    #[serde(rename = "DNFRate")]
    pub dnf_rate: f64,
    #[serde(rename = "SynergyScore")]
    pub synergy_score: f64,
}

/// One driver-season on the comparable 0–100 scale. A row whose score falls
/// outside every level bin carries no level (empty CSV cell).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSynergyRecord {
    #[serde(rename = "Driver")]
    pub driver: String,
    #[serde(rename = "Season")]
    pub season: u16,
    #[serde(rename = "SynergyScore")]
    pub synergy_score: f64,
    #[serde(rename = "SynergyLevel")]
    pub synergy_level: Option<SynergyLevel>,
}

#[derive(Debug, Default)]
pub struct SynergyStore {
    raw: Mutex<Vec<RawSynergyRecord>>,
    normalized: Mutex<Vec<NormalizedSynergyRecord>>,
}

impl SynergyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update by (driver, season).
    pub fn upsert_raw(&self, rec: RawSynergyRecord) {
        let mut rows = self.raw.lock().expect("raw table mutex poisoned");
        match rows
            .iter_mut()
            .find(|r| r.driver == rec.driver && r.season == rec.season)
        {
            Some(existing) => *existing = rec,
            None => rows.push(rec),
        }
    }

    pub fn raw_snapshot(&self) -> Vec<RawSynergyRecord> {
        self.raw.lock().expect("raw table mutex poisoned").clone()
    }

    pub fn raw_len(&self) -> usize {
        self.raw.lock().expect("raw table mutex poisoned").len()
    }

    /// Rewrite every raw score in place under the table lock. Used when the
    /// weight vector changes: the stored metric fields stay, only the score
    /// column moves.
    pub fn rescore_raw<F>(&self, score: F)
    where
        F: Fn(&RawSynergyRecord) -> f64,
    {
        let mut rows = self.raw.lock().expect("raw table mutex poisoned");
        for r in rows.iter_mut() {
            r.synergy_score = score(r);
        }
    }

    /// The normalized table is derived state: full replacement only.
    pub fn replace_normalized(&self, rows: Vec<NormalizedSynergyRecord>) {
        *self
            .normalized
            .lock()
            .expect("normalized table mutex poisoned") = rows;
    }

    pub fn normalized_snapshot(&self) -> Vec<NormalizedSynergyRecord> {
        self.normalized
            .lock()
            .expect("normalized table mutex poisoned")
            .clone()
    }

    pub fn save_raw_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rows = self.raw_snapshot();
        let mut wtr = csv::Writer::from_path(path.as_ref())
            .with_context(|| format!("opening {} for writing", path.as_ref().display()))?;
        for r in &rows {
            wtr.serialize(r).context("serializing raw synergy row")?;
        }
        wtr.flush().context("flushing raw synergy csv")?;
        Ok(())
    }

    /// Replace the raw table from a CSV written by [`save_raw_csv`] (or the
    /// historical exporter). Returns the number of rows loaded.
    pub fn load_raw_csv<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let mut rows = Vec::new();
        for rec in rdr.deserialize() {
            let row: RawSynergyRecord = rec.context("parsing raw synergy row")?;
            rows.push(row);
        }
        let n = rows.len();
        *self.raw.lock().expect("raw table mutex poisoned") = rows;
        Ok(n)
    }

    pub fn save_normalized_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let rows = self.normalized_snapshot();
        let mut wtr = csv::Writer::from_path(path.as_ref())
            .with_context(|| format!("opening {} for writing", path.as_ref().display()))?;
        for r in &rows {
            wtr.serialize(r).context("serializing normalized synergy row")?;
        }
        wtr.flush().context("flushing normalized synergy csv")?;
        Ok(())
    }
}
