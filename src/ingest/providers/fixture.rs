//! In-memory race-data source for tests and offline runs.
//!
//! Rounds can be marked as failing to exercise the round-granular skip path,
//! and fetch calls are counted so tests can pin the one-fetch-per-round
//! batch contract.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use crate::ingest::types::{
    LapRecord, RaceDataSource, RaceResultRow, ScheduleEntry, SessionType,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchCalls {
    pub results: u32,
    pub laps: u32,
    pub schedule: u32,
}

#[derive(Debug, Default)]
pub struct FixtureSource {
    results: HashMap<(u16, u32, SessionType), Vec<RaceResultRow>>,
    laps: HashMap<(u16, u32), Vec<LapRecord>>,
    schedules: HashMap<u16, Vec<ScheduleEntry>>,
    failing_rounds: HashSet<(u16, u32)>,
    calls: Mutex<FetchCalls>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedule(mut self, season: u16, entries: Vec<ScheduleEntry>) -> Self {
        self.schedules.insert(season, entries);
        self
    }

    pub fn with_results(
        mut self,
        season: u16,
        round: u32,
        session: SessionType,
        rows: Vec<RaceResultRow>,
    ) -> Self {
        self.results.insert((season, round, session), rows);
        self
    }

    pub fn with_laps(mut self, season: u16, round: u32, laps: Vec<LapRecord>) -> Self {
        self.laps.insert((season, round), laps);
        self
    }

    /// Every fetch against this round errors, simulating an unavailable
    /// session or a network failure.
    pub fn with_failing_round(mut self, season: u16, round: u32) -> Self {
        self.failing_rounds.insert((season, round));
        self
    }

    pub fn fetch_calls(&self) -> FetchCalls {
        *self.calls.lock().expect("fixture call counter poisoned")
    }
}

#[async_trait]
impl RaceDataSource for FixtureSource {
    async fn results(
        &self,
        season: u16,
        round: u32,
        session: SessionType,
    ) -> Result<Vec<RaceResultRow>> {
        self.calls
            .lock()
            .expect("fixture call counter poisoned")
            .results += 1;
        if self.failing_rounds.contains(&(season, round)) {
            return Err(anyhow!("fixture: round {round} of {season} unavailable"));
        }
        self.results
            .get(&(season, round, session))
            .cloned()
            .ok_or_else(|| anyhow!("fixture: no {session:?} results for {season} round {round}"))
    }

    async fn laps(&self, season: u16, round: u32) -> Result<Vec<LapRecord>> {
        self.calls
            .lock()
            .expect("fixture call counter poisoned")
            .laps += 1;
        if self.failing_rounds.contains(&(season, round)) {
            return Err(anyhow!("fixture: round {round} of {season} unavailable"));
        }
        self.laps
            .get(&(season, round))
            .cloned()
            .ok_or_else(|| anyhow!("fixture: no laps for {season} round {round}"))
    }

    async fn schedule(&self, season: u16) -> Result<Vec<ScheduleEntry>> {
        self.calls
            .lock()
            .expect("fixture call counter poisoned")
            .schedule += 1;
        self.schedules
            .get(&season)
            .cloned()
            .ok_or_else(|| anyhow!("fixture: no schedule for {season}"))
    }

    fn name(&self) -> &'static str {
        "Fixture"
    }
}
