//! Pipeline orchestration.
//!
//! Owns the race-data source, the weight store, and the raw/normalized
//! tables. Season aggregation is round-major: each round's qualifying, race
//! and lap data is fetched once and fanned out to every driver in that
//! round, so upstream request volume scales with rounds, not drivers.
//!
//! Weight updates and history recomputation are one logical operation,
//! serialized on an async lock: callers never observe new weights with stale
//! scores.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use metrics::{counter, gauge};
use tracing::{info, warn};

use crate::aggregate::{SeasonAccumulator, SeasonSynergyMetrics};
use crate::extract;
use crate::ingest::types::{LapRecord, RaceDataSource, RaceResultRow, SessionType};
use crate::normalize;
use crate::scoring;
use crate::store::{RawSynergyRecord, SynergyStore};
use crate::weights::{SynergyWeights, WeightStore};

pub struct SynergyService {
    source: Arc<dyn RaceDataSource>,
    weights: WeightStore,
    store: SynergyStore,
    recompute_lock: tokio::sync::Mutex<()>,
}

impl SynergyService {
    pub fn new(source: Arc<dyn RaceDataSource>, initial: SynergyWeights) -> Self {
        Self {
            source,
            weights: WeightStore::new(initial),
            store: SynergyStore::new(),
            recompute_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn weights(&self) -> SynergyWeights {
        self.weights.current()
    }

    pub fn weights_version(&self) -> u64 {
        self.weights.version()
    }

    pub fn store(&self) -> &SynergyStore {
        &self.store
    }

    /// Season metrics for one driver, recomputed from session data on every
    /// query. `Ok(None)` when the driver never appears in the season.
    pub async fn season_metrics(
        &self,
        driver: &str,
        season: u16,
    ) -> Result<Option<SeasonSynergyMetrics>> {
        let mut all = self
            .compute_season_as_of(season, Utc::now().date_naive())
            .await?;
        Ok(all.remove(driver))
    }

    /// Aggregate every driver of a season. Rounds are visited in ascending
    /// order; testing events, future-dated events, and rounds whose fetch
    /// fails are skipped without aborting the season.
    pub async fn compute_season(&self, season: u16) -> Result<HashMap<String, SeasonSynergyMetrics>> {
        self.compute_season_as_of(season, Utc::now().date_naive())
            .await
    }

    pub async fn compute_season_as_of(
        &self,
        season: u16,
        today: NaiveDate,
    ) -> Result<HashMap<String, SeasonSynergyMetrics>> {
        let mut schedule = self
            .source
            .schedule(season)
            .await
            .with_context(|| format!("loading {season} schedule"))?;
        schedule.sort_by_key(|e| e.round);

        let mut accs: HashMap<String, SeasonAccumulator> = HashMap::new();

        for entry in schedule {
            if entry.is_testing || entry.event_date > today {
                counter!("synergy_rounds_skipped_total").increment(1);
                continue;
            }
            let round = entry.round;
            let (quali, race, laps) = match self.fetch_round(season, round).await {
                Ok(data) => data,
                Err(e) => {
                    warn!(error = ?e, source = self.source.name(), season, round, "round fetch failed; skipping");
                    counter!("synergy_fetch_errors_total").increment(1);
                    counter!("synergy_rounds_skipped_total").increment(1);
                    continue;
                }
            };
            counter!("synergy_rounds_processed_total").increment(1);

            for race_row in &race {
                let teammate_race = extract::find_teammate(&race, race_row);
                let driver_quali = quali
                    .iter()
                    .find(|r| r.abbreviation == race_row.abbreviation);
                let teammate_quali =
                    driver_quali.and_then(|dq| extract::find_teammate(&quali, dq));

                let m = extract::extract(
                    race_row,
                    driver_quali,
                    teammate_race,
                    teammate_quali,
                    &laps,
                );
                accs.entry(race_row.driver.clone())
                    .or_insert_with(|| SeasonAccumulator::new(race_row.driver.clone(), season))
                    .push_round(round, &m);
            }
        }

        Ok(accs
            .into_iter()
            .map(|(driver, acc)| (driver, acc.finish()))
            .collect())
    }

    async fn fetch_round(
        &self,
        season: u16,
        round: u32,
    ) -> Result<(Vec<RaceResultRow>, Vec<RaceResultRow>, Vec<LapRecord>)> {
        let quali = self
            .source
            .results(season, round, SessionType::Qualifying)
            .await?;
        let race = self.source.results(season, round, SessionType::Race).await?;
        let laps = self.source.laps(season, round).await?;
        Ok((quali, race, laps))
    }

    /// Score a whole season into the raw table, then rebuild the normalized
    /// table. Returns the number of driver-seasons upserted.
    pub async fn recompute_season(&self, season: u16) -> Result<usize> {
        let _guard = self.recompute_lock.lock().await;
        let all = self.compute_season(season).await?;
        let w = self.weights.current();
        let n = all.len();
        for m in all.into_values() {
            let score = scoring::synergy_score(&m, &w);
            self.store.upsert_raw(raw_record(&m, score));
        }
        self.renormalize();
        gauge!("synergy_raw_records").set(self.store.raw_len() as f64);
        info!(season, upserted = n, "season scored into raw table");
        Ok(n)
    }

    /// Replace the weight vector and bring every persisted score up to the
    /// new generation before returning. Concurrent updates queue behind the
    /// lock; validation failures leave the previous weights untouched.
    pub async fn set_weights_and_recompute(&self, new: SynergyWeights) -> Result<u64> {
        new.validate()?;
        let _guard = self.recompute_lock.lock().await;
        let version = self.weights.replace(new);
        self.store.rescore_raw(|r| {
            scoring::score_components(
                r.teammate_delta,
                r.lap_stdev,
                r.avg_qualifying,
                r.avg_race,
                r.dnf_rate,
                &new,
            )
        });
        self.renormalize();
        counter!("synergy_recompute_runs_total").increment(1);
        info!(version, records = self.store.raw_len(), "weights replaced; history rescored");
        Ok(version)
    }

    fn renormalize(&self) {
        let raw = self.store.raw_snapshot();
        self.store.replace_normalized(normalize::normalize(&raw));
    }
}

fn raw_record(m: &SeasonSynergyMetrics, score: f64) -> RawSynergyRecord {
    RawSynergyRecord {
        driver: m.driver.clone(),
        season: m.season,
        teammate_delta: m.avg_teammate_delta,
        lap_stdev: m.avg_lap_std_dev,
        avg_qualifying: m.avg_qualifying_position,
        avg_race: m.avg_race_position,
        dnf_rate: m.dnf_rate_percent,
        synergy_score: score,
    }
}
