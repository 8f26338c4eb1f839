//! Season aggregation.
//!
//! Folds per-round metrics into season-level averages. Every average keeps
//! its own denominator: a round that yields no teammate delta still counts
//! toward the lap-consistency average if it produced clean laps, and vice
//! versa. The DNF rate divides by classified rounds only.
//!
//! Season fields use the 0.0 sentinel when a denominator is empty, matching
//! the historical raw tables (see `extract::metric_present`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::extract::{Classification, PerRaceMetrics};

#[derive(Debug, Clone, Copy, Default)]
struct MetricAccumulator {
    sum: f64,
    count: u32,
}

impl MetricAccumulator {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean_or_sentinel(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Season-level synergy inputs for one driver, plus the per-round maps the
/// dashboard uses for trend charts. Rounds with absent data are omitted from
/// the maps, never stored as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSynergyMetrics {
    pub driver: String,
    pub season: u16,
    pub avg_teammate_delta: f64,
    pub avg_lap_std_dev: f64,
    pub avg_qualifying_position: f64,
    pub avg_race_position: f64,
    pub dnf_rate_percent: f64,
    pub qualifying_by_round: BTreeMap<u32, u32>,
    pub race_by_round: BTreeMap<u32, u32>,
    pub lap_delta_by_round: BTreeMap<u32, f64>,
    pub quali_delta_by_round: BTreeMap<u32, f64>,
}

/// Running sums for one driver-season. Accumulators are per-driver by
/// construction, so batch aggregation can fan one round's session data out
/// to many drivers without shared mutable counters.
#[derive(Debug)]
pub struct SeasonAccumulator {
    driver: String,
    season: u16,
    teammate_delta: MetricAccumulator,
    lap_std_dev: MetricAccumulator,
    qualifying_position: MetricAccumulator,
    race_position: MetricAccumulator,
    dnf_rounds: u32,
    classified_rounds: u32,
    qualifying_by_round: BTreeMap<u32, u32>,
    race_by_round: BTreeMap<u32, u32>,
    lap_delta_by_round: BTreeMap<u32, f64>,
    quali_delta_by_round: BTreeMap<u32, f64>,
}

impl SeasonAccumulator {
    pub fn new(driver: impl Into<String>, season: u16) -> Self {
        Self {
            driver: driver.into(),
            season,
            teammate_delta: MetricAccumulator::default(),
            lap_std_dev: MetricAccumulator::default(),
            qualifying_position: MetricAccumulator::default(),
            race_position: MetricAccumulator::default(),
            dnf_rounds: 0,
            classified_rounds: 0,
            qualifying_by_round: BTreeMap::new(),
            race_by_round: BTreeMap::new(),
            lap_delta_by_round: BTreeMap::new(),
            quali_delta_by_round: BTreeMap::new(),
        }
    }

    pub fn push_round(&mut self, round: u32, m: &PerRaceMetrics) {
        self.teammate_delta.push(m.teammate_lap_delta);
        self.lap_std_dev.push(m.lap_std_dev);
        self.qualifying_position
            .push(m.qualifying_position.map(f64::from));
        self.race_position.push(m.race_position.map(f64::from));

        match m.classification {
            Classification::Finished => self.classified_rounds += 1,
            Classification::Dnf => {
                self.classified_rounds += 1;
                self.dnf_rounds += 1;
            }
            Classification::Unclassified => {}
        }

        if let Some(p) = m.qualifying_position {
            self.qualifying_by_round.insert(round, p);
        }
        if let Some(p) = m.race_position {
            self.race_by_round.insert(round, p);
        }
        if let Some(d) = m.teammate_lap_delta {
            self.lap_delta_by_round.insert(round, d);
        }
        if let Some(d) = m.quali_delta {
            self.quali_delta_by_round.insert(round, d);
        }
    }

    pub fn finish(self) -> SeasonSynergyMetrics {
        let dnf_rate_percent = if self.classified_rounds == 0 {
            0.0
        } else {
            f64::from(self.dnf_rounds) / f64::from(self.classified_rounds) * 100.0
        };
        SeasonSynergyMetrics {
            driver: self.driver,
            season: self.season,
            avg_teammate_delta: self.teammate_delta.mean_or_sentinel(),
            avg_lap_std_dev: self.lap_std_dev.mean_or_sentinel(),
            avg_qualifying_position: self.qualifying_position.mean_or_sentinel(),
            avg_race_position: self.race_position.mean_or_sentinel(),
            dnf_rate_percent,
            qualifying_by_round: self.qualifying_by_round,
            race_by_round: self.race_by_round,
            lap_delta_by_round: self.lap_delta_by_round,
            quali_delta_by_round: self.quali_delta_by_round,
        }
    }
}

/// Aggregate a driver's season from per-round metrics in round order.
pub fn aggregate(
    driver: impl Into<String>,
    season: u16,
    rounds: impl IntoIterator<Item = (u32, PerRaceMetrics)>,
) -> SeasonSynergyMetrics {
    let mut acc = SeasonAccumulator::new(driver, season);
    for (round, m) in rounds {
        acc.push_round(round, &m);
    }
    acc.finish()
}
