//! Synergy scoring.
//!
//! Raw score = weighted linear combination of the five season metrics. Every
//! input is lower-is-better (faster than the teammate, more consistent,
//! better grid/finish position, fewer failures), so each term is negated:
//! a higher raw score always means better synergy.

use crate::aggregate::SeasonSynergyMetrics;
use crate::weights::SynergyWeights;

/// Score the five components directly. Used both for fresh season metrics
/// and for rescoring persisted raw rows after a weight change.
pub fn score_components(
    teammate_delta: f64,
    lap_stdev: f64,
    avg_qualifying: f64,
    avg_race: f64,
    dnf_rate: f64,
    w: &SynergyWeights,
) -> f64 {
    -(teammate_delta * w.w_teammate_delta)
        - lap_stdev * w.w_lap_stdev
        - avg_qualifying * w.w_qualifying
        - avg_race * w.w_race
        - dnf_rate * w.w_dnf
}

/// Pure scoring function: no side effects, deterministic, borrows only.
pub fn synergy_score(m: &SeasonSynergyMetrics, w: &SynergyWeights) -> f64 {
    score_components(
        m.avg_teammate_delta,
        m.avg_lap_std_dev,
        m.avg_qualifying_position,
        m.avg_race_position,
        m.dnf_rate_percent,
        w,
    )
}
