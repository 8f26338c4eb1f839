//! Historical normalization: filter → min-max rescale to [0,100] → levels.
//!
//! Stateless and idempotent over its input; the normalized table is always
//! regenerated in full, never patched row-by-row.

use serde::{Deserialize, Serialize};

use crate::extract::metric_present;
use crate::store::{NormalizedSynergyRecord, RawSynergyRecord};

/// Ordered qualitative labels for a normalized score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SynergyLevel {
    #[serde(rename = "Very Poor")]
    VeryPoor,
    #[serde(rename = "Poor")]
    Poor,
    #[serde(rename = "Moderate")]
    Moderate,
    #[serde(rename = "Good")]
    Good,
    #[serde(rename = "Excellent")]
    Excellent,
}

/// Right-closed bins: (0,30] (30,50] (50,70] (70,85] (85,100].
/// Exactly 0 falls outside every bin and stays unleveled rather than being
/// silently pushed into "Very Poor".
pub fn level_for(normalized: f64) -> Option<SynergyLevel> {
    if normalized > 0.0 && normalized <= 30.0 {
        Some(SynergyLevel::VeryPoor)
    } else if normalized > 30.0 && normalized <= 50.0 {
        Some(SynergyLevel::Poor)
    } else if normalized > 50.0 && normalized <= 70.0 {
        Some(SynergyLevel::Moderate)
    } else if normalized > 70.0 && normalized <= 85.0 {
        Some(SynergyLevel::Good)
    } else if normalized > 85.0 && normalized <= 100.0 {
        Some(SynergyLevel::Excellent)
    } else {
        None
    }
}

/// Drop rows that would distort the distribution: missing/non-finite scores,
/// the 0.0 score sentinel, and the AvgQ == 0 sentinel ("zero valid
/// qualifying rounds"). The AvgQ rule is specific to that field; the other
/// four metrics may legitimately be zero.
fn survives_filtering(r: &RawSynergyRecord) -> bool {
    r.synergy_score.is_finite()
        && metric_present(r.synergy_score)
        && metric_present(r.avg_qualifying)
}

/// Rescale surviving raw scores linearly onto [0,100]. A degenerate range
/// (all surviving scores equal, including a lone survivor) maps everything
/// to the midpoint 50 instead of dividing by zero.
pub fn normalize(raw: &[RawSynergyRecord]) -> Vec<NormalizedSynergyRecord> {
    let surviving: Vec<&RawSynergyRecord> = raw.iter().filter(|r| survives_filtering(r)).collect();
    if surviving.is_empty() {
        return Vec::new();
    }

    let min = surviving
        .iter()
        .map(|r| r.synergy_score)
        .fold(f64::INFINITY, f64::min);
    let max = surviving
        .iter()
        .map(|r| r.synergy_score)
        .fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    let degenerate = range.abs() < 1e-9;

    surviving
        .into_iter()
        .map(|r| {
            let score = if degenerate {
                50.0
            } else {
                (r.synergy_score - min) / range * 100.0
            };
            NormalizedSynergyRecord {
                driver: r.driver.clone(),
                season: r.season,
                synergy_score: score,
                synergy_level: level_for(score),
            }
        })
        .collect()
}
