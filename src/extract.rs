//! Per-race metric extraction.
//!
//! Turns one round's result rows and lap records into the per-round signals
//! the season aggregator consumes: clean-lap pace statistics, the signed
//! teammate lap delta, qualifying/race positions, and the DNF classification.
//! Every quantity is optional; "no data" and "zero" are kept apart so the
//! aggregator can track denominators per metric.

use crate::ingest::types::{LapRecord, RaceResultRow};

/// Qualifying-delta sanity cap in seconds. A gap larger than this is a
/// weather/red-flag artifact and the round's delta is discarded. Fixed policy.
pub const QUALI_DELTA_SANITY_SECS: f64 = 5.0;

/// Race outcome derived from the result status string.
///
/// Statuses outside both fixed sets are `Unclassified`: the round still
/// counts as raced, but it moves neither the DNF numerator nor denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Finished,
    Dnf,
    Unclassified,
}

const DNF_STATUSES: &[&str] = &[
    "accident",
    "collision",
    "collision damage",
    "engine",
    "gearbox",
    "transmission",
    "hydraulics",
    "brakes",
    "suspension",
    "electrical",
    "electronics",
    "power unit",
    "mechanical",
    "overheating",
    "oil leak",
    "water leak",
    "fuel pressure",
    "puncture",
    "driveshaft",
    "spun off",
    "retired",
    "withdrew",
    "disqualified",
];

/// Map a status string onto the fixed DNF/finished taxonomy.
/// Lapped classifications ("+1 Lap", "+2 Laps", ...) count as finished.
pub fn classify_status(status: &str) -> Classification {
    let s = status.trim();
    if s.eq_ignore_ascii_case("finished") || s.starts_with('+') {
        return Classification::Finished;
    }
    let lower = s.to_ascii_lowercase();
    if DNF_STATUSES.contains(&lower.as_str()) {
        Classification::Dnf
    } else {
        Classification::Unclassified
    }
}

/// A lap counts toward pace statistics iff it is not an in/out lap, is
/// flagged accurate, and carries a lap time.
pub fn is_clean_lap(lap: &LapRecord) -> bool {
    !lap.pit_in && !lap.pit_out && lap.accurate && lap.lap_time.is_some()
}

/// Clean lap times (seconds) for one driver in one round.
pub fn clean_lap_times(laps: &[LapRecord], abbreviation: &str) -> Vec<f64> {
    laps.iter()
        .filter(|l| l.abbreviation == abbreviation && is_clean_lap(l))
        .filter_map(|l| l.lap_time)
        .collect()
}

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        None
    } else {
        Some(xs.iter().sum::<f64>() / xs.len() as f64)
    }
}

/// Sample standard deviation. `None` for an empty slice, so callers can
/// distinguish "no clean laps" from "zero variance". A single lap yields 0.0.
pub fn sample_std_dev(xs: &[f64]) -> Option<f64> {
    let n = xs.len();
    if n == 0 {
        return None;
    }
    if n == 1 {
        return Some(0.0);
    }
    let m = xs.iter().sum::<f64>() / n as f64;
    let var = xs.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / (n as f64 - 1.0);
    Some(var.sqrt())
}

/// Best qualifying segment time: Q3 → Q2 → Q1. Later segments take
/// precedence, since only drivers who progress run them.
pub fn best_qualifying_time(row: &RaceResultRow) -> Option<f64> {
    row.q3.or(row.q2).or(row.q1)
}

/// The teammate is the single other row sharing the driver's team identifier
/// in the same session. None or several candidates (mid-season swaps) yield
/// `None`; the caller skips the paired metrics for that round.
pub fn find_teammate<'a>(
    rows: &'a [RaceResultRow],
    driver: &RaceResultRow,
) -> Option<&'a RaceResultRow> {
    let mut candidates = rows
        .iter()
        .filter(|r| r.team_id == driver.team_id && r.abbreviation != driver.abbreviation);
    match (candidates.next(), candidates.next()) {
        (Some(tm), None) => Some(tm),
        _ => None,
    }
}

/// The zero-sentinel predicate: an exactly-zero value is "not computed".
///
/// This conflates a genuine zero observation with missing data; the policy is
/// kept for compatibility with the historical tables and is contained here so
/// it can be revisited in one place.
pub fn metric_present(value: f64) -> bool {
    value != 0.0
}

fn drop_sentinel(value: f64) -> Option<f64> {
    metric_present(value).then_some(value)
}

/// Per-round derived metrics. Ephemeral: computed per round, folded into the
/// season accumulator, and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PerRaceMetrics {
    pub lap_std_dev: Option<f64>,
    pub avg_lap_time: Option<f64>,
    /// Driver mean clean lap minus teammate mean clean lap, seconds.
    /// Negative = driver faster.
    pub teammate_lap_delta: Option<f64>,
    pub qualifying_position: Option<u32>,
    pub race_position: Option<u32>,
    /// Driver best segment minus teammate best segment, seconds.
    pub quali_delta: Option<f64>,
    pub classification: Classification,
}

/// Extract one round's metrics for a driver. Teammate rows are resolved by
/// the caller per session (see [`find_teammate`]); a missing teammate only
/// blanks the paired metrics.
pub fn extract(
    driver_race: &RaceResultRow,
    driver_quali: Option<&RaceResultRow>,
    teammate_race: Option<&RaceResultRow>,
    teammate_quali: Option<&RaceResultRow>,
    laps: &[LapRecord],
) -> PerRaceMetrics {
    let own_laps = clean_lap_times(laps, &driver_race.abbreviation);
    let lap_std_dev = sample_std_dev(&own_laps);
    let avg_lap_time = mean(&own_laps);

    let teammate_lap_delta = teammate_race
        .map(|tm| clean_lap_times(laps, &tm.abbreviation))
        .and_then(|tm_laps| mean(&tm_laps))
        .zip(avg_lap_time)
        .map(|(tm_mean, own_mean)| own_mean - tm_mean)
        .and_then(drop_sentinel);

    let qualifying_position = driver_quali
        .filter(|q| best_qualifying_time(q).is_some())
        .and_then(|q| q.position);

    let quali_delta = driver_quali
        .and_then(best_qualifying_time)
        .zip(teammate_quali.and_then(best_qualifying_time))
        .map(|(own, tm)| own - tm)
        .filter(|d| d.abs() <= QUALI_DELTA_SANITY_SECS)
        .and_then(drop_sentinel);

    PerRaceMetrics {
        lap_std_dev,
        avg_lap_time,
        teammate_lap_delta,
        qualifying_position,
        race_position: driver_race.position,
        quali_delta,
        classification: classify_status(&driver_race.status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lap(abbr: &str, time: Option<f64>) -> LapRecord {
        LapRecord {
            abbreviation: abbr.to_string(),
            lap_time: time,
            pit_in: false,
            pit_out: false,
            accurate: true,
            compound: Some("MEDIUM".into()),
            stint: Some(1),
        }
    }

    fn row(abbr: &str, team: &str) -> RaceResultRow {
        RaceResultRow {
            driver: format!("Driver {abbr}"),
            abbreviation: abbr.to_string(),
            team_id: team.to_string(),
            team_name: team.to_string(),
            position: Some(1),
            status: "Finished".to_string(),
            points: 0.0,
            q1: None,
            q2: None,
            q3: None,
            team_color: None,
        }
    }

    #[test]
    fn clean_lap_filter_excludes_pit_and_inaccurate() {
        let mut pit_in = lap("VER", Some(91.0));
        pit_in.pit_in = true;
        let mut pit_out = lap("VER", Some(95.0));
        pit_out.pit_out = true;
        let mut inaccurate = lap("VER", Some(89.0));
        inaccurate.accurate = false;
        let laps = vec![
            lap("VER", Some(90.0)),
            pit_in,
            pit_out,
            inaccurate,
            lap("VER", None),
            lap("PER", Some(90.5)),
        ];
        assert_eq!(clean_lap_times(&laps, "VER"), vec![90.0]);
    }

    #[test]
    fn std_dev_absent_without_laps_and_zero_for_one_lap() {
        assert_eq!(sample_std_dev(&[]), None);
        assert_eq!(sample_std_dev(&[88.1]), Some(0.0));
        let sd = sample_std_dev(&[90.0, 91.0, 92.0]).unwrap();
        assert!((sd - 1.0).abs() < 1e-9);
    }

    #[test]
    fn best_segment_prefers_q3_over_q2_over_q1() {
        let mut r = row("VER", "red_bull");
        r.q1 = Some(89.0);
        r.q2 = Some(88.0);
        assert_eq!(best_qualifying_time(&r), Some(88.0));
        r.q3 = Some(87.5);
        assert_eq!(best_qualifying_time(&r), Some(87.5));
        let empty = row("PER", "red_bull");
        assert_eq!(best_qualifying_time(&empty), None);
    }

    #[test]
    fn teammate_resolution_requires_exactly_one_candidate() {
        let rows = vec![row("VER", "red_bull"), row("PER", "red_bull"), row("HAM", "mercedes")];
        assert_eq!(
            find_teammate(&rows, &rows[0]).map(|r| r.abbreviation.as_str()),
            Some("PER")
        );
        // Mid-season swap: two candidate teammates means no paired comparison.
        let swapped = vec![
            row("RIC", "alpha_tauri"),
            row("TSU", "alpha_tauri"),
            row("LAW", "alpha_tauri"),
        ];
        assert_eq!(find_teammate(&swapped, &swapped[1]), None);
        // Lone entry has no teammate at all.
        assert_eq!(find_teammate(&rows, &rows[2]), None);
    }

    #[test]
    fn dnf_taxonomy_matches_fixed_sets() {
        assert_eq!(classify_status("Finished"), Classification::Finished);
        assert_eq!(classify_status("+1 Lap"), Classification::Finished);
        assert_eq!(classify_status("+2 Laps"), Classification::Finished);
        assert_eq!(classify_status("Engine"), Classification::Dnf);
        assert_eq!(classify_status("Collision"), Classification::Dnf);
        assert_eq!(classify_status("Disqualified"), Classification::Dnf);
        assert_eq!(classify_status("Illness"), Classification::Unclassified);
        assert_eq!(classify_status(""), Classification::Unclassified);
    }

    #[test]
    fn teammate_delta_signed_toward_faster_driver() {
        let driver = row("VER", "red_bull");
        let teammate = row("PER", "red_bull");
        let laps = vec![
            lap("VER", Some(90.0)),
            lap("VER", Some(90.0)),
            lap("PER", Some(90.5)),
            lap("PER", Some(90.5)),
        ];
        let m = extract(&driver, None, Some(&teammate), None, &laps);
        assert!((m.teammate_lap_delta.unwrap() + 0.5).abs() < 1e-9);
    }

    #[test]
    fn delta_of_exactly_zero_is_dropped() {
        // Pins the zero-sentinel policy: identical means look like "no data".
        let driver = row("VER", "red_bull");
        let teammate = row("PER", "red_bull");
        let laps = vec![lap("VER", Some(90.0)), lap("PER", Some(90.0))];
        let m = extract(&driver, None, Some(&teammate), None, &laps);
        assert_eq!(m.teammate_lap_delta, None);
    }

    #[test]
    fn no_clean_laps_blanks_pace_metrics_but_not_positions() {
        let driver = row("VER", "red_bull");
        let teammate = row("PER", "red_bull");
        let mut in_lap = lap("VER", Some(95.0));
        in_lap.pit_in = true;
        let laps = vec![in_lap, lap("PER", Some(90.5))];
        let m = extract(&driver, None, Some(&teammate), None, &laps);
        assert_eq!(m.lap_std_dev, None);
        assert_eq!(m.teammate_lap_delta, None);
        assert_eq!(m.race_position, Some(1));
    }

    #[test]
    fn quali_delta_discarded_beyond_sanity_threshold() {
        let mut dq = row("VER", "red_bull");
        dq.q3 = Some(80.0);
        let mut tq = row("PER", "red_bull");
        tq.q3 = Some(88.0); // 8 s gap: red-flag territory
        let driver = row("VER", "red_bull");
        let m = extract(&driver, Some(&dq), None, Some(&tq), &[]);
        assert_eq!(m.quali_delta, None);

        let mut tq_close = row("PER", "red_bull");
        tq_close.q3 = Some(80.2);
        let m2 = extract(&driver, Some(&dq), None, Some(&tq_close), &[]);
        assert!((m2.quali_delta.unwrap() + 0.2).abs() < 1e-9);
    }

    #[test]
    fn quali_position_absent_when_all_segments_null() {
        let driver = row("VER", "red_bull");
        let mut no_time = row("VER", "red_bull");
        no_time.position = Some(20);
        let m = extract(&driver, Some(&no_time), None, None, &[]);
        assert_eq!(m.qualifying_position, None);

        let mut with_time = no_time.clone();
        with_time.q1 = Some(91.2);
        let m2 = extract(&driver, Some(&with_time), None, None, &[]);
        assert_eq!(m2.qualifying_position, Some(20));
    }
}
