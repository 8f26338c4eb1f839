//! HTTP provider for an OpenF1-style race-data API.
//!
//! One GET per call, JSON bodies deserialized into thin wire structs and
//! mapped onto the domain rows. Retry/pagination stays upstream; the scoring
//! core only requires that each fetch is fallible at round granularity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::ingest::types::{
    LapRecord, RaceDataSource, RaceResultRow, ScheduleEntry, SessionType,
};

pub const ENV_BASE_URL: &str = "OPENF1_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.openf1.org/v1";

pub struct OpenF1Source {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    full_name: String,
    name_acronym: String,
    team_id: String,
    team_name: String,
    position: Option<u32>,
    status: Option<String>,
    points: Option<f64>,
    q1: Option<String>,
    q2: Option<String>,
    q3: Option<String>,
    team_colour: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLap {
    name_acronym: String,
    lap_duration: Option<f64>,
    #[serde(default)]
    is_pit_in_lap: bool,
    #[serde(default)]
    is_pit_out_lap: bool,
    #[serde(default = "default_accurate")]
    is_accurate: bool,
    compound: Option<String>,
    stint_number: Option<u32>,
}

fn default_accurate() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct WireEvent {
    round_number: u32,
    date_start: String,
    #[serde(default)]
    is_testing: bool,
}

/// Parse "M:SS.mmm" (or a plain seconds value) into seconds.
pub fn parse_lap_time(s: &str) -> Option<f64> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"^(\d+):(\d{2})(?:\.(\d{1,3}))?$").unwrap());
    let t = s.trim();
    if let Some(caps) = re.captures(t) {
        let minutes: f64 = caps[1].parse().ok()?;
        let seconds: f64 = caps[2].parse().ok()?;
        let millis = caps
            .get(3)
            .map(|m| format!("{:0<3}", m.as_str()).parse::<f64>().unwrap_or(0.0))
            .unwrap_or(0.0);
        return Some(minutes * 60.0 + seconds + millis / 1000.0);
    }
    t.parse::<f64>().ok()
}

fn parse_event_date(s: &str) -> Option<NaiveDate> {
    // Accept both bare dates and RFC 3339 timestamps.
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

impl OpenF1Source {
    pub fn new(base_url: impl Into<String>) -> Self {
        // Per-request timeout so one slow round can't hang a whole batch.
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("building http client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn from_env() -> Self {
        let base = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self::new(base)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                counter!("synergy_fetch_errors_total").increment(1);
                e
            })
            .with_context(|| format!("GET {url}"))?;
        let resp = resp
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;
        resp.json::<T>()
            .await
            .with_context(|| format!("decoding {url} body"))
    }
}

#[async_trait]
impl RaceDataSource for OpenF1Source {
    async fn results(
        &self,
        season: u16,
        round: u32,
        session: SessionType,
    ) -> Result<Vec<RaceResultRow>> {
        let session_name = match session {
            SessionType::Qualifying => "qualifying",
            SessionType::Race => "race",
        };
        let rows: Vec<WireResult> = self
            .get_json(
                "session_result",
                &[
                    ("year", season.to_string()),
                    ("round", round.to_string()),
                    ("session", session_name.to_string()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|w| RaceResultRow {
                driver: w.full_name,
                abbreviation: w.name_acronym,
                team_id: w.team_id,
                team_name: w.team_name,
                position: w.position,
                status: w.status.unwrap_or_default(),
                points: w.points.unwrap_or(0.0),
                q1: w.q1.as_deref().and_then(parse_lap_time),
                q2: w.q2.as_deref().and_then(parse_lap_time),
                q3: w.q3.as_deref().and_then(parse_lap_time),
                team_color: w.team_colour,
            })
            .collect())
    }

    async fn laps(&self, season: u16, round: u32) -> Result<Vec<LapRecord>> {
        let rows: Vec<WireLap> = self
            .get_json(
                "laps",
                &[("year", season.to_string()), ("round", round.to_string())],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|w| LapRecord {
                abbreviation: w.name_acronym,
                lap_time: w.lap_duration,
                pit_in: w.is_pit_in_lap,
                pit_out: w.is_pit_out_lap,
                accurate: w.is_accurate,
                compound: w.compound,
                stint: w.stint_number,
            })
            .collect())
    }

    async fn schedule(&self, season: u16) -> Result<Vec<ScheduleEntry>> {
        let rows: Vec<WireEvent> = self
            .get_json("schedule", &[("year", season.to_string())])
            .await?;
        Ok(rows
            .into_iter()
            .filter_map(|w| {
                let event_date = match parse_event_date(&w.date_start) {
                    Some(d) => d,
                    None => {
                        tracing::warn!(round = w.round_number, raw = %w.date_start, "unparseable event date; skipping entry");
                        return None;
                    }
                };
                Some(ScheduleEntry {
                    round: w.round_number,
                    event_date,
                    is_testing: w.is_testing,
                })
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "OpenF1"
    }
}
