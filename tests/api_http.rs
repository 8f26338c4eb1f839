// tests/api_http.rs
// HTTP surface tests through the public router (no network).

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::Request,
};
use chrono::{Datelike, Utc};
use http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use f1_synergy_analyzer::api::{create_router, AppState};
use f1_synergy_analyzer::ingest::providers::fixture::FixtureSource;
use f1_synergy_analyzer::ingest::types::{
    LapRecord, RaceResultRow, ScheduleEntry, SessionType,
};
use f1_synergy_analyzer::service::SynergyService;
use f1_synergy_analyzer::weights::SynergyWeights;

const SEASON: u16 = 2023;

fn row(driver: &str, abbr: &str, team: &str, pos: u32) -> RaceResultRow {
    RaceResultRow {
        driver: driver.to_string(),
        abbreviation: abbr.to_string(),
        team_id: team.to_string(),
        team_name: team.to_string(),
        position: Some(pos),
        status: "Finished".to_string(),
        points: 10.0,
        q1: Some(90.0 + pos as f64 * 0.2),
        q2: None,
        q3: None,
        team_color: None,
    }
}

fn lap(abbr: &str, time: f64) -> LapRecord {
    LapRecord {
        abbreviation: abbr.to_string(),
        lap_time: Some(time),
        pit_in: false,
        pit_out: false,
        accurate: true,
        compound: None,
        stint: None,
    }
}

fn test_router() -> axum::Router {
    assert!(
        Utc::now().year() > i32::from(SEASON),
        "fixture season must be in the past for the date cutoff"
    );
    let rows = vec![
        row("Dana Driver", "DRI", "apex", 1),
        row("Tomas Teammate", "TEA", "apex", 2),
    ];
    let source = FixtureSource::new()
        .with_schedule(
            SEASON,
            vec![ScheduleEntry {
                round: 1,
                event_date: chrono::NaiveDate::from_ymd_opt(2023, 3, 5).unwrap(),
                is_testing: false,
            }],
        )
        .with_results(SEASON, 1, SessionType::Qualifying, rows.clone())
        .with_results(SEASON, 1, SessionType::Race, rows)
        .with_laps(
            SEASON,
            1,
            vec![lap("DRI", 90.0), lap("DRI", 90.2), lap("TEA", 90.6), lap("TEA", 90.8)],
        );
    let service = Arc::new(SynergyService::new(
        Arc::new(source),
        SynergyWeights::default(),
    ));
    create_router(AppState { service })
}

async fn get(router: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let resp = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 256 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(router: &axum::Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let resp = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 256 * 1024).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn health_is_ok() {
    let router = test_router();
    let resp = router
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn weights_roundtrip_through_the_api() {
    let router = test_router();

    let (status, body) = get(&router, "/weights").await;
    assert_eq!(status, StatusCode::OK);
    assert!((body["w_teammate_delta"].as_f64().unwrap() - 2.0).abs() < 1e-9);

    let (status, body) = post_json(
        &router,
        "/weights",
        json!({
            "w_teammate_delta": 2.5,
            "w_lap_stdev": 1.0,
            "w_qualifying": 0.5,
            "w_race": 1.0,
            "w_dnf": 4.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"].as_u64(), Some(2));

    let (_, body) = get(&router, "/weights").await;
    assert!((body["w_dnf"].as_f64().unwrap() - 4.0).abs() < 1e-9);
}

#[tokio::test]
async fn malformed_weight_vector_is_rejected() {
    let router = test_router();
    // Wrong arity: one coefficient missing.
    let (status, _) = post_json(
        &router,
        "/weights",
        json!({
            "w_teammate_delta": 2.5,
            "w_lap_stdev": 1.0,
            "w_qualifying": 0.5,
            "w_race": 1.0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Previous weights still in place.
    let (_, body) = get(&router, "/weights").await;
    assert!((body["w_teammate_delta"].as_f64().unwrap() - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn season_metrics_endpoint_serves_trend_maps() {
    let router = test_router();
    let (status, body) = get(
        &router,
        &format!("/synergy/season?driver=Dana%20Driver&season={SEASON}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["driver"], json!("Dana Driver"));
    assert!((body["avg_teammate_delta"].as_f64().unwrap() + 0.6).abs() < 1e-9);
    assert_eq!(body["race_by_round"]["1"], json!(1));

    let (status, _) = get(
        &router,
        &format!("/synergy/season?driver=Nobody&season={SEASON}"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn recompute_fills_raw_and_normalized_tables() {
    let router = test_router();

    let (_, raw) = get(&router, "/synergy/raw").await;
    assert_eq!(raw.as_array().map(Vec::len), Some(0));

    let (status, body) =
        post_json(&router, &format!("/synergy/season/{SEASON}/recompute"), json!(null)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["driver_seasons"].as_u64(), Some(2));

    let (_, raw) = get(&router, "/synergy/raw").await;
    let rows = raw.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.get("SynergyScore").is_some()));

    let (_, normalized) = get(&router, "/synergy/normalized").await;
    let rows = normalized.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    for r in rows {
        let s = r["SynergyScore"].as_f64().unwrap();
        assert!((0.0..=100.0).contains(&s));
    }
}
