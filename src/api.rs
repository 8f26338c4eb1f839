use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::SeasonSynergyMetrics;
use crate::service::SynergyService;
use crate::store::{NormalizedSynergyRecord, RawSynergyRecord};
use crate::weights::SynergyWeights;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SynergyService>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/weights", get(get_weights).post(set_weights))
        .route("/synergy/season", get(season_metrics))
        .route("/synergy/season/{season}/recompute", post(recompute_season))
        .route("/synergy/raw", get(raw_table))
        .route("/synergy/normalized", get(normalized_table))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn get_weights(State(state): State<AppState>) -> Json<SynergyWeights> {
    Json(state.service.weights())
}

#[derive(serde::Serialize)]
struct WeightsUpdated {
    version: u64,
    raw_records: usize,
    normalized_records: usize,
}

/// Atomic weight replace; the response is only sent after every raw score is
/// recomputed and the normalized table regenerated, so the dashboard can
/// refresh immediately on completion.
async fn set_weights(
    State(state): State<AppState>,
    Json(body): Json<SynergyWeights>,
) -> Result<Json<WeightsUpdated>, (StatusCode, String)> {
    let version = state
        .service
        .set_weights_and_recompute(body)
        .await
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(WeightsUpdated {
        version,
        raw_records: state.service.store().raw_len(),
        normalized_records: state.service.store().normalized_snapshot().len(),
    }))
}

#[derive(serde::Deserialize)]
struct SeasonQuery {
    driver: String,
    season: u16,
}

async fn season_metrics(
    State(state): State<AppState>,
    Query(q): Query<SeasonQuery>,
) -> Result<Json<SeasonSynergyMetrics>, (StatusCode, String)> {
    let metrics = state
        .service
        .season_metrics(&q.driver, q.season)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    match metrics {
        Some(m) => Ok(Json(m)),
        None => Err((
            StatusCode::NOT_FOUND,
            format!("no season data for {} in {}", q.driver, q.season),
        )),
    }
}

#[derive(serde::Serialize)]
struct RecomputeResp {
    season: u16,
    driver_seasons: usize,
}

async fn recompute_season(
    State(state): State<AppState>,
    Path(season): Path<u16>,
) -> Result<Json<RecomputeResp>, (StatusCode, String)> {
    let n = state
        .service
        .recompute_season(season)
        .await
        .map_err(|e| (StatusCode::BAD_GATEWAY, e.to_string()))?;
    Ok(Json(RecomputeResp {
        season,
        driver_seasons: n,
    }))
}

async fn raw_table(State(state): State<AppState>) -> Json<Vec<RawSynergyRecord>> {
    Json(state.service.store().raw_snapshot())
}

async fn normalized_table(State(state): State<AppState>) -> Json<Vec<NormalizedSynergyRecord>> {
    Json(state.service.store().normalized_snapshot())
}
