use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use crate::api::models::QualifierQuery;
use crate::api::AppState;
use crate::errors::GateError;
use crate::trend::latest_trend;

pub async fn get_summary(
    State(state): State<AppState>,
    Path(number): Path<u64>,
    Query(query): Query<QualifierQuery>,
) -> Result<Json<Value>, GateError> {
    let qualifier = query.or(&state.qualifier);
    let summary = state
        .history
        .store()
        .load(number, &qualifier)
        .await?
        .ok_or_else(|| GateError::NotFound(format!("No summary for build {} ({})", number, qualifier)))?;
    Ok(Json(json!({ "build": number, "qualifier": qualifier, "summary": summary })))
}

pub async fn get_trend(
    State(state): State<AppState>,
    Query(query): Query<QualifierQuery>,
) -> Result<Json<Value>, GateError> {
    let qualifier = query.or(&state.qualifier);
    let latest = latest_trend(&state.history, &qualifier)
        .await?
        .ok_or_else(|| GateError::NotFound("No finished builds".into()))?;

    Ok(Json(json!({
        "build": latest.build,
        "previous_build": latest.previous_build,
        "qualifier": qualifier,
        "trend": latest.trend,
    })))
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<QualifierQuery>,
) -> Result<Json<Value>, GateError> {
    let qualifier = query.or(&state.qualifier);
    let points = state.history.score_history(&qualifier).await?;
    Ok(Json(json!({ "qualifier": qualifier, "points": points })))
}
