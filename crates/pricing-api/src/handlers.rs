use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use pricing_core::PropertyRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub const HOME_MESSAGE: &str = "This is the API for the property price prediction model.";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: f64,
}

pub async fn home() -> Json<Value> {
    Json(json!({ "message": HOME_MESSAGE }))
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PropertyRecord>, JsonRejection>,
) -> ApiResult<Json<PredictionResponse>> {
    let Json(record) = payload?;
    record
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let features = record
        .to_frame()
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    let prediction = state
        .predictor
        .predict(&features)?
        .first()
        .copied()
        .ok_or_else(|| ApiError::Internal("model returned no prediction".into()))?;

    debug!(?record, prediction, "Prediction served");
    Ok(Json(PredictionResponse { prediction }))
}
