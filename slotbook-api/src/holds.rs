use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use slotbook_booking::PlacedHold;
use uuid::Uuid;

use crate::{error::AppError, middleware::Claims, state::AppState};

#[derive(Debug, Deserialize)]
pub struct HoldRequest {
    pub tier_id: Uuid,
    pub date: NaiveDate,
}

/// POST /v1/holds
pub async fn place_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HoldRequest>,
) -> Result<(StatusCode, Json<PlacedHold>), AppError> {
    let hold = state.holds.place_hold(req.tier_id, req.date, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(hold)))
}

/// DELETE /v1/holds
pub async fn release_hold(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<HoldRequest>,
) -> Result<StatusCode, AppError> {
    state.holds.release_hold(req.tier_id, req.date, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}
