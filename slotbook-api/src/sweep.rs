use axum::{extract::State, Json};
use slotbook_booking::SweepSummary;

use crate::{error::AppError, state::AppState};

/// POST /v1/internal/sweep
/// Same pass as the in-process worker, for deployments that drive it from cron.
pub async fn run_sweep(State(state): State<AppState>) -> Result<Json<SweepSummary>, AppError> {
    Ok(Json(state.sweeper.sweep().await?))
}
