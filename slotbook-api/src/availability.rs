use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
pub struct BlockedDatesResponse {
    pub tier_id: Uuid,
    pub blocked_dates: Vec<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub tier_id: Uuid,
    pub date: NaiveDate,
    pub available: bool,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/tiers/{tier_id}/blocked-dates", get(blocked_dates))
        .route("/v1/tiers/{tier_id}/availability", get(date_availability))
        .route("/v1/tiers/{tier_id}/stream", get(stream_slot_changes))
}

/// GET /v1/tiers/{tier_id}/blocked-dates
async fn blocked_dates(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
) -> Result<Json<BlockedDatesResponse>, AppError> {
    let blocked_dates = state.availability.blocked_dates(tier_id).await?;
    Ok(Json(BlockedDatesResponse { tier_id, blocked_dates }))
}

/// GET /v1/tiers/{tier_id}/availability?date=YYYY-MM-DD
/// Advisory only; a hold attempt is the real check.
async fn date_availability(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailabilityResponse>, AppError> {
    let available = state.availability.is_available(tier_id, query.date).await?;
    Ok(Json(AvailabilityResponse {
        tier_id,
        date: query.date,
        available,
    }))
}

/// GET /v1/tiers/{tier_id}/stream
/// Live slot changes so open calendars can grey out dates without polling.
async fn stream_slot_changes(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(move |result| async move {
        match result {
            Ok(event) if event.tier_id == tier_id => Event::default()
                .event(event.change.as_str())
                .json_data(&event)
                .ok()
                .map(Ok),
            Ok(_) => None,
            // Lagged receivers skip ahead; the client can refetch blocked dates
            Err(_) => None,
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
