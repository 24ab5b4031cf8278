use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use slotbook_core::booking::{AdCreative, Booking, SponsorInfo};
use slotbook_shared::Masked;
use uuid::Uuid;

use crate::{error::AppError, middleware::Claims, state::AppState};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateBookingRequest {
    pub tier_id: Uuid,
    pub date: NaiveDate,
    pub sponsor_name: String,
    pub sponsor_email: Masked<String>,
    #[serde(default)]
    pub creative: AdCreative,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub booking_id: Uuid,
    pub checkout_session_id: String,
    pub checkout_url: String,
}

// ============================================================================
// Sponsor Handlers
// ============================================================================

/// POST /v1/bookings
/// Confirms the caller's hold, or a free date, as a draft booking.
pub async fn create_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let sponsor = SponsorInfo {
        name: req.sponsor_name,
        email: req.sponsor_email,
        creative: req.creative,
    };
    let booking = state
        .confirmer
        .confirm_booking(req.tier_id, req.date, sponsor, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings/{booking_id}
pub async fn get_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.confirmer.get_owned_booking(booking_id, &claims.sub).await?;
    Ok(Json(booking))
}

/// PUT /v1/bookings/{booking_id}/content
pub async fn update_content(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(creative): Json<AdCreative>,
) -> Result<Json<Booking>, AppError> {
    let booking = state
        .confirmer
        .update_booking_content(booking_id, &claims.sub, creative)
        .await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{booking_id}/checkout
pub async fn begin_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let session = state.confirmer.begin_checkout(booking_id, &claims.sub).await?;
    Ok(Json(CheckoutResponse {
        booking_id,
        checkout_session_id: session.id,
        checkout_url: session.url,
    }))
}

// ============================================================================
// Creator Handlers
// ============================================================================

/// GET /v1/tiers/{tier_id}/bookings
pub async fn list_tier_bookings(
    State(state): State<AppState>,
    Path(tier_id): Path<Uuid>,
) -> Result<Json<Vec<Booking>>, AppError> {
    Ok(Json(state.confirmer.list_bookings(tier_id).await?))
}

/// POST /v1/bookings/{booking_id}/approve
pub async fn approve_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.confirmer.approve(booking_id).await?;
    tracing::info!("Booking {} approved by {}", booking_id, claims.sub);
    Ok(Json(booking))
}

/// POST /v1/bookings/{booking_id}/reject
pub async fn reject_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.confirmer.reject(booking_id).await?;
    tracing::info!("Booking {} rejected by {}", booking_id, claims.sub);
    Ok(Json(booking))
}
