use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use slotbook_booking::ReconcileOutcome;

use crate::{error::AppError, state::AppState};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// POST /v1/webhooks/payments
/// The body is taken raw: the signature covers the exact bytes sent.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ReconcileOutcome>, AppError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let outcome = state.reconciler.handle_webhook(&body, signature).await?;
    tracing::info!("Payment webhook handled: {:?}", outcome);
    Ok(Json(outcome))
}
