use axum::{
    extract::{ConnectInfo, Request, State},
    http::{Method, StatusCode},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod availability;
pub mod bookings;
pub mod error;
pub mod holds;
pub mod middleware;
pub mod state;
pub mod sweep;
pub mod webhooks;
pub mod worker;

pub use state::AppState;

use middleware::{creator_auth_middleware, scheduler_auth_middleware, sponsor_auth_middleware};

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let sponsor_routes = Router::new()
        .route("/v1/holds", post(holds::place_hold).delete(holds::release_hold))
        .route("/v1/bookings", post(bookings::create_booking))
        .route("/v1/bookings/{booking_id}", get(bookings::get_booking))
        .route("/v1/bookings/{booking_id}/content", put(bookings::update_content))
        .route("/v1/bookings/{booking_id}/checkout", post(bookings::begin_checkout))
        .route_layer(from_fn_with_state(state.clone(), sponsor_auth_middleware));

    let creator_routes = Router::new()
        .route("/v1/tiers/{tier_id}/bookings", get(bookings::list_tier_bookings))
        .route("/v1/bookings/{booking_id}/approve", post(bookings::approve_booking))
        .route("/v1/bookings/{booking_id}/reject", post(bookings::reject_booking))
        .route_layer(from_fn_with_state(state.clone(), creator_auth_middleware));

    let internal_routes = Router::new()
        .route("/v1/internal/sweep", post(sweep::run_sweep))
        .route_layer(from_fn_with_state(state.clone(), scheduler_auth_middleware));

    Router::new()
        .route("/health", get(health))
        .merge(auth::routes())
        .merge(availability::routes())
        .merge(webhooks::routes())
        .merge(sponsor_routes)
        .merge(creator_routes)
        .merge(internal_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Fixed window per client IP. Disabled without Redis, and fails open when
/// Redis is unreachable.
async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(limit) = &state.rate_limit else {
        return next.run(req).await;
    };
    let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>().cloned() else {
        return next.run(req).await;
    };

    let key = slotbook_store::redis_repo::rate_limit_key(&addr.ip().to_string());
    match limit.redis.check_rate_limit(&key, limit.per_minute, 60).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(e) => {
            tracing::warn!("Rate limiter unavailable, allowing request: {}", e);
            next.run(req).await
        }
    }
}
