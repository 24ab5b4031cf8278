use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, TimeZone, Utc, Weekday};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use slotbook_api::{
    app,
    middleware::Claims,
    state::{AppState, AuthConfig, Settings, Stores},
};
use slotbook_booking::DummyCheckoutGateway;
use slotbook_core::clock::{Clock, ManualClock};
use slotbook_core::payment::sign_payload;
use slotbook_core::tier::InventoryTier;
use slotbook_store::MemoryStore;
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const JWT_SECRET: &str = "test-secret";
const WEBHOOK_SECRET: &str = "whsec_test";
const CRON_TOKEN: &str = "cron-token";

struct TestApp {
    router: Router,
    clock: Arc<ManualClock>,
    tier_id: Uuid,
}

async fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let tier = InventoryTier {
        id: Uuid::new_v4(),
        newsletter_id: Uuid::new_v4(),
        newsletter_slug: "weekly-rust".to_string(),
        name: "Primary".to_string(),
        price_cents: 50_000,
        currency: "usd".to_string(),
        available_weekdays: vec![
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ],
        active: true,
    };
    let tier_id = tier.id;
    store.insert_tier(tier).await;

    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap()));
    let settings = Settings {
        auth: AuthConfig {
            secret: JWT_SECRET.to_string(),
            expiration: 3600,
        },
        hold_ttl: Duration::minutes(15),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        signature_tolerance_seconds: 300,
        scheduler_token: Some(CRON_TOKEN.to_string()),
    };
    let state = AppState::new(
        Stores::shared(store),
        Arc::new(DummyCheckoutGateway::new("http://localhost/checkout")),
        clock.clone(),
        settings,
    );

    TestApp {
        router: app(state),
        clock,
        tier_id,
    }
}

fn token(sub: &str, role: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn post_webhook(app: &TestApp, payload: &[u8], signature: Option<String>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/v1/webhooks/payments")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("Stripe-Signature", signature);
    }
    let response = app
        .router
        .clone()
        .oneshot(builder.body(Body::from(payload.to_vec())).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

fn completed_event(booking_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "id": "evt_1",
        "type": "checkout.session.completed",
        "data": { "object": { "id": "cs_test_1", "metadata": { "booking_id": booking_id } } }
    }))
    .unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = setup().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn test_two_sponsors_contend_for_one_date() {
    let app = setup().await;
    let a = token("sponsor-a", "SPONSOR");
    let b = token("sponsor-b", "SPONSOR");
    let hold = json!({ "tier_id": app.tier_id, "date": "2026-03-01" });

    let (status, body) = send(&app, Method::POST, "/v1/holds", Some(&a), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["expires_at"], json!("2026-02-20T09:15:00Z"));

    let (status, body) = send(&app, Method::POST, "/v1/holds", Some(&b), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("This date was just taken"));

    let uri = format!("/v1/tiers/{}/blocked-dates", app.tier_id);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blocked_dates"], json!(["2026-03-01"]));

    let uri = format!("/v1/tiers/{}/availability?date=2026-03-01", app.tier_id);
    let (status, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["available"], json!(false));

    let (status, _) = send(&app, Method::DELETE, "/v1/holds", Some(&b), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, Method::DELETE, "/v1/holds", Some(&a), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&b), Some(hold)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_concurrent_confirmations_one_wins() {
    let app = setup().await;
    let a = token("sponsor-a", "SPONSOR");
    let b = token("sponsor-b", "SPONSOR");
    let request = |name: &str| {
        json!({
            "tier_id": app.tier_id,
            "date": "2026-04-01",
            "sponsor_name": name,
            "sponsor_email": format!("{}@example.com", name.to_lowercase()),
        })
    };

    let ((status_a, _), (status_b, _)) = tokio::join!(
        send(&app, Method::POST, "/v1/bookings", Some(&a), Some(request("Acme"))),
        send(&app, Method::POST, "/v1/bookings", Some(&b), Some(request("Globex"))),
    );

    let mut statuses = [status_a, status_b];
    statuses.sort_by_key(|s| s.as_u16());
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::CONFLICT]);

    let creator = token("creator-1", "CREATOR");
    let uri = format!("/v1/tiers/{}/bookings", app.tier_id);
    let (status, body) = send(&app, Method::GET, &uri, Some(&creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_booking_lifecycle_through_payment_and_approval() {
    let app = setup().await;
    let sponsor = token("sponsor-a", "SPONSOR");
    let creator = token("creator-1", "CREATOR");

    let (status, booking) = send(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&sponsor),
        Some(json!({
            "tier_id": app.tier_id,
            "date": "2026-03-10",
            "sponsor_name": "Acme",
            "sponsor_email": "ads@acme.test",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], json!("draft"));
    let booking_id = booking["id"].as_str().unwrap().to_string();

    // Another sponsor cannot read or edit it
    let intruder = token("sponsor-b", "SPONSOR");
    let (status, _) = send(&app, Method::GET, &format!("/v1/bookings/{}", booking_id), Some(&intruder), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/v1/bookings/{}/content", booking_id),
        Some(&sponsor),
        Some(json!({ "headline": "", "body": "x", "link": "https://acme.test" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, updated) = send(
        &app,
        Method::PUT,
        &format!("/v1/bookings/{}/content", booking_id),
        Some(&sponsor),
        Some(json!({
            "headline": "Ship faster with Acme",
            "body": "Acme builds the build system you wish you had.",
            "link": "https://acme.test"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["creative"]["headline"], json!("Ship faster with Acme"));

    let (status, checkout) = send(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/checkout", booking_id),
        Some(&sponsor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(checkout["checkout_url"].as_str().unwrap().contains(&booking_id));

    // Approval before payment is refused
    let approve_uri = format!("/v1/bookings/{}/approve", booking_id);
    let (status, _) = send(&app, Method::POST, &approve_uri, Some(&creator), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let payload = completed_event(&booking_id);
    let signature = sign_payload(&payload, WEBHOOK_SECRET, app.clock.now().timestamp()).unwrap();
    let (status, outcome) = post_webhook(&app, &payload, Some(signature.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("paid"));

    // Redelivery
    let (status, outcome) = post_webhook(&app, &payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("already_paid"));

    // Only creators approve
    let (status, _) = send(&app, Method::POST, &approve_uri, Some(&sponsor), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, approved) = send(&app, Method::POST, &approve_uri, Some(&creator), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["status"], json!("approved"));

    let (status, seen) = send(&app, Method::GET, &format!("/v1/bookings/{}", booking_id), Some(&sponsor), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(seen["status"], json!("approved"));
}

#[tokio::test]
async fn test_rejection_reopens_the_date() {
    let app = setup().await;
    let sponsor = token("sponsor-a", "SPONSOR");
    let creator = token("creator-1", "CREATOR");

    let (_, booking) = send(
        &app,
        Method::POST,
        "/v1/bookings",
        Some(&sponsor),
        Some(json!({
            "tier_id": app.tier_id,
            "date": "2026-03-12",
            "sponsor_name": "Acme",
            "sponsor_email": "ads@acme.test",
        })),
    )
    .await;
    let booking_id = booking["id"].as_str().unwrap().to_string();

    let (status, rejected) = send(
        &app,
        Method::POST,
        &format!("/v1/bookings/{}/reject", booking_id),
        Some(&creator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rejected["status"], json!("rejected"));

    let uri = format!("/v1/tiers/{}/blocked-dates", app.tier_id);
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["blocked_dates"], json!([]));
}

#[tokio::test]
async fn test_webhook_signature_is_enforced() {
    let app = setup().await;
    let payload = completed_event(&Uuid::new_v4().to_string());

    let (status, _) = post_webhook(&app, &payload, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let wrong = sign_payload(&payload, "whsec_other", app.clock.now().timestamp()).unwrap();
    let (status, _) = post_webhook(&app, &payload, Some(wrong)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Correctly signed but for a booking this service never created
    let signature = sign_payload(&payload, WEBHOOK_SECRET, app.clock.now().timestamp()).unwrap();
    let (status, outcome) = post_webhook(&app, &payload, Some(signature)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["outcome"], json!("booking_missing"));
}

#[tokio::test]
async fn test_scheduler_sweep_releases_expired_holds() {
    let app = setup().await;
    let sponsor = token("sponsor-a", "SPONSOR");
    let hold = json!({ "tier_id": app.tier_id, "date": "2026-03-01" });
    send(&app, Method::POST, "/v1/holds", Some(&sponsor), Some(hold)).await;

    let (status, _) = send(&app, Method::POST, "/v1/internal/sweep", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::POST, "/v1/internal/sweep", Some("wrong"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.clock.advance(Duration::minutes(14));
    let (status, summary) = send(&app, Method::POST, "/v1/internal/sweep", Some(CRON_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["released_count"], json!(0));

    app.clock.advance(Duration::minutes(2));
    let (_, summary) = send(&app, Method::POST, "/v1/internal/sweep", Some(CRON_TOKEN), None).await;
    assert_eq!(summary["released_count"], json!(1));
    assert_eq!(summary["affected_sessions"], json!(["sponsor-a"]));

    let (_, summary) = send(&app, Method::POST, "/v1/internal/sweep", Some(CRON_TOKEN), None).await;
    assert_eq!(summary["released_count"], json!(0));
}

#[tokio::test]
async fn test_expired_hold_is_swept_and_retaken_by_second_sponsor() {
    let app = setup().await;
    let a = token("sponsor-a", "SPONSOR");
    let b = token("sponsor-b", "SPONSOR");
    let hold = json!({ "tier_id": app.tier_id, "date": "2026-03-01" });

    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&a), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    app.clock.advance(Duration::minutes(5));
    let (status, body) = send(&app, Method::POST, "/v1/holds", Some(&b), Some(hold.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!("This date was just taken"));

    app.clock.advance(Duration::minutes(15));
    let (status, summary) = send(&app, Method::POST, "/v1/internal/sweep", Some(CRON_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["released_count"], json!(1));
    assert_eq!(summary["affected_sessions"], json!(["sponsor-a"]));

    let uri = format!("/v1/tiers/{}/availability?date=2026-03-01", app.tier_id);
    let (_, body) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(body["available"], json!(true));

    let (status, body) = send(&app, Method::POST, "/v1/holds", Some(&b), Some(hold)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["expires_at"], json!("2026-02-20T09:35:00Z"));
}

#[tokio::test]
async fn test_guest_token_can_hold_and_auth_is_required() {
    let app = setup().await;
    let hold = json!({ "tier_id": app.tier_id, "date": "2026-03-02" });

    let (status, _) = send(&app, Method::POST, "/v1/holds", None, Some(hold.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(&app, Method::POST, "/v1/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let guest = login["token"].as_str().unwrap().to_string();
    assert!(login["session_id"].as_str().unwrap().starts_with("guest-"));

    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&guest), Some(hold)).await;
    assert_eq!(status, StatusCode::CREATED);

    // Creators do not hold slots
    let creator = token("creator-1", "CREATOR");
    let other = json!({ "tier_id": app.tier_id, "date": "2026-03-03" });
    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&creator), Some(other)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_unbookable_dates_and_unknown_tiers() {
    let app = setup().await;
    let sponsor = token("sponsor-a", "SPONSOR");

    let past = json!({ "tier_id": app.tier_id, "date": "2026-02-19" });
    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&sponsor), Some(past)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let unknown = json!({ "tier_id": Uuid::new_v4(), "date": "2026-03-02" });
    let (status, _) = send(&app, Method::POST, "/v1/holds", Some(&sponsor), Some(unknown)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
