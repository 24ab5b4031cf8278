use anyhow::Context;
use chrono::Weekday;
use slotbook_api::{
    app,
    state::{AppState, Settings, Stores},
    worker::start_sweep_worker,
};
use slotbook_booking::DummyCheckoutGateway;
use slotbook_core::clock::SystemClock;
use slotbook_core::payment::CheckoutGateway;
use slotbook_core::tier::InventoryTier;
use slotbook_store::app_config::{Config, PaymentProviderKind, StoreBackend};
use slotbook_store::{DbClient, MemoryStore, PostgresStore, RedisClient, StripeCheckoutGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slotbook_api=debug,slotbook_booking=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Slotbook API on port {}", config.server.port);

    let stores = match config.store.backend {
        StoreBackend::Postgres => {
            let db = DbClient::new(&config.database.url, config.database.max_connections)
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
            }
            Stores::shared(Arc::new(PostgresStore::new(db.pool.clone())))
        }
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; nothing survives a restart");
            let store = Arc::new(MemoryStore::new());
            seed_demo_tier(&store).await;
            Stores::shared(store)
        }
    };

    let gateway: Arc<dyn CheckoutGateway> = match config.payments.provider {
        PaymentProviderKind::Stripe => {
            let api_key = config
                .payments
                .stripe_api_key
                .clone()
                .context("payments.stripe_api_key is required for the stripe provider")?;
            Arc::new(StripeCheckoutGateway::new(
                config.payments.stripe_api_base.clone(),
                api_key,
                config.payments.success_url.clone(),
                config.payments.cancel_url.clone(),
            ))
        }
        PaymentProviderKind::Dummy => {
            tracing::warn!("Dummy payment provider active; post signed webhooks to complete checkouts");
            Arc::new(DummyCheckoutGateway::new(format!(
                "http://localhost:{}/dummy-checkout",
                config.server.port
            )))
        }
    };

    let mut app_state = AppState::new(stores, gateway, Arc::new(SystemClock), Settings::from_config(&config));

    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).context("Invalid Redis URL")?;
        app_state = app_state.with_rate_limit(Arc::new(client), redis.rate_limit_per_minute);
    }

    if config.business_rules.sweep_interval_seconds > 0 {
        tokio::spawn(start_sweep_worker(
            app_state.sweeper.clone(),
            tokio::time::Duration::from_secs(config.business_rules.sweep_interval_seconds),
        ));
    } else {
        tracing::info!("In-process sweeper disabled; expecting an external scheduler");
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}

/// Gives a memory-backed dev server something to book.
async fn seed_demo_tier(store: &MemoryStore) {
    let tier = InventoryTier {
        id: Uuid::new_v4(),
        newsletter_id: Uuid::new_v4(),
        newsletter_slug: "demo-weekly".to_string(),
        name: "Primary sponsor".to_string(),
        price_cents: 25_000,
        currency: "usd".to_string(),
        available_weekdays: vec![Weekday::Tue, Weekday::Thu],
        active: true,
    };
    tracing::info!("Seeded demo tier {} (Tuesdays and Thursdays)", tier.id);
    store.insert_tier(tier).await;
}
