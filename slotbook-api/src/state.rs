use chrono::Duration;
use slotbook_booking::{
    AvailabilityService, BookingConfirmer, ExpirationSweeper, HoldManager, PaymentReconciler, SlotEvents,
};
use slotbook_core::clock::Clock;
use slotbook_core::payment::CheckoutGateway;
use slotbook_core::repository::{BookingRepository, SlotRepository, TierRepository};
use slotbook_store::app_config::Config;
use slotbook_store::RedisClient;
use std::sync::Arc;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// Repository handles. Both store backends implement all three.
#[derive(Clone)]
pub struct Stores {
    pub slots: Arc<dyn SlotRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub tiers: Arc<dyn TierRepository>,
}

impl Stores {
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: SlotRepository + BookingRepository + TierRepository + 'static,
    {
        Self {
            slots: store.clone(),
            bookings: store.clone(),
            tiers: store,
        }
    }
}

#[derive(Clone)]
pub struct Settings {
    pub auth: AuthConfig,
    pub hold_ttl: Duration,
    pub webhook_secret: String,
    pub signature_tolerance_seconds: i64,
    pub scheduler_token: Option<String>,
}

impl Settings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            auth: AuthConfig {
                secret: config.auth.jwt_secret.clone(),
                expiration: config.auth.jwt_expiration_seconds,
            },
            hold_ttl: Duration::seconds(config.business_rules.hold_ttl_seconds as i64),
            webhook_secret: config.payments.webhook_secret.clone(),
            signature_tolerance_seconds: config.payments.signature_tolerance_seconds,
            scheduler_token: config.scheduler.token.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimit {
    pub redis: Arc<RedisClient>,
    pub per_minute: i64,
}

#[derive(Clone)]
pub struct AppState {
    pub availability: Arc<AvailabilityService>,
    pub holds: Arc<HoldManager>,
    pub confirmer: Arc<BookingConfirmer>,
    pub sweeper: Arc<ExpirationSweeper>,
    pub reconciler: Arc<PaymentReconciler>,
    pub events: SlotEvents,
    pub auth: AuthConfig,
    pub scheduler_token: Option<String>,
    pub rate_limit: Option<RateLimit>,
}

impl AppState {
    pub fn new(stores: Stores, gateway: Arc<dyn CheckoutGateway>, clock: Arc<dyn Clock>, settings: Settings) -> Self {
        let events = SlotEvents::default();
        let confirmer = Arc::new(BookingConfirmer::new(
            stores.bookings.clone(),
            stores.tiers.clone(),
            gateway,
            clock.clone(),
            events.clone(),
        ));

        Self {
            availability: Arc::new(AvailabilityService::new(stores.slots.clone())),
            holds: Arc::new(HoldManager::new(
                stores.slots.clone(),
                stores.tiers.clone(),
                clock.clone(),
                settings.hold_ttl,
                events.clone(),
            )),
            sweeper: Arc::new(ExpirationSweeper::new(
                stores.slots,
                clock.clone(),
                settings.hold_ttl,
                events.clone(),
            )),
            reconciler: Arc::new(PaymentReconciler::new(
                confirmer.clone(),
                clock,
                settings.webhook_secret,
                settings.signature_tolerance_seconds,
            )),
            confirmer,
            events,
            auth: settings.auth,
            scheduler_token: settings.scheduler_token,
            rate_limit: None,
        }
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, per_minute: i64) -> Self {
        self.rate_limit = Some(RateLimit { redis, per_minute });
        self
    }
}
