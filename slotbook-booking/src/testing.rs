use crate::{BookingConfirmer, DummyCheckoutGateway, ExpirationSweeper, HoldManager, SlotEvents};
use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};
use slotbook_core::booking::{AdCreative, SponsorInfo};
use slotbook_core::clock::ManualClock;
use slotbook_core::tier::InventoryTier;
use slotbook_shared::Masked;
use slotbook_store::MemoryStore;
use std::sync::Arc;
use uuid::Uuid;

pub(crate) const ALL_WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

pub(crate) fn tier_with_weekdays(available_weekdays: Vec<Weekday>) -> InventoryTier {
    InventoryTier {
        id: Uuid::new_v4(),
        newsletter_id: Uuid::new_v4(),
        newsletter_slug: "weekly-rust".to_string(),
        name: "Primary".to_string(),
        price_cents: 50_000,
        currency: "usd".to_string(),
        available_weekdays,
        active: true,
    }
}

pub(crate) fn sponsor(name: &str) -> SponsorInfo {
    SponsorInfo {
        name: name.to_string(),
        email: Masked::new(format!("{}@example.com", name.to_lowercase())),
        creative: AdCreative::default(),
    }
}

pub(crate) fn creative() -> AdCreative {
    AdCreative {
        headline: "Ship faster with Acme".to_string(),
        body: "Acme builds the build system you wish you had.".to_string(),
        link: "https://acme.test/?ref=weekly-rust".to_string(),
        image_ref: None,
    }
}

pub(crate) fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 20, 9, 0, 0).unwrap()
}

/// One tier that sells every weekday, a memory store and a hand-driven clock.
pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: SlotEvents,
    pub tier: InventoryTier,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let tier = tier_with_weekdays(ALL_WEEKDAYS.to_vec());
        store.insert_tier(tier.clone()).await;
        Self {
            store,
            clock: Arc::new(ManualClock::new(start())),
            events: SlotEvents::default(),
            tier,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::minutes(15)
    }

    pub fn holds(&self) -> HoldManager {
        HoldManager::new(
            self.store.clone(),
            self.store.clone(),
            self.clock.clone(),
            self.ttl(),
            self.events.clone(),
        )
    }

    pub fn confirmer(&self) -> BookingConfirmer {
        BookingConfirmer::new(
            self.store.clone(),
            self.store.clone(),
            Arc::new(DummyCheckoutGateway::new("http://localhost:3000/checkout")),
            self.clock.clone(),
            self.events.clone(),
        )
    }

    pub fn sweeper(&self) -> ExpirationSweeper {
        ExpirationSweeper::new(self.store.clone(), self.clock.clone(), self.ttl(), self.events.clone())
    }
}
