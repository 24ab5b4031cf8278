use crate::events::SlotEvents;
use crate::schedule::validate_bookable;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use slotbook_core::clock::Clock;
use slotbook_core::repository::{SlotRepository, TierRepository};
use slotbook_core::slot::InventorySlot;
use slotbook_core::{BookingError, BookingResult};
use slotbook_shared::SlotChange;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct PlacedHold {
    pub tier_id: Uuid,
    pub date: NaiveDate,
    pub held_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Places and releases short exclusive holds while a sponsor negotiates a date.
///
/// The TTL is never enforced here; holds only end by release, booking, or the sweeper.
pub struct HoldManager {
    slots: Arc<dyn SlotRepository>,
    tiers: Arc<dyn TierRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    events: SlotEvents,
}

impl HoldManager {
    pub fn new(
        slots: Arc<dyn SlotRepository>,
        tiers: Arc<dyn TierRepository>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
        events: SlotEvents,
    ) -> Self {
        Self { slots, tiers, clock, ttl, events }
    }

    pub async fn place_hold(&self, tier_id: Uuid, date: NaiveDate, session_id: &str) -> BookingResult<PlacedHold> {
        let now = self.clock.now();
        validate_bookable(self.tiers.as_ref(), tier_id, date, now.date_naive()).await?;

        let slot = self
            .slots
            .try_hold(tier_id, date, session_id, now)
            .await?
            .ok_or(BookingError::SlotUnavailable)?;

        info!("Slot {} on {} held for tier {}", slot.id, date, tier_id);
        self.events.publish(tier_id, date, SlotChange::Held, now);

        Ok(self.placed(&slot, now))
    }

    pub async fn release_hold(&self, tier_id: Uuid, date: NaiveDate, session_id: &str) -> BookingResult<()> {
        if !self.slots.release_hold(tier_id, date, session_id).await? {
            debug!("Release of {} for tier {} matched no hold of this session", date, tier_id);
            return Err(BookingError::NotHolder);
        }

        info!("Hold on {} for tier {} released by its session", date, tier_id);
        self.events.publish(tier_id, date, SlotChange::Released, self.clock.now());
        Ok(())
    }

    fn placed(&self, slot: &InventorySlot, now: DateTime<Utc>) -> PlacedHold {
        PlacedHold {
            tier_id: slot.tier_id,
            date: slot.date,
            held_at: slot.held_at.unwrap_or(now),
            expires_at: slot.hold_expires_at(self.ttl).unwrap_or(now + self.ttl),
        }
    }
}
