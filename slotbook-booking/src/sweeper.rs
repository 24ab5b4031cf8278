use crate::events::SlotEvents;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use slotbook_core::clock::Clock;
use slotbook_core::repository::SlotRepository;
use slotbook_core::slot::HoldKey;
use slotbook_core::BookingResult;
use slotbook_shared::SlotChange;
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SweepSummary {
    pub released_count: u64,
    /// Distinct, sorted.
    pub affected_sessions: Vec<String>,
    /// Holds placed before this instant were eligible.
    pub threshold: DateTime<Utc>,
}

/// Releases holds older than the TTL.
pub struct ExpirationSweeper {
    slots: Arc<dyn SlotRepository>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    events: SlotEvents,
}

impl ExpirationSweeper {
    pub fn new(slots: Arc<dyn SlotRepository>, clock: Arc<dyn Clock>, ttl: Duration, events: SlotEvents) -> Self {
        Self { slots, clock, ttl, events }
    }

    /// One pass. The release is keyed on the (slot, session) pairs that were
    /// read, so a slot booked or re-held by another session after the read is
    /// left alone, and only released slots are announced.
    pub async fn sweep(&self) -> BookingResult<SweepSummary> {
        let now = self.clock.now();
        let threshold = now - self.ttl;

        let expired = self.slots.find_expired_holds(threshold).await.map_err(|e| {
            error!("Sweep aborted, could not read expired holds: {:?}", e);
            e
        })?;

        let selected: Vec<_> = expired.iter().filter_map(|slot| slot.hold_key().map(|key| (slot, key))).collect();
        if selected.is_empty() {
            debug!("Sweep found no holds older than {}", threshold);
            return Ok(SweepSummary {
                released_count: 0,
                affected_sessions: Vec::new(),
                threshold,
            });
        }

        let keys: Vec<HoldKey> = selected.iter().map(|(_, key)| key.clone()).collect();
        let released = self.slots.release_holds(&keys).await.map_err(|e| {
            error!("Sweep failed to release {} expired holds: {:?}", keys.len(), e);
            e
        })?;
        let released_count = released.len() as u64;

        let affected_sessions: Vec<String> = released
            .iter()
            .map(|key| key.session_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let released: HashSet<HoldKey> = released.into_iter().collect();
        for (slot, key) in &selected {
            if released.contains(key) {
                self.events.publish(slot.tier_id, slot.date, SlotChange::Released, now);
            }
        }

        info!(
            "Sweep released {} of {} expired holds across {} sessions (threshold {})",
            released_count,
            keys.len(),
            affected_sessions.len(),
            threshold
        );

        Ok(SweepSummary {
            released_count,
            affected_sessions,
            threshold,
        })
    }
}
