use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use slotbook_core::booking::{AdCreative, Booking, BookingStatus, NewBooking};
use slotbook_core::repository::{BookingRepository, SlotRepository, StoreError, StoreResult, TierRepository};
use slotbook_core::slot::{HoldKey, InventorySlot, SlotStatus};
use slotbook_core::tier::InventoryTier;
use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap, HashSet};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    slots: HashMap<(Uuid, NaiveDate), InventorySlot>,
    bookings: HashMap<Uuid, Booking>,
    tiers: HashMap<Uuid, InventoryTier>,
    blackouts: HashSet<(Uuid, NaiveDate)>,
}

impl MemoryState {
    fn active_booking_exists(&self, tier_id: Uuid, date: NaiveDate) -> bool {
        self.bookings
            .values()
            .any(|b| b.tier_id == tier_id && b.target_date == date && b.status != BookingStatus::Rejected)
    }
}

/// In-process store for tests and single-instance development.
///
/// Each trait method runs start to finish under one lock, which gives it the
/// same all-or-nothing behavior as the Postgres statements it mirrors.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tiers are managed outside the booking service; this stands in for that.
    pub async fn insert_tier(&self, tier: InventoryTier) {
        self.state.lock().await.tiers.insert(tier.id, tier);
    }

    pub async fn add_blackout(&self, newsletter_id: Uuid, date: NaiveDate) {
        self.state.lock().await.blackouts.insert((newsletter_id, date));
    }

    pub async fn slot_count(&self) -> usize {
        self.state.lock().await.slots.len()
    }
}

#[async_trait]
impl SlotRepository for MemoryStore {
    async fn blocked_dates(&self, tier_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        let state = self.state.lock().await;
        let dates: BTreeSet<NaiveDate> = state
            .slots
            .values()
            .filter(|s| s.tier_id == tier_id && s.is_blocking())
            .map(|s| s.date)
            .collect();
        Ok(dates.into_iter().collect())
    }

    async fn find_slot(&self, tier_id: Uuid, date: NaiveDate) -> StoreResult<Option<InventorySlot>> {
        Ok(self.state.lock().await.slots.get(&(tier_id, date)).cloned())
    }

    async fn try_hold(
        &self,
        tier_id: Uuid,
        date: NaiveDate,
        session_id: &str,
        held_at: DateTime<Utc>,
    ) -> StoreResult<Option<InventorySlot>> {
        let mut state = self.state.lock().await;
        match state.slots.entry((tier_id, date)) {
            Entry::Occupied(mut entry) => {
                let slot = entry.get_mut();
                if slot.status != SlotStatus::Available {
                    return Ok(None);
                }
                slot.hold(session_id, held_at);
                Ok(Some(slot.clone()))
            }
            Entry::Vacant(entry) => {
                let slot = InventorySlot::held(tier_id, date, session_id, held_at);
                entry.insert(slot.clone());
                Ok(Some(slot))
            }
        }
    }

    async fn release_hold(&self, tier_id: Uuid, date: NaiveDate, session_id: &str) -> StoreResult<bool> {
        let mut state = self.state.lock().await;
        match state.slots.get_mut(&(tier_id, date)) {
            Some(slot) if slot.is_held_by(session_id) => {
                slot.make_available();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InventorySlot>> {
        let state = self.state.lock().await;
        let mut expired: Vec<InventorySlot> = state
            .slots
            .values()
            .filter(|s| s.status == SlotStatus::Held && s.held_at.map_or(false, |at| at < cutoff))
            .cloned()
            .collect();
        expired.sort_by_key(|s| s.held_at);
        Ok(expired)
    }

    async fn release_holds(&self, holds: &[HoldKey]) -> StoreResult<Vec<HoldKey>> {
        let mut state = self.state.lock().await;
        let wanted: HashSet<&HoldKey> = holds.iter().collect();
        let mut released = Vec::new();
        for slot in state.slots.values_mut() {
            if let Some(key) = slot.hold_key().filter(|key| wanted.contains(key)) {
                slot.make_available();
                released.push(key);
            }
        }
        Ok(released)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_booking(&self, booking: &NewBooking, session_id: &str) -> StoreResult<Booking> {
        let mut state = self.state.lock().await;
        let key = (booking.tier_id, booking.target_date);

        let claimable = match state.slots.get(&key) {
            None => true,
            Some(slot) => slot.status == SlotStatus::Available || slot.is_held_by(session_id),
        };
        if !claimable {
            return Err(StoreError::UniqueViolation {
                constraint: Some("inventory_slots_tier_date_key".to_string()),
            });
        }
        if state.active_booking_exists(booking.tier_id, booking.target_date) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("bookings_tier_date_active_key".to_string()),
            });
        }
        if state.bookings.contains_key(&booking.id) {
            return Err(StoreError::UniqueViolation {
                constraint: Some("bookings_pkey".to_string()),
            });
        }

        state
            .slots
            .entry(key)
            .or_insert_with(|| InventorySlot::booked(booking.tier_id, booking.target_date))
            .book();

        let created = Booking::from(booking.clone());
        state.bookings.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.state.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, tier_id: Uuid) -> StoreResult<Vec<Booking>> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state.bookings.values().filter(|b| b.tier_id == tier_id).cloned().collect();
        bookings.sort_by_key(|b| (b.target_date, b.created_at));
        Ok(bookings)
    }

    async fn update_booking_content(
        &self,
        id: Uuid,
        creative: &AdCreative,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if booking.status == BookingStatus::Draft => {
                booking.creative = creative.clone();
                booking.updated_at = at;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if from.contains(&booking.status) => {
                booking.status = to;
                booking.updated_at = at;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn record_checkout(
        &self,
        id: Uuid,
        checkout_session_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let mut state = self.state.lock().await;
        match state.bookings.get_mut(&id) {
            Some(booking) if matches!(booking.status, BookingStatus::Draft | BookingStatus::PendingPayment) => {
                booking.status = BookingStatus::PendingPayment;
                booking.checkout_session_id = Some(checkout_session_id.to_string());
                booking.updated_at = at;
                Ok(Some(booking.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn reject_booking(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Booking>> {
        let mut state = self.state.lock().await;
        let rejected = match state.bookings.get_mut(&id) {
            Some(booking) if booking.status.can_transition_to(BookingStatus::Rejected) => {
                booking.status = BookingStatus::Rejected;
                booking.updated_at = at;
                booking.clone()
            }
            _ => return Ok(None),
        };

        if let Some(slot) = state.slots.get_mut(&(rejected.tier_id, rejected.target_date)) {
            if slot.status == SlotStatus::Booked {
                slot.make_available();
            }
        }
        Ok(Some(rejected))
    }
}

#[async_trait]
impl TierRepository for MemoryStore {
    async fn get_tier(&self, id: Uuid) -> StoreResult<Option<InventoryTier>> {
        Ok(self.state.lock().await.tiers.get(&id).cloned())
    }

    async fn is_blackout(&self, newsletter_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        Ok(self.state.lock().await.blackouts.contains(&(newsletter_id, date)))
    }
}
