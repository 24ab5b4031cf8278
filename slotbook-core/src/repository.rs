use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::booking::{AdCreative, Booking, BookingStatus, NewBooking};
use crate::slot::{HoldKey, InventorySlot};
use crate::tier::InventoryTier;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violation: {constraint:?}")]
    UniqueViolation { constraint: Option<String> },
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Availability store. The only writer of slot rows.
///
/// Every mutating method is a single conditional write; callers never read a
/// slot and then decide whether to write it.
#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Dates whose slot is held or booked, ascending.
    async fn blocked_dates(&self, tier_id: Uuid) -> StoreResult<Vec<NaiveDate>>;

    async fn find_slot(&self, tier_id: Uuid, date: NaiveDate) -> StoreResult<Option<InventorySlot>>;

    /// Inserts a held row, or flips an available row to held.
    /// Returns `None` when the slot is already held or booked.
    async fn try_hold(
        &self,
        tier_id: Uuid,
        date: NaiveDate,
        session_id: &str,
        held_at: DateTime<Utc>,
    ) -> StoreResult<Option<InventorySlot>>;

    /// Held -> available, only when `session_id` is the current holder.
    /// Returns whether a row changed.
    async fn release_hold(&self, tier_id: Uuid, date: NaiveDate, session_id: &str) -> StoreResult<bool>;

    /// Held slots stamped strictly before `cutoff`.
    async fn find_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InventorySlot>>;

    /// Batched release keyed by the given holds. Returns the holds actually
    /// released; keys whose slot moved on are skipped.
    async fn release_holds(&self, holds: &[HoldKey]) -> StoreResult<Vec<HoldKey>>;
}

/// Booking rows. Creation is atomic with the slot moving to booked.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Books the slot (available, or held by `session_id`) and inserts the draft
    /// booking in one transaction. A lost race surfaces as `UniqueViolation`.
    async fn create_booking(&self, booking: &NewBooking, session_id: &str) -> StoreResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>>;

    async fn list_bookings(&self, tier_id: Uuid) -> StoreResult<Vec<Booking>>;

    /// Replaces the creative while the booking is still a draft.
    async fn update_booking_content(
        &self,
        id: Uuid,
        creative: &AdCreative,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    /// Compare-and-set on status. `None` when the current status is not in `from`.
    async fn transition_status(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    /// Draft/pending -> pending_payment, remembering the provider's checkout session.
    async fn record_checkout(
        &self,
        id: Uuid,
        checkout_session_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>>;

    /// Marks the booking rejected and frees its slot in one transaction.
    async fn reject_booking(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Booking>>;
}

#[async_trait]
pub trait TierRepository: Send + Sync {
    async fn get_tier(&self, id: Uuid) -> StoreResult<Option<InventoryTier>>;

    async fn is_blackout(&self, newsletter_id: Uuid, date: NaiveDate) -> StoreResult<bool>;
}
