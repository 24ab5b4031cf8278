use chrono::NaiveDate;
use slotbook_core::repository::SlotRepository;
use slotbook_core::BookingResult;
use std::sync::Arc;
use uuid::Uuid;

/// Public availability reads. Never exposes hold sessions or slot ids.
pub struct AvailabilityService {
    slots: Arc<dyn SlotRepository>,
}

impl AvailabilityService {
    pub fn new(slots: Arc<dyn SlotRepository>) -> Self {
        Self { slots }
    }

    /// Held or booked dates, ascending.
    pub async fn blocked_dates(&self, tier_id: Uuid) -> BookingResult<Vec<NaiveDate>> {
        let mut dates = self.slots.blocked_dates(tier_id).await?;
        dates.sort_unstable();
        dates.dedup();
        Ok(dates)
    }

    /// Advisory only. The answer can be stale by the time a hold is attempted.
    pub async fn is_available(&self, tier_id: Uuid, date: NaiveDate) -> BookingResult<bool> {
        let slot = self.slots.find_slot(tier_id, date).await?;
        Ok(slot.map_or(true, |s| !s.is_blocking()))
    }
}
