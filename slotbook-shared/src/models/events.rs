use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotChange {
    Held,
    Released,
    Booked,
}

impl SlotChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotChange::Held => "slot_held",
            SlotChange::Released => "slot_released",
            SlotChange::Booked => "slot_booked",
        }
    }
}

/// Broadcast to calendar subscribers so they can gray out (or re-enable) a date.
/// Carries no session or booking identifiers.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SlotChangedEvent {
    pub tier_id: Uuid,
    pub date: NaiveDate,
    pub change: SlotChange,
    pub timestamp: i64,
}

impl SlotChangedEvent {
    pub fn new(tier_id: Uuid, date: NaiveDate, change: SlotChange, timestamp: i64) -> Self {
        Self { tier_id, date, change, timestamp }
    }
}
