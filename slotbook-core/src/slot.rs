use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Held,
    Booked,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "available",
            SlotStatus::Held => "held",
            SlotStatus::Booked => "booked",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(SlotStatus::Available),
            "held" => Ok(SlotStatus::Held),
            "booked" => Ok(SlotStatus::Booked),
            other => Err(format!("unknown slot status: {}", other)),
        }
    }
}

/// One bookable (tier, date) unit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventorySlot {
    pub id: Uuid,
    pub tier_id: Uuid,
    pub date: NaiveDate,
    pub status: SlotStatus,
    pub held_at: Option<DateTime<Utc>>,
    pub hold_session_id: Option<String>,
}

impl InventorySlot {
    pub fn held(tier_id: Uuid, date: NaiveDate, session_id: &str, held_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tier_id,
            date,
            status: SlotStatus::Held,
            held_at: Some(held_at),
            hold_session_id: Some(session_id.to_string()),
        }
    }

    pub fn booked(tier_id: Uuid, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            tier_id,
            date,
            status: SlotStatus::Booked,
            held_at: None,
            hold_session_id: None,
        }
    }

    pub fn hold(&mut self, session_id: &str, at: DateTime<Utc>) {
        self.status = SlotStatus::Held;
        self.held_at = Some(at);
        self.hold_session_id = Some(session_id.to_string());
    }

    pub fn make_available(&mut self) {
        self.status = SlotStatus::Available;
        self.held_at = None;
        self.hold_session_id = None;
    }

    pub fn book(&mut self) {
        self.status = SlotStatus::Booked;
        self.held_at = None;
        self.hold_session_id = None;
    }

    /// Held and booked slots are grayed out on the sponsor calendar.
    pub fn is_blocking(&self) -> bool {
        matches!(self.status, SlotStatus::Held | SlotStatus::Booked)
    }

    pub fn is_held_by(&self, session_id: &str) -> bool {
        self.status == SlotStatus::Held && self.hold_session_id.as_deref() == Some(session_id)
    }

    /// `held` carries both hold fields, every other status carries neither.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            SlotStatus::Held => self.held_at.is_some() && self.hold_session_id.is_some(),
            SlotStatus::Available | SlotStatus::Booked => {
                self.held_at.is_none() && self.hold_session_id.is_none()
            }
        }
    }

    pub fn hold_expires_at(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        match self.status {
            SlotStatus::Held => self.held_at.map(|at| at + ttl),
            _ => None,
        }
    }

    pub fn hold_key(&self) -> Option<HoldKey> {
        match (&self.status, &self.hold_session_id) {
            (SlotStatus::Held, Some(session_id)) => Some(HoldKey {
                slot_id: self.id,
                session_id: session_id.clone(),
            }),
            _ => None,
        }
    }
}

/// Identifies one specific hold: the slot plus the session that placed it.
/// Re-held by another session, the slot no longer matches. The same session
/// re-holding produces the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HoldKey {
    pub slot_id: Uuid,
    pub session_id: String,
}
