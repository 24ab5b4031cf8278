use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use slotbook_shared::Masked;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Booking status in the lifecycle. Only ever moves forward.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Draft,
    PendingPayment,
    Paid,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Draft => "draft",
            BookingStatus::PendingPayment => "pending_payment",
            BookingStatus::Paid => "paid",
            BookingStatus::Approved => "approved",
            BookingStatus::Rejected => "rejected",
        }
    }

    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        use BookingStatus::*;
        matches!(
            (self, next),
            (Draft, PendingPayment)
                | (Draft, Paid)
                | (PendingPayment, PendingPayment)
                | (PendingPayment, Paid)
                | (Paid, Approved)
                | (Draft, Rejected)
                | (PendingPayment, Rejected)
                | (Paid, Rejected)
        )
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(BookingStatus::Draft),
            "pending_payment" => Ok(BookingStatus::PendingPayment),
            "paid" => Ok(BookingStatus::Paid),
            "approved" => Ok(BookingStatus::Approved),
            "rejected" => Ok(BookingStatus::Rejected),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdCreative {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl AdCreative {
    pub fn validate(&self) -> Result<(), String> {
        if self.headline.trim().is_empty() {
            return Err("headline must not be empty".to_string());
        }
        if !(self.link.starts_with("https://") || self.link.starts_with("http://")) {
            return Err("link must be an absolute http(s) URL".to_string());
        }
        if self.link.contains(char::is_whitespace) {
            return Err("link must not contain whitespace".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SponsorInfo {
    pub name: String,
    pub email: Masked<String>,
    #[serde(default)]
    pub creative: AdCreative,
}

/// Everything needed to insert a booking row.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub tier_id: Uuid,
    pub newsletter_slug: String,
    pub target_date: NaiveDate,
    pub sponsor_id: String,
    pub sponsor: SponsorInfo,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub tier_id: Uuid,
    pub newsletter_slug: String,
    pub target_date: NaiveDate,
    pub status: BookingStatus,
    pub sponsor_id: String,
    pub sponsor_name: String,
    pub sponsor_email: Masked<String>,
    pub creative: AdCreative,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NewBooking> for Booking {
    fn from(new: NewBooking) -> Self {
        Self {
            id: new.id,
            tier_id: new.tier_id,
            newsletter_slug: new.newsletter_slug,
            target_date: new.target_date,
            status: BookingStatus::Draft,
            sponsor_id: new.sponsor_id,
            sponsor_name: new.sponsor.name,
            sponsor_email: new.sponsor.email,
            creative: new.sponsor.creative,
            checkout_session_id: None,
            created_at: new.created_at,
            updated_at: new.created_at,
        }
    }
}
