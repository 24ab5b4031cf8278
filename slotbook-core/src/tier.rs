use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sellable ad product. Read-only for the booking service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryTier {
    pub id: Uuid,
    pub newsletter_id: Uuid,
    pub newsletter_slug: String,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub available_weekdays: Vec<Weekday>,
    pub active: bool,
}

impl InventoryTier {
    pub fn allows_weekday(&self, date: NaiveDate) -> bool {
        self.available_weekdays.contains(&date.weekday())
    }
}

/// ISO weekday number (Mon = 1 .. Sun = 7), the form stored in Postgres.
pub fn weekday_from_iso(n: i16) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}
