use chrono::NaiveDate;
use slotbook_core::repository::TierRepository;
use slotbook_core::tier::InventoryTier;
use slotbook_core::{BookingError, BookingResult};
use uuid::Uuid;

/// Read-only checks run before any hold or booking write.
///
/// Returns the tier so callers can use its slug and price without a second read.
pub async fn validate_bookable(
    tiers: &dyn TierRepository,
    tier_id: Uuid,
    date: NaiveDate,
    today: NaiveDate,
) -> BookingResult<InventoryTier> {
    let tier = tiers
        .get_tier(tier_id)
        .await?
        .ok_or(BookingError::TierNotFound(tier_id))?;

    if !tier.active {
        return Err(BookingError::TierNotFound(tier_id));
    }
    if date < today {
        return Err(BookingError::DateNotBookable(format!("{} is in the past", date)));
    }
    if !tier.allows_weekday(date) {
        return Err(BookingError::DateNotBookable(format!(
            "{} is not sold on {}",
            tier.name,
            date.format("%A")
        )));
    }
    if tiers.is_blackout(tier.newsletter_id, date).await? {
        return Err(BookingError::DateNotBookable(format!("{} is a blackout date", date)));
    }

    Ok(tier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::tier_with_weekdays;
    use chrono::Weekday;
    use slotbook_store::MemoryStore;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[tokio::test]
    async fn test_validation_rules() {
        let store = MemoryStore::new();
        let tier = tier_with_weekdays(vec![Weekday::Tue, Weekday::Thu]);
        let tier_id = tier.id;
        let newsletter_id = tier.newsletter_id;
        store.insert_tier(tier).await;
        store.add_blackout(newsletter_id, d(2026, 3, 5)).await;
        let today = d(2026, 3, 2);

        // Tuesday
        assert!(validate_bookable(&store, tier_id, d(2026, 3, 3), today).await.is_ok());

        // Wednesday
        let err = validate_bookable(&store, tier_id, d(2026, 3, 4), today).await.unwrap_err();
        assert!(matches!(err, BookingError::DateNotBookable(_)));

        // Thursday, but blacked out
        let err = validate_bookable(&store, tier_id, d(2026, 3, 5), today).await.unwrap_err();
        assert!(matches!(err, BookingError::DateNotBookable(_)));

        // Tuesday last week
        let err = validate_bookable(&store, tier_id, d(2026, 2, 24), today).await.unwrap_err();
        assert!(matches!(err, BookingError::DateNotBookable(_)));

        let missing = Uuid::new_v4();
        let err = validate_bookable(&store, missing, d(2026, 3, 3), today).await.unwrap_err();
        assert!(matches!(err, BookingError::TierNotFound(id) if id == missing));
    }

    #[tokio::test]
    async fn test_inactive_tier_is_not_found() {
        let store = MemoryStore::new();
        let mut tier = tier_with_weekdays(vec![Weekday::Tue]);
        tier.active = false;
        let tier_id = tier.id;
        store.insert_tier(tier).await;

        let err = validate_bookable(&store, tier_id, d(2026, 3, 3), d(2026, 3, 1)).await.unwrap_err();
        assert!(matches!(err, BookingError::TierNotFound(_)));
    }
}
