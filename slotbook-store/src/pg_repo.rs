use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use slotbook_core::booking::{AdCreative, Booking, BookingStatus, NewBooking};
use slotbook_core::repository::{BookingRepository, SlotRepository, StoreError, StoreResult, TierRepository};
use slotbook_core::slot::{HoldKey, InventorySlot};
use slotbook_core::tier::{weekday_from_iso, InventoryTier};
use slotbook_shared::Masked;
use sqlx::PgPool;
use uuid::Uuid;

/// Postgres-backed availability, booking and tier store.
///
/// Exclusivity comes from two indexes: the unique (tier_id, slot_date) key on
/// `inventory_slots` and the partial unique index on non-rejected bookings.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn store_err(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::UniqueViolation {
            constraint: db_err.constraint().map(str::to_string),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}

const SLOT_COLUMNS: &str = "id, tier_id, slot_date, status, held_at, hold_session_id";

const BOOKING_COLUMNS: &str = "id, tier_id, newsletter_slug, target_date, status, sponsor_id, sponsor_name, \
     sponsor_email, headline, body, link, image_ref, checkout_session_id, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct SlotRow {
    id: Uuid,
    tier_id: Uuid,
    slot_date: NaiveDate,
    status: String,
    held_at: Option<DateTime<Utc>>,
    hold_session_id: Option<String>,
}

impl TryFrom<SlotRow> for InventorySlot {
    type Error = StoreError;

    fn try_from(row: SlotRow) -> Result<Self, Self::Error> {
        Ok(InventorySlot {
            id: row.id,
            tier_id: row.tier_id,
            date: row.slot_date,
            status: row.status.parse().map_err(StoreError::Unavailable)?,
            held_at: row.held_at,
            hold_session_id: row.hold_session_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    tier_id: Uuid,
    newsletter_slug: String,
    target_date: NaiveDate,
    status: String,
    sponsor_id: String,
    sponsor_name: String,
    sponsor_email: String,
    headline: String,
    body: String,
    link: String,
    image_ref: Option<String>,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            tier_id: row.tier_id,
            newsletter_slug: row.newsletter_slug,
            target_date: row.target_date,
            status: row.status.parse().map_err(StoreError::Unavailable)?,
            sponsor_id: row.sponsor_id,
            sponsor_name: row.sponsor_name,
            sponsor_email: Masked::new(row.sponsor_email),
            creative: AdCreative {
                headline: row.headline,
                body: row.body,
                link: row.link,
                image_ref: row.image_ref,
            },
            checkout_session_id: row.checkout_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_booking(row: Option<BookingRow>) -> StoreResult<Option<Booking>> {
    row.map(Booking::try_from).transpose()
}

#[derive(sqlx::FromRow)]
struct TierRow {
    id: Uuid,
    newsletter_id: Uuid,
    newsletter_slug: String,
    name: String,
    price_cents: i64,
    currency: String,
    available_weekdays: Vec<i16>,
    active: bool,
}

impl From<TierRow> for InventoryTier {
    fn from(row: TierRow) -> Self {
        InventoryTier {
            id: row.id,
            newsletter_id: row.newsletter_id,
            newsletter_slug: row.newsletter_slug,
            name: row.name,
            price_cents: row.price_cents,
            currency: row.currency,
            available_weekdays: row.available_weekdays.into_iter().filter_map(weekday_from_iso).collect(),
            active: row.active,
        }
    }
}

#[async_trait]
impl SlotRepository for PostgresStore {
    async fn blocked_dates(&self, tier_id: Uuid) -> StoreResult<Vec<NaiveDate>> {
        sqlx::query_scalar::<_, NaiveDate>(
            r#"
            SELECT slot_date FROM inventory_slots
            WHERE tier_id = $1 AND status IN ('held', 'booked')
            ORDER BY slot_date
            "#,
        )
        .bind(tier_id)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)
    }

    async fn find_slot(&self, tier_id: Uuid, date: NaiveDate) -> StoreResult<Option<InventorySlot>> {
        let sql = format!("SELECT {} FROM inventory_slots WHERE tier_id = $1 AND slot_date = $2", SLOT_COLUMNS);
        let row = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(tier_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(InventorySlot::try_from).transpose()
    }

    async fn try_hold(
        &self,
        tier_id: Uuid,
        date: NaiveDate,
        session_id: &str,
        held_at: DateTime<Utc>,
    ) -> StoreResult<Option<InventorySlot>> {
        // The WHERE on the conflict arm makes held/booked rows return nothing
        let sql = format!(
            r#"
            INSERT INTO inventory_slots (id, tier_id, slot_date, status, held_at, hold_session_id)
            VALUES ($1, $2, $3, 'held', $4, $5)
            ON CONFLICT (tier_id, slot_date) DO UPDATE
                SET status = 'held', held_at = EXCLUDED.held_at, hold_session_id = EXCLUDED.hold_session_id
                WHERE inventory_slots.status = 'available'
            RETURNING {}
            "#,
            SLOT_COLUMNS
        );
        let row = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(tier_id)
            .bind(date)
            .bind(held_at)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        row.map(InventorySlot::try_from).transpose()
    }

    async fn release_hold(&self, tier_id: Uuid, date: NaiveDate, session_id: &str) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE inventory_slots
            SET status = 'available', held_at = NULL, hold_session_id = NULL
            WHERE tier_id = $1 AND slot_date = $2 AND status = 'held' AND hold_session_id = $3
            "#,
        )
        .bind(tier_id)
        .bind(date)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_expired_holds(&self, cutoff: DateTime<Utc>) -> StoreResult<Vec<InventorySlot>> {
        let sql = format!(
            "SELECT {} FROM inventory_slots WHERE status = 'held' AND held_at < $1 ORDER BY held_at",
            SLOT_COLUMNS
        );
        let rows = sqlx::query_as::<_, SlotRow>(&sql)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(InventorySlot::try_from).collect()
    }

    async fn release_holds(&self, holds: &[HoldKey]) -> StoreResult<Vec<HoldKey>> {
        if holds.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = holds.iter().map(|h| h.slot_id).collect();
        let sessions: Vec<String> = holds.iter().map(|h| h.session_id.clone()).collect();

        let released: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            UPDATE inventory_slots AS s
            SET status = 'available', held_at = NULL, hold_session_id = NULL
            FROM UNNEST($1::uuid[], $2::text[]) AS expired(id, session_id)
            WHERE s.id = expired.id
              AND s.status = 'held'
              AND s.hold_session_id = expired.session_id
            RETURNING s.id, expired.session_id
            "#,
        )
        .bind(ids)
        .bind(sessions)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(released
            .into_iter()
            .map(|(slot_id, session_id)| HoldKey { slot_id, session_id })
            .collect())
    }
}

#[async_trait]
impl BookingRepository for PostgresStore {
    async fn create_booking(&self, booking: &NewBooking, session_id: &str) -> StoreResult<Booking> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        // Claim the slot: fresh row, available row, or our own hold. Anything else is taken.
        let claimed: Option<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO inventory_slots (id, tier_id, slot_date, status)
            VALUES ($1, $2, $3, 'booked')
            ON CONFLICT (tier_id, slot_date) DO UPDATE
                SET status = 'booked', held_at = NULL, hold_session_id = NULL
                WHERE inventory_slots.status = 'available'
                   OR (inventory_slots.status = 'held' AND inventory_slots.hold_session_id = $4)
            RETURNING id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.tier_id)
        .bind(booking.target_date)
        .bind(session_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(store_err)?;

        if claimed.is_none() {
            // Dropping the transaction rolls it back
            return Err(StoreError::UniqueViolation {
                constraint: Some("inventory_slots_tier_date_key".to_string()),
            });
        }

        let sql = format!(
            r#"
            INSERT INTO bookings (id, tier_id, newsletter_slug, target_date, status, sponsor_id, sponsor_name,
                                  sponsor_email, headline, body, link, image_ref, created_at, updated_at)
            VALUES ($1, $2, $3, $4, 'draft', $5, $6, $7, $8, $9, $10, $11, $12, $12)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.id)
            .bind(booking.tier_id)
            .bind(&booking.newsletter_slug)
            .bind(booking.target_date)
            .bind(&booking.sponsor_id)
            .bind(&booking.sponsor.name)
            .bind(booking.sponsor.email.expose())
            .bind(&booking.sponsor.creative.headline)
            .bind(&booking.sponsor.creative.body)
            .bind(&booking.sponsor.creative.link)
            .bind(booking.sponsor.creative.image_ref.as_deref())
            .bind(booking.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        Booking::try_from(row)
    }

    async fn get_booking(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        map_booking(row)
    }

    async fn list_bookings(&self, tier_id: Uuid) -> StoreResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE tier_id = $1 ORDER BY target_date, created_at",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(tier_id)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;

        rows.into_iter().map(Booking::try_from).collect()
    }

    async fn update_booking_content(
        &self,
        id: Uuid,
        creative: &AdCreative,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET headline = $2, body = $3, link = $4, image_ref = $5, updated_at = $6
            WHERE id = $1 AND status = 'draft'
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(&creative.headline)
            .bind(&creative.body)
            .bind(&creative.link)
            .bind(creative.image_ref.as_deref())
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        map_booking(row)
    }

    async fn transition_status(
        &self,
        id: Uuid,
        from: &[BookingStatus],
        to: BookingStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let from: Vec<String> = from.iter().map(|s| s.as_str().to_string()).collect();
        let sql = format!(
            r#"
            UPDATE bookings SET status = $2, updated_at = $3
            WHERE id = $1 AND status = ANY($4::text[])
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(to.as_str())
            .bind(at)
            .bind(from)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        map_booking(row)
    }

    async fn record_checkout(
        &self,
        id: Uuid,
        checkout_session_id: &str,
        at: DateTime<Utc>,
    ) -> StoreResult<Option<Booking>> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET status = 'pending_payment', checkout_session_id = $2, updated_at = $3
            WHERE id = $1 AND status IN ('draft', 'pending_payment')
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(checkout_session_id)
            .bind(at)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;

        map_booking(row)
    }

    async fn reject_booking(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<Option<Booking>> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let sql = format!(
            r#"
            UPDATE bookings SET status = 'rejected', updated_at = $2
            WHERE id = $1 AND status IN ('draft', 'pending_payment', 'paid')
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(at)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        sqlx::query(
            r#"
            UPDATE inventory_slots
            SET status = 'available', held_at = NULL, hold_session_id = NULL
            WHERE tier_id = $1 AND slot_date = $2 AND status = 'booked'
            "#,
        )
        .bind(row.tier_id)
        .bind(row.target_date)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        tx.commit().await.map_err(store_err)?;

        Booking::try_from(row).map(Some)
    }
}

#[async_trait]
impl TierRepository for PostgresStore {
    async fn get_tier(&self, id: Uuid) -> StoreResult<Option<InventoryTier>> {
        let row = sqlx::query_as::<_, TierRow>(
            r#"
            SELECT t.id, t.newsletter_id, n.slug AS newsletter_slug, t.name, t.price_cents,
                   t.currency, t.available_weekdays, t.active
            FROM inventory_tiers t
            JOIN newsletters n ON n.id = t.newsletter_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(InventoryTier::from))
    }

    async fn is_blackout(&self, newsletter_id: Uuid, date: NaiveDate) -> StoreResult<bool> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM blackout_dates WHERE newsletter_id = $1 AND blackout_date = $2)",
        )
        .bind(newsletter_id)
        .bind(date)
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)
    }
}
