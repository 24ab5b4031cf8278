use crate::events::SlotEvents;
use crate::schedule::validate_bookable;
use chrono::NaiveDate;
use slotbook_core::booking::{AdCreative, Booking, BookingStatus, NewBooking, SponsorInfo};
use slotbook_core::clock::Clock;
use slotbook_core::payment::{CheckoutGateway, CheckoutSession};
use slotbook_core::repository::{BookingRepository, TierRepository};
use slotbook_core::{BookingError, BookingResult};
use slotbook_shared::pii::redact_email;
use slotbook_shared::SlotChange;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Result of applying a payment confirmation.
#[derive(Debug, Clone)]
pub enum PaymentOutcome {
    Paid(Booking),
    /// Duplicate delivery, or the creator already approved.
    AlreadyPaid(Booking),
    /// Paid after the creator rejected; left for a manual refund.
    Rejected(Booking),
}

/// Owns booking creation and every status transition after it.
///
/// All writes are single conditional store calls; nothing here reads a status
/// and then writes based on it.
pub struct BookingConfirmer {
    bookings: Arc<dyn BookingRepository>,
    tiers: Arc<dyn TierRepository>,
    gateway: Arc<dyn CheckoutGateway>,
    clock: Arc<dyn Clock>,
    events: SlotEvents,
}

impl BookingConfirmer {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        tiers: Arc<dyn TierRepository>,
        gateway: Arc<dyn CheckoutGateway>,
        clock: Arc<dyn Clock>,
        events: SlotEvents,
    ) -> Self {
        Self {
            bookings,
            tiers,
            gateway,
            clock,
            events,
        }
    }

    /// Converts the caller's hold (or a free date) into a draft booking.
    ///
    /// A slot held by another session, already booked, or lost to a concurrent
    /// confirmation is reported as `SlotConflict`.
    pub async fn confirm_booking(
        &self,
        tier_id: Uuid,
        date: NaiveDate,
        sponsor: SponsorInfo,
        session_id: &str,
    ) -> BookingResult<Booking> {
        let now = self.clock.now();
        let tier = validate_bookable(self.tiers.as_ref(), tier_id, date, now.date_naive()).await?;

        if sponsor.name.trim().is_empty() {
            return Err(BookingError::InvalidContent("sponsor name must not be empty".to_string()));
        }
        if !sponsor.email.expose().contains('@') {
            return Err(BookingError::InvalidContent("sponsor email is not valid".to_string()));
        }

        let sponsor_email = redact_email(sponsor.email.expose());
        let new_booking = NewBooking {
            id: Uuid::new_v4(),
            tier_id,
            newsletter_slug: tier.newsletter_slug.clone(),
            target_date: date,
            sponsor_id: session_id.to_string(),
            sponsor,
            created_at: now,
        };

        let booking = match self.bookings.create_booking(&new_booking, session_id).await {
            Ok(booking) => booking,
            Err(e) => {
                let err = BookingError::from(e);
                if matches!(err, BookingError::SlotConflict) {
                    info!("Booking for {} on tier {} lost the slot to another sponsor", date, tier_id);
                }
                return Err(err);
            }
        };

        info!(
            "Booking {} created for {} on {} ({})",
            booking.id, tier.newsletter_slug, date, sponsor_email
        );
        self.events.publish(tier_id, date, SlotChange::Booked, now);
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> BookingResult<Booking> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound(booking_id))
    }

    /// Sponsor-facing read: only the identity that created the booking sees it.
    pub async fn get_owned_booking(&self, booking_id: Uuid, sponsor_id: &str) -> BookingResult<Booking> {
        let booking = self.get_booking(booking_id).await?;
        if booking.sponsor_id != sponsor_id {
            return Err(BookingError::NotOwner);
        }
        Ok(booking)
    }

    pub async fn list_bookings(&self, tier_id: Uuid) -> BookingResult<Vec<Booking>> {
        Ok(self.bookings.list_bookings(tier_id).await?)
    }

    pub async fn update_booking_content(
        &self,
        booking_id: Uuid,
        sponsor_id: &str,
        creative: AdCreative,
    ) -> BookingResult<Booking> {
        let booking = self.get_owned_booking(booking_id, sponsor_id).await?;
        if booking.status != BookingStatus::Draft {
            return Err(locked_content(booking.status));
        }
        creative.validate().map_err(BookingError::InvalidContent)?;

        match self
            .bookings
            .update_booking_content(booking_id, &creative, self.clock.now())
            .await?
        {
            Some(updated) => Ok(updated),
            // Moved past draft between the read and the write
            None => {
                let current = self.get_booking(booking_id).await?;
                Err(locked_content(current.status))
            }
        }
    }

    /// Opens a hosted checkout and moves the booking to `pending_payment`.
    ///
    /// Calling it again while pending creates a fresh provider session.
    pub async fn begin_checkout(&self, booking_id: Uuid, sponsor_id: &str) -> BookingResult<CheckoutSession> {
        let booking = self.get_owned_booking(booking_id, sponsor_id).await?;
        if !matches!(booking.status, BookingStatus::Draft | BookingStatus::PendingPayment) {
            return Err(BookingError::InvalidTransition {
                from: booking.status,
                to: BookingStatus::PendingPayment,
            });
        }
        booking
            .creative
            .validate()
            .map_err(|reason| BookingError::InvalidContent(format!("ad content incomplete: {}", reason)))?;

        let tier = self
            .tiers
            .get_tier(booking.tier_id)
            .await?
            .ok_or(BookingError::TierNotFound(booking.tier_id))?;

        let session = self
            .gateway
            .create_checkout(&booking, &tier)
            .await
            .map_err(|e| BookingError::Payment(e.to_string()))?;

        let recorded = self
            .bookings
            .record_checkout(booking_id, &session.id, self.clock.now())
            .await?;
        if recorded.is_none() {
            let current = self.get_booking(booking_id).await?;
            warn!(
                "Checkout session {} for booking {} abandoned, booking moved to {}",
                session.id, booking_id, current.status
            );
            return Err(BookingError::InvalidTransition {
                from: current.status,
                to: BookingStatus::PendingPayment,
            });
        }

        info!("Checkout session {} opened for booking {}", session.id, booking_id);
        Ok(session)
    }

    /// Idempotent: repeated confirmations of the same payment are no-ops.
    pub async fn mark_paid(&self, booking_id: Uuid) -> BookingResult<PaymentOutcome> {
        // Status only moves forward, so a lost CAS settles within a couple of rounds
        for _ in 0..3 {
            if let Some(paid) = self
                .bookings
                .transition_status(
                    booking_id,
                    &[BookingStatus::Draft, BookingStatus::PendingPayment],
                    BookingStatus::Paid,
                    self.clock.now(),
                )
                .await?
            {
                info!("Booking {} marked paid", booking_id);
                return Ok(PaymentOutcome::Paid(paid));
            }

            let current = self.get_booking(booking_id).await?;
            match current.status {
                BookingStatus::Paid | BookingStatus::Approved => {
                    info!("Booking {} already {}, payment confirmation ignored", booking_id, current.status);
                    return Ok(PaymentOutcome::AlreadyPaid(current));
                }
                BookingStatus::Rejected => {
                    warn!("Payment received for rejected booking {}; needs a manual refund", booking_id);
                    return Ok(PaymentOutcome::Rejected(current));
                }
                BookingStatus::Draft | BookingStatus::PendingPayment => continue,
            }
        }

        let current = self.get_booking(booking_id).await?;
        Err(BookingError::InvalidTransition {
            from: current.status,
            to: BookingStatus::Paid,
        })
    }

    pub async fn approve(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let approved = self
            .bookings
            .transition_status(booking_id, &[BookingStatus::Paid], BookingStatus::Approved, self.clock.now())
            .await?;

        match approved {
            Some(booking) => {
                info!("Booking {} approved", booking_id);
                Ok(booking)
            }
            None => {
                let current = self.get_booking(booking_id).await?;
                Err(BookingError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Approved,
                })
            }
        }
    }

    /// Rejects a non-terminal booking and frees its date in the same write.
    pub async fn reject(&self, booking_id: Uuid) -> BookingResult<Booking> {
        let now = self.clock.now();
        match self.bookings.reject_booking(booking_id, now).await? {
            Some(booking) => {
                info!("Booking {} rejected, {} is open again", booking_id, booking.target_date);
                self.events
                    .publish(booking.tier_id, booking.target_date, SlotChange::Released, now);
                Ok(booking)
            }
            None => {
                let current = self.get_booking(booking_id).await?;
                Err(BookingError::InvalidTransition {
                    from: current.status,
                    to: BookingStatus::Rejected,
                })
            }
        }
    }
}

fn locked_content(status: BookingStatus) -> BookingError {
    BookingError::InvalidContent(format!("ad content is locked once the booking is {}", status))
}
