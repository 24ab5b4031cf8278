use crate::confirm::{BookingConfirmer, PaymentOutcome};
use serde::Serialize;
use slotbook_core::clock::Clock;
use slotbook_core::payment::{payload_digest, verify_signature, WebhookEvent, CHECKOUT_COMPLETED};
use slotbook_core::{BookingError, BookingResult};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// What a verified webhook delivery amounted to. Every variant is acknowledged
/// to the provider with a 2xx.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    Paid { booking_id: Uuid },
    AlreadyPaid { booking_id: Uuid },
    /// Payment landed on a booking the creator had rejected.
    PaidAfterRejection { booking_id: Uuid },
    BookingMissing,
    Ignored { event_type: String },
}

pub struct PaymentReconciler {
    confirmer: Arc<BookingConfirmer>,
    clock: Arc<dyn Clock>,
    webhook_secret: String,
    tolerance_seconds: i64,
}

impl PaymentReconciler {
    pub fn new(
        confirmer: Arc<BookingConfirmer>,
        clock: Arc<dyn Clock>,
        webhook_secret: String,
        tolerance_seconds: i64,
    ) -> Self {
        Self {
            confirmer,
            clock,
            webhook_secret,
            tolerance_seconds,
        }
    }

    /// Authenticates a raw delivery and applies it. Nothing is parsed before the
    /// signature checks out.
    pub async fn handle_webhook(&self, payload: &[u8], signature: Option<&str>) -> BookingResult<ReconcileOutcome> {
        let Some(signature) = signature else {
            warn!("Payment webhook without signature header, digest {}", payload_digest(payload));
            return Err(BookingError::InvalidSignature);
        };

        if let Err(e) = verify_signature(
            payload,
            signature,
            &self.webhook_secret,
            self.clock.now(),
            self.tolerance_seconds,
        ) {
            warn!("Rejected payment webhook ({}), digest {}", e, payload_digest(payload));
            return Err(BookingError::InvalidSignature);
        }

        let event: WebhookEvent =
            serde_json::from_slice(payload).map_err(|e| BookingError::InvalidPayload(e.to_string()))?;

        if event.event_type != CHECKOUT_COMPLETED {
            info!("Ignoring payment event {} of type {}", event.id, event.event_type);
            return Ok(ReconcileOutcome::Ignored {
                event_type: event.event_type,
            });
        }

        let Some(booking_id) = event.booking_id() else {
            warn!(
                "Payment event {} for session {} carries no usable booking_id",
                event.id, event.data.object.id
            );
            return Ok(ReconcileOutcome::BookingMissing);
        };

        self.on_payment_confirmed(booking_id).await
    }

    pub async fn on_payment_confirmed(&self, booking_id: Uuid) -> BookingResult<ReconcileOutcome> {
        match self.confirmer.mark_paid(booking_id).await {
            Ok(PaymentOutcome::Paid(_)) => Ok(ReconcileOutcome::Paid { booking_id }),
            Ok(PaymentOutcome::AlreadyPaid(_)) => Ok(ReconcileOutcome::AlreadyPaid { booking_id }),
            Ok(PaymentOutcome::Rejected(_)) => Ok(ReconcileOutcome::PaidAfterRejection { booking_id }),
            Err(BookingError::BookingNotFound(_)) => {
                warn!("Payment confirmed for unknown booking {}", booking_id);
                Ok(ReconcileOutcome::BookingMissing)
            }
            Err(e) => Err(e),
        }
    }
}
