use async_trait::async_trait;
use slotbook_core::booking::Booking;
use slotbook_core::payment::{CheckoutGateway, CheckoutSession, GatewayError};
use slotbook_core::tier::InventoryTier;
use uuid::Uuid;

/// Development gateway. Hands out fake session ids and never charges anything;
/// completion has to be simulated by posting a signed webhook.
pub struct DummyCheckoutGateway {
    checkout_base_url: String,
}

impl DummyCheckoutGateway {
    pub fn new(checkout_base_url: impl Into<String>) -> Self {
        Self {
            checkout_base_url: checkout_base_url.into(),
        }
    }
}

#[async_trait]
impl CheckoutGateway for DummyCheckoutGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
        tier: &InventoryTier,
    ) -> Result<CheckoutSession, GatewayError> {
        if tier.price_cents < 0 {
            return Err(GatewayError::InvalidData(format!("negative price on tier {}", tier.id)));
        }

        let id = format!("cs_dummy_{}", Uuid::new_v4().simple());
        let url = format!(
            "{}/{}?booking_id={}",
            self.checkout_base_url.trim_end_matches('/'),
            id,
            booking.id
        );
        Ok(CheckoutSession { id, url })
    }
}
