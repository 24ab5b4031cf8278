use async_trait::async_trait;
use serde::Deserialize;
use slotbook_core::booking::Booking;
use slotbook_core::payment::{CheckoutGateway, CheckoutSession, GatewayError};
use slotbook_core::tier::InventoryTier;
use tracing::{error, info};

/// Hosted checkout through the Stripe REST API.
pub struct StripeCheckoutGateway {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
struct StripeSessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeCheckoutGateway {
    pub fn new(api_base: String, api_key: String, success_url: String, cancel_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            api_key,
            success_url,
            cancel_url,
        }
    }

    fn form(&self, booking: &Booking, tier: &InventoryTier) -> Vec<(&'static str, String)> {
        let booking_id = booking.id.to_string();
        vec![
            ("mode", "payment".to_string()),
            ("success_url", self.success_url.replace("{BOOKING_ID}", &booking_id)),
            ("cancel_url", self.cancel_url.replace("{BOOKING_ID}", &booking_id)),
            ("client_reference_id", booking_id.clone()),
            ("customer_email", booking.sponsor_email.expose().clone()),
            ("metadata[booking_id]", booking_id.clone()),
            ("payment_intent_data[metadata][booking_id]", booking_id),
            ("line_items[0][quantity]", "1".to_string()),
            ("line_items[0][price_data][currency]", tier.currency.to_lowercase()),
            ("line_items[0][price_data][unit_amount]", tier.price_cents.to_string()),
            (
                "line_items[0][price_data][product_data][name]",
                format!("{} sponsorship, {} ({})", tier.name, booking.target_date, booking.newsletter_slug),
            ),
        ]
    }
}

#[async_trait]
impl CheckoutGateway for StripeCheckoutGateway {
    async fn create_checkout(
        &self,
        booking: &Booking,
        tier: &InventoryTier,
    ) -> Result<CheckoutSession, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.api_base.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", format!("checkout-{}", booking.id))
            .form(&self.form(booking, tier))
            .send()
            .await
            .map_err(|e| GatewayError::ProviderApi(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("Stripe checkout creation failed for booking {}: {} {}", booking.id, status, body);
            return Err(GatewayError::ProviderApi(format!("stripe returned {}", status)));
        }

        let session: StripeSessionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidData(e.to_string()))?;
        let url = session
            .url
            .ok_or_else(|| GatewayError::InvalidData("checkout session has no url".to_string()))?;

        info!("Created Stripe checkout session {} for booking {}", session.id, booking.id);
        Ok(CheckoutSession { id: session.id, url })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc, Weekday};
    use slotbook_core::booking::{AdCreative, BookingStatus};
    use slotbook_shared::Masked;
    use uuid::Uuid;

    #[test]
    fn test_form_carries_booking_metadata_and_price() {
        let gateway = StripeCheckoutGateway::new(
            "https://api.stripe.com".to_string(),
            "sk_test".to_string(),
            "https://app.example.com/bookings/{BOOKING_ID}/paid".to_string(),
            "https://app.example.com/bookings/{BOOKING_ID}".to_string(),
        );
        let tier = InventoryTier {
            id: Uuid::new_v4(),
            newsletter_id: Uuid::new_v4(),
            newsletter_slug: "weekly-rust".to_string(),
            name: "Primary".to_string(),
            price_cents: 45_000,
            currency: "USD".to_string(),
            available_weekdays: vec![Weekday::Tue],
            active: true,
        };
        let booking = Booking {
            id: Uuid::new_v4(),
            tier_id: tier.id,
            newsletter_slug: "weekly-rust".to_string(),
            target_date: NaiveDate::from_ymd_opt(2026, 4, 7).unwrap(),
            status: BookingStatus::Draft,
            sponsor_id: "guest-1".to_string(),
            sponsor_name: "Acme".to_string(),
            sponsor_email: Masked::new("ads@acme.test".to_string()),
            creative: AdCreative::default(),
            checkout_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let form = gateway.form(&booking, &tier);
        let get = |key: &str| form.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());

        assert_eq!(get("metadata[booking_id]"), Some(booking.id.to_string()));
        assert_eq!(get("line_items[0][price_data][unit_amount]").as_deref(), Some("45000"));
        assert_eq!(get("line_items[0][price_data][currency]").as_deref(), Some("usd"));
        assert_eq!(
            get("success_url"),
            Some(format!("https://app.example.com/bookings/{}/paid", booking.id))
        );
    }
}
