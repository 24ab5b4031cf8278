//! Payment provider seam: checkout session creation and webhook authentication.
//!
//! Webhook signatures follow the Stripe scheme. The `Stripe-Signature` header
//! looks like `t=1772359200,v1=5257a869...` and the signature is a hex encoded
//! HMAC-SHA256 over `{t}.{raw_body}` keyed with the endpoint secret.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::booking::Booking;
use crate::tier::InventoryTier;

type HmacSha256 = Hmac<Sha256>;

/// The only event type that moves a booking.
pub const CHECKOUT_COMPLETED: &str = "checkout.session.completed";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment provider API error: {0}")]
    ProviderApi(String),
    #[error("Invalid payment data: {0}")]
    InvalidData(String),
}

#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Create a hosted checkout session. The provider must echo
    /// `metadata.booking_id` back in the completion webhook.
    async fn create_checkout(
        &self,
        booking: &Booking,
        tier: &InventoryTier,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Malformed signature header")]
    MalformedHeader,
    #[error("Signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("No matching signature")]
    Mismatch,
}

/// Verify a signed webhook body. Any failure means the event must not be acted on.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: DateTime<Utc>,
    tolerance_seconds: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            return Err(SignatureError::MalformedHeader);
        };
        match key {
            "t" => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::MalformedHeader)?);
            }
            "v1" => {
                // Unknown encodings are skipped, a rotated secret may add more v1 entries
                if let Ok(bytes) = hex::decode(value) {
                    candidates.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if candidates.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }
    // t is attacker-controlled; abs_diff cannot overflow
    if now.timestamp().abs_diff(timestamp) > tolerance_seconds.max(0) as u64 {
        return Err(SignatureError::StaleTimestamp);
    }

    for candidate in &candidates {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| SignatureError::Mismatch)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        // verify_slice is constant time
        if mac.verify_slice(candidate).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

/// Produce a header value the way the provider does. Used by local tooling and tests.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}

/// Short fingerprint for logging a rejected payload without storing its contents.
pub fn payload_digest(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookData {
    pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    pub id: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl WebhookEvent {
    pub fn booking_id(&self) -> Option<Uuid> {
        self.data
            .object
            .metadata
            .as_ref()?
            .get("booking_id")?
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
    }
}
