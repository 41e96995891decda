use anyhow::Result;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use sha2::Sha256;
use tracing::error;
use uuid::Uuid;

use crate::config::config_model::Stripe;

type HmacSha256 = Hmac<Sha256>;

/// Minimal Stripe client built on reqwest. All keys and redirect URLs come
/// from the config struct handed in at construction.
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    webhook_secret: String,
    success_url: String,
    cancel_url: String,
}

#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub type_: String,
    pub created: Option<i64>,
    pub livemode: Option<bool>,
    pub api_version: Option<String>,
    pub request: Option<StripeEventRequest>,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StripeEventRequest {
    Id(String),
    Details {
        id: Option<String>,
        idempotency_key: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: Option<String>,
    pub mode: Option<String>,
    pub client_reference_id: Option<String>,
    pub subscription: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method_types: Option<Vec<String>>,
}

/// Reference to a freshly created hosted checkout flow.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSessionRef {
    pub id: String,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetails,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetails {
    #[serde(rename = "type")]
    type_: Option<String>,
    code: Option<String>,
    message: Option<String>,
    param: Option<String>,
    decline_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StripeCancellationDetails {
    pub reason: Option<String>,
    pub comment: Option<String>,
    pub feedback: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscription {
    pub id: Option<String>,
    pub status: Option<String>,
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
    pub billing_cycle_anchor: Option<i64>,
    pub cancel_at_period_end: Option<bool>,
    pub canceled_at: Option<i64>,
    pub cancellation_details: Option<StripeCancellationDetails>,
    #[serde(default)]
    pub items: StripeSubscriptionItems,
}

#[derive(Debug, Deserialize, Default)]
pub struct StripeSubscriptionItems {
    pub data: Vec<StripeSubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscriptionItem {
    pub current_period_start: Option<i64>,
    pub current_period_end: Option<i64>,
}

impl StripeSubscription {
    /// Returns the subscription period start timestamp, falling back to the first item
    /// or the billing cycle anchor when the top-level field is absent.
    pub fn period_start(&self) -> Option<i64> {
        self.current_period_start
            .or_else(|| {
                self.items
                    .data
                    .first()
                    .and_then(|item| item.current_period_start)
            })
            .or(self.billing_cycle_anchor)
    }

    /// Returns the subscription period end timestamp, falling back to the first item when needed.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end.or_else(|| {
            self.items
                .data
                .first()
                .and_then(|item| item.current_period_end)
        })
    }

    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }
}

impl StripeClient {
    pub fn new(config: Stripe) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: config.secret_key,
            webhook_secret: config.webhook_secret,
            success_url: config.success_url,
            cancel_url: config.cancel_url,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("request-id")
            .or_else(|| resp.headers().get("stripe-request-id"))
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let stripe_error = serde_json::from_str::<StripeErrorEnvelope>(&body)
            .ok()
            .map(|envelope| envelope.error);

        error!(
            status = %status,
            stripe_request_id = ?request_id,
            stripe_error = ?stripe_error,
            response_body = %body,
            context = %context,
            "stripe api request failed"
        );

        anyhow::bail!(
            "Stripe API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a subscription-mode Checkout Session carrying the internal
    /// user id as the client reference.
    /// https://stripe.com/docs/payments/checkout
    pub async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: Uuid,
    ) -> Result<CheckoutSessionRef> {
        let body: Vec<(String, String)> = vec![
            ("mode".to_string(), "subscription".to_string()),
            ("payment_method_types[0]".to_string(), "card".to_string()),
            ("line_items[0][price]".to_string(), price_id.to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            (
                "client_reference_id".to_string(),
                client_reference_id.to_string(),
            ),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ];

        let resp = self
            .http
            .post("https://api.stripe.com/v1/checkout/sessions")
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create checkout session").await?;

        let session: CheckoutSessionRef = resp.json().await?;
        Ok(session)
    }

    /// Marks a Stripe subscription to cancel at period end and returns the
    /// updated subscription object.
    /// https://stripe.com/docs/api/subscriptions/cancel#cancel_subscription-at_period_end
    pub async fn cancel_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        let body = [("cancel_at_period_end", "true".to_string())];
        let resp = self
            .http
            .post(format!(
                "https://api.stripe.com/v1/subscriptions/{}",
                subscription_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .form(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "cancel subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }

    /// Verifies the webhook signature over the raw body bytes.
    /// https://stripe.com/docs/webhooks/signatures
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<StripeEvent> {
        let mut timestamp: Option<String> = None;
        let mut signature: Option<String> = None;

        for part in signature_header.split(',') {
            if let Some(rest) = part.strip_prefix("t=") {
                timestamp = Some(rest.to_string());
            } else if let Some(rest) = part.strip_prefix("v1=") {
                signature = Some(rest.to_string());
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| anyhow::anyhow!("missing timestamp in stripe-signature"))?;
        let signature =
            signature.ok_or_else(|| anyhow::anyhow!("missing v1 in stripe-signature"))?;

        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())?;
        mac.update(signed_payload.as_bytes());
        let expected = mac.finalize().into_bytes();
        let provided = hex::decode(signature)?;

        if expected[..] != provided[..] {
            anyhow::bail!("invalid webhook signature");
        }

        let event: StripeEvent = serde_json::from_slice(payload)?;
        Ok(event)
    }

    pub fn extract_checkout_session(event: &StripeEvent) -> Option<StripeCheckoutSession> {
        serde_json::from_value(event.data.object.clone()).ok()
    }

    pub async fn retrieve_subscription(&self, subscription_id: &str) -> Result<StripeSubscription> {
        // https://stripe.com/docs/api/subscriptions/retrieve
        let resp = self
            .http
            .get(format!(
                "https://api.stripe.com/v1/subscriptions/{}",
                subscription_id
            ))
            .header(AUTHORIZATION, format!("Bearer {}", self.secret_key))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "retrieve subscription").await?;

        let subscription: StripeSubscription = resp.json().await?;
        Ok(subscription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_WEBHOOK_SECRET: &str = "whsec_test_secret_12345";

    fn test_client() -> StripeClient {
        StripeClient::new(Stripe {
            secret_key: "sk_test_123".to_string(),
            webhook_secret: TEST_WEBHOOK_SECRET.to_string(),
            success_url: "https://app.example.com/payment/success".to_string(),
            cancel_url: "https://app.example.com/payment/cancel".to_string(),
        })
    }

    fn sign(secret: &str, timestamp: i64, payload: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, payload);
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn verify_accepts_properly_signed_payload() {
        let client = test_client();
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"subscription":"sub_1"}}}"#;
        let timestamp = 1700000000;
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign(TEST_WEBHOOK_SECRET, timestamp, payload)
        );

        let event = client
            .verify_webhook_signature(payload.as_bytes(), &header)
            .expect("signature should verify");

        assert_eq!(event.type_, "checkout.session.completed");
        assert_eq!(event.id.as_deref(), Some("evt_1"));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let client = test_client();
        let payload = r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{}}}"#;
        let tampered = r#"{"id":"evt_2","type":"checkout.session.completed","data":{"object":{}}}"#;
        let timestamp = 1700000000;
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign(TEST_WEBHOOK_SECRET, timestamp, payload)
        );

        let result = client.verify_webhook_signature(tampered.as_bytes(), &header);

        assert!(result.is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let client = test_client();
        let payload = r#"{"id":"evt_1","type":"invoice.payment_succeeded","data":{"object":{}}}"#;
        let timestamp = 1700000000;
        let header = format!(
            "t={},v1={}",
            timestamp,
            sign("whsec_other_secret", timestamp, payload)
        );

        let result = client.verify_webhook_signature(payload.as_bytes(), &header);

        assert!(result.is_err());
    }

    #[test]
    fn verify_rejects_header_without_signature_parts() {
        let client = test_client();
        let payload = r#"{"id":"evt_1","type":"invoice.payment_failed","data":{"object":{}}}"#;

        assert!(
            client
                .verify_webhook_signature(payload.as_bytes(), "t=1700000000")
                .is_err()
        );
        assert!(
            client
                .verify_webhook_signature(payload.as_bytes(), "v1=deadbeef")
                .is_err()
        );
    }

    #[test]
    fn subscription_period_falls_back_to_items_then_anchor() {
        let subscription: StripeSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_1",
            "status": "active",
            "billing_cycle_anchor": 1690000000,
            "items": {
                "data": [
                    {"current_period_start": 1700000000, "current_period_end": 1702600000}
                ]
            }
        }))
        .unwrap();

        assert_eq!(subscription.period_start(), Some(1700000000));
        assert_eq!(subscription.period_end(), Some(1702600000));

        let anchored: StripeSubscription = serde_json::from_value(serde_json::json!({
            "id": "sub_2",
            "status": "active",
            "billing_cycle_anchor": 1690000000,
            "items": {"data": []}
        }))
        .unwrap();

        assert_eq!(anchored.period_start(), Some(1690000000));
        assert_eq!(anchored.period_end(), None);
    }

    #[test]
    fn is_active_requires_exact_active_status() {
        let active: StripeSubscription =
            serde_json::from_value(serde_json::json!({"status": "active"})).unwrap();
        let past_due: StripeSubscription =
            serde_json::from_value(serde_json::json!({"status": "past_due"})).unwrap();
        let missing: StripeSubscription = serde_json::from_value(serde_json::json!({})).unwrap();

        assert!(active.is_active());
        assert!(!past_due.is_active());
        assert!(!missing.is_active());
    }
}
