use crate::payments::stripe_client::{StripeClient, StripeEvent};

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const PAYMENT_SUCCEEDED: &str = "invoice.payment_succeeded";
pub const PAYMENT_FAILED: &str = "invoice.payment_failed";

/// Fields captured from a completed checkout session. All of them are
/// optional on the wire; absence is tolerated here and resolved later.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutCompleted {
    pub client_reference_id: Option<String>,
    pub subscription_id: Option<String>,
    pub payment_status: Option<String>,
    pub payment_method_types: Option<Vec<String>>,
}

/// Closed set of provider events this service reacts to. Anything else maps
/// to `Unhandled` instead of falling through a string match.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    CheckoutSessionCompleted(CheckoutCompleted),
    PaymentSucceeded,
    PaymentFailed,
    Unhandled(String),
}

impl PaymentEvent {
    pub fn from_stripe_event(event: &StripeEvent) -> Self {
        match event.type_.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                let session = StripeClient::extract_checkout_session(event).unwrap_or_default();

                PaymentEvent::CheckoutSessionCompleted(CheckoutCompleted {
                    client_reference_id: session.client_reference_id,
                    subscription_id: session.subscription,
                    payment_status: session.payment_status,
                    payment_method_types: session.payment_method_types,
                })
            }
            PAYMENT_SUCCEEDED => PaymentEvent::PaymentSucceeded,
            PAYMENT_FAILED => PaymentEvent::PaymentFailed,
            other => PaymentEvent::Unhandled(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::stripe_client::{StripeEvent, StripeEventData};

    fn event_with(type_: &str, object: serde_json::Value) -> StripeEvent {
        StripeEvent {
            id: Some("evt_test".to_string()),
            type_: type_.to_string(),
            created: Some(1700000000),
            livemode: Some(false),
            api_version: None,
            request: None,
            data: StripeEventData { object },
        }
    }

    #[test]
    fn checkout_completed_captures_session_fields() {
        let event = event_with(
            CHECKOUT_SESSION_COMPLETED,
            serde_json::json!({
                "id": "cs_test_1",
                "client_reference_id": "5f2d3a9c-9e1b-4a56-8f05-3d2c1b0a9e88",
                "subscription": "sub_1",
                "payment_status": "paid",
                "payment_method_types": ["card"]
            }),
        );

        let parsed = PaymentEvent::from_stripe_event(&event);

        assert_eq!(
            parsed,
            PaymentEvent::CheckoutSessionCompleted(CheckoutCompleted {
                client_reference_id: Some("5f2d3a9c-9e1b-4a56-8f05-3d2c1b0a9e88".to_string()),
                subscription_id: Some("sub_1".to_string()),
                payment_status: Some("paid".to_string()),
                payment_method_types: Some(vec!["card".to_string()]),
            })
        );
    }

    #[test]
    fn checkout_completed_tolerates_missing_fields() {
        let event = event_with(CHECKOUT_SESSION_COMPLETED, serde_json::json!({}));

        let parsed = PaymentEvent::from_stripe_event(&event);

        assert_eq!(
            parsed,
            PaymentEvent::CheckoutSessionCompleted(CheckoutCompleted::default())
        );
    }

    #[test]
    fn recognized_no_op_events_map_to_their_variants() {
        let succeeded = event_with(PAYMENT_SUCCEEDED, serde_json::json!({}));
        let failed = event_with(PAYMENT_FAILED, serde_json::json!({}));

        assert_eq!(
            PaymentEvent::from_stripe_event(&succeeded),
            PaymentEvent::PaymentSucceeded
        );
        assert_eq!(
            PaymentEvent::from_stripe_event(&failed),
            PaymentEvent::PaymentFailed
        );
    }

    #[test]
    fn unknown_event_types_become_unhandled() {
        let event = event_with("customer.created", serde_json::json!({}));

        assert_eq!(
            PaymentEvent::from_stripe_event(&event),
            PaymentEvent::Unhandled("customer.created".to_string())
        );
    }
}
