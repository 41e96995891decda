use std::sync::Arc;

use anyhow::{Result as AnyResult, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    domain::{
        entities::users::SubscriptionSyncChangeset,
        repositories::{plans::PlanRepository, users::UserRepository},
        value_objects::{
            payment_events::{CheckoutCompleted, PaymentEvent},
            payments::{
                CancelSubscriptionRequest, CheckoutSessionDto, CreatePaymentSessionRequest,
                PaymentInfoDto, SubscriptionStateDto,
            },
        },
    },
    payments::stripe_client::{CheckoutSessionRef, StripeClient, StripeEvent, StripeSubscription},
};

const SUPPORTED_GATEWAY: &str = "stripe";
const SUBSCRIPTION_PAYMENT_MODE: &str = "subscription";
const ADMIN_ROLE: &str = "admin";

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StripeGateway: Send + Sync {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: Uuid,
    ) -> AnyResult<CheckoutSessionRef>;

    async fn cancel_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent>;

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription>;
}

#[async_trait]
impl StripeGateway for StripeClient {
    async fn create_checkout_session(
        &self,
        price_id: &str,
        client_reference_id: Uuid,
    ) -> AnyResult<CheckoutSessionRef> {
        self.create_checkout_session(price_id, client_reference_id)
            .await
    }

    async fn cancel_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.cancel_subscription(subscription_id).await
    }

    fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> AnyResult<StripeEvent> {
        self.verify_webhook_signature(payload, signature)
    }

    async fn retrieve_subscription(&self, subscription_id: &str) -> AnyResult<StripeSubscription> {
        self.retrieve_subscription(subscription_id).await
    }
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Validation(String),
    #[error("subscription plan not found")]
    PlanNotFound,
    #[error("no price found for the requested duration")]
    PriceKeyNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("subscription not found")]
    SubscriptionNotFound,
    #[error("permission denied")]
    Permission,
    #[error("{0}")]
    Unsupported(String),
    #[error("webhook signature verification failed")]
    InvalidSignature,
    #[error("payment provider request failed")]
    Upstream(#[source] anyhow::Error),
    #[error("subscription state update failed")]
    Persistence(#[source] anyhow::Error),
}

impl PaymentError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            PaymentError::Validation(_) | PaymentError::InvalidSignature => {
                StatusCode::BAD_REQUEST
            }
            PaymentError::PlanNotFound
            | PaymentError::PriceKeyNotFound
            | PaymentError::UserNotFound
            | PaymentError::SubscriptionNotFound => StatusCode::NOT_FOUND,
            PaymentError::Permission => StatusCode::FORBIDDEN,
            PaymentError::Unsupported(_) => StatusCode::NOT_ACCEPTABLE,
            PaymentError::Upstream(_) | PaymentError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PaymentError>;

/// Outcome of webhook processing once the signature checked out. An
/// unrecognized event type is reported back to the provider rather than
/// treated as an internal failure.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookDisposition {
    Received,
    Unrecognized(String),
}

pub struct PaymentUseCase<U, P, G>
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    plan_repo: Arc<P>,
    stripe_client: Arc<G>,
}

impl<U, P, G> PaymentUseCase<U, P, G>
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, plan_repo: Arc<P>, stripe_client: Arc<G>) -> Self {
        Self {
            user_repo,
            plan_repo,
            stripe_client,
        }
    }

    pub async fn create_checkout_session(
        &self,
        user_id: Uuid,
        request: CreatePaymentSessionRequest,
    ) -> UseCaseResult<CheckoutSessionDto> {
        info!(%user_id, "payments: create checkout session requested");

        let gateway = match request.gateway {
            Some(value) => value,
            None => {
                let err = PaymentError::Validation("gateway is required".to_string());
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "payments: gateway missing on session request"
                );
                return Err(err);
            }
        };
        let payment_mode = match request.payment_mode {
            Some(value) => value,
            None => {
                let err = PaymentError::Validation("paymentMode is required".to_string());
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "payments: payment mode missing on session request"
                );
                return Err(err);
            }
        };

        if gateway != SUPPORTED_GATEWAY {
            let err = PaymentError::Unsupported(format!("gateway {} is not supported", gateway));
            warn!(
                %user_id,
                gateway = %gateway,
                status = err.status_code().as_u16(),
                "payments: unsupported gateway requested"
            );
            return Err(err);
        }
        if payment_mode != SUBSCRIPTION_PAYMENT_MODE {
            let err = PaymentError::Unsupported(format!(
                "payment mode {} is not supported",
                payment_mode
            ));
            warn!(
                %user_id,
                payment_mode = %payment_mode,
                status = err.status_code().as_u16(),
                "payments: unsupported payment mode requested"
            );
            return Err(err);
        }
        let duration = match request.subscription.and_then(|params| params.duration) {
            Some(value) => value,
            None => {
                let err = PaymentError::Unsupported(
                    "subscription checkout requires a duration".to_string(),
                );
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "payments: session request without subscription duration"
                );
                return Err(err);
            }
        };

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    db_error = ?err,
                    "payments: failed to load user for checkout"
                );
                PaymentError::Persistence(err)
            })?
            .ok_or_else(|| {
                let err = PaymentError::UserNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "payments: checkout requested for unknown user"
                );
                err
            })?;

        let plan_id = match user.subscription.subscription_plan_id {
            Some(value) => value,
            None => {
                let err = PaymentError::PlanNotFound;
                warn!(
                    %user_id,
                    status = err.status_code().as_u16(),
                    "payments: user has no plan assigned"
                );
                return Err(err);
            }
        };

        let plan = self
            .plan_repo
            .find_by_id(plan_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    db_error = ?err,
                    "payments: failed to load plan for checkout"
                );
                PaymentError::Persistence(err)
            })?
            .ok_or_else(|| {
                let err = PaymentError::PlanNotFound;
                warn!(
                    %user_id,
                    %plan_id,
                    status = err.status_code().as_u16(),
                    "payments: assigned plan no longer exists"
                );
                err
            })?;

        let price_id = match plan.stripe_price_keys.get(&duration) {
            Some(value) => value.clone(),
            None => {
                let err = PaymentError::PriceKeyNotFound;
                warn!(
                    %user_id,
                    %plan_id,
                    duration = %duration,
                    status = err.status_code().as_u16(),
                    "payments: plan has no price key for requested duration"
                );
                return Err(err);
            }
        };

        info!(
            %user_id,
            %plan_id,
            duration = %duration,
            price_id = %price_id,
            "payments: creating stripe checkout session"
        );

        let session = self
            .stripe_client
            .create_checkout_session(&price_id, user_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %plan_id,
                    price_id = %price_id,
                    error = ?err,
                    "payments: stripe checkout session creation failed"
                );
                PaymentError::Upstream(err)
            })?;

        info!(
            %user_id,
            session_id = %session.id,
            "payments: checkout session created successfully"
        );

        Ok(CheckoutSessionDto {
            session_id: session.id,
            url: session.url,
        })
    }

    pub async fn handle_stripe_webhook(
        &self,
        payload: &[u8],
        signature: &str,
    ) -> UseCaseResult<WebhookDisposition> {
        info!(
            payload = %String::from_utf8_lossy(payload),
            signature,
            "payments: stripe webhook payload received"
        );

        let event = self
            .stripe_client
            .verify_webhook_signature(payload, signature)
            .map_err(|err| {
                let rejected = PaymentError::InvalidSignature;
                warn!(
                    error = %err,
                    status = rejected.status_code().as_u16(),
                    "payments: stripe webhook verification failed"
                );
                rejected
            })?;

        info!(
            event_type = %event.type_,
            event_id = ?event.id,
            "payments: stripe webhook verified"
        );

        match PaymentEvent::from_stripe_event(&event) {
            PaymentEvent::CheckoutSessionCompleted(completed) => {
                self.apply_checkout_completed(completed).await?;
                Ok(WebhookDisposition::Received)
            }
            PaymentEvent::PaymentSucceeded => {
                info!(event_type = %event.type_, "payments: payment succeeded, nothing to record yet");
                Ok(WebhookDisposition::Received)
            }
            PaymentEvent::PaymentFailed => {
                info!(event_type = %event.type_, "payments: payment failed, nothing to record yet");
                Ok(WebhookDisposition::Received)
            }
            PaymentEvent::Unhandled(event_type) => {
                warn!(event_type = %event_type, "payments: unrecognized stripe event type");
                Ok(WebhookDisposition::Unrecognized(event_type))
            }
        }
    }

    async fn apply_checkout_completed(&self, completed: CheckoutCompleted) -> UseCaseResult<()> {
        let subscription_id = match completed.subscription_id {
            Some(value) => value,
            None => {
                info!("payments: checkout completed without subscription id, nothing to reconcile");
                return Ok(());
            }
        };

        info!(
            %subscription_id,
            "payments: retrieving subscription from stripe for reconciliation"
        );

        // The webhook payload's billing dates are never trusted. The live
        // subscription is re-read so replayed deliveries converge on the
        // provider's current truth.
        let subscription = self
            .stripe_client
            .retrieve_subscription(&subscription_id)
            .await
            .map_err(|err| {
                error!(
                    %subscription_id,
                    error = ?err,
                    "payments: failed to retrieve subscription from stripe"
                );
                PaymentError::Upstream(err)
            })?;

        let changeset = SubscriptionSyncChangeset {
            subscription_payment_id: Some(subscription_id.clone()),
            activation_date: subscription.period_start().and_then(Self::ts_to_datetime),
            expiry_date: subscription.period_end().and_then(Self::ts_to_datetime),
            is_active: Some(subscription.is_active()),
            payment_status: completed.payment_status,
            payment_type: completed
                .payment_method_types
                .map(serde_json::Value::from),
        };

        let user_id = match completed
            .client_reference_id
            .as_deref()
            .and_then(|reference| Uuid::parse_str(reference).ok())
        {
            Some(value) => value,
            None => {
                warn!(
                    %subscription_id,
                    client_reference_id = ?completed.client_reference_id,
                    "payments: client reference did not resolve to a user, skipping state sync"
                );
                return Ok(());
            }
        };

        let affected = self
            .user_repo
            .sync_subscription_from_provider(user_id, changeset)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %subscription_id,
                    db_error = ?err,
                    "payments: failed to sync subscription state onto user"
                );
                PaymentError::Persistence(err)
            })?;

        if affected == 0 {
            warn!(
                %user_id,
                %subscription_id,
                "payments: client reference matched no user, state sync skipped"
            );
            return Ok(());
        }

        info!(
            %user_id,
            %subscription_id,
            is_active = subscription.is_active(),
            "payments: user subscription state synced from provider"
        );

        Ok(())
    }

    pub async fn cancel_subscription(
        &self,
        actor_id: Uuid,
        actor_role: &str,
        request: CancelSubscriptionRequest,
    ) -> UseCaseResult<SubscriptionStateDto> {
        let target = match request.user_id {
            Some(value) => value,
            None => {
                let err = PaymentError::Validation("userID is required".to_string());
                warn!(
                    %actor_id,
                    status = err.status_code().as_u16(),
                    "payments: cancellation request without userID"
                );
                return Err(err);
            }
        };
        let payment_mode = match request.payment_mode {
            Some(value) => value,
            None => {
                let err = PaymentError::Validation("paymentMode is required".to_string());
                warn!(
                    %actor_id,
                    status = err.status_code().as_u16(),
                    "payments: cancellation request without paymentMode"
                );
                return Err(err);
            }
        };

        if payment_mode != SUBSCRIPTION_PAYMENT_MODE {
            let err = PaymentError::Unsupported(format!(
                "payment mode {} is not supported",
                payment_mode
            ));
            warn!(
                %actor_id,
                payment_mode = %payment_mode,
                status = err.status_code().as_u16(),
                "payments: unsupported payment mode on cancellation"
            );
            return Err(err);
        }

        let target_user_id = match Uuid::parse_str(&target) {
            Ok(value) => value,
            Err(_) => {
                let err = PaymentError::Validation("userID is not a valid user id".to_string());
                warn!(
                    %actor_id,
                    target = %target,
                    status = err.status_code().as_u16(),
                    "payments: cancellation request with malformed userID"
                );
                return Err(err);
            }
        };

        if actor_id != target_user_id && actor_role != ADMIN_ROLE {
            let err = PaymentError::Permission;
            warn!(
                %actor_id,
                %target_user_id,
                status = err.status_code().as_u16(),
                "payments: cancellation denied for non-owner actor"
            );
            return Err(err);
        }

        let user = self
            .user_repo
            .find_by_id(target_user_id)
            .await
            .map_err(|err| {
                error!(
                    %target_user_id,
                    db_error = ?err,
                    "payments: failed to load user for cancellation"
                );
                PaymentError::Persistence(err)
            })?
            .ok_or_else(|| {
                let err = PaymentError::UserNotFound;
                warn!(
                    %target_user_id,
                    status = err.status_code().as_u16(),
                    "payments: cancellation requested for unknown user"
                );
                err
            })?;

        let subscription_payment_id = match user.subscription.subscription_payment_id {
            Some(value) => value,
            None => {
                let err = PaymentError::SubscriptionNotFound;
                warn!(
                    %target_user_id,
                    status = err.status_code().as_u16(),
                    "payments: no subscription payment id on file to cancel"
                );
                return Err(err);
            }
        };

        info!(
            %target_user_id,
            %subscription_payment_id,
            "payments: scheduling cancel_at_period_end at stripe"
        );

        let subscription = self
            .stripe_client
            .cancel_subscription(&subscription_payment_id)
            .await
            .map_err(|err| {
                error!(
                    %target_user_id,
                    %subscription_payment_id,
                    error = ?err,
                    "payments: stripe cancel subscription failed"
                );
                PaymentError::Upstream(err)
            })?;

        if subscription.cancel_at_period_end != Some(true) {
            let err = PaymentError::Upstream(anyhow!(
                "provider did not confirm cancel_at_period_end for {}",
                subscription_payment_id
            ));
            error!(
                %target_user_id,
                %subscription_payment_id,
                status = err.status_code().as_u16(),
                "payments: provider did not schedule the cancellation"
            );
            return Err(err);
        }

        let canceled_at = subscription.canceled_at.and_then(Self::ts_to_datetime);
        let reason = request.reason.or_else(|| {
            subscription
                .cancellation_details
                .as_ref()
                .and_then(|details| details.reason.clone())
        });

        let updated = self
            .user_repo
            .mark_subscription_canceled(target_user_id, canceled_at, reason)
            .await
            .map_err(|err| {
                error!(
                    %target_user_id,
                    %subscription_payment_id,
                    db_error = ?err,
                    "payments: failed to record cancellation on user"
                );
                PaymentError::Persistence(err)
            })?;

        info!(
            %target_user_id,
            %subscription_payment_id,
            "payments: subscription cancellation recorded"
        );

        Ok(SubscriptionStateDto::from(updated.subscription))
    }

    pub async fn get_payment_info(
        &self,
        actor_id: Uuid,
        actor_role: &str,
        target_user_id: Uuid,
    ) -> UseCaseResult<PaymentInfoDto> {
        if actor_id != target_user_id && actor_role != ADMIN_ROLE {
            let err = PaymentError::Permission;
            warn!(
                %actor_id,
                %target_user_id,
                status = err.status_code().as_u16(),
                "payments: payment info denied for non-owner actor"
            );
            return Err(err);
        }

        let user = self
            .user_repo
            .find_by_id(target_user_id)
            .await
            .map_err(|err| {
                error!(
                    %target_user_id,
                    db_error = ?err,
                    "payments: failed to load user for payment info"
                );
                PaymentError::Persistence(err)
            })?
            .ok_or_else(|| {
                let err = PaymentError::UserNotFound;
                warn!(
                    %target_user_id,
                    status = err.status_code().as_u16(),
                    "payments: payment info requested for unknown user"
                );
                err
            })?;

        let subscription_payment_id = match user.subscription.subscription_payment_id {
            Some(value) => value,
            None => {
                let err = PaymentError::SubscriptionNotFound;
                warn!(
                    %target_user_id,
                    status = err.status_code().as_u16(),
                    "payments: no subscription payment id on file"
                );
                return Err(err);
            }
        };

        let subscription = self
            .stripe_client
            .retrieve_subscription(&subscription_payment_id)
            .await
            .map_err(|err| {
                error!(
                    %target_user_id,
                    %subscription_payment_id,
                    error = ?err,
                    "payments: failed to retrieve subscription for payment info"
                );
                PaymentError::Upstream(err)
            })?;

        Ok(PaymentInfoDto {
            subscription_payment_id,
            status: subscription.status.clone(),
            activation_date: subscription.period_start().and_then(Self::ts_to_datetime),
            expiry_date: subscription.period_end().and_then(Self::ts_to_datetime),
            cancel_at_period_end: subscription.cancel_at_period_end,
        })
    }

    fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(ts, 0).single()
    }
}
