use crate::{
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{plans::PlanRepository, users::UserRepository},
        value_objects::payments::{CancelSubscriptionRequest, CreatePaymentSessionRequest},
    },
    infrastructure::postgres::{
        postgres_connection::PgPoolSquad,
        repositories::{plans::PlanPostgres, users::UserPostgres},
    },
    payments::stripe_client::StripeClient,
    usecases::payments::{PaymentUseCase, StripeGateway, WebhookDisposition},
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PaymentInfoQuery {
    #[serde(rename = "userID")]
    user_id: Option<String>,
}

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let plan_repository = PlanPostgres::new(Arc::clone(&db_pool));
    let stripe_client = StripeClient::new(config.stripe.clone());

    let payments_usecase = PaymentUseCase::new(
        Arc::new(user_repository),
        Arc::new(plan_repository),
        Arc::new(stripe_client),
    );

    Router::new()
        .route("/session", post(create_checkout_session))
        .route("/webhook", post(stripe_webhook))
        .route("/info", get(payment_info))
        .route("/cancel", post(cancel_subscription))
        .with_state(Arc::new(payments_usecase))
}

pub async fn create_checkout_session<U, P, G>(
    State(usecase): State<Arc<PaymentUseCase<U, P, G>>>,
    AuthUser { user_id, .. }: AuthUser,
    Json(request): Json<CreatePaymentSessionRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    info!(%user_id, "payments: checkout session request received");
    match usecase.create_checkout_session(user_id, request).await {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

/// Inbound Stripe webhook. Unauthenticated on purpose: trust is established
/// by the signature over the raw body, so the body must be taken as bytes,
/// never re-serialized.
pub async fn stripe_webhook<U, P, G>(
    State(usecase): State<Arc<PaymentUseCase<U, P, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    let signature = match headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
    {
        Some(value) => value.to_string(),
        None => {
            warn!("payments: webhook request without stripe-signature header");
            return (
                StatusCode::BAD_REQUEST,
                "missing stripe-signature header".to_string(),
            )
                .into_response();
        }
    };

    match usecase.handle_stripe_webhook(&body, &signature).await {
        Ok(WebhookDisposition::Received) => Json(json!({ "received": true })).into_response(),
        Ok(WebhookDisposition::Unrecognized(event_type)) => (
            StatusCode::BAD_REQUEST,
            format!("unhandled event type {}", event_type),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn payment_info<U, P, G>(
    State(usecase): State<Arc<PaymentUseCase<U, P, G>>>,
    AuthUser { user_id, role, .. }: AuthUser,
    Query(query): Query<PaymentInfoQuery>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    info!(%user_id, "payments: payment info request received");
    let target_user_id = match query.user_id {
        Some(raw_id) => match Uuid::parse_str(&raw_id) {
            Ok(parsed) => parsed,
            Err(_) => {
                return (
                    StatusCode::BAD_REQUEST,
                    "userID must be a valid UUID".to_string(),
                )
                    .into_response();
            }
        },
        None => user_id,
    };

    match usecase
        .get_payment_info(user_id, &role, target_user_id)
        .await
    {
        Ok(info) => Json(info).into_response(),
        Err(err) => err.into_response(),
    }
}

pub async fn cancel_subscription<U, P, G>(
    State(usecase): State<Arc<PaymentUseCase<U, P, G>>>,
    AuthUser { user_id, role, .. }: AuthUser,
    Json(request): Json<CancelSubscriptionRequest>,
) -> impl IntoResponse
where
    U: UserRepository + Send + Sync + 'static,
    P: PlanRepository + Send + Sync + 'static,
    G: StripeGateway + Send + Sync + 'static,
{
    info!(%user_id, "payments: cancellation request received");
    match usecase.cancel_subscription(user_id, &role, request).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}
