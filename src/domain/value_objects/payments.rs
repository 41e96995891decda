use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::users::UserSubscriptionState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentSessionRequest {
    pub gateway: Option<String>,
    pub payment_mode: Option<String>,
    pub subscription: Option<SessionSubscriptionParams>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSubscriptionParams {
    pub duration: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionDto {
    pub session_id: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelSubscriptionRequest {
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
    pub payment_mode: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CancelationDto {
    pub status: bool,
    pub date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStateDto {
    #[serde(rename = "subscriptionPlanID")]
    pub subscription_plan_id: Option<Uuid>,
    #[serde(rename = "subscriptionPaymentID")]
    pub subscription_payment_id: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub duration: String,
    pub payment_type: Vec<String>,
    pub payment_status: String,
    pub is_active: bool,
    pub is_active_by_admin: bool,
    pub cancelation: CancelationDto,
}

impl From<UserSubscriptionState> for SubscriptionStateDto {
    fn from(value: UserSubscriptionState) -> Self {
        Self {
            subscription_plan_id: value.subscription_plan_id,
            subscription_payment_id: value.subscription_payment_id,
            activation_date: value.activation_date,
            expiry_date: value.expiry_date,
            duration: value.duration,
            payment_type: value.payment_type,
            payment_status: value.payment_status,
            is_active: value.is_active,
            is_active_by_admin: value.is_active_by_admin,
            cancelation: CancelationDto {
                status: value.cancelation.status,
                date: value.cancelation.date,
                reason: value.cancelation.reason,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInfoDto {
    #[serde(rename = "subscriptionPaymentID")]
    pub subscription_payment_id: String,
    pub status: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub cancel_at_period_end: Option<bool>,
}
