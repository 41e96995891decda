use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infrastructure::postgres::schema::users;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CancelationState {
    pub status: bool,
    pub date: Option<DateTime<Utc>>,
    pub reason: Option<String>,
}

/// Subscription fields embedded in the user record. Written only by the
/// webhook reconciliation and the cancellation path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserSubscriptionState {
    pub subscription_plan_id: Option<Uuid>,
    pub subscription_payment_id: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub duration: String,
    pub payment_type: Vec<String>,
    pub payment_status: String,
    pub is_active: bool,
    pub is_active_by_admin: bool,
    pub cancelation: CancelationState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub user_role: String,
    pub subscription: UserSubscriptionState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw row used for Diesel queries. `payment_type` stays as JSON and is
/// parsed into the typed list.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub user_role: String,
    pub subscription_plan_id: Option<Uuid>,
    pub subscription_payment_id: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub duration: String,
    pub payment_type: serde_json::Value,
    pub payment_status: String,
    pub is_active: bool,
    pub is_active_by_admin: bool,
    pub cancelation_status: bool,
    pub cancelation_date: Option<DateTime<Utc>>,
    pub cancelation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserEntity {
    fn from(value: UserRow) -> Self {
        let payment_type = serde_json::from_value(value.payment_type).unwrap_or_default();

        Self {
            id: value.id,
            email: value.email,
            display_name: value.display_name,
            user_role: value.user_role,
            subscription: UserSubscriptionState {
                subscription_plan_id: value.subscription_plan_id,
                subscription_payment_id: value.subscription_payment_id,
                activation_date: value.activation_date,
                expiry_date: value.expiry_date,
                duration: value.duration,
                payment_type,
                payment_status: value.payment_status,
                is_active: value.is_active,
                is_active_by_admin: value.is_active_by_admin,
                cancelation: CancelationState {
                    status: value.cancelation_status,
                    date: value.cancelation_date,
                    reason: value.cancelation_reason,
                },
            },
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Overwrite applied when a provider subscription is reconciled onto a user.
/// `None` fields are left untouched, so replaying the same event converges
/// to the same row.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = users)]
pub struct SubscriptionSyncChangeset {
    pub subscription_payment_id: Option<String>,
    pub activation_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub payment_status: Option<String>,
    pub payment_type: Option<serde_json::Value>,
}
