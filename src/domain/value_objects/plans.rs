use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entities::plans::PlanEntity;

/// Feature flags attached to a plan. Stored as JSONB in the database.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlanFeatures {
    #[serde(default)]
    pub email_link: bool,

    #[serde(default)]
    pub phone_link: bool,

    #[serde(default)]
    pub website_link: bool,

    #[serde(default)]
    pub social_media_links: bool,

    #[serde(default)]
    pub calendar: bool,

    #[serde(default)]
    pub chat: bool,

    #[serde(default)]
    pub store: bool,

    #[serde(default)]
    pub client_packages: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDto {
    pub id: Uuid,
    pub title: String,
    pub price: i32,
    pub yearly_discount: Option<i32>,
    pub description: Option<String>,
    pub features: PlanFeatures,
    pub max_images_allowed: i32,
    pub stripe_price_keys: HashMap<String, String>,
}

impl From<PlanEntity> for PlanDto {
    fn from(value: PlanEntity) -> Self {
        Self {
            id: value.id,
            title: value.title,
            price: value.price,
            yearly_discount: value.yearly_discount,
            description: value.description,
            features: value.features,
            max_images_allowed: value.max_images_allowed,
            stripe_price_keys: value.stripe_price_keys,
        }
    }
}
