use std::collections::HashMap;

use diesel::prelude::*;
use uuid::Uuid;

use crate::{domain::value_objects::plans::PlanFeatures, infrastructure::postgres::schema::plans};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanEntity {
    pub id: Uuid,
    pub title: String,
    pub price: i32,
    pub yearly_discount: Option<i32>,
    pub description: Option<String>,
    pub features: PlanFeatures,
    pub max_images_allowed: i32,
    pub stripe_price_keys: HashMap<String, String>,
    pub is_active: bool,
}

/// Raw row used for Diesel queries. Features and price keys stay as JSON and
/// are parsed into their typed forms.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = plans)]
pub struct PlanRow {
    pub id: Uuid,
    pub title: String,
    pub price: i32,
    pub yearly_discount: Option<i32>,
    pub description: Option<String>,
    pub features: serde_json::Value,
    pub max_images_allowed: i32,
    pub stripe_price_keys: serde_json::Value,
    pub is_active: bool,
}

impl From<PlanRow> for PlanEntity {
    fn from(value: PlanRow) -> Self {
        let features = serde_json::from_value(value.features).unwrap_or_default();
        let stripe_price_keys = serde_json::from_value(value.stripe_price_keys).unwrap_or_default();

        Self {
            id: value.id,
            title: value.title,
            price: value.price,
            yearly_discount: value.yearly_discount,
            description: value.description,
            features,
            max_images_allowed: value.max_images_allowed,
            stripe_price_keys,
            is_active: value.is_active,
        }
    }
}
