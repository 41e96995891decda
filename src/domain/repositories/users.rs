use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::users::{SubscriptionSyncChangeset, UserEntity};

#[async_trait]
#[automock]
pub trait UserRepository {
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;

    /// Applies a provider-derived subscription overwrite to the matching user
    /// row. Returns the number of rows touched; zero means the reference id
    /// matched nobody.
    async fn sync_subscription_from_provider(
        &self,
        user_id: Uuid,
        changeset: SubscriptionSyncChangeset,
    ) -> Result<usize>;

    async fn mark_subscription_canceled(
        &self,
        user_id: Uuid,
        canceled_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    ) -> Result<UserEntity>;
}
